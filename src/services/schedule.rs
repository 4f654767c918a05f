use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};
use validator::Validate;

use crate::clock::Clock;
use crate::config::BookingConfig;
use crate::error::{BookingError, BookingResult};
use crate::locks;
use crate::models::{ScreenId, SeatInventory, SeatLayout, Show, ShowId};
use crate::repositories::{InventoryRepository, ShowRepository};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ScheduleShow {
    #[validate(length(min = 1, message = "title is required"))]
    pub title: String,
    pub screen_id: ScreenId,
    pub start_time: DateTime<Utc>,
    #[validate(range(min = 1, max = 10080, message = "duration must be between 1 minute and 7 days"))]
    pub duration_minutes: i64,
    #[validate(range(exclusive_min = 0.0, message = "base price must be positive"))]
    pub base_price: f64,
    #[serde(default)]
    pub layout: SeatLayout,
}

/// Реестр сеансов: расписание с проверкой пересечений в зале
/// и выдача каждому сеансу собственного инвентаря мест.
pub struct ScheduleService {
    shows: Arc<dyn ShowRepository>,
    inventories: Arc<dyn InventoryRepository>,
    clock: Arc<dyn Clock>,
    cutoff_after_start: Duration,
    // проверка пересечения и запись сеанса должны идти одним шагом
    schedule_lock: Mutex<()>,
}

impl ScheduleService {
    pub fn new(
        shows: Arc<dyn ShowRepository>,
        inventories: Arc<dyn InventoryRepository>,
        clock: Arc<dyn Clock>,
        config: &BookingConfig,
    ) -> Self {
        Self {
            shows,
            inventories,
            clock,
            cutoff_after_start: config.cutoff_after_start(),
            schedule_lock: Mutex::new(()),
        }
    }

    pub fn schedule_show(&self, request: ScheduleShow) -> BookingResult<Show> {
        request
            .validate()
            .map_err(|e| BookingError::InvalidShowData(e.to_string()))?;

        if request.title.trim().is_empty() {
            return Err(BookingError::InvalidShowData("title is required".to_string()));
        }
        if !request.base_price.is_finite() {
            return Err(BookingError::InvalidShowData("base price must be finite".to_string()));
        }
        if request.layout.total_seats() == 0 {
            return Err(BookingError::InvalidShowData("layout has no seats".to_string()));
        }

        let now = self.clock.now();
        if request.start_time <= now {
            return Err(BookingError::InvalidShowData("show must start in the future".to_string()));
        }

        let start_time = request.start_time;
        let out_of_range = || BookingError::InvalidShowData("show time is out of range".to_string());
        let end_time = Duration::try_minutes(request.duration_minutes)
            .and_then(|duration| start_time.checked_add_signed(duration))
            .ok_or_else(out_of_range)?;
        let bookable_until = start_time
            .checked_add_signed(self.cutoff_after_start)
            .ok_or_else(out_of_range)?;

        let _guard = locks::lock(&self.schedule_lock);

        if self.shows.check_conflict(request.screen_id, start_time, end_time)? {
            warn!(screen_id = %request.screen_id, "Show at {} overlaps an existing show", start_time);
            return Err(BookingError::ShowConflict);
        }

        let show_id = ShowId::new();
        let inventory = Arc::new(SeatInventory::new(
            request.screen_id,
            show_id,
            request.layout.build_seats(request.base_price),
        ));

        let show = Show {
            id: show_id,
            title: request.title,
            screen_id: request.screen_id,
            inventory_id: inventory.id(),
            start_time,
            end_time,
            base_price: request.base_price,
            bookable_until,
            created_at: now,
        };

        self.inventories.create(Arc::clone(&inventory))?;
        self.shows.create(show.clone())?;

        info!(
            show_id = %show.id,
            screen_id = %show.screen_id,
            "🎬 Show '{}' scheduled at {} with {} seats",
            show.title,
            show.start_time,
            inventory.capacity()
        );

        Ok(show)
    }

    pub fn get_show(&self, show_id: ShowId) -> BookingResult<Show> {
        self.shows
            .get_by_id(show_id)
            .map_err(|e| e.or_not_found(BookingError::ShowNotFound(show_id)))
    }

    pub fn list_shows(&self) -> BookingResult<Vec<Show>> {
        Ok(self.shows.list()?)
    }

    /// Сеансы, на которые ещё идёт продажа.
    pub fn bookable_shows(&self) -> BookingResult<Vec<Show>> {
        let now = self.clock.now();
        let mut shows = self.shows.list()?;
        shows.retain(|show| show.can_be_booked(now));
        Ok(shows)
    }
}
