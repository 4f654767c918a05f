use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{InventoryId, ScreenId, ShowId};

/// Сеанс. Для ядра это справочник: время, зал, инвентарь мест
/// и крайний срок продажи.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Show {
    pub id: ShowId,
    pub title: String,
    pub screen_id: ScreenId,
    pub inventory_id: InventoryId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub base_price: f64,
    /// Продажа разрешена строго до этого момента.
    pub bookable_until: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Show {
    pub fn can_be_booked(&self, now: DateTime<Utc>) -> bool {
        now < self.bookable_until
    }

    pub fn is_upcoming(&self, now: DateTime<Utc>) -> bool {
        now < self.start_time
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now >= self.start_time && now < self.end_time
    }

    pub fn is_completed(&self, now: DateTime<Utc>) -> bool {
        now >= self.end_time
    }

    pub fn duration(&self) -> Duration {
        self.end_time - self.start_time
    }

    pub fn time_until_start(&self, now: DateTime<Utc>) -> Duration {
        if self.is_upcoming(now) {
            self.start_time - now
        } else {
            Duration::zero()
        }
    }

    // Пересечение полуинтервалов [start, end)
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        start < self.end_time && end > self.start_time
    }
}
