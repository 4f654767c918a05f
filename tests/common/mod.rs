#![allow(dead_code)]

use chrono::{Duration, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use seat_booking::clock::{Clock, ManualClock};
use seat_booking::config::{BookingConfig, LockScope, PaymentConfig};
use seat_booking::error::{PaymentError, StoreError};
use seat_booking::models::{
    BookingId, BookingRecord, BookingStatus, InventoryId, PaymentMethod, RowConfig, ScreenId, SeatClass, SeatId,
    SeatInventory, SeatLayout, SeatStatus, Show, UserId,
};
use seat_booking::repositories::{
    BookingRepository, InventoryRepository, MemoryBookingRepository, MemoryInventoryRepository,
    MemoryPaymentRepository, MemoryShowRepository, StoreResult,
};
use seat_booking::services::{
    BookingService, CircuitBreaker, CreateBookingRequest, NotificationError, NotificationSink, PaymentGateway,
    PaymentMetadata, PaymentResult, PaymentService, ScheduleService, ScheduleShow, StrategyGateway,
};

fn injected() -> StoreError {
    StoreError::Unavailable("injected failure".to_string())
}

/// Хранилище броней, которое умеет падать по команде.
#[derive(Debug, Default)]
pub struct FlakyBookingRepository {
    inner: MemoryBookingRepository,
    pub fail_create: AtomicBool,
    pub fail_update: AtomicBool,
}

impl BookingRepository for FlakyBookingRepository {
    fn create(&self, booking: BookingRecord) -> StoreResult<()> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(injected());
        }
        self.inner.create(booking)
    }

    fn get_by_id(&self, id: BookingId) -> StoreResult<BookingRecord> {
        self.inner.get_by_id(id)
    }

    fn update(&self, booking: &BookingRecord) -> StoreResult<()> {
        if self.fail_update.load(Ordering::SeqCst) {
            return Err(injected());
        }
        self.inner.update(booking)
    }

    fn list_by_status(&self, status: BookingStatus) -> StoreResult<Vec<BookingRecord>> {
        self.inner.list_by_status(status)
    }

    fn list_by_user(&self, user_id: &UserId) -> StoreResult<Vec<BookingRecord>> {
        self.inner.list_by_user(user_id)
    }
}

#[derive(Debug, Default)]
pub struct FlakyInventoryRepository {
    inner: MemoryInventoryRepository,
    pub fail_update: AtomicBool,
}

impl InventoryRepository for FlakyInventoryRepository {
    fn create(&self, inventory: Arc<SeatInventory>) -> StoreResult<()> {
        self.inner.create(inventory)
    }

    fn get_by_id(&self, id: InventoryId) -> StoreResult<Arc<SeatInventory>> {
        self.inner.get_by_id(id)
    }

    fn update(&self, inventory: &Arc<SeatInventory>) -> StoreResult<()> {
        if self.fail_update.load(Ordering::SeqCst) {
            return Err(injected());
        }
        self.inner.update(inventory)
    }
}

#[derive(Debug, Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<BookingId>>,
    pub fail: AtomicBool,
}

impl NotificationSink for RecordingNotifier {
    fn send_booking_confirmation(&self, _user_id: &UserId, booking_id: BookingId) -> Result<(), NotificationError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotificationError("smtp down".to_string()));
        }
        self.sent.lock().unwrap().push(booking_id);
        Ok(())
    }
}

/// Шлюз, который всегда отклоняет платёж.
pub struct DecliningGateway;

impl PaymentGateway for DecliningGateway {
    fn process_payment(&self, _: f64, _: PaymentMethod, _: &PaymentMetadata) -> Result<PaymentResult, PaymentError> {
        Ok(PaymentResult {
            success: false,
            transaction_id: None,
            response: "insufficient funds".to_string(),
        })
    }
}

/// Шлюз, который всегда недоступен.
pub struct BrokenGateway;

impl PaymentGateway for BrokenGateway {
    fn process_payment(&self, _: f64, _: PaymentMethod, _: &PaymentMetadata) -> Result<PaymentResult, PaymentError> {
        Err(PaymentError::Gateway("upstream timeout".to_string()))
    }
}

pub const CIRCUIT_THRESHOLD: u32 = 3;

pub struct Fixture {
    pub clock: Arc<ManualClock>,
    pub shows: Arc<MemoryShowRepository>,
    pub inventories: Arc<FlakyInventoryRepository>,
    pub booking_repo: Arc<FlakyBookingRepository>,
    pub notifier: Arc<RecordingNotifier>,
    pub schedule: ScheduleService,
    pub payments: Arc<PaymentService>,
    pub bookings: Arc<BookingService>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with(LockScope::PerInventory, Arc::new(StrategyGateway::from_config(&PaymentConfig::default())))
    }

    pub fn with_lock_scope(lock_scope: LockScope) -> Self {
        Self::with(lock_scope, Arc::new(StrategyGateway::from_config(&PaymentConfig::default())))
    }

    pub fn with_gateway(gateway: Arc<dyn PaymentGateway>) -> Self {
        Self::with(LockScope::PerInventory, gateway)
    }

    pub fn with(lock_scope: LockScope, gateway: Arc<dyn PaymentGateway>) -> Self {
        let config = BookingConfig {
            lock_scope,
            ..BookingConfig::default()
        };

        let clock = Arc::new(ManualClock::new(Utc::now()));
        let shows = Arc::new(MemoryShowRepository::new());
        let inventories = Arc::new(FlakyInventoryRepository::default());
        let booking_repo = Arc::new(FlakyBookingRepository::default());
        let notifier = Arc::new(RecordingNotifier::default());

        let schedule = ScheduleService::new(shows.clone(), inventories.clone(), clock.clone(), &config);

        let payments = Arc::new(PaymentService::new(
            Arc::new(MemoryPaymentRepository::new()),
            booking_repo.clone(),
            gateway,
            Arc::new(CircuitBreaker::new(CIRCUIT_THRESHOLD, std::time::Duration::from_secs(60))),
            clock.clone(),
            "INR",
        ));

        let bookings = Arc::new(BookingService::new(
            shows.clone(),
            inventories.clone(),
            booking_repo.clone(),
            payments.clone(),
            notifier.clone(),
            clock.clone(),
            &config,
        ));

        Self {
            clock,
            shows,
            inventories,
            booking_repo,
            notifier,
            schedule,
            payments,
            bookings,
        }
    }

    /// Сеанс через два часа в новом зале.
    pub fn schedule_show(&self, rows: Vec<RowConfig>, base_price: f64) -> Show {
        self.schedule
            .schedule_show(ScheduleShow {
                title: "Test Show".to_string(),
                screen_id: ScreenId::new(),
                start_time: self.clock.now() + Duration::hours(2),
                duration_minutes: 120,
                base_price,
                layout: SeatLayout::new(rows),
            })
            .unwrap()
    }

    /// Один ряд "A" из `count` обычных мест по 100.
    pub fn simple_show(&self, count: u32) -> Show {
        self.schedule_show(vec![RowConfig::new("A", count, SeatClass::Regular)], 100.0)
    }

    pub fn inventory(&self, show: &Show) -> Arc<SeatInventory> {
        self.inventories.get_by_id(show.inventory_id).unwrap()
    }

    /// Идентификаторы мест в порядке схемы зала.
    pub fn seat_ids(&self, show: &Show) -> Vec<SeatId> {
        self.inventory(show).snapshots().into_iter().map(|s| s.id).collect()
    }

    pub fn seat_status(&self, show: &Show, seat_id: SeatId) -> SeatStatus {
        self.inventory(show).get_seat(seat_id).unwrap().status()
    }

    pub fn statuses(&self, show: &Show, seat_ids: &[SeatId]) -> Vec<SeatStatus> {
        seat_ids.iter().map(|id| self.seat_status(show, *id)).collect()
    }

    pub fn book(&self, user: &str, show: &Show, seat_ids: &[SeatId]) -> BookingRecord {
        self.bookings.create_booking(request(user, show, seat_ids)).unwrap()
    }

    pub fn advance(&self, minutes: i64) {
        self.clock.advance(Duration::minutes(minutes));
    }
}

pub fn request(user: &str, show: &Show, seat_ids: &[SeatId]) -> CreateBookingRequest {
    CreateBookingRequest {
        user_id: user.to_string(),
        show_id: show.id,
        seat_ids: seat_ids.to_vec(),
    }
}

pub fn upi() -> PaymentMetadata {
    seat_booking::services::payment::metadata([("upi_id", "tester@upi")])
}
