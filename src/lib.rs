pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod repositories;
pub mod services;

pub(crate) mod locks;

use std::sync::Arc;

use clock::{Clock, SystemClock};
use repositories::{MemoryBookingRepository, MemoryInventoryRepository, MemoryPaymentRepository, MemoryShowRepository};
use services::{
    BookingService, CircuitBreaker, CleanupService, LogNotifier, PaymentService, ScheduleService, StrategyGateway,
};

// Shared state для всего приложения
#[derive(Clone)]
pub struct AppState {
    pub config: config::Config,
    pub clock: Arc<dyn Clock>,
    pub schedule: Arc<ScheduleService>,
    pub payments: Arc<PaymentService>,
    pub bookings: Arc<BookingService>,
    pub cleanup: Arc<CleanupService>,
}

impl AppState {
    pub fn new(config: config::Config) -> Arc<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Собирает все сервисы поверх хранилищ в памяти.
    pub fn with_clock(config: config::Config, clock: Arc<dyn Clock>) -> Arc<Self> {
        let shows = Arc::new(MemoryShowRepository::new());
        let inventories = Arc::new(MemoryInventoryRepository::new());
        let booking_repo = Arc::new(MemoryBookingRepository::new());
        let payment_repo = Arc::new(MemoryPaymentRepository::new());

        let schedule = Arc::new(ScheduleService::new(
            shows.clone(),
            inventories.clone(),
            clock.clone(),
            &config.booking,
        ));

        let payments = Arc::new(PaymentService::new(
            payment_repo,
            booking_repo.clone(),
            Arc::new(StrategyGateway::from_config(&config.payment)),
            Arc::new(CircuitBreaker::from_config(&config.circuit_breaker)),
            clock.clone(),
            config.payment.currency.clone(),
        ));

        let bookings = Arc::new(BookingService::new(
            shows,
            inventories,
            booking_repo,
            payments.clone(),
            Arc::new(LogNotifier),
            clock.clone(),
            &config.booking,
        ));

        let cleanup = Arc::new(CleanupService::new(bookings.clone()));

        tracing::debug!(
            "Application state ready: environment={}, lock_scope={:?}",
            config.app.environment,
            config.booking.lock_scope
        );

        Arc::new(Self {
            config,
            clock,
            schedule,
            payments,
            bookings,
            cleanup,
        })
    }
}
