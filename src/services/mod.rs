pub mod booking;
pub mod cleanup;
pub mod notification;
pub mod payment;
pub mod schedule;

pub use booking::{BookingDetails, BookingService, CreateBookingRequest};
pub use cleanup::{CleanupReport, CleanupService, CleanupStats};
pub use notification::{LogNotifier, NotificationError, NotificationSink};
pub use payment::{
    CircuitBreaker, CircuitState, PaymentGateway, PaymentMetadata, PaymentResult, PaymentService, PaymentStrategy,
    SimulatedStrategy, StrategyGateway,
};
pub use schedule::{ScheduleService, ScheduleShow};
