use thiserror::Error;
use tracing::info;

use crate::models::{BookingId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("notification delivery failed: {0}")]
pub struct NotificationError(pub String);

/// Канал уведомлений. Вызывается только после того, как бронь стала
/// Confirmed; ошибка доставки на состояние брони не влияет.
pub trait NotificationSink: Send + Sync {
    fn send_booking_confirmation(&self, user_id: &UserId, booking_id: BookingId) -> Result<(), NotificationError>;
}

/// Реальной доставки (email/SMS/push) нет - пишем в лог.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl NotificationSink for LogNotifier {
    fn send_booking_confirmation(&self, user_id: &UserId, booking_id: BookingId) -> Result<(), NotificationError> {
        info!(user_id = %user_id, booking_id = %booking_id, "📧 Booking confirmed, notification sent");
        Ok(())
    }
}
