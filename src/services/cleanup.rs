use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::BookingError;
use crate::services::booking::BookingService;

/// Фоновая очистка: истекает просроченные Pending брони и возвращает
/// их места в продажу. Работает через те же операции, что и запросы
/// пользователей, поэтому гонка с поздним подтверждением решается
/// версией записи брони, а не отдельной блокировкой.
pub struct CleanupService {
    bookings: Arc<BookingService>,
}

impl CleanupService {
    pub fn new(bookings: Arc<BookingService>) -> Self {
        Self { bookings }
    }

    /// Запускает полную очистку: просроченные брони + места броней,
    /// истёкших при подтверждении
    pub fn run_full_cleanup(&self) -> CleanupReport {
        debug!("🧹 Starting full cleanup process");
        let mut report = CleanupReport::default();

        self.cleanup_overdue_bookings(&mut report);
        self.release_expired_holds(&mut report);

        if report.expired_bookings > 0 || report.seats_released > 0 {
            info!(
                "✅ Cleanup completed: {} bookings expired, {} seats released, {} skipped",
                report.expired_bookings, report.seats_released, report.skipped
            );
        } else {
            debug!("✅ Cleanup completed, nothing to do");
        }
        report
    }

    fn cleanup_overdue_bookings(&self, report: &mut CleanupReport) {
        let overdue = match self.bookings.overdue_bookings() {
            Ok(overdue) => overdue,
            Err(e) => {
                error!("Failed to list overdue bookings: {}", e);
                report.skipped += 1;
                return;
            }
        };

        if overdue.is_empty() {
            debug!("🎫 No overdue bookings to cleanup");
            return;
        }

        info!("🎫 Found {} overdue bookings to cleanup", overdue.len());

        for booking in overdue {
            let booking_id = booking.id();
            match self.bookings.expire_booking(booking_id) {
                Ok((_, released)) => {
                    report.expired_bookings += 1;
                    report.seats_released += released;
                }
                // бронь успели подтвердить или отменить - это не ошибка
                Err(
                    e @ (BookingError::AlreadyConfirmed(_)
                    | BookingError::AlreadyCancelled(_)
                    | BookingError::BookingExpired(_)
                    | BookingError::NotPending { .. }
                    | BookingError::ConcurrentModification(_)),
                ) => {
                    debug!(booking_id = %booking_id, "Skipping booking during cleanup: {}", e);
                    report.skipped += 1;
                }
                Err(e) => {
                    warn!(booking_id = %booking_id, "Failed to expire booking: {}", e);
                    report.skipped += 1;
                }
            }
        }
    }

    fn release_expired_holds(&self, report: &mut CleanupReport) {
        let expired = match self.bookings.unreleased_expired_bookings() {
            Ok(expired) => expired,
            Err(e) => {
                error!("Failed to list expired bookings with held seats: {}", e);
                report.skipped += 1;
                return;
            }
        };

        for booking in expired {
            match self.bookings.release_expired_seats(booking.id()) {
                Ok(released) => report.seats_released += released,
                Err(e) => {
                    warn!(booking_id = %booking.id(), "Failed to release seats of expired booking: {}", e);
                    report.skipped += 1;
                }
            }
        }
    }

    /// Получает статистику для мониторинга
    pub fn get_cleanup_stats(&self) -> CleanupStats {
        let overdue_bookings = self.bookings.overdue_bookings().map(|b| b.len()).unwrap_or_else(|e| {
            warn!("Failed to count overdue bookings: {}", e);
            0
        });
        let expired_with_held_seats = self
            .bookings
            .unreleased_expired_bookings()
            .map(|b| b.len())
            .unwrap_or_else(|e| {
                warn!("Failed to count expired bookings with held seats: {}", e);
                0
            });

        CleanupStats { overdue_bookings, expired_with_held_seats }
    }

    /// Периодический запуск очистки на tokio. Ядро синхронное, поэтому
    /// каждый проход уходит в spawn_blocking.
    pub fn spawn(self: Arc<Self>, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period.max(Duration::from_millis(1)));
            info!("🧹 Cleanup task started, interval {:?}", period);

            loop {
                interval.tick().await;

                let service = Arc::clone(&self);
                if let Err(e) = tokio::task::spawn_blocking(move || service.run_full_cleanup()).await {
                    error!("Cleanup pass panicked: {}", e);
                }
            }
        })
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub expired_bookings: usize,
    pub seats_released: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanupStats {
    pub overdue_bookings: usize,
    pub expired_with_held_seats: usize,
}

impl CleanupStats {
    pub fn total_items_to_cleanup(&self) -> usize {
        self.overdue_bookings + self.expired_with_held_seats
    }
}
