use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{BookingError, BookingResult};
use crate::models::{BookingId, PaymentId, SeatId, ShowId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Expired,
}

impl BookingStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, BookingStatus::Pending)
    }
}

/// Бронь нескольких мест на один сеанс.
///
/// Набор мест и сумма фиксируются при создании и дальше не меняются.
/// Статус монотонный: из Confirmed/Cancelled/Expired переходов нет.
/// Каждое изменение увеличивает `version` - по ней хранилище отсекает
/// конкурентные записи.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingRecord {
    id: BookingId,
    user_id: UserId,
    show_id: ShowId,
    seat_ids: Vec<SeatId>,
    total_amount: f64,
    status: BookingStatus,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    payment_id: Option<PaymentId>,
    updated_at: DateTime<Utc>,
    /// Места брони уже возвращены в Available (отмена/истечение).
    seats_released: bool,
    version: u64,
}

impl BookingRecord {
    pub fn new(
        user_id: UserId,
        show_id: ShowId,
        seat_ids: Vec<SeatId>,
        total_amount: f64,
        now: DateTime<Utc>,
        hold_window: Duration,
    ) -> BookingResult<Self> {
        if user_id.as_str().trim().is_empty() {
            return Err(BookingError::InvalidBookingData("user id is required".to_string()));
        }
        if seat_ids.is_empty() {
            return Err(BookingError::InvalidBookingData("booking must hold at least one seat".to_string()));
        }
        if !(total_amount.is_finite() && total_amount > 0.0) {
            return Err(BookingError::InvalidBookingData(format!(
                "total amount must be positive, got {}",
                total_amount
            )));
        }

        Ok(Self {
            id: BookingId::new(),
            user_id,
            show_id,
            seat_ids,
            total_amount,
            status: BookingStatus::Pending,
            created_at: now,
            expires_at: now + hold_window,
            payment_id: None,
            updated_at: now,
            seats_released: false,
            version: 1,
        })
    }

    pub fn id(&self) -> BookingId {
        self.id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn show_id(&self) -> ShowId {
        self.show_id
    }

    pub fn seat_ids(&self) -> &[SeatId] {
        &self.seat_ids
    }

    pub fn seat_count(&self) -> usize {
        self.seat_ids.len()
    }

    pub fn total_amount(&self) -> f64 {
        self.total_amount
    }

    pub fn status(&self) -> BookingStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn payment_id(&self) -> Option<PaymentId> {
        self.payment_id
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn seats_released(&self) -> bool {
        self.seats_released
    }

    /// Бронь истекла при подтверждении, а её места всё ещё удерживаются.
    pub fn needs_seat_release(&self) -> bool {
        self.status == BookingStatus::Expired && !self.seats_released
    }

    /// Чистый предикат, статус не меняет (ленивое истечение).
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == BookingStatus::Pending && now > self.expires_at
    }

    pub fn time_until_expiry(&self, now: DateTime<Utc>) -> Duration {
        if self.status != BookingStatus::Pending {
            return Duration::zero();
        }
        (self.expires_at - now).max(Duration::zero())
    }

    pub fn can_be_cancelled(&self) -> bool {
        self.status == BookingStatus::Pending
    }

    /// Ошибка для любого статуса кроме Pending.
    pub fn ensure_pending(&self) -> BookingResult<()> {
        match self.status {
            BookingStatus::Pending => Ok(()),
            BookingStatus::Confirmed => Err(BookingError::AlreadyConfirmed(self.id)),
            BookingStatus::Cancelled => Err(BookingError::AlreadyCancelled(self.id)),
            BookingStatus::Expired => Err(BookingError::BookingExpired(self.id)),
        }
    }

    /// Подтверждение после оплаты.
    ///
    /// Срок проверяется здесь ещё раз: если он вышел, бронь переходит в
    /// Expired и возвращается `BookingExpired`. Это изменение тоже нужно
    /// сохранить, поэтому `version` растёт в обоих случаях.
    pub fn confirm(&mut self, payment_id: PaymentId, now: DateTime<Utc>) -> BookingResult<()> {
        self.ensure_pending()?;

        if now > self.expires_at {
            self.status = BookingStatus::Expired;
            self.touch(now);
            return Err(BookingError::BookingExpired(self.id));
        }

        self.status = BookingStatus::Confirmed;
        self.payment_id = Some(payment_id);
        self.touch(now);
        Ok(())
    }

    /// Отмена. Места освобождает вызывающий после сохранения записи.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> BookingResult<()> {
        self.ensure_pending()?;
        self.status = BookingStatus::Cancelled;
        self.seats_released = true;
        self.touch(now);
        Ok(())
    }

    pub fn expire(&mut self, now: DateTime<Utc>) -> BookingResult<()> {
        if self.status != BookingStatus::Pending {
            return Err(BookingError::NotPending { id: self.id, status: self.status });
        }
        self.status = BookingStatus::Expired;
        self.seats_released = true;
        self.touch(now);
        Ok(())
    }

    /// Отмечает, что места истёкшей брони освобождены. `false`, если
    /// освобождать нечего (бронь не истекла или места уже отпущены).
    pub fn mark_seats_released(&mut self, now: DateTime<Utc>) -> bool {
        if !self.needs_seat_release() {
            return false;
        }
        self.seats_released = true;
        self.touch(now);
        true
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
        self.version += 1;
    }
}
