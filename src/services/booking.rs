use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};
use validator::Validate;

use crate::clock::Clock;
use crate::config::{BookingConfig, LockScope};
use crate::error::{BookingError, BookingResult, PaymentError, StoreError};
use crate::locks;
use crate::models::{
    BookingId, BookingRecord, BookingStatus, Payment, PaymentId, PaymentMethod, SeatId, SeatInventory, SeatSnapshot,
    Show, ShowId, UserId,
};
use crate::repositories::{BookingRepository, InventoryRepository, ShowRepository};
use crate::services::notification::NotificationSink;
use crate::services::payment::{PaymentMetadata, PaymentService};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateBookingRequest {
    #[validate(length(min = 1, message = "user id is required"))]
    pub user_id: String,
    pub show_id: ShowId,
    #[validate(length(min = 1, message = "at least one seat is required"))]
    pub seat_ids: Vec<SeatId>,
}

/// Бронь вместе со всем, что нужно показать пользователю.
#[derive(Debug, Clone, Serialize)]
pub struct BookingDetails {
    pub booking: BookingRecord,
    pub show: Show,
    pub seats: Vec<SeatSnapshot>,
    pub payment: Option<Payment>,
}

/// Координатор бронирования: создание брони с компенсацией,
/// подтверждение, отмена и истечение.
///
/// Порядок блокировок: creation_lock (только в режиме Global) ->
/// инвентарь -> место. Хранилища берут свои блокировки сами и
/// никогда не вызываются изнутри блокировки инвентаря. Платёжный
/// шлюз и уведомления вызываются без каких-либо блокировок ядра.
pub struct BookingService {
    shows: Arc<dyn ShowRepository>,
    inventories: Arc<dyn InventoryRepository>,
    bookings: Arc<dyn BookingRepository>,
    payments: Arc<PaymentService>,
    notifier: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
    hold_window: Duration,
    lock_scope: LockScope,
    creation_lock: Mutex<()>,
}

impl BookingService {
    pub fn new(
        shows: Arc<dyn ShowRepository>,
        inventories: Arc<dyn InventoryRepository>,
        bookings: Arc<dyn BookingRepository>,
        payments: Arc<PaymentService>,
        notifier: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
        config: &BookingConfig,
    ) -> Self {
        Self {
            shows,
            inventories,
            bookings,
            payments,
            notifier,
            clock,
            hold_window: config.hold_window(),
            lock_scope: config.lock_scope,
            creation_lock: Mutex::new(()),
        }
    }

    pub fn lock_scope(&self) -> LockScope {
        self.lock_scope
    }

    /// Создание брони: сеанс -> продажа открыта -> инвентарь -> цена ->
    /// атомарный hold -> запись брони. Если запись не удалась, места
    /// возвращаются в Available до возврата ошибки.
    pub fn create_booking(&self, request: CreateBookingRequest) -> BookingResult<BookingRecord> {
        request.validate()?;
        if request.user_id.trim().is_empty() {
            return Err(BookingError::InvalidBookingData("user id is required".to_string()));
        }

        let _global = match self.lock_scope {
            LockScope::Global => Some(locks::lock(&self.creation_lock)),
            LockScope::PerInventory => None,
        };

        let show = self.load_show(request.show_id)?;
        let now = self.clock.now();
        if !show.can_be_booked(now) {
            return Err(BookingError::ShowNotBookable(show.id));
        }

        let inventory = self.load_inventory(&show)?;

        let mut total_amount = 0.0;
        for seat_id in &request.seat_ids {
            let seat = inventory.get_seat(*seat_id)?;
            if !seat.is_available() {
                return Err(BookingError::SeatUnavailable(*seat_id));
            }
            total_amount += seat.price();
        }

        inventory.block_seats(&request.seat_ids)?;

        let booking = match BookingRecord::new(
            UserId::new(request.user_id),
            show.id,
            request.seat_ids.clone(),
            total_amount,
            now,
            self.hold_window,
        ) {
            Ok(booking) => booking,
            Err(e) => {
                self.compensate_hold(&inventory, &request.seat_ids, &e);
                return Err(e);
            }
        };

        if let Err(e) = self.bookings.create(booking.clone()) {
            let e = BookingError::from(e);
            self.compensate_hold(&inventory, &request.seat_ids, &e);
            return Err(e);
        }

        if let Err(e) = self.inventories.update(&inventory) {
            warn!(booking_id = %booking.id(), "Failed to persist inventory after booking creation: {}", e);
        }

        info!(
            booking_id = %booking.id(),
            show_id = %show.id,
            "🎫 Booking created: {} seats, total {:.2}, expires at {}",
            booking.seat_count(),
            booking.total_amount(),
            booking.expires_at()
        );

        Ok(booking)
    }

    fn compensate_hold(&self, inventory: &SeatInventory, seat_ids: &[SeatId], cause: &BookingError) {
        let released = inventory.unblock_seats(seat_ids);
        warn!(
            inventory_id = %inventory.id(),
            "Booking creation failed after hold ({}), released {} of {} seats",
            cause,
            released,
            seat_ids.len()
        );
    }

    /// Подтверждение после успешной оплаты.
    ///
    /// Истёкшая бронь переводится в Expired и возвращается `BookingExpired`;
    /// её места остаются Blocked и освобождаются через
    /// [`BookingService::release_expired_seats`] (это делает и фоновая очистка).
    pub fn confirm_booking(&self, booking_id: BookingId, payment_id: PaymentId) -> BookingResult<BookingRecord> {
        let mut booking = self.load_booking(booking_id)?;
        let payment = self.payments.get_payment(payment_id);
        let loaded_version = booking.version();
        let now = self.clock.now();

        if let Err(e) = booking.confirm(payment_id, now) {
            if booking.version() != loaded_version {
                // истекла прямо сейчас - фиксируем Expired
                self.persist_transition(&booking)?;
                warn!(booking_id = %booking_id, "⏰ Confirmation arrived after the hold expired");
            }
            return Err(e);
        }

        let payment = payment?;
        if payment.booking_id != booking_id {
            return Err(BookingError::InvalidBookingData(format!(
                "payment {} belongs to booking {}",
                payment_id, payment.booking_id
            )));
        }
        if !payment.is_successful() {
            return Err(BookingError::PaymentNotSuccessful(payment_id));
        }

        self.persist_transition(&booking)?;

        match self.inventory_for(booking.show_id()) {
            Ok(inventory) => {
                let failures = inventory.book_seats(booking.seat_ids());
                if !failures.is_empty() {
                    warn!(
                        booking_id = %booking_id,
                        "Booking confirmed but {} of {} seats were not moved to BOOKED",
                        failures.len(),
                        booking.seat_count()
                    );
                }
                if let Err(e) = self.inventories.update(&inventory) {
                    warn!(booking_id = %booking_id, "Failed to persist inventory after confirmation: {}", e);
                }
            }
            Err(e) => error!(booking_id = %booking_id, "Booking confirmed but seat inventory is unreachable: {}", e),
        }

        if let Err(e) = self.notifier.send_booking_confirmation(booking.user_id(), booking_id) {
            warn!(booking_id = %booking_id, "Confirmation notification failed: {}", e);
        }

        info!(booking_id = %booking_id, payment_id = %payment_id, "✅ Booking confirmed");
        Ok(booking)
    }

    /// Оплата и подтверждение одним вызовом. Отказ в оплате оставляет бронь
    /// в Pending; повторить попытку - решение вызывающего.
    pub fn checkout(
        &self,
        booking_id: BookingId,
        method: PaymentMethod,
        metadata: PaymentMetadata,
    ) -> BookingResult<BookingRecord> {
        let payment = self.payments.process_payment(booking_id, method, metadata)?;
        if !payment.is_successful() {
            let reason = payment.failure_reason.clone().unwrap_or_else(|| "declined".to_string());
            return Err(PaymentError::Declined(reason).into());
        }

        match self.confirm_booking(booking_id, payment.id) {
            Ok(booking) => Ok(booking),
            Err(e) => {
                // деньги списаны, а бронь не подтвердилась - возвращаем
                match self.payments.refund_payment(payment.id, payment.amount, format!("confirmation failed: {}", e)) {
                    Ok(_) => info!(booking_id = %booking_id, payment_id = %payment.id, "Payment refunded after failed confirmation"),
                    Err(refund_err) => error!(
                        booking_id = %booking_id,
                        payment_id = %payment.id,
                        "Failed to refund payment after failed confirmation: {}",
                        refund_err
                    ),
                }
                Err(e)
            }
        }
    }

    pub fn cancel_booking(&self, booking_id: BookingId) -> BookingResult<BookingRecord> {
        let mut booking = self.load_booking(booking_id)?;
        booking.cancel(self.clock.now())?;
        self.persist_transition(&booking)?;

        let released = self.release_seats_of(&booking);
        info!(booking_id = %booking_id, "Booking cancelled, {} seats released", released);
        Ok(booking)
    }

    /// Pending -> Expired с освобождением мест.
    /// Возвращает бронь и число реально освобождённых мест.
    pub fn expire_booking(&self, booking_id: BookingId) -> BookingResult<(BookingRecord, usize)> {
        let mut booking = self.load_booking(booking_id)?;
        booking.expire(self.clock.now())?;
        self.persist_transition(&booking)?;

        let released = self.release_seats_of(&booking);
        info!(booking_id = %booking_id, "⏰ Booking expired, {} seats released", released);
        Ok((booking, released))
    }

    /// Освобождает места брони, истёкшей при подтверждении. Повторный
    /// вызов ничего не делает и возвращает 0.
    pub fn release_expired_seats(&self, booking_id: BookingId) -> BookingResult<usize> {
        let mut booking = self.load_booking(booking_id)?;
        if !booking.mark_seats_released(self.clock.now()) {
            return Ok(0);
        }

        match self.bookings.update(&booking) {
            Ok(()) => {}
            // кто-то успел раньше
            Err(StoreError::VersionConflict { .. }) => return Ok(0),
            Err(e) => return Err(e.or_not_found(BookingError::BookingNotFound(booking_id))),
        }

        let released = self.release_seats_of(&booking);
        info!(booking_id = %booking_id, "Released {} seats of expired booking", released);
        Ok(released)
    }

    fn release_seats_of(&self, booking: &BookingRecord) -> usize {
        match self.inventory_for(booking.show_id()) {
            Ok(inventory) => {
                let released = inventory.unblock_seats(booking.seat_ids());
                if let Err(e) = self.inventories.update(&inventory) {
                    warn!(booking_id = %booking.id(), "Failed to persist inventory after release: {}", e);
                }
                released
            }
            Err(e) => {
                error!(booking_id = %booking.id(), "Cannot release seats, inventory unreachable: {}", e);
                0
            }
        }
    }

    /// Сохраняет переход брони. Проигрыш в гонке превращается в ошибку
    /// того состояния, в которое бронь успел перевести соперник.
    fn persist_transition(&self, booking: &BookingRecord) -> BookingResult<()> {
        let booking_id = booking.id();
        match self.bookings.update(booking) {
            Ok(()) => Ok(()),
            Err(StoreError::VersionConflict { .. }) => {
                debug!(booking_id = %booking_id, "Lost a concurrent update race");
                let current = self.load_booking(booking_id)?;
                current.ensure_pending()?;
                Err(BookingError::ConcurrentModification(booking_id))
            }
            Err(e) => Err(e.or_not_found(BookingError::BookingNotFound(booking_id))),
        }
    }

    pub fn get_booking(&self, booking_id: BookingId) -> BookingResult<BookingRecord> {
        self.load_booking(booking_id)
    }

    pub fn bookings_for_user(&self, user_id: &UserId) -> BookingResult<Vec<BookingRecord>> {
        Ok(self.bookings.list_by_user(user_id)?)
    }

    /// Pending брони, у которых вышел срок.
    pub fn overdue_bookings(&self) -> BookingResult<Vec<BookingRecord>> {
        let now = self.clock.now();
        let mut overdue = self.bookings.list_pending()?;
        overdue.retain(|b| b.is_expired(now));
        Ok(overdue)
    }

    /// Истёкшие брони, чьи места ещё не освобождены.
    pub fn unreleased_expired_bookings(&self) -> BookingResult<Vec<BookingRecord>> {
        let mut expired = self.bookings.list_by_status(BookingStatus::Expired)?;
        expired.retain(|b| b.needs_seat_release());
        Ok(expired)
    }

    pub fn booking_details(&self, booking_id: BookingId) -> BookingResult<BookingDetails> {
        let booking = self.load_booking(booking_id)?;
        let show = self.load_show(booking.show_id())?;
        let inventory = self.load_inventory(&show)?;

        let seats = booking
            .seat_ids()
            .iter()
            .filter_map(|id| inventory.get_seat(*id).ok())
            .map(|seat| seat.snapshot())
            .collect();

        let payment = match booking.payment_id() {
            Some(payment_id) => match self.payments.get_payment(payment_id) {
                Ok(payment) => Some(payment),
                Err(e) => {
                    warn!(booking_id = %booking_id, "Payment lookup failed: {}", e);
                    None
                }
            },
            None => None,
        };

        Ok(BookingDetails { booking, show, seats, payment })
    }

    pub fn available_seats(&self, show_id: ShowId) -> BookingResult<Vec<SeatSnapshot>> {
        let inventory = self.inventory_for(show_id)?;
        Ok(inventory.available_seats().iter().map(|seat| seat.snapshot()).collect())
    }

    fn load_booking(&self, booking_id: BookingId) -> BookingResult<BookingRecord> {
        self.bookings
            .get_by_id(booking_id)
            .map_err(|e| e.or_not_found(BookingError::BookingNotFound(booking_id)))
    }

    fn load_show(&self, show_id: ShowId) -> BookingResult<Show> {
        self.shows
            .get_by_id(show_id)
            .map_err(|e| e.or_not_found(BookingError::ShowNotFound(show_id)))
    }

    fn load_inventory(&self, show: &Show) -> BookingResult<Arc<SeatInventory>> {
        self.inventories
            .get_by_id(show.inventory_id)
            .map_err(|e| e.or_not_found(BookingError::InventoryNotFound(show.inventory_id)))
    }

    fn inventory_for(&self, show_id: ShowId) -> BookingResult<Arc<SeatInventory>> {
        let show = self.load_show(show_id)?;
        self.load_inventory(&show)
    }
}

impl std::fmt::Debug for BookingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookingService")
            .field("hold_window", &self.hold_window)
            .field("lock_scope", &self.lock_scope)
            .finish()
    }
}
