//! Хранилища сущностей.
//!
//! Ядро работает только через эти трейты; каждое хранилище защищено
//! собственной блокировкой и ничего не знает о соседних.

pub mod memory;

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::error::StoreError;
use crate::models::{
    BookingId, BookingRecord, BookingStatus, InventoryId, Payment, PaymentId, ScreenId, SeatInventory, Show, ShowId, UserId,
};

pub use memory::{MemoryBookingRepository, MemoryInventoryRepository, MemoryPaymentRepository, MemoryShowRepository};

pub type StoreResult<T> = Result<T, StoreError>;

pub trait ShowRepository: Send + Sync {
    fn create(&self, show: Show) -> StoreResult<()>;
    fn get_by_id(&self, id: ShowId) -> StoreResult<Show>;
    fn list(&self) -> StoreResult<Vec<Show>>;
    /// Есть ли в зале сеанс, пересекающийся с [start, end).
    fn check_conflict(&self, screen_id: ScreenId, start: DateTime<Utc>, end: DateTime<Utc>) -> StoreResult<bool>;
}

/// Инвентарь хранится как разделяемый объект: состояние мест в памяти
/// процесса и есть источник правды, `update` только фиксирует его.
pub trait InventoryRepository: Send + Sync {
    fn create(&self, inventory: Arc<SeatInventory>) -> StoreResult<()>;
    fn get_by_id(&self, id: InventoryId) -> StoreResult<Arc<SeatInventory>>;
    fn update(&self, inventory: &Arc<SeatInventory>) -> StoreResult<()>;
}

/// Брони хранятся по значению. `update` принимает запись только если
/// она получена из текущей сохранённой версии (version = stored + 1).
pub trait BookingRepository: Send + Sync {
    fn create(&self, booking: BookingRecord) -> StoreResult<()>;
    fn get_by_id(&self, id: BookingId) -> StoreResult<BookingRecord>;
    fn update(&self, booking: &BookingRecord) -> StoreResult<()>;
    fn list_by_status(&self, status: BookingStatus) -> StoreResult<Vec<BookingRecord>>;
    fn list_pending(&self) -> StoreResult<Vec<BookingRecord>> {
        self.list_by_status(BookingStatus::Pending)
    }
    fn list_by_user(&self, user_id: &UserId) -> StoreResult<Vec<BookingRecord>>;
}

pub trait PaymentRepository: Send + Sync {
    fn create(&self, payment: Payment) -> StoreResult<()>;
    fn get_by_id(&self, id: PaymentId) -> StoreResult<Payment>;
    fn update(&self, payment: &Payment) -> StoreResult<()>;
    fn list_by_booking(&self, booking_id: BookingId) -> StoreResult<Vec<Payment>>;
}
