use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, RwLock};

use crate::error::StoreError;
use crate::locks;
use crate::models::{
    BookingId, BookingRecord, BookingStatus, InventoryId, Payment, PaymentId, ScreenId, SeatInventory, Show,
    ShowId, UserId,
};
use crate::repositories::{
    BookingRepository, InventoryRepository, PaymentRepository, ShowRepository, StoreResult,
};

// Общая таблица "ключ -> значение" под одной RwLock
#[derive(Debug)]
struct Table<K, V> {
    rows: RwLock<HashMap<K, V>>,
}

impl<K, V> Default for Table<K, V> {
    fn default() -> Self {
        Self { rows: RwLock::new(HashMap::new()) }
    }
}

impl<K: Eq + Hash + Copy + ToString, V: Clone> Table<K, V> {
    fn insert_new(&self, key: K, value: V) -> StoreResult<()> {
        let mut rows = locks::write(&self.rows);
        if rows.contains_key(&key) {
            return Err(StoreError::AlreadyExists(key.to_string()));
        }
        rows.insert(key, value);
        Ok(())
    }

    fn get(&self, key: K) -> StoreResult<V> {
        locks::read(&self.rows)
            .get(&key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    fn replace(&self, key: K, value: V) -> StoreResult<()> {
        let mut rows = locks::write(&self.rows);
        match rows.get_mut(&key) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(StoreError::NotFound(key.to_string())),
        }
    }

    fn filter(&self, predicate: impl Fn(&V) -> bool) -> Vec<V> {
        locks::read(&self.rows).values().filter(|v| predicate(v)).cloned().collect()
    }
}

#[derive(Debug, Default)]
pub struct MemoryShowRepository {
    shows: Table<ShowId, Show>,
}

impl MemoryShowRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ShowRepository for MemoryShowRepository {
    fn create(&self, show: Show) -> StoreResult<()> {
        self.shows.insert_new(show.id, show)
    }

    fn get_by_id(&self, id: ShowId) -> StoreResult<Show> {
        self.shows.get(id)
    }

    fn list(&self) -> StoreResult<Vec<Show>> {
        let mut shows = self.shows.filter(|_| true);
        shows.sort_by_key(|s| s.start_time);
        Ok(shows)
    }

    fn check_conflict(&self, screen_id: ScreenId, start: DateTime<Utc>, end: DateTime<Utc>) -> StoreResult<bool> {
        let rows = locks::read(&self.shows.rows);
        Ok(rows.values().any(|show| show.screen_id == screen_id && show.overlaps(start, end)))
    }
}

#[derive(Debug, Default)]
pub struct MemoryInventoryRepository {
    inventories: Table<InventoryId, Arc<SeatInventory>>,
}

impl MemoryInventoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl InventoryRepository for MemoryInventoryRepository {
    fn create(&self, inventory: Arc<SeatInventory>) -> StoreResult<()> {
        self.inventories.insert_new(inventory.id(), inventory)
    }

    fn get_by_id(&self, id: InventoryId) -> StoreResult<Arc<SeatInventory>> {
        self.inventories.get(id)
    }

    fn update(&self, inventory: &Arc<SeatInventory>) -> StoreResult<()> {
        self.inventories.replace(inventory.id(), Arc::clone(inventory))
    }
}

#[derive(Debug, Default)]
pub struct MemoryBookingRepository {
    bookings: Table<BookingId, BookingRecord>,
}

impl MemoryBookingRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BookingRepository for MemoryBookingRepository {
    fn create(&self, booking: BookingRecord) -> StoreResult<()> {
        self.bookings.insert_new(booking.id(), booking)
    }

    fn get_by_id(&self, id: BookingId) -> StoreResult<BookingRecord> {
        self.bookings.get(id)
    }

    fn update(&self, booking: &BookingRecord) -> StoreResult<()> {
        let mut rows = locks::write(&self.bookings.rows);
        let stored = rows
            .get_mut(&booking.id())
            .ok_or_else(|| StoreError::NotFound(booking.id().to_string()))?;

        // запись должна быть ровно на одну версию новее сохранённой
        let expected = booking.version().saturating_sub(1);
        if stored.version() != expected {
            return Err(StoreError::VersionConflict {
                id: booking.id().to_string(),
                expected,
                found: stored.version(),
            });
        }

        *stored = booking.clone();
        Ok(())
    }

    fn list_by_status(&self, status: BookingStatus) -> StoreResult<Vec<BookingRecord>> {
        Ok(self.bookings.filter(|b| b.status() == status))
    }

    fn list_by_user(&self, user_id: &UserId) -> StoreResult<Vec<BookingRecord>> {
        let mut bookings = self.bookings.filter(|b| b.user_id() == user_id);
        bookings.sort_by_key(|b| std::cmp::Reverse(b.created_at()));
        Ok(bookings)
    }
}

#[derive(Debug, Default)]
pub struct MemoryPaymentRepository {
    payments: Table<PaymentId, Payment>,
}

impl MemoryPaymentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PaymentRepository for MemoryPaymentRepository {
    fn create(&self, payment: Payment) -> StoreResult<()> {
        self.payments.insert_new(payment.id, payment)
    }

    fn get_by_id(&self, id: PaymentId) -> StoreResult<Payment> {
        self.payments.get(id)
    }

    fn update(&self, payment: &Payment) -> StoreResult<()> {
        self.payments.replace(payment.id, payment.clone())
    }

    fn list_by_booking(&self, booking_id: BookingId) -> StoreResult<Vec<Payment>> {
        let mut payments = self.payments.filter(|p| p.booking_id == booking_id);
        payments.sort_by_key(|p| p.created_at);
        Ok(payments)
    }
}
