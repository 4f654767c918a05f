use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

use crate::error::{BookingError, BookingResult};
use crate::locks;
use crate::models::{InventoryId, ScreenId, Seat, SeatClass, SeatId, SeatSnapshot, ShowId};

/// Инвентарь мест одного зала на конкретный сеанс.
///
/// Карта мест защищена эксклюзивной блокировкой инвентаря; все многоместные
/// операции (hold, release, book) берут её целиком, а внутри уже
/// блокировку каждого места. Порядок всегда инвентарь -> место.
#[derive(Debug)]
pub struct SeatInventory {
    id: InventoryId,
    screen_id: ScreenId,
    show_id: ShowId,
    seats: RwLock<SeatMap>,
}

#[derive(Debug, Default)]
struct SeatMap {
    by_id: HashMap<SeatId, Arc<Seat>>,
    // порядок как в схеме зала, для стабильного вывода
    order: Vec<SeatId>,
    capacity: usize,
}

impl SeatInventory {
    pub fn new(screen_id: ScreenId, show_id: ShowId, seats: Vec<Seat>) -> Self {
        let inventory = Self {
            id: InventoryId::new(),
            screen_id,
            show_id,
            seats: RwLock::new(SeatMap::default()),
        };
        for seat in seats {
            inventory.add_seat(seat);
        }
        inventory
    }

    pub fn id(&self) -> InventoryId {
        self.id
    }

    pub fn screen_id(&self) -> ScreenId {
        self.screen_id
    }

    pub fn show_id(&self) -> ShowId {
        self.show_id
    }

    pub fn add_seat(&self, seat: Seat) {
        let mut map = locks::write(&self.seats);
        let id = seat.id();
        if map.by_id.insert(id, Arc::new(seat)).is_none() {
            map.order.push(id);
            map.capacity += 1;
        }
    }

    pub fn capacity(&self) -> usize {
        locks::read(&self.seats).capacity
    }

    pub fn get_seat(&self, seat_id: SeatId) -> BookingResult<Arc<Seat>> {
        locks::read(&self.seats)
            .by_id
            .get(&seat_id)
            .cloned()
            .ok_or(BookingError::SeatNotFound(seat_id))
    }

    pub fn available_seats(&self) -> Vec<Arc<Seat>> {
        let map = locks::read(&self.seats);
        map.order
            .iter()
            .filter_map(|id| map.by_id.get(id))
            .filter(|seat| seat.is_available())
            .cloned()
            .collect()
    }

    pub fn available_count(&self) -> usize {
        let map = locks::read(&self.seats);
        map.by_id.values().filter(|seat| seat.is_available()).count()
    }

    pub fn seats_by_class(&self, class: SeatClass) -> Vec<Arc<Seat>> {
        let map = locks::read(&self.seats);
        map.order
            .iter()
            .filter_map(|id| map.by_id.get(id))
            .filter(|seat| seat.class() == class)
            .cloned()
            .collect()
    }

    pub fn snapshots(&self) -> Vec<SeatSnapshot> {
        let map = locks::read(&self.seats);
        map.order
            .iter()
            .filter_map(|id| map.by_id.get(id))
            .map(|seat| seat.snapshot())
            .collect()
    }

    /// Атомарный hold нескольких мест: либо блокируются все, либо ни одно.
    ///
    /// Первый проход только проверяет (существование, Available, отсутствие
    /// дублей), второй блокирует в порядке запроса. Если блокировка места
    /// всё же сорвалась во втором проходе, уже заблокированные в этом вызове
    /// места возвращаются в Available до выхода из критической секции.
    pub fn block_seats(&self, seat_ids: &[SeatId]) -> BookingResult<()> {
        if seat_ids.is_empty() {
            return Err(BookingError::InvalidBookingData("no seats requested".to_string()));
        }

        let map = locks::write(&self.seats);

        let mut seen = HashSet::with_capacity(seat_ids.len());
        for seat_id in seat_ids {
            if !seen.insert(*seat_id) {
                return Err(BookingError::InvalidBookingData(format!(
                    "seat {} requested more than once",
                    seat_id
                )));
            }
            let seat = map.by_id.get(seat_id).ok_or(BookingError::SeatNotFound(*seat_id))?;
            if !seat.is_available() {
                return Err(BookingError::SeatUnavailable(*seat_id));
            }
        }

        block_in_order(self.id, &map, seat_ids)?;

        debug!(inventory_id = %self.id, "Blocked {} seats", seat_ids.len());
        Ok(())
    }

    /// Освобождение мест (компенсация, отмена, истечение брони).
    /// Не падает: место не в Blocked только логируется. Возвращает
    /// количество реально освобождённых мест.
    pub fn unblock_seats(&self, seat_ids: &[SeatId]) -> usize {
        let map = locks::write(&self.seats);
        let mut released = 0;

        for seat_id in seat_ids {
            match map.by_id.get(seat_id) {
                Some(seat) => match seat.unblock() {
                    Ok(()) => released += 1,
                    Err(e) => warn!(inventory_id = %self.id, "Skipping release: {}", e),
                },
                None => warn!(inventory_id = %self.id, seat_id = %seat_id, "Skipping release: seat not in inventory"),
            }
        }

        released
    }

    /// Перевод удерживаемых мест в Booked при подтверждении брони.
    /// Ошибки по отдельным местам не прерывают операцию, а возвращаются
    /// вызывающему списком.
    pub fn book_seats(&self, seat_ids: &[SeatId]) -> Vec<BookingError> {
        let map = locks::write(&self.seats);
        let mut failures = Vec::new();

        for seat_id in seat_ids {
            let result = map
                .by_id
                .get(seat_id)
                .ok_or(BookingError::SeatNotFound(*seat_id))
                .and_then(|seat| seat.book());

            if let Err(e) = result {
                warn!(inventory_id = %self.id, "Failed to book seat: {}", e);
                failures.push(e);
            }
        }

        failures
    }
}

/// Второй проход hold: блокирует места в порядке запроса. Если место
/// заблокировать не удалось, уже заблокированные в этом проходе места
/// возвращаются в Available.
fn block_in_order(inventory_id: InventoryId, map: &SeatMap, seat_ids: &[SeatId]) -> BookingResult<()> {
    for (idx, seat_id) in seat_ids.iter().enumerate() {
        let result = map
            .by_id
            .get(seat_id)
            .ok_or(BookingError::SeatNotFound(*seat_id))
            .and_then(|seat| seat.block());

        if let Err(e) = result {
            warn!(inventory_id = %inventory_id, seat_id = %seat_id, "Seat block failed mid-hold, rolling back {} seats", idx);
            for blocked_id in &seat_ids[..idx] {
                if let Some(seat) = map.by_id.get(blocked_id) {
                    if let Err(rollback) = seat.unblock() {
                        warn!(inventory_id = %inventory_id, "Rollback of held seat failed: {}", rollback);
                    }
                }
            }
            return Err(e);
        }
    }
    Ok(())
}
