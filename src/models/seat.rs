use serde::{Deserialize, Serialize};
use std::sync::RwLock;

use crate::error::BookingError;
use crate::locks;
use crate::models::SeatId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatClass {
    Regular,
    Premium,
    Vip,
    Recliner,
}

impl SeatClass {
    // Множитель к базовой цене сеанса
    pub fn price_multiplier(&self) -> f64 {
        match self {
            SeatClass::Regular => 1.0,
            SeatClass::Premium => 1.5,
            SeatClass::Vip => 2.0,
            SeatClass::Recliner => 2.5,
        }
    }
}

/// Статус места: Available -> Blocked -> Booked, либо Blocked -> Available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatStatus {
    Available,
    Blocked,
    Booked,
}

/// Место в зале. Статус защищён собственной блокировкой,
/// всё остальное неизменяемо после создания.
#[derive(Debug)]
pub struct Seat {
    id: SeatId,
    row: String,
    number: u32,
    class: SeatClass,
    price: f64,
    status: RwLock<SeatStatus>,
}

/// Копия места на момент чтения, для ответов и отчётов.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeatSnapshot {
    pub id: SeatId,
    pub label: String,
    pub row: String,
    pub number: u32,
    pub class: SeatClass,
    pub status: SeatStatus,
    pub price: f64,
}

impl Seat {
    /// Цена считается один раз при создании: base_price * множитель класса.
    pub fn new(row: impl Into<String>, number: u32, class: SeatClass, base_price: f64) -> Self {
        Self {
            id: SeatId::new(),
            row: row.into(),
            number,
            class,
            price: base_price * class.price_multiplier(),
            status: RwLock::new(SeatStatus::Available),
        }
    }

    pub fn id(&self) -> SeatId {
        self.id
    }

    pub fn row(&self) -> &str {
        &self.row
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn class(&self) -> SeatClass {
        self.class
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    // "C7", "H18"
    pub fn label(&self) -> String {
        format!("{}{}", self.row, self.number)
    }

    pub fn status(&self) -> SeatStatus {
        *locks::read(&self.status)
    }

    pub fn is_available(&self) -> bool {
        self.status() == SeatStatus::Available
    }

    pub fn snapshot(&self) -> SeatSnapshot {
        SeatSnapshot {
            id: self.id,
            label: self.label(),
            row: self.row.clone(),
            number: self.number,
            class: self.class,
            status: self.status(),
            price: self.price,
        }
    }

    // Мутации доступны только внутри крейта: снаружи статус меняется
    // исключительно через синхронизированные операции SeatInventory.

    pub(crate) fn block(&self) -> Result<(), BookingError> {
        self.transition(SeatStatus::Available, SeatStatus::Blocked)
            .map_err(|_| BookingError::SeatUnavailable(self.id))
    }

    pub(crate) fn book(&self) -> Result<(), BookingError> {
        self.transition(SeatStatus::Blocked, SeatStatus::Booked)
            .map_err(|_| BookingError::SeatNotBlocked(self.id))
    }

    pub(crate) fn unblock(&self) -> Result<(), BookingError> {
        self.transition(SeatStatus::Blocked, SeatStatus::Available)
            .map_err(|_| BookingError::SeatNotBlocked(self.id))
    }

    fn transition(&self, from: SeatStatus, to: SeatStatus) -> Result<(), SeatStatus> {
        let mut status = locks::write(&self.status);
        if *status != from {
            return Err(*status);
        }
        *status = to;
        Ok(())
    }
}
