//! Ошибки ядра бронирования.
//!
//! Каждый вариант - отдельный, различимый вызывающим код ошибки.
//! `ErrorKind` сворачивает их в крупные категории, по которым
//! удобно принимать решения (повторять, откатывать, показывать пользователю).

use serde::Serialize;
use thiserror::Error;

use crate::models::{BookingId, BookingStatus, InventoryId, PaymentId, SeatId, ShowId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    StateConflict,
    Expired,
    Validation,
    Persistence,
    External,
}

/// Ошибки хранилищ (по одному на вид сущности).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("record {0} not found")]
    NotFound(String),

    #[error("record {0} already exists")]
    AlreadyExists(String),

    /// Запись изменилась с момента чтения (оптимистичная блокировка).
    #[error("record {id} was modified concurrently (expected version {expected}, found {found})")]
    VersionConflict { id: String, expected: u64, found: u64 },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// NotFound из хранилища превращается в доменную ошибку конкретной сущности,
    /// остальное остаётся ошибкой персистентности.
    pub fn or_not_found(self, not_found: BookingError) -> BookingError {
        match self {
            StoreError::NotFound(_) => not_found,
            other => BookingError::Persistence(other),
        }
    }
}

/// Ошибки на границе с платёжной системой.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentError {
    #[error("payment method {0} is not supported")]
    UnsupportedMethod(String),

    #[error("invalid payment details: {0}")]
    InvalidDetails(String),

    #[error("payment declined: {0}")]
    Declined(String),

    /// Сбой самого шлюза (таймаут, 5xx). Считается Circuit Breaker'ом.
    #[error("payment gateway error: {0}")]
    Gateway(String),

    #[error("circuit breaker is open - payment gateway temporarily unavailable")]
    CircuitOpen,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BookingError {
    // --- места ---
    #[error("seat {0} not found")]
    SeatNotFound(SeatId),

    #[error("seat {0} is not available")]
    SeatUnavailable(SeatId),

    #[error("seat {0} is not blocked")]
    SeatNotBlocked(SeatId),

    #[error("seat inventory {0} not found")]
    InventoryNotFound(InventoryId),

    // --- сеансы ---
    #[error("show {0} not found")]
    ShowNotFound(ShowId),

    #[error("show {0} is not available for booking")]
    ShowNotBookable(ShowId),

    #[error("show time conflicts with an existing show on the same screen")]
    ShowConflict,

    #[error("invalid show data: {0}")]
    InvalidShowData(String),

    // --- брони ---
    #[error("booking {0} not found")]
    BookingNotFound(BookingId),

    #[error("booking {0} has expired")]
    BookingExpired(BookingId),

    #[error("booking {0} is already confirmed")]
    AlreadyConfirmed(BookingId),

    #[error("booking {0} is already cancelled")]
    AlreadyCancelled(BookingId),

    #[error("booking {id} is {status:?}, expected PENDING")]
    NotPending { id: BookingId, status: BookingStatus },

    #[error("booking {0} was modified concurrently")]
    ConcurrentModification(BookingId),

    #[error("invalid booking data: {0}")]
    InvalidBookingData(String),

    // --- платежи ---
    #[error("payment {0} not found")]
    PaymentNotFound(PaymentId),

    #[error("payment {0} was not successful")]
    PaymentNotSuccessful(PaymentId),

    #[error("invalid refund amount {0}")]
    InvalidRefundAmount(f64),

    // --- внешние системы ---
    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),

    #[error("payment failure: {0}")]
    Payment(#[from] PaymentError),
}

impl BookingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BookingError::SeatNotFound(_)
            | BookingError::InventoryNotFound(_)
            | BookingError::ShowNotFound(_)
            | BookingError::BookingNotFound(_)
            | BookingError::PaymentNotFound(_) => ErrorKind::NotFound,

            BookingError::SeatUnavailable(_)
            | BookingError::SeatNotBlocked(_)
            | BookingError::ShowNotBookable(_)
            | BookingError::ShowConflict
            | BookingError::AlreadyConfirmed(_)
            | BookingError::AlreadyCancelled(_)
            | BookingError::NotPending { .. }
            | BookingError::ConcurrentModification(_)
            | BookingError::PaymentNotSuccessful(_) => ErrorKind::StateConflict,

            BookingError::BookingExpired(_) => ErrorKind::Expired,

            BookingError::InvalidShowData(_)
            | BookingError::InvalidBookingData(_)
            | BookingError::InvalidRefundAmount(_) => ErrorKind::Validation,

            BookingError::Persistence(StoreError::NotFound(_)) => ErrorKind::NotFound,
            BookingError::Persistence(StoreError::VersionConflict { .. }) => ErrorKind::StateConflict,
            BookingError::Persistence(_) => ErrorKind::Persistence,

            BookingError::Payment(PaymentError::InvalidDetails(_)) => ErrorKind::Validation,
            BookingError::Payment(_) => ErrorKind::External,
        }
    }
}

impl From<validator::ValidationErrors> for BookingError {
    fn from(errors: validator::ValidationErrors) -> Self {
        BookingError::InvalidBookingData(errors.to_string())
    }
}

pub type BookingResult<T> = Result<T, BookingError>;
