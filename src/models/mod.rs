pub mod seat;
pub mod screen;
pub mod layout;
pub mod show;
pub mod booking;
pub mod payment;

pub use seat::{Seat, SeatClass, SeatSnapshot, SeatStatus};
pub use screen::SeatInventory;
pub use layout::{RowConfig, SeatLayout};
pub use show::Show;
pub use booking::{BookingRecord, BookingStatus};
pub use payment::{Payment, PaymentMethod, PaymentStatus};

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// Все идентификаторы сущностей - отдельные типы поверх UUID,
// чтобы нельзя было перепутать seat_id и booking_id
macro_rules! entity_id {
    ($($name:ident),+ $(,)?) => {
        $(
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
            #[serde(transparent)]
            pub struct $name(Uuid);

            impl $name {
                pub fn new() -> Self {
                    Self(Uuid::new_v4())
                }
            }

            impl Default for $name {
                fn default() -> Self {
                    Self::new()
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.0)
                }
            }
        )+
    };
}

entity_id!(SeatId, InventoryId, ScreenId, ShowId, BookingId, PaymentId);

/// Ссылка на пользователя. Реестр пользователей живёт вне ядра,
/// поэтому здесь только непустой строковый идентификатор.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
