use serde::{Deserialize, Serialize};

use crate::models::{Seat, SeatClass};

/// Схема зала: ряды мест одного класса.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeatLayout {
    pub rows: Vec<RowConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowConfig {
    pub name: String,
    pub count: u32,
    pub class: SeatClass,
}

impl RowConfig {
    pub fn new(name: impl Into<String>, count: u32, class: SeatClass) -> Self {
        Self { name: name.into(), count, class }
    }
}

impl SeatLayout {
    pub fn new(rows: Vec<RowConfig>) -> Self {
        Self { rows }
    }

    /// Стандартный зал на 118 мест: два VIP ряда, два Premium, четыре Regular.
    pub fn standard() -> Self {
        Self::new(vec![
            RowConfig::new("A", 10, SeatClass::Vip),
            RowConfig::new("B", 12, SeatClass::Vip),
            RowConfig::new("C", 14, SeatClass::Premium),
            RowConfig::new("D", 14, SeatClass::Premium),
            RowConfig::new("E", 16, SeatClass::Regular),
            RowConfig::new("F", 16, SeatClass::Regular),
            RowConfig::new("G", 18, SeatClass::Regular),
            RowConfig::new("H", 18, SeatClass::Regular),
        ])
    }

    pub fn total_seats(&self) -> u32 {
        self.rows.iter().map(|r| r.count).sum()
    }

    // Места нумеруются с 1 в каждом ряду
    pub fn build_seats(&self, base_price: f64) -> Vec<Seat> {
        self.rows
            .iter()
            .flat_map(|row| {
                (1..=row.count).map(move |number| Seat::new(row.name.clone(), number, row.class, base_price))
            })
            .collect()
    }
}

impl Default for SeatLayout {
    fn default() -> Self {
        Self::standard()
    }
}
