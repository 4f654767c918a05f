use chrono::{DateTime, Duration, Utc};
use std::sync::Mutex;

use crate::locks;

/// Источник текущего времени. Все сроки (hold, продажа) считаются через него.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Часы, которые двигаются только вручную (тесты, прогон сценариев).
#[derive(Debug)]
pub struct ManualClock {
    time: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(time: DateTime<Utc>) -> Self {
        Self { time: Mutex::new(time) }
    }

    pub fn set(&self, time: DateTime<Utc>) {
        *locks::lock(&self.time) = time;
    }

    pub fn advance(&self, by: Duration) {
        let mut time = locks::lock(&self.time);
        *time = *time + by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *locks::lock(&self.time)
    }
}
