use config::{ConfigError, Environment};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

// Главная структура конфигурации - контейнер для всех настроек
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub booking: BookingConfig,
    pub payment: PaymentConfig,
    pub circuit_breaker: CircuitBreakerConfig,
    pub cleanup: CleanupConfig,
}

// Настройки приложения
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: String,
    pub rust_log: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            rust_log: "seat_booking=debug".to_string(),
        }
    }
}

/// Область эксклюзивной секции при создании брони.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockScope {
    /// Одна блокировка на весь процесс вокруг всего create_booking.
    Global,
    /// Только блокировка инвентаря конкретного сеанса на шаге hold.
    #[default]
    PerInventory,
}

// Настройки бронирования
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingConfig {
    /// Сколько живёт неподтверждённая бронь.
    pub hold_minutes: i64,
    /// Продажа закрывается через столько минут после начала сеанса.
    pub cutoff_after_start_minutes: i64,
    pub lock_scope: LockScope,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            hold_minutes: 15,
            cutoff_after_start_minutes: 30,
            lock_scope: LockScope::PerInventory,
        }
    }
}

impl BookingConfig {
    pub fn hold_window(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.hold_minutes)
    }

    pub fn cutoff_after_start(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.cutoff_after_start_minutes)
    }
}

// Настройки платежей
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConfig {
    pub currency: String,
    /// Имитировать отказы провайдеров с их типичной долей успеха.
    pub simulate_failures: bool,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            currency: "INR".to_string(),
            simulate_failures: false,
        }
    }
}

// Настройки Circuit Breaker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub timeout_seconds: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            timeout_seconds: 60,
        }
    }
}

// Настройки фоновой очистки
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupConfig {
    pub interval_seconds: u64,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self { interval_seconds: 60 }
    }
}

impl CleanupConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds.max(1))
    }
}

impl Config {
    /// Значения по умолчанию, поверх них переменные окружения
    /// `APP_<СЕКЦИЯ>__<КЛЮЧ>` (например `APP_BOOKING__HOLD_MINUTES=10`).
    /// `RUST_LOG` перекрывает `app.rust_log`.
    pub fn load() -> Result<Self, ConfigError> {
        let defaults = config::Config::try_from(&Config::default())?;

        let mut loaded: Config = config::Config::builder()
            .add_source(defaults)
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        if let Ok(rust_log) = env::var("RUST_LOG") {
            loaded.app.rust_log = rust_log;
        }

        Ok(loaded)
    }
}
