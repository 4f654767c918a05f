//! payment.rs
//!
//! Сервисный слой для оплаты броней через внешнюю платёжную систему.
//!
//! Ключевые компоненты:
//! 1.  **CircuitBreaker**: "Автоматический выключатель" вокруг вызовов шлюза.
//!     После серии сбоев шлюза перестаёт его дёргать до истечения таймаута.
//! 2.  **PaymentGateway / StrategyGateway**: граница с платёжной системой.
//!     Шлюз выбирает стратегию по способу оплаты (карта, UPI, кошелёк...)
//!     и передаёт ей сумму и метаданные.
//! 3.  **PaymentService**: создаёт запись платежа, вызывает шлюз без каких-либо
//!     блокировок ядра и фиксирует результат. Бронь и места здесь не меняются.

use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use crate::clock::Clock;
use crate::config::{CircuitBreakerConfig, PaymentConfig};
use crate::error::{BookingError, BookingResult, PaymentError};
use crate::locks;
use crate::models::{BookingId, Payment, PaymentId, PaymentMethod};
use crate::repositories::{BookingRepository, PaymentRepository};

pub type PaymentMetadata = HashMap<String, String>;

/// Состояния "Автоматического выключателя".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CircuitState {
    /// **Closed**: нормальный режим, запросы к шлюзу разрешены.
    Closed,
    /// **Open**: после серии сбоев запросы временно запрещены.
    Open,
    /// **HalfOpen**: таймаут в Open истёк, пропускаем пробный запрос.
    HalfOpen,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    state: RwLock<CircuitState>,
    /// Счётчик последовательных сбоев.
    failure_count: AtomicU32,
    /// Момент последнего сбоя, от него отсчитывается таймаут.
    last_failure: Mutex<Option<Instant>>,
    failure_threshold: u32,
    timeout: Duration,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, timeout: Duration) -> Self {
        Self {
            state: RwLock::new(CircuitState::Closed),
            failure_count: AtomicU32::new(0),
            last_failure: Mutex::new(None),
            failure_threshold: failure_threshold.max(1),
            timeout,
        }
    }

    pub fn from_config(config: &CircuitBreakerConfig) -> Self {
        Self::new(config.failure_threshold, Duration::from_secs(config.timeout_seconds))
    }

    /// Можно ли выполнить следующий запрос к шлюзу.
    pub fn can_execute(&self) -> bool {
        let mut state = locks::write(&self.state);

        match *state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let last_failure = *locks::lock(&self.last_failure);
                let elapsed = last_failure.map(|at| at.elapsed());
                // Таймаут истёк - переходим в HalfOpen и пропускаем пробный запрос
                if elapsed.map_or(true, |e| e >= self.timeout) {
                    *state = CircuitState::HalfOpen;
                    info!("Circuit breaker transitioning to HalfOpen state");
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&self) {
        let mut state = locks::write(&self.state);
        if *state == CircuitState::HalfOpen {
            info!("Circuit breaker recovered - transitioning to Closed state");
        }
        *state = CircuitState::Closed;
        self.failure_count.store(0, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        let failure_count = self.failure_count.fetch_add(1, Ordering::Relaxed) + 1;
        *locks::lock(&self.last_failure) = Some(Instant::now());

        let mut state = locks::write(&self.state);
        match *state {
            CircuitState::Closed if failure_count >= self.failure_threshold => {
                *state = CircuitState::Open;
                error!(
                    "Circuit breaker OPENED - {} failures reached threshold {}",
                    failure_count, self.failure_threshold
                );
            }
            CircuitState::HalfOpen => {
                *state = CircuitState::Open;
                warn!("Circuit breaker test failed - returning to Open state");
            }
            _ => {}
        }
    }

    pub fn state(&self) -> CircuitState {
        *locks::read(&self.state)
    }

    pub fn failure_count(&self) -> u32 {
        self.failure_count.load(Ordering::Relaxed)
    }
}

/// Ответ шлюза. `success == false` - это отказ по существу
/// (отклонённая карта и т.п.), а не сбой самого шлюза.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentResult {
    pub success: bool,
    pub transaction_id: Option<String>,
    pub response: String,
}

/// Стратегия оплаты для одного способа.
pub trait PaymentStrategy: Send + Sync {
    fn method(&self) -> PaymentMethod;
    fn validate(&self, metadata: &PaymentMetadata) -> Result<(), PaymentError>;
    fn process(&self, amount: f64, metadata: &PaymentMetadata) -> Result<PaymentResult, PaymentError>;
}

/// Граница с платёжной системой.
pub trait PaymentGateway: Send + Sync {
    fn process_payment(
        &self,
        amount: f64,
        method: PaymentMethod,
        metadata: &PaymentMetadata,
    ) -> Result<PaymentResult, PaymentError>;
}

/// Имитация платёжного провайдера для одного способа оплаты.
#[derive(Debug, Clone)]
pub struct SimulatedStrategy {
    method: PaymentMethod,
    required_fields: &'static [&'static str],
    success_rate: f64,
    prefix: &'static str,
    simulate_failures: bool,
}

impl SimulatedStrategy {
    pub fn new(method: PaymentMethod, simulate_failures: bool) -> Self {
        // обязательные поля и доля успешных платежей по способам
        let (required_fields, success_rate, prefix): (&'static [&'static str], f64, &'static str) = match method {
            PaymentMethod::CreditCard => (&["card_number", "cvv", "expiry"], 0.90, "CC"),
            PaymentMethod::DebitCard => (&["card_number", "pin"], 0.85, "DC"),
            PaymentMethod::Upi => (&["upi_id"], 0.95, "UPI"),
            PaymentMethod::NetBanking => (&["bank_code", "account_number"], 0.92, "NB"),
            PaymentMethod::Wallet => (&["wallet_id"], 0.97, "WALLET"),
        };

        Self { method, required_fields, success_rate, prefix, simulate_failures }
    }

    /// Идентификатор транзакции: префикс способа + короткий SHA-256.
    fn generate_transaction_id(&self, amount: f64, metadata: &PaymentMetadata) -> String {
        let token_string = format!(
            "{}{:.2}{}{}",
            self.method,
            amount,
            metadata.get("booking_id").map(String::as_str).unwrap_or_default(),
            uuid::Uuid::new_v4()
        );
        let mut hasher = Sha256::new();
        hasher.update(token_string.as_bytes());
        let digest = format!("{:x}", hasher.finalize());
        format!("{}_{}", self.prefix, &digest[..16])
    }
}

impl PaymentStrategy for SimulatedStrategy {
    fn method(&self) -> PaymentMethod {
        self.method
    }

    fn validate(&self, metadata: &PaymentMetadata) -> Result<(), PaymentError> {
        let missing: Vec<&str> = self
            .required_fields
            .iter()
            .copied()
            .filter(|field| metadata.get(*field).map_or(true, |v| v.trim().is_empty()))
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(PaymentError::InvalidDetails(format!(
                "missing {} details: {}",
                self.method,
                missing.join(", ")
            )))
        }
    }

    fn process(&self, amount: f64, metadata: &PaymentMetadata) -> Result<PaymentResult, PaymentError> {
        self.validate(metadata)?;

        let approved = !self.simulate_failures || rand::thread_rng().gen::<f64>() < self.success_rate;
        if approved {
            Ok(PaymentResult {
                success: true,
                transaction_id: Some(self.generate_transaction_id(amount, metadata)),
                response: format!("Payment processed successfully via {}", self.method),
            })
        } else {
            Ok(PaymentResult {
                success: false,
                transaction_id: None,
                response: format!("{} payment failed", self.method),
            })
        }
    }
}

/// Шлюз, выбирающий стратегию по способу оплаты.
#[derive(Default)]
pub struct StrategyGateway {
    strategies: HashMap<PaymentMethod, Box<dyn PaymentStrategy>>,
}

impl StrategyGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Все пять способов оплаты с имитацией провайдера.
    pub fn from_config(config: &PaymentConfig) -> Self {
        let mut gateway = Self::new();
        for method in [
            PaymentMethod::CreditCard,
            PaymentMethod::DebitCard,
            PaymentMethod::Upi,
            PaymentMethod::NetBanking,
            PaymentMethod::Wallet,
        ] {
            gateway.register_strategy(Box::new(SimulatedStrategy::new(method, config.simulate_failures)));
        }
        gateway
    }

    pub fn register_strategy(&mut self, strategy: Box<dyn PaymentStrategy>) {
        self.strategies.insert(strategy.method(), strategy);
    }
}

impl PaymentGateway for StrategyGateway {
    fn process_payment(
        &self,
        amount: f64,
        method: PaymentMethod,
        metadata: &PaymentMetadata,
    ) -> Result<PaymentResult, PaymentError> {
        let strategy = self
            .strategies
            .get(&method)
            .ok_or_else(|| PaymentError::UnsupportedMethod(method.to_string()))?;
        strategy.process(amount, metadata)
    }
}

/// Оплата броней. Не держит никаких блокировок ядра во время вызова шлюза
/// и не трогает ни бронь, ни места - только запись платежа.
pub struct PaymentService {
    payments: Arc<dyn PaymentRepository>,
    bookings: Arc<dyn BookingRepository>,
    gateway: Arc<dyn PaymentGateway>,
    circuit_breaker: Arc<CircuitBreaker>,
    clock: Arc<dyn Clock>,
    currency: String,
}

impl PaymentService {
    pub fn new(
        payments: Arc<dyn PaymentRepository>,
        bookings: Arc<dyn BookingRepository>,
        gateway: Arc<dyn PaymentGateway>,
        circuit_breaker: Arc<CircuitBreaker>,
        clock: Arc<dyn Clock>,
        currency: impl Into<String>,
    ) -> Self {
        Self { payments, bookings, gateway, circuit_breaker, clock, currency: currency.into() }
    }

    /// Выполняет вызов шлюза, пропуская его через Circuit Breaker.
    /// Ошибки валидации реквизитов - вина клиента, сбоем шлюза не считаются.
    fn execute_with_circuit_breaker(
        &self,
        amount: f64,
        method: PaymentMethod,
        metadata: &PaymentMetadata,
    ) -> Result<PaymentResult, PaymentError> {
        if !self.circuit_breaker.can_execute() {
            warn!("Circuit breaker is OPEN - blocking payment gateway request");
            return Err(PaymentError::CircuitOpen);
        }

        match self.gateway.process_payment(amount, method, metadata) {
            Ok(result) => {
                self.circuit_breaker.record_success();
                Ok(result)
            }
            Err(e @ (PaymentError::InvalidDetails(_) | PaymentError::UnsupportedMethod(_))) => Err(e),
            Err(e) => {
                error!("Payment gateway request failed: {}", e);
                self.circuit_breaker.record_failure();
                Err(e)
            }
        }
    }

    /// Оплата брони. Возвращает запись платежа в статусе Success или Failed;
    /// `Err` - только если до шлюза не дошли или шлюз сломался.
    pub fn process_payment(
        &self,
        booking_id: BookingId,
        method: PaymentMethod,
        metadata: PaymentMetadata,
    ) -> BookingResult<Payment> {
        let booking = self
            .bookings
            .get_by_id(booking_id)
            .map_err(|e| e.or_not_found(BookingError::BookingNotFound(booking_id)))?;

        booking.ensure_pending()?;
        let now = self.clock.now();
        if booking.is_expired(now) {
            return Err(BookingError::BookingExpired(booking_id));
        }

        let mut payment = Payment::new(booking_id, booking.user_id().clone(), booking.total_amount(), method, now)?;
        self.payments.create(payment.clone())?;

        let mut metadata = metadata;
        metadata.insert("booking_id".to_string(), booking_id.to_string());
        metadata.insert("user_id".to_string(), booking.user_id().to_string());
        metadata.insert("amount".to_string(), format!("{:.2}", booking.total_amount()));
        metadata.insert("currency".to_string(), self.currency.clone());

        info!(
            booking_id = %booking_id,
            payment_id = %payment.id,
            "Processing payment: amount={:.2} {}, method={}, circuit={:?}",
            payment.amount,
            self.currency,
            method,
            self.circuit_breaker.state()
        );

        let outcome = self.execute_with_circuit_breaker(payment.amount, method, &metadata);
        let finished_at = self.clock.now();

        match outcome {
            Ok(result) if result.success => {
                let transaction_id = result.transaction_id.unwrap_or_else(|| payment.id.to_string());
                payment.mark_success(transaction_id, result.response, finished_at);
            }
            Ok(result) => {
                warn!(booking_id = %booking_id, payment_id = %payment.id, "Payment declined: {}", result.response);
                payment.mark_failed(result.response, finished_at);
            }
            Err(e) => {
                if matches!(e, PaymentError::CircuitOpen) {
                    payment.mark_cancelled(finished_at);
                } else {
                    payment.mark_failed(e.to_string(), finished_at);
                }
                if let Err(store_err) = self.payments.update(&payment) {
                    error!(payment_id = %payment.id, "Failed to record failed payment: {}", store_err);
                }
                return Err(e.into());
            }
        }

        self.payments.update(&payment)?;
        Ok(payment)
    }

    pub fn get_payment(&self, payment_id: PaymentId) -> BookingResult<Payment> {
        self.payments
            .get_by_id(payment_id)
            .map_err(|e| e.or_not_found(BookingError::PaymentNotFound(payment_id)))
    }

    pub fn payments_for_booking(&self, booking_id: BookingId) -> BookingResult<Vec<Payment>> {
        Ok(self.payments.list_by_booking(booking_id)?)
    }

    pub fn refund_payment(&self, payment_id: PaymentId, amount: f64, reason: impl Into<String>) -> BookingResult<Payment> {
        let mut payment = self.get_payment(payment_id)?;
        payment.process_refund(amount, reason.into(), self.clock.now())?;
        self.payments.update(&payment)?;
        info!(payment_id = %payment_id, "Refunded {:.2}", amount);
        Ok(payment)
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.circuit_breaker.state()
    }
}

impl std::fmt::Debug for PaymentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentService")
            .field("currency", &self.currency)
            .field("circuit_state", &self.circuit_breaker.state())
            .finish()
    }
}

// Удобный конструктор метаданных для тестов и демо
pub fn metadata<const N: usize>(pairs: [(&str, &str); N]) -> PaymentMetadata {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}
