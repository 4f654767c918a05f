use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{BookingError, BookingResult};
use crate::models::{BookingId, PaymentId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    CreditCard,
    DebitCard,
    Upi,
    NetBanking,
    Wallet,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PaymentMethod::CreditCard => "CREDIT_CARD",
            PaymentMethod::DebitCard => "DEBIT_CARD",
            PaymentMethod::Upi => "UPI",
            PaymentMethod::NetBanking => "NET_BANKING",
            PaymentMethod::Wallet => "WALLET",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
    Refunded,
    Cancelled,
}

/// Платёжная транзакция по брони.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub booking_id: BookingId,
    pub user_id: UserId,
    pub amount: f64,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub transaction_id: Option<String>,
    pub gateway_response: Option<String>,
    pub failure_reason: Option<String>,
    pub refund_amount: Option<f64>,
    pub refund_reason: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
    pub refunded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    pub fn new(
        booking_id: BookingId,
        user_id: UserId,
        amount: f64,
        method: PaymentMethod,
        now: DateTime<Utc>,
    ) -> BookingResult<Self> {
        if !(amount.is_finite() && amount > 0.0) {
            return Err(BookingError::InvalidBookingData(format!("payment amount must be positive, got {}", amount)));
        }

        Ok(Self {
            id: PaymentId::new(),
            booking_id,
            user_id,
            amount,
            method,
            status: PaymentStatus::Pending,
            transaction_id: None,
            gateway_response: None,
            failure_reason: None,
            refund_amount: None,
            refund_reason: None,
            processed_at: None,
            refunded_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn mark_success(&mut self, transaction_id: String, gateway_response: String, now: DateTime<Utc>) {
        self.status = PaymentStatus::Success;
        self.transaction_id = Some(transaction_id);
        self.gateway_response = Some(gateway_response);
        self.processed_at = Some(now);
        self.updated_at = now;
    }

    pub fn mark_failed(&mut self, reason: String, now: DateTime<Utc>) {
        self.status = PaymentStatus::Failed;
        self.failure_reason = Some(reason);
        self.processed_at = Some(now);
        self.updated_at = now;
    }

    /// Попытка, не дошедшая до шлюза.
    pub fn mark_cancelled(&mut self, now: DateTime<Utc>) {
        self.status = PaymentStatus::Cancelled;
        self.updated_at = now;
    }

    /// Возврат только по успешному платежу и не больше уплаченного.
    pub fn process_refund(&mut self, amount: f64, reason: String, now: DateTime<Utc>) -> BookingResult<()> {
        if self.status != PaymentStatus::Success {
            return Err(BookingError::PaymentNotSuccessful(self.id));
        }
        if !(amount > 0.0 && amount <= self.amount) {
            return Err(BookingError::InvalidRefundAmount(amount));
        }

        self.status = PaymentStatus::Refunded;
        self.refund_amount = Some(amount);
        self.refund_reason = Some(reason);
        self.refunded_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    pub fn is_successful(&self) -> bool {
        self.status == PaymentStatus::Success
    }

    pub fn is_pending(&self) -> bool {
        self.status == PaymentStatus::Pending
    }
}
