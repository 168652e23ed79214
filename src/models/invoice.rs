//! Invoice model for settlement-service.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Invoice payment status.
///
/// Transitions are monotonic within the settlement engine:
/// unpaid -> partial -> paid, with paid terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Unpaid,
    Partial,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Partial => "partial",
            PaymentStatus::Paid => "paid",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "partial" => PaymentStatus::Partial,
            "paid" => PaymentStatus::Paid,
            _ => PaymentStatus::Unpaid,
        }
    }

    /// Derive the status from paid/remaining amounts.
    pub fn for_amounts(paid: Decimal, remaining: Decimal) -> Self {
        if remaining <= Decimal::ZERO {
            PaymentStatus::Paid
        } else if paid > Decimal::ZERO {
            PaymentStatus::Partial
        } else {
            PaymentStatus::Unpaid
        }
    }
}

/// Invoice row. `total_amount` is immutable once issued; `paid_amount` is
/// monotonically non-decreasing; `remaining_amount` stays >= 0.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Invoice {
    pub invoice_id: Uuid,
    pub code: String,
    pub partner_id: Uuid,
    pub partner_type: String,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
    pub remaining_amount: Decimal,
    pub payment_status: String,
    pub cancelled_utc: Option<DateTime<Utc>>,
    pub created_utc: DateTime<Utc>,
}
