//! Debt ledger models: canonical debt records and their append-only payment log.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Debt classification by partner type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebtType {
    Receivable,
    Payable,
}

impl DebtType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DebtType::Receivable => "receivable",
            DebtType::Payable => "payable",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "payable" => DebtType::Payable,
            _ => DebtType::Receivable,
        }
    }
}

/// Debt record status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebtStatus {
    Pending,
    Partial,
    Paid,
}

impl DebtStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DebtStatus::Pending => "pending",
            DebtStatus::Partial => "partial",
            DebtStatus::Paid => "paid",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "partial" => DebtStatus::Partial,
            "paid" => DebtStatus::Paid,
            _ => DebtStatus::Pending,
        }
    }
}

/// Canonical debt ledger entry, a lazily created one-to-one shadow of an
/// invoice. `remaining_amount` must equal the invoice's remaining amount
/// after every settlement.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DebtRecord {
    pub debt_record_id: Uuid,
    pub code: String,
    pub partner_id: Uuid,
    pub debt_type: String,
    pub original_amount: Decimal,
    pub remaining_amount: Decimal,
    pub reference_id: Uuid,
    pub reference_type: String,
    pub status: String,
    pub created_utc: DateTime<Utc>,
}

/// Append-only payment event against a debt record. Never updated or
/// deleted; this is the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PaymentRecord {
    pub payment_record_id: Uuid,
    pub debt_record_id: Uuid,
    pub amount: Decimal,
    pub payment_date: NaiveDate,
    pub method: String,
    pub bank_account_id: Option<Uuid>,
    pub notes: Option<String>,
    pub actor_id: Option<String>,
    pub created_utc: DateTime<Utc>,
}
