//! Persisted settlement results, re-read by the receipt renderer.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One completed settlement request.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Settlement {
    pub settlement_id: Uuid,
    pub partner_id: Uuid,
    pub partner_type: String,
    pub payment_amount: Decimal,
    pub total_allocated: Decimal,
    pub unallocated_amount: Decimal,
    pub invoice_count: i32,
    pub bank_account_id: Uuid,
    pub payment_date: NaiveDate,
    pub notes: Option<String>,
    pub actor_id: Option<String>,
    pub created_utc: DateTime<Utc>,
}

/// Per-invoice breakdown line of a settlement.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SettlementLine {
    pub line_id: Uuid,
    pub settlement_id: Uuid,
    pub invoice_id: Uuid,
    pub invoice_code: String,
    pub amount_applied: Decimal,
    pub new_paid_amount: Decimal,
    pub new_remaining_amount: Decimal,
    pub new_status: String,
    pub created_utc: DateTime<Utc>,
}
