//! Cash-book models: dated financial movements, bank accounts, categories.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Movement direction of a cash-book entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CashDirection {
    In,
    Out,
}

impl CashDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            CashDirection::In => "in",
            CashDirection::Out => "out",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "out" => CashDirection::Out,
            _ => CashDirection::In,
        }
    }
}

/// Bank or cash account with a running balance, adjusted by the settlement
/// engine whenever a cash-book entry references it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BankAccount {
    pub bank_account_id: Uuid,
    pub name: String,
    pub balance: Decimal,
    pub created_utc: DateTime<Utc>,
}

/// Financial category for cash-book entries. One category per direction is
/// flagged as the default and used when the caller does not pick one.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FinancialCategory {
    pub category_id: Uuid,
    pub name: String,
    pub direction: String,
    pub is_default: bool,
    pub created_utc: DateTime<Utc>,
}

/// Dated cash-book movement. One entry is created per settlement request,
/// covering the total settled amount.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CashLedgerEntry {
    pub entry_id: Uuid,
    pub code: String,
    pub direction: String,
    pub amount: Decimal,
    pub method: String,
    pub bank_account_id: Uuid,
    pub category_id: Uuid,
    pub description: String,
    pub branch_id: Option<String>,
    pub actor_id: Option<String>,
    pub entry_date: NaiveDate,
    pub created_utc: DateTime<Utc>,
}
