//! Partner model (customers and suppliers).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::cash::CashDirection;
use crate::models::debt::DebtType;

/// Partner type discriminator.
///
/// Selects the settlement direction: customer payments are inbound
/// receivables, supplier payments are outbound payables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartnerType {
    Customer,
    Supplier,
}

impl PartnerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartnerType::Customer => "customer",
            PartnerType::Supplier => "supplier",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "supplier" => PartnerType::Supplier,
            _ => PartnerType::Customer,
        }
    }

    /// Debt ledger classification for this partner type.
    pub fn debt_type(&self) -> DebtType {
        match self {
            PartnerType::Customer => DebtType::Receivable,
            PartnerType::Supplier => DebtType::Payable,
        }
    }

    /// Cash-book movement direction for a settlement against this partner type.
    pub fn cash_direction(&self) -> CashDirection {
        match self {
            PartnerType::Customer => CashDirection::In,
            PartnerType::Supplier => CashDirection::Out,
        }
    }
}

/// Partner row. `debt_amount` is a denormalized cache of the partner's
/// outstanding debt, maintained by the settlement engine and floored at 0.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Partner {
    pub partner_id: Uuid,
    pub code: String,
    pub name: String,
    pub partner_type: String,
    pub debt_amount: Decimal,
    pub created_utc: DateTime<Utc>,
}
