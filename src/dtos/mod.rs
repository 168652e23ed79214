//! Request/response DTOs for the settlement API.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::PartnerType;

fn validate_positive_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if *amount > Decimal::ZERO {
        Ok(())
    } else {
        Err(ValidationError::new("payment_amount_not_positive"))
    }
}

/// Body of `POST /partners/{partner_id}/settlements`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SettleDebtRequest {
    #[validate(custom(function = "validate_positive_amount"))]
    pub payment_amount: Decimal,
    pub payment_date: NaiveDate,
    pub bank_account_id: Uuid,
    pub partner_type: PartnerType,
    /// Restrict the settlement to a single invoice (detail-view flow).
    pub invoice_id: Option<Uuid>,
    /// Cash-book category; the direction default is used when omitted.
    pub category_id: Option<Uuid>,
    pub method: Option<String>,
    pub notes: Option<String>,
}

/// Per-invoice breakdown line returned to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettledInvoice {
    pub invoice_id: Uuid,
    pub invoice_code: String,
    pub amount_applied: Decimal,
    pub new_paid_amount: Decimal,
    pub new_remaining_amount: Decimal,
    pub new_status: String,
}

/// Successful settlement result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementResponse {
    pub settlement_id: Uuid,
    pub partner_id: Uuid,
    pub payment_amount: Decimal,
    pub total_settled: Decimal,
    /// Surplus not applied to any invoice (payment exceeded outstanding debt).
    pub unallocated_amount: Decimal,
    pub invoice_count: i32,
    pub invoices: Vec<SettledInvoice>,
}

impl From<(crate::models::Settlement, Vec<crate::models::SettlementLine>)> for SettlementResponse {
    fn from(
        (settlement, lines): (crate::models::Settlement, Vec<crate::models::SettlementLine>),
    ) -> Self {
        SettlementResponse {
            settlement_id: settlement.settlement_id,
            partner_id: settlement.partner_id,
            payment_amount: settlement.payment_amount,
            total_settled: settlement.total_allocated,
            unallocated_amount: settlement.unallocated_amount,
            invoice_count: settlement.invoice_count,
            invoices: lines
                .into_iter()
                .map(|line| SettledInvoice {
                    invoice_id: line.invoice_id,
                    invoice_code: line.invoice_code,
                    amount_applied: line.amount_applied,
                    new_paid_amount: line.new_paid_amount,
                    new_remaining_amount: line.new_remaining_amount,
                    new_status: line.new_status,
                })
                .collect(),
        }
    }
}

/// Query parameters for the outstanding-invoice listing.
#[derive(Debug, Clone, Deserialize)]
pub struct OutstandingQuery {
    pub partner_type: PartnerType,
    pub invoice_id: Option<Uuid>,
}
