//! FIFO payment allocation.
//!
//! Pure computation: given the partner's outstanding invoices in creation
//! order and a payment amount, decide how much each invoice receives. All
//! writes happen later, inside the settlement transaction.

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::{Invoice, PaymentStatus};

/// Planned update for one invoice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub invoice_id: Uuid,
    pub invoice_code: String,
    pub amount: Decimal,
    pub new_paid_amount: Decimal,
    pub new_remaining_amount: Decimal,
    pub new_status: PaymentStatus,
}

/// Result of allocating one payment across a list of invoices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationPlan {
    pub allocations: Vec<Allocation>,
    pub total_allocated: Decimal,
    /// Surplus left after every invoice is fully covered. Reported to the
    /// caller instead of being applied anywhere.
    pub unallocated: Decimal,
}

/// Walk the invoices oldest-first, applying
/// `allocated = min(remaining_payment, invoice.remaining_amount)` until the
/// payment is exhausted or the list ends.
///
/// Invariants: the sum of allocations never exceeds `payment_amount`, no
/// invoice receives more than its remaining amount, and every touched
/// invoice ends with `new_remaining_amount >= 0`.
pub fn allocate(invoices: &[Invoice], payment_amount: Decimal) -> AllocationPlan {
    let mut remaining_payment = payment_amount;
    let mut allocations = Vec::new();

    for invoice in invoices {
        if remaining_payment <= Decimal::ZERO {
            break;
        }
        if invoice.remaining_amount <= Decimal::ZERO {
            continue;
        }

        let allocated = remaining_payment.min(invoice.remaining_amount);
        let new_paid = invoice.paid_amount + allocated;
        let new_remaining = invoice.total_amount - new_paid;

        allocations.push(Allocation {
            invoice_id: invoice.invoice_id,
            invoice_code: invoice.code.clone(),
            amount: allocated,
            new_paid_amount: new_paid,
            new_remaining_amount: new_remaining,
            new_status: PaymentStatus::for_amounts(new_paid, new_remaining),
        });

        remaining_payment -= allocated;
    }

    AllocationPlan {
        total_allocated: payment_amount - remaining_payment,
        unallocated: remaining_payment,
        allocations,
    }
}
