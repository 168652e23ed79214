//! Settlement orchestration.
//!
//! One settlement request distributes a payment FIFO across a partner's
//! outstanding invoices and synchronizes the invoice store, the debt ledger
//! and its payment log, the cash book and bank balance, and the partner's
//! denormalized debt total. The whole sequence runs inside a single
//! transaction with row locks on the selected invoices, so two concurrent
//! settlements against the same partner cannot both consume the same
//! outstanding balance. Any failure rolls back every write.

use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sqlx::{Postgres, Transaction};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::dtos::SettleDebtRequest;
use crate::error::AppError;
use crate::middleware::ActorContext;
use crate::models::{
    BankAccount, CashDirection, DebtRecord, DebtStatus, FinancialCategory, Invoice, Partner,
    PartnerType, Settlement, SettlementLine,
};
use crate::services::allocation::{allocate, Allocation};
use crate::services::database::Database;
use crate::services::metrics::{DB_QUERY_DURATION, SETTLED_AMOUNT_TOTAL, SETTLEMENTS_TOTAL};
use crate::services::sequence::{next_daily_code, CASH_LEDGER_PREFIX, DEBT_RECORD_PREFIX};

impl Database {
    /// Settle a payment against a partner's outstanding invoices.
    ///
    /// Either all five entity classes (invoice, debt record, payment record,
    /// cash book + bank balance, partner aggregate) are updated consistently,
    /// or none are.
    #[instrument(skip(self, request, actor), fields(partner_id = %partner_id, payment_amount = %request.payment_amount))]
    pub async fn settle_debt(
        &self,
        partner_id: Uuid,
        request: &SettleDebtRequest,
        actor: &ActorContext,
    ) -> Result<(Settlement, Vec<SettlementLine>), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["settle_debt"])
            .start_timer();

        let mut tx = self.pool().begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        // Lock the partner row for the aggregate update at the end.
        let partner = sqlx::query_as::<_, Partner>(
            r#"
            SELECT partner_id, code, name, partner_type, debt_amount, created_utc
            FROM partners
            WHERE partner_id = $1
            FOR UPDATE
            "#,
        )
        .bind(partner_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to lock partner: {}", e)))?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Partner not found")))?;

        if PartnerType::from_string(&partner.partner_type) != request.partner_type {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Partner '{}' is a {}, not a {}",
                partner.code,
                partner.partner_type,
                request.partner_type.as_str()
            )));
        }

        // Lock the bank account for the balance adjustment.
        let bank_account = sqlx::query_as::<_, BankAccount>(
            r#"
            SELECT bank_account_id, name, balance, created_utc
            FROM bank_accounts
            WHERE bank_account_id = $1
            FOR UPDATE
            "#,
        )
        .bind(request.bank_account_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to lock bank account: {}", e))
        })?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Bank account not found")))?;

        // Select and lock the outstanding invoices, oldest first. Locking
        // here is what makes the concurrent double-allocation case a clean
        // conflict instead of an overshoot.
        let invoices = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT invoice_id, code, partner_id, partner_type, total_amount, paid_amount,
                remaining_amount, payment_status, cancelled_utc, created_utc
            FROM invoices
            WHERE partner_id = $1
              AND partner_type = $2
              AND cancelled_utc IS NULL
              AND remaining_amount > 0
              AND ($3::uuid IS NULL OR invoice_id = $3)
            ORDER BY created_utc ASC
            FOR UPDATE
            "#,
        )
        .bind(partner_id)
        .bind(request.partner_type.as_str())
        .bind(request.invoice_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to lock invoices: {}", e))
        })?;

        if invoices.is_empty() {
            // Distinguish "nothing to settle" from "already paid": invoices
            // that exist but carry no remainder are a state conflict (e.g. a
            // concurrent settlement got there first), not a missing resource.
            if let Some(invoice_id) = request.invoice_id {
                let existing = sqlx::query_scalar::<_, Decimal>(
                    "SELECT remaining_amount FROM invoices WHERE invoice_id = $1 AND partner_id = $2",
                )
                .bind(invoice_id)
                .bind(partner_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow::anyhow!("Failed to check invoice: {}", e))
                })?;

                if let Some(remaining) = existing {
                    if remaining <= Decimal::ZERO {
                        return Err(AppError::Conflict(anyhow::anyhow!(
                            "Invoice is already fully settled"
                        )));
                    }
                }
            } else {
                let settled_invoices: i64 = sqlx::query_scalar(
                    r#"
                    SELECT COUNT(*) FROM invoices
                    WHERE partner_id = $1 AND partner_type = $2 AND cancelled_utc IS NULL
                    "#,
                )
                .bind(partner_id)
                .bind(request.partner_type.as_str())
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow::anyhow!("Failed to count invoices: {}", e))
                })?;

                if settled_invoices > 0 {
                    return Err(AppError::Conflict(anyhow::anyhow!(
                        "All invoices for partner '{}' are already fully settled",
                        partner.code
                    )));
                }
            }
            return Err(AppError::NotFound(anyhow::anyhow!(
                "No outstanding invoices for partner '{}'",
                partner.code
            )));
        }

        let plan = allocate(&invoices, request.payment_amount);

        if plan.unallocated > Decimal::ZERO {
            warn!(
                partner_id = %partner_id,
                unallocated = %plan.unallocated,
                "Payment exceeds outstanding debt; surplus not applied to any invoice"
            );
        }

        let method = request
            .method
            .clone()
            .unwrap_or_else(|| "bank_transfer".to_string());

        // Synchronize the debt ledger and invoice store per allocation.
        for alloc in &plan.allocations {
            let invoice = invoices
                .iter()
                .find(|i| i.invoice_id == alloc.invoice_id)
                .ok_or_else(|| {
                    AppError::InternalError(anyhow::anyhow!("Allocation for unknown invoice"))
                })?;

            self.apply_allocation(&mut tx, &partner, invoice, alloc, request, actor, &method)
                .await?;
        }

        // One cash-book entry per settlement, covering the full payment.
        let direction = request.partner_type.cash_direction();
        let category = resolve_category(&mut tx, request.category_id, direction.as_str()).await?;

        let cash_code = next_daily_code(&mut *tx, CASH_LEDGER_PREFIX, request.payment_date).await?;
        let description = format!(
            "Debt settlement from {} '{}' ({})",
            partner.partner_type, partner.name, partner.code
        );

        sqlx::query(
            r#"
            INSERT INTO cash_ledger (entry_id, code, direction, amount, method, bank_account_id,
                category_id, description, branch_id, actor_id, entry_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&cash_code)
        .bind(direction.as_str())
        .bind(request.payment_amount)
        .bind(&method)
        .bind(bank_account.bank_account_id)
        .bind(category.category_id)
        .bind(&description)
        .bind(&actor.branch_id)
        .bind(&actor.actor_id)
        .bind(request.payment_date)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to insert cash-book entry: {}", e))
        })?;

        // Inbound settlements add to the bank balance, outbound subtract.
        let balance_delta = match direction {
            CashDirection::In => request.payment_amount,
            CashDirection::Out => -request.payment_amount,
        };
        sqlx::query("UPDATE bank_accounts SET balance = balance + $2 WHERE bank_account_id = $1")
            .bind(bank_account.bank_account_id)
            .bind(balance_delta)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to adjust bank balance: {}", e))
            })?;

        // Partner aggregate, floored at zero even if upstream data drifted.
        sqlx::query(
            "UPDATE partners SET debt_amount = GREATEST(0, debt_amount - $2) WHERE partner_id = $1",
        )
        .bind(partner_id)
        .bind(plan.total_allocated)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to update partner debt: {}", e))
        })?;

        // Persist the settlement with its breakdown for receipt read-back.
        let settlement = sqlx::query_as::<_, Settlement>(
            r#"
            INSERT INTO settlements (settlement_id, partner_id, partner_type, payment_amount,
                total_allocated, unallocated_amount, invoice_count, bank_account_id,
                payment_date, notes, actor_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING settlement_id, partner_id, partner_type, payment_amount, total_allocated,
                unallocated_amount, invoice_count, bank_account_id, payment_date, notes,
                actor_id, created_utc
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(partner_id)
        .bind(request.partner_type.as_str())
        .bind(request.payment_amount)
        .bind(plan.total_allocated)
        .bind(plan.unallocated)
        .bind(plan.allocations.len() as i32)
        .bind(bank_account.bank_account_id)
        .bind(request.payment_date)
        .bind(&request.notes)
        .bind(&actor.actor_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to insert settlement: {}", e))
        })?;

        let mut lines = Vec::with_capacity(plan.allocations.len());
        for alloc in &plan.allocations {
            let line = sqlx::query_as::<_, SettlementLine>(
                r#"
                INSERT INTO settlement_lines (line_id, settlement_id, invoice_id, invoice_code,
                    amount_applied, new_paid_amount, new_remaining_amount, new_status)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING line_id, settlement_id, invoice_id, invoice_code, amount_applied,
                    new_paid_amount, new_remaining_amount, new_status, created_utc
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(settlement.settlement_id)
            .bind(alloc.invoice_id)
            .bind(&alloc.invoice_code)
            .bind(alloc.amount)
            .bind(alloc.new_paid_amount)
            .bind(alloc.new_remaining_amount)
            .bind(alloc.new_status.as_str())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to insert settlement line: {}", e))
            })?;
            lines.push(line);
        }

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit settlement: {}", e))
        })?;

        timer.observe_duration();

        SETTLEMENTS_TOTAL
            .with_label_values(&[request.partner_type.as_str()])
            .inc();
        SETTLED_AMOUNT_TOTAL
            .with_label_values(&[request.partner_type.as_str()])
            .inc_by(plan.total_allocated.to_f64().unwrap_or(0.0));

        info!(
            settlement_id = %settlement.settlement_id,
            partner_code = %partner.code,
            total_allocated = %plan.total_allocated,
            unallocated = %plan.unallocated,
            invoice_count = lines.len(),
            "Settlement completed"
        );

        Ok((settlement, lines))
    }

    /// Apply one allocation: find or lazily create the debt record, append
    /// the payment record, recompute the debt remainder, and write the
    /// invoice's new paid amount and status.
    #[allow(clippy::too_many_arguments)]
    async fn apply_allocation(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        partner: &Partner,
        invoice: &Invoice,
        alloc: &Allocation,
        request: &SettleDebtRequest,
        actor: &ActorContext,
        method: &str,
    ) -> Result<(), AppError> {
        let debt_record = sqlx::query_as::<_, DebtRecord>(
            r#"
            SELECT debt_record_id, code, partner_id, debt_type, original_amount,
                remaining_amount, reference_id, reference_type, status, created_utc
            FROM debt_records
            WHERE reference_id = $1 AND reference_type = 'invoice'
            FOR UPDATE
            "#,
        )
        .bind(invoice.invoice_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to lock debt record: {}", e))
        })?;

        let debt_record = match debt_record {
            Some(record) => record,
            None => {
                // Lazily created shadow of the invoice, seeded from its
                // current totals so both remainders start in lock-step.
                let code =
                    next_daily_code(&mut **tx, DEBT_RECORD_PREFIX, Utc::now().date_naive()).await?;
                sqlx::query_as::<_, DebtRecord>(
                    r#"
                    INSERT INTO debt_records (debt_record_id, code, partner_id, debt_type,
                        original_amount, remaining_amount, reference_id, reference_type, status)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, 'invoice', $8)
                    RETURNING debt_record_id, code, partner_id, debt_type, original_amount,
                        remaining_amount, reference_id, reference_type, status, created_utc
                    "#,
                )
                .bind(Uuid::new_v4())
                .bind(&code)
                .bind(partner.partner_id)
                .bind(request.partner_type.debt_type().as_str())
                .bind(invoice.total_amount)
                .bind(invoice.remaining_amount)
                .bind(invoice.invoice_id)
                .bind(DebtStatus::Pending.as_str())
                .fetch_one(&mut **tx)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow::anyhow!("Failed to create debt record: {}", e))
                })?
            }
        };

        sqlx::query(
            r#"
            INSERT INTO payment_records (payment_record_id, debt_record_id, amount, payment_date,
                method, bank_account_id, notes, actor_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(debt_record.debt_record_id)
        .bind(alloc.amount)
        .bind(request.payment_date)
        .bind(method)
        .bind(request.bank_account_id)
        .bind(&request.notes)
        .bind(&actor.actor_id)
        .execute(&mut **tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to insert payment record: {}", e))
        })?;

        let new_remaining = (debt_record.remaining_amount - alloc.amount).max(Decimal::ZERO);
        let new_status = if new_remaining == Decimal::ZERO {
            DebtStatus::Paid
        } else {
            DebtStatus::Partial
        };

        sqlx::query(
            "UPDATE debt_records SET remaining_amount = $2, status = $3 WHERE debt_record_id = $1",
        )
        .bind(debt_record.debt_record_id)
        .bind(new_remaining)
        .bind(new_status.as_str())
        .execute(&mut **tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to update debt record: {}", e))
        })?;

        sqlx::query(
            r#"
            UPDATE invoices
            SET paid_amount = $2,
                remaining_amount = $3,
                payment_status = $4
            WHERE invoice_id = $1
            "#,
        )
        .bind(alloc.invoice_id)
        .bind(alloc.new_paid_amount)
        .bind(alloc.new_remaining_amount)
        .bind(alloc.new_status.as_str())
        .execute(&mut **tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to update invoice: {}", e))
        })?;

        Ok(())
    }
}

/// Resolve the cash-book category: the caller's explicit choice, or the
/// default category for the movement direction.
async fn resolve_category(
    tx: &mut Transaction<'_, Postgres>,
    category_id: Option<Uuid>,
    direction: &str,
) -> Result<FinancialCategory, AppError> {
    let category = if let Some(id) = category_id {
        sqlx::query_as::<_, FinancialCategory>(
            r#"
            SELECT category_id, name, direction, is_default, created_utc
            FROM financial_categories
            WHERE category_id = $1 AND direction = $2
            "#,
        )
        .bind(id)
        .bind(direction)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get category: {}", e)))?
    } else {
        sqlx::query_as::<_, FinancialCategory>(
            r#"
            SELECT category_id, name, direction, is_default, created_utc
            FROM financial_categories
            WHERE direction = $1 AND is_default
            LIMIT 1
            "#,
        )
        .bind(direction)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to get default category: {}", e))
        })?
    };

    category.ok_or_else(|| {
        AppError::NotFound(anyhow::anyhow!(
            "No financial category for direction '{}'",
            direction
        ))
    })
}
