//! Database service for settlement-service.

use crate::error::AppError;
use crate::models::{Invoice, Partner, PartnerType, Settlement, SettlementLine};
use crate::services::metrics::DB_QUERY_DURATION;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "settlement-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check database health.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Partner and Account Lookups
    // -------------------------------------------------------------------------

    /// Get a partner by ID.
    #[instrument(skip(self), fields(partner_id = %partner_id))]
    pub async fn get_partner(&self, partner_id: Uuid) -> Result<Option<Partner>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_partner"])
            .start_timer();

        let partner = sqlx::query_as::<_, Partner>(
            r#"
            SELECT partner_id, code, name, partner_type, debt_amount, created_utc
            FROM partners
            WHERE partner_id = $1
            "#,
        )
        .bind(partner_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get partner: {}", e)))?;

        timer.observe_duration();

        Ok(partner)
    }

    // -------------------------------------------------------------------------
    // Outstanding Invoice Selection
    // -------------------------------------------------------------------------

    /// List a partner's non-cancelled invoices with an outstanding balance,
    /// oldest first. An optional invoice ID restricts the selection to that
    /// single invoice (detail-view settlement).
    #[instrument(skip(self), fields(partner_id = %partner_id))]
    pub async fn outstanding_invoices(
        &self,
        partner_id: Uuid,
        partner_type: PartnerType,
        invoice_id: Option<Uuid>,
    ) -> Result<Vec<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["outstanding_invoices"])
            .start_timer();

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
            "#,
        )
        .bind(partner_id)
        .bind(partner_type.as_str())
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to list outstanding invoices: {}", e))
        })?;

        timer.observe_duration();

        Ok(invoices)
    }

    // -------------------------------------------------------------------------
    // Settlement Read-back
    // -------------------------------------------------------------------------

    /// Get a completed settlement with its per-invoice breakdown.
    #[instrument(skip(self), fields(settlement_id = %settlement_id))]
    pub async fn get_settlement(
        &self,
        settlement_id: Uuid,
    ) -> Result<Option<(Settlement, Vec<SettlementLine>)>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_settlement"])
            .start_timer();

        let settlement = sqlx::query_as::<_, Settlement>(
            r#"
            SELECT settlement_id, partner_id, partner_type, payment_amount, total_allocated,
                unallocated_amount, invoice_count, bank_account_id, payment_date, notes,
                actor_id, created_utc
            FROM settlements
            WHERE settlement_id = $1
            "#,
        )
        .bind(settlement_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to get settlement: {}", e))
        })?;

        let settlement = match settlement {
            Some(s) => s,
            None => {
                timer.observe_duration();
                return Ok(None);
            }
        };

        let lines = sqlx::query_as::<_, SettlementLine>(
            r#"
            SELECT line_id, settlement_id, invoice_id, invoice_code, amount_applied,
                new_paid_amount, new_remaining_amount, new_status, created_utc
            FROM settlement_lines
            WHERE settlement_id = $1
            ORDER BY created_utc, line_id
            "#,
        )
        .bind(settlement_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to get settlement lines: {}", e))
        })?;

        timer.observe_duration();

        Ok(Some((settlement, lines)))
    }
}
