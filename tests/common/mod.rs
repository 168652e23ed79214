//! Common test utilities for settlement-service integration tests.
//!
//! Integration tests need a PostgreSQL instance reachable through
//! `TEST_DATABASE_URL`; without it they skip instead of failing, so the
//! unit test suite stays runnable anywhere.

#![allow(dead_code)]

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use settlement_service::config::{Config, DatabaseConfig, ServerConfig};
use settlement_service::models::{BankAccount, DebtRecord, Invoice, Partner, PaymentRecord};
use settlement_service::Application;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Once;
use uuid::Uuid;

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,settlement_service=debug,sqlx=warn")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub struct TestApp {
    pub address: String,
    pub pool: PgPool,
    pub client: reqwest::Client,
}

/// Spawn a test application. Returns `None` when `TEST_DATABASE_URL` is not
/// set, in which case the calling test should return early.
pub async fn spawn_app() -> Option<TestApp> {
    init_tracing();

    let database_url = match std::env::var("TEST_DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("TEST_DATABASE_URL not set; skipping integration test");
            return None;
        }
    };

    let config = Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        database: DatabaseConfig {
            url: database_url.clone(),
            max_connections: 2,
            min_connections: 1,
        },
        service_name: "settlement-service-test".to_string(),
    };

    let app = Application::build(config)
        .await
        .expect("Failed to build application");
    let address = format!("http://127.0.0.1:{}", app.port());

    tokio::spawn(async move {
        app.run_until_stopped().await.ok();
    });

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await
        .expect("Failed to connect test pool");

    ensure_default_categories(&pool).await;

    Some(TestApp {
        address,
        pool,
        client: reqwest::Client::new(),
    })
}

/// Seed one default financial category per direction if none exists yet.
async fn ensure_default_categories(pool: &PgPool) {
    for (direction, name) in [("in", "Debt collection"), ("out", "Supplier payment")] {
        sqlx::query(
            r#"
            INSERT INTO financial_categories (category_id, name, direction, is_default)
            SELECT $1, $2, $3, TRUE
            WHERE NOT EXISTS (
                SELECT 1 FROM financial_categories WHERE direction = $3 AND is_default
            )
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(direction)
        .execute(pool)
        .await
        .expect("Failed to seed default category");
    }
}

/// Insert a partner with the given type and cached debt amount.
pub async fn create_partner(pool: &PgPool, partner_type: &str, debt_amount: i64) -> Partner {
    let partner_id = Uuid::new_v4();
    let code = format!("P{}", &partner_id.simple().to_string()[..10]);

    sqlx::query_as::<_, Partner>(
        r#"
        INSERT INTO partners (partner_id, code, name, partner_type, debt_amount)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING partner_id, code, name, partner_type, debt_amount, created_utc
        "#,
    )
    .bind(partner_id)
    .bind(&code)
    .bind(format!("Test partner {}", code))
    .bind(partner_type)
    .bind(Decimal::from(debt_amount))
    .fetch_one(pool)
    .await
    .expect("Failed to create partner")
}

/// Insert an invoice. `age_minutes` pushes `created_utc` into the past so
/// tests control FIFO order explicitly.
pub async fn create_invoice(
    pool: &PgPool,
    partner: &Partner,
    total: i64,
    paid: i64,
    age_minutes: i64,
) -> Invoice {
    let invoice_id = Uuid::new_v4();
    let code = format!("HD{}", &invoice_id.simple().to_string()[..10]);
    let status = if paid == 0 {
        "unpaid"
    } else if paid < total {
        "partial"
    } else {
        "paid"
    };

    sqlx::query_as::<_, Invoice>(
        r#"
        INSERT INTO invoices (invoice_id, code, partner_id, partner_type, total_amount,
            paid_amount, remaining_amount, payment_status, created_utc)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING invoice_id, code, partner_id, partner_type, total_amount, paid_amount,
            remaining_amount, payment_status, cancelled_utc, created_utc
        "#,
    )
    .bind(invoice_id)
    .bind(&code)
    .bind(partner.partner_id)
    .bind(&partner.partner_type)
    .bind(Decimal::from(total))
    .bind(Decimal::from(paid))
    .bind(Decimal::from(total - paid))
    .bind(status)
    .bind(Utc::now() - Duration::minutes(age_minutes))
    .fetch_one(pool)
    .await
    .expect("Failed to create invoice")
}

/// Insert a bank account with an opening balance.
pub async fn create_bank_account(pool: &PgPool, balance: i64) -> BankAccount {
    let bank_account_id = Uuid::new_v4();

    sqlx::query_as::<_, BankAccount>(
        r#"
        INSERT INTO bank_accounts (bank_account_id, name, balance)
        VALUES ($1, $2, $3)
        RETURNING bank_account_id, name, balance, created_utc
        "#,
    )
    .bind(bank_account_id)
    .bind(format!("Test account {}", bank_account_id.simple()))
    .bind(Decimal::from(balance))
    .fetch_one(pool)
    .await
    .expect("Failed to create bank account")
}

pub async fn fetch_invoice(pool: &PgPool, invoice_id: Uuid) -> Invoice {
    sqlx::query_as::<_, Invoice>(
        r#"
        SELECT invoice_id, code, partner_id, partner_type, total_amount, paid_amount,
            remaining_amount, payment_status, cancelled_utc, created_utc
        FROM invoices
        WHERE invoice_id = $1
        "#,
    )
    .bind(invoice_id)
    .fetch_one(pool)
    .await
    .expect("Failed to fetch invoice")
}

pub async fn fetch_partner(pool: &PgPool, partner_id: Uuid) -> Partner {
    sqlx::query_as::<_, Partner>(
        r#"
        SELECT partner_id, code, name, partner_type, debt_amount, created_utc
        FROM partners
        WHERE partner_id = $1
        "#,
    )
    .bind(partner_id)
    .fetch_one(pool)
    .await
    .expect("Failed to fetch partner")
}

pub async fn fetch_bank_account(pool: &PgPool, bank_account_id: Uuid) -> BankAccount {
    sqlx::query_as::<_, BankAccount>(
        r#"
        SELECT bank_account_id, name, balance, created_utc
        FROM bank_accounts
        WHERE bank_account_id = $1
        "#,
    )
    .bind(bank_account_id)
    .fetch_one(pool)
    .await
    .expect("Failed to fetch bank account")
}

pub async fn fetch_debt_record(pool: &PgPool, invoice_id: Uuid) -> Option<DebtRecord> {
    sqlx::query_as::<_, DebtRecord>(
        r#"
        SELECT debt_record_id, code, partner_id, debt_type, original_amount,
            remaining_amount, reference_id, reference_type, status, created_utc
        FROM debt_records
        WHERE reference_id = $1 AND reference_type = 'invoice'
        "#,
    )
    .bind(invoice_id)
    .fetch_optional(pool)
    .await
    .expect("Failed to fetch debt record")
}

pub async fn fetch_payment_records(pool: &PgPool, debt_record_id: Uuid) -> Vec<PaymentRecord> {
    sqlx::query_as::<_, PaymentRecord>(
        r#"
        SELECT payment_record_id, debt_record_id, amount, payment_date, method,
            bank_account_id, notes, actor_id, created_utc
        FROM payment_records
        WHERE debt_record_id = $1
        ORDER BY created_utc
        "#,
    )
    .bind(debt_record_id)
    .fetch_all(pool)
    .await
    .expect("Failed to fetch payment records")
}

/// Count cash-book entries referencing a bank account.
pub async fn count_cash_entries(pool: &PgPool, bank_account_id: Uuid) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM cash_ledger WHERE bank_account_id = $1")
        .bind(bank_account_id)
        .fetch_one(pool)
        .await
        .expect("Failed to count cash entries")
}

/// Build the default settlement request body.
pub fn settlement_body(
    amount: &str,
    bank_account_id: Uuid,
    partner_type: &str,
) -> serde_json::Value {
    serde_json::json!({
        "payment_amount": amount,
        "payment_date": "2026-01-15",
        "bank_account_id": bank_account_id,
        "partner_type": partner_type,
    })
}
