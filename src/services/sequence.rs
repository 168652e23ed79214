//! Per-day sequential document codes.
//!
//! Debt records and cash-book entries carry codes like `CN2601150001`:
//! a fixed prefix, the date as yymmdd, and a four-digit per-day counter.
//! The counter row is claimed with an upsert on the caller's open
//! transaction, so concurrent settlements cannot produce colliding codes.

use chrono::NaiveDate;
use sqlx::PgConnection;

use crate::error::AppError;

/// Code prefix for debt records.
pub const DEBT_RECORD_PREFIX: &str = "CN";
/// Code prefix for cash-book entries.
pub const CASH_LEDGER_PREFIX: &str = "PT";

/// Render a daily code from its parts.
pub fn format_daily_code(prefix: &str, date: NaiveDate, counter: i64) -> String {
    format!("{}{}{:04}", prefix, date.format("%y%m%d"), counter)
}

/// Claim the next counter for `(prefix, date)` and render the code.
///
/// Must be called on an open transaction; the claimed counter is only
/// visible to others once that transaction commits.
pub async fn next_daily_code(
    conn: &mut PgConnection,
    prefix: &str,
    date: NaiveDate,
) -> Result<String, AppError> {
    let counter: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO daily_sequences (prefix, seq_date, counter)
        VALUES ($1, $2, 1)
        ON CONFLICT (prefix, seq_date)
        DO UPDATE SET counter = daily_sequences.counter + 1
        RETURNING counter
        "#,
    )
    .bind(prefix)
    .bind(date)
    .fetch_one(conn)
    .await
    .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to claim sequence: {}", e)))?;

    Ok(format_daily_code(prefix, date, counter))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_render_with_zero_padded_counter() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        assert_eq!(format_daily_code("CN", date, 1), "CN2501010001");
        assert_eq!(format_daily_code("PT", date, 42), "PT2501010042");
        assert_eq!(format_daily_code("CN", date, 9999), "CN2501019999");
    }

    #[test]
    fn counter_beyond_padding_still_renders() {
        let date = NaiveDate::from_ymd_opt(2026, 12, 31).unwrap();
        assert_eq!(format_daily_code("CN", date, 10000), "CN26123110000");
    }
}
