//! Settlement handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{OutstandingQuery, SettleDebtRequest, SettlementResponse},
    error::AppError,
    middleware::ActorContext,
    models::Invoice,
    AppState,
};

/// Settle a payment against a partner's outstanding invoices.
pub async fn settle_partner_debt(
    State(state): State<AppState>,
    actor: ActorContext,
    Path(partner_id): Path<Uuid>,
    Json(payload): Json<SettleDebtRequest>,
) -> Result<(StatusCode, Json<SettlementResponse>), AppError> {
    payload.validate()?;

    tracing::info!(
        partner_id = %partner_id,
        payment_amount = %payload.payment_amount,
        partner_type = ?payload.partner_type,
        invoice_id = ?payload.invoice_id,
        "Settling partner debt"
    );

    let (settlement, lines) = state.db.settle_debt(partner_id, &payload, &actor).await?;

    Ok((
        StatusCode::CREATED,
        Json(SettlementResponse::from((settlement, lines))),
    ))
}

/// Re-read a completed settlement by ID (used by the receipt renderer).
pub async fn get_settlement(
    State(state): State<AppState>,
    Path(settlement_id): Path<Uuid>,
) -> Result<Json<SettlementResponse>, AppError> {
    let (settlement, lines) = state
        .db
        .get_settlement(settlement_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Settlement not found")))?;

    Ok(Json(SettlementResponse::from((settlement, lines))))
}

/// List a partner's outstanding invoices, oldest first (the same selection
/// the settlement engine will allocate against).
pub async fn list_outstanding_invoices(
    State(state): State<AppState>,
    Path(partner_id): Path<Uuid>,
    Query(query): Query<OutstandingQuery>,
) -> Result<Json<Vec<Invoice>>, AppError> {
    state
        .db
        .get_partner(partner_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Partner not found")))?;

    let invoices = state
        .db
        .outstanding_invoices(partner_id, query.partner_type, query.invoice_id)
        .await?;

    Ok(Json(invoices))
}
