//! Outstanding-invoice listing tests for settlement-service.

mod common;

use common::{create_bank_account, create_invoice, create_partner, settlement_body};
use settlement_service::models::Invoice;

#[tokio::test]
async fn outstanding_invoices_are_listed_oldest_first() {
    let Some(app) = common::spawn_app().await else {
        return;
    };

    let partner = create_partner(&app.pool, "customer", 0).await;
    let oldest = create_invoice(&app.pool, &partner, 100, 0, 30).await;
    let middle = create_invoice(&app.pool, &partner, 200, 50, 20).await;
    // Fully paid: must not appear.
    create_invoice(&app.pool, &partner, 300, 300, 10).await;

    let invoices: Vec<Invoice> = app
        .client
        .get(format!(
            "{}/partners/{}/invoices/outstanding?partner_type=customer",
            app.address, partner.partner_id
        ))
        .send()
        .await
        .expect("Failed to list invoices")
        .json()
        .await
        .expect("Invalid response body");

    assert_eq!(invoices.len(), 2);
    assert_eq!(invoices[0].invoice_id, oldest.invoice_id);
    assert_eq!(invoices[1].invoice_id, middle.invoice_id);
}

#[tokio::test]
async fn listing_for_unknown_partner_returns_not_found() {
    let Some(app) = common::spawn_app().await else {
        return;
    };

    let response = app
        .client
        .get(format!(
            "{}/partners/{}/invoices/outstanding?partner_type=customer",
            app.address,
            uuid::Uuid::new_v4()
        ))
        .send()
        .await
        .expect("Failed to list invoices");

    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn settled_invoice_disappears_from_outstanding_list() {
    let Some(app) = common::spawn_app().await else {
        return;
    };

    let partner = create_partner(&app.pool, "customer", 100).await;
    create_invoice(&app.pool, &partner, 100, 0, 5).await;
    let account = create_bank_account(&app.pool, 0).await;

    app.client
        .post(format!(
            "{}/partners/{}/settlements",
            app.address, partner.partner_id
        ))
        .json(&settlement_body("100", account.bank_account_id, "customer"))
        .send()
        .await
        .expect("Failed to send settlement");

    let invoices: Vec<Invoice> = app
        .client
        .get(format!(
            "{}/partners/{}/invoices/outstanding?partner_type=customer",
            app.address, partner.partner_id
        ))
        .send()
        .await
        .expect("Failed to list invoices")
        .json()
        .await
        .expect("Invalid response body");

    assert!(invoices.is_empty());
}
