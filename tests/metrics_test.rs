//! Metrics endpoint tests for settlement-service.

mod common;

#[tokio::test]
async fn http_requests_are_counted_per_route_and_status() {
    let Some(app) = common::spawn_app().await else {
        return;
    };

    app.client
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("Failed to call health endpoint");

    let body = app
        .client
        .get(format!("{}/metrics", app.address))
        .send()
        .await
        .expect("Failed to fetch metrics")
        .text()
        .await
        .expect("Invalid metrics body");

    assert!(body.contains("settlement_http_requests_total"));
    // Prometheus renders label pairs sorted by name.
    assert!(body.contains(r#"route="/health",status="200""#));
}
