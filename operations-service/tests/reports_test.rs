mod common;

use chrono::{Duration, Utc};
use common::TestApp;
use serde_json::{json, Value};

fn standard_items() -> Value {
    json!([{ "description": "A", "quantity": 2.0, "unit_price": 100.0 }])
}

#[tokio::test]
#[ignore = "requires a running MongoDB"]
async fn invoice_stats_reflect_lifecycle_changes() {
    let app = TestApp::spawn().await;

    let paid = app.create_invoice(&standard_items()).await;
    let paid_id = paid["id"].as_str().unwrap();
    let response = app
        .patch(&format!("/invoices/{}/mark-paid", paid_id), &json!({}))
        .await;
    assert_eq!(response.status(), 200);

    let open = app.create_invoice(&standard_items()).await;
    let open_id = open["id"].as_str().unwrap();
    let response = app
        .post(
            "/payments",
            &json!({ "invoice_id": open_id, "amount": 100.0, "payment_method": "card" }),
        )
        .await;
    assert_eq!(response.status(), 201);

    let response = app.get("/invoices/stats").await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    let stats = &body["data"];

    assert_eq!(stats["total_invoices"], 2);
    assert_eq!(stats["paid"], 1);
    assert_eq!(stats["partially_paid"], 1);
    assert_eq!(stats["total_billed"], 410.0);
    assert_eq!(stats["total_paid"], 305.0);
    assert_eq!(stats["total_outstanding"], 105.0);

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires a running MongoDB"]
async fn dashboard_summary_combines_both_collections() {
    let app = TestApp::spawn().await;

    let _quotation = app.create_quotation(Utc::now() + Duration::days(14)).await;

    let invoice = app.create_invoice(&standard_items()).await;
    let invoice_id = invoice["id"].as_str().unwrap();
    let response = app
        .patch(&format!("/invoices/{}/mark-paid", invoice_id), &json!({}))
        .await;
    assert_eq!(response.status(), 200);

    let response = app.get("/dashboard/summary").await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    let summary = &body["data"];

    assert_eq!(summary["quotations"]["total_quotations"], 1);
    assert_eq!(summary["quotations"]["pending"], 1);
    assert_eq!(summary["quotations"]["total_quoted"], 205.0);
    assert_eq!(summary["invoices"]["total_invoices"], 1);
    assert_eq!(summary["total_revenue"], 205.0);
    assert_eq!(summary["outstanding_balance"], 0.0);

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires a running MongoDB"]
async fn lifecycle_events_land_in_the_notification_log() {
    let app = TestApp::spawn().await;

    let quotation = app.create_quotation(Utc::now() + Duration::days(14)).await;
    let id = quotation["id"].as_str().unwrap();
    let response = app
        .patch(&format!("/quotations/{}/send", id), &json!({}))
        .await;
    assert_eq!(response.status(), 200);

    // Delivery is asynchronous and best-effort; poll briefly.
    let mut kinds: Vec<String> = vec![];
    for _ in 0..20 {
        let response = app.get("/notifications").await;
        assert_eq!(response.status(), 200);
        let body: Value = response.json().await.unwrap();
        kinds = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|n| n["kind"].as_str().unwrap().to_string())
            .collect();
        if kinds.len() >= 2 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    }

    assert!(kinds.iter().any(|k| k == "quotation.created"));
    assert!(kinds.iter().any(|k| k == "quotation.sent"));

    app.cleanup().await;
}
