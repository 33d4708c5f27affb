mod common;

use chrono::{Duration, Utc};
use common::TestApp;
use serde_json::{json, Value};

fn standard_items() -> Value {
    json!([{ "description": "A", "quantity": 2.0, "unit_price": 100.0 }])
}

#[tokio::test]
#[ignore = "requires a running MongoDB"]
async fn standalone_invoice_requires_client_and_items() {
    let app = TestApp::spawn().await;

    let response = app.post("/invoices", &json!({ "tax": 10.0 })).await;
    assert_eq!(response.status(), 400);

    let response = app
        .post("/invoices", &json!({ "client_id": uuid::Uuid::new_v4() }))
        .await;
    assert_eq!(response.status(), 400);

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires a running MongoDB"]
async fn mark_paid_settles_balance_and_records_a_payment() {
    let app = TestApp::spawn().await;

    let invoice = app.create_invoice(&standard_items()).await;
    let id = invoice["id"].as_str().unwrap();
    assert_eq!(invoice["total_amount"], 205.0);

    let response = app
        .patch(
            &format!("/invoices/{}/mark-paid", id),
            &json!({ "payment_method": "bank_transfer" }),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["status"], "paid");
    assert_eq!(body["data"]["paid_amount"], 205.0);
    assert!(body["data"]["paid_date"].is_string());

    // The settlement shows up as a payment record.
    let response = app.get(&format!("/invoices/{}/payments", id)).await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    let payments = body["data"].as_array().unwrap();
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0]["amount"], 205.0);
    assert_eq!(payments[0]["payment_method"], "bank_transfer");
    assert_eq!(payments[0]["status"], "completed");

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires a running MongoDB"]
async fn zero_total_invoice_settles_without_a_payment_record() {
    let app = TestApp::spawn().await;

    // Discount equal to subtotal plus tax is allowed and yields a zero total.
    let response = app
        .post(
            "/invoices",
            &json!({
                "client_id": uuid::Uuid::new_v4(),
                "items": [{ "description": "A", "quantity": 1.0, "unit_price": 10.0 }],
                "tax": 2.0,
                "discount": 12.0,
            }),
        )
        .await;
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["total_amount"], 0.0);
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let response = app
        .patch(&format!("/invoices/{}/mark-paid", id), &json!({}))
        .await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["status"], "paid");
    assert!(body["data"]["paid_date"].is_string());

    // Settling again is rejected, and no zero-amount payment was written.
    let response = app
        .patch(&format!("/invoices/{}/mark-paid", id), &json!({}))
        .await;
    assert_eq!(response.status(), 400);

    let response = app.get(&format!("/invoices/{}/payments", id)).await;
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 0);

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires a running MongoDB"]
async fn mark_paid_twice_is_rejected() {
    let app = TestApp::spawn().await;

    let invoice = app.create_invoice(&standard_items()).await;
    let id = invoice["id"].as_str().unwrap();

    let response = app
        .patch(&format!("/invoices/{}/mark-paid", id), &json!({}))
        .await;
    assert_eq!(response.status(), 200);

    let response = app
        .patch(&format!("/invoices/{}/mark-paid", id), &json!({}))
        .await;
    assert_eq!(response.status(), 400);

    // No second payment record was written.
    let response = app.get(&format!("/invoices/{}/payments", id)).await;
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires a running MongoDB"]
async fn send_is_idempotent() {
    let app = TestApp::spawn().await;

    let invoice = app.create_invoice(&standard_items()).await;
    let id = invoice["id"].as_str().unwrap();

    let response = app.patch(&format!("/invoices/{}/send", id), &json!({})).await;
    assert_eq!(response.status(), 200);

    let response = app.patch(&format!("/invoices/{}/send", id), &json!({})).await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["status"], "sent");
    assert_eq!(body["message"], "Invoice already sent");

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires a running MongoDB"]
async fn paid_invoice_cannot_be_cancelled_or_edited() {
    let app = TestApp::spawn().await;

    let invoice = app.create_invoice(&standard_items()).await;
    let id = invoice["id"].as_str().unwrap();

    let response = app
        .patch(&format!("/invoices/{}/mark-paid", id), &json!({}))
        .await;
    assert_eq!(response.status(), 200);

    let response = app
        .patch(&format!("/invoices/{}/cancel", id), &json!({}))
        .await;
    assert_eq!(response.status(), 400);

    let response = app
        .patch(
            &format!("/invoices/{}", id),
            &json!({ "notes": "too late" }),
        )
        .await;
    assert_eq!(response.status(), 400);

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires a running MongoDB"]
async fn invoice_with_payments_cannot_be_deleted() {
    let app = TestApp::spawn().await;

    let invoice = app.create_invoice(&standard_items()).await;
    let id = invoice["id"].as_str().unwrap();

    let response = app
        .post(
            "/payments",
            &json!({
                "invoice_id": id,
                "amount": 50.0,
                "payment_method": "card",
            }),
        )
        .await;
    assert_eq!(response.status(), 201);

    let response = app.delete(&format!("/invoices/{}", id)).await;
    assert_eq!(response.status(), 400);

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires a running MongoDB"]
async fn delete_then_delete_again_returns_404() {
    let app = TestApp::spawn().await;

    let invoice = app.create_invoice(&standard_items()).await;
    let id = invoice["id"].as_str().unwrap();

    let response = app.delete(&format!("/invoices/{}", id)).await;
    assert_eq!(response.status(), 200);

    let response = app.delete(&format!("/invoices/{}", id)).await;
    assert_eq!(response.status(), 404);

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires a running MongoDB"]
async fn overdue_listing_includes_past_due_unpaid_invoices() {
    let app = TestApp::spawn().await;

    let response = app
        .post(
            "/invoices",
            &json!({
                "client_id": uuid::Uuid::new_v4(),
                "items": standard_items(),
                "due_date": Utc::now() - Duration::days(3),
            }),
        )
        .await;
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.unwrap();
    let past_due_id = body["data"]["id"].as_str().unwrap().to_string();

    // A paid invoice never shows up, even past its due date.
    let paid = app.create_invoice(&standard_items()).await;
    let paid_id = paid["id"].as_str().unwrap();
    let response = app
        .patch(&format!("/invoices/{}/mark-paid", paid_id), &json!({}))
        .await;
    assert_eq!(response.status(), 200);

    let response = app.get("/invoices/overdue").await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    let ids: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|inv| inv["id"].as_str().unwrap())
        .collect();
    assert!(ids.contains(&past_due_id.as_str()));
    assert!(!ids.contains(&paid_id));

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires a running MongoDB"]
async fn create_from_quotation_marks_it_converted() {
    let app = TestApp::spawn().await;

    let quotation = app.create_accepted_quotation().await;
    let quotation_id = quotation["id"].as_str().unwrap();

    let response = app
        .post("/invoices", &json!({ "quotation_id": quotation_id }))
        .await;
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["quotation_id"], quotation["id"]);
    assert_eq!(body["data"]["total_amount"], quotation["total_amount"]);

    let response = app.get(&format!("/quotations/{}", quotation_id)).await;
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["status"], "converted");

    // The pointer is one-way and final: a second derivation fails.
    let response = app
        .post("/invoices", &json!({ "quotation_id": quotation_id }))
        .await;
    assert_eq!(response.status(), 400);

    app.cleanup().await;
}
