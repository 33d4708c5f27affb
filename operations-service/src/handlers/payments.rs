//! Payment recording.
//!
//! Recording a payment and applying it to the invoice balance is one
//! operation: the payment insert is followed by the invoice save in the
//! same handler, so callers never observe a recorded payment with a stale
//! balance for longer than the gap between the two writes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use ops_core::{error::AppError, response::ApiResponse};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{CreatePaymentRequest, ListPaymentsQuery, PaymentResponse},
    models::Payment,
    services::{record_document, record_revenue, LifecycleEvent},
    AppState,
};

pub async fn create_payment(
    State(state): State<AppState>,
    Json(payload): Json<CreatePaymentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PaymentResponse>>), AppError> {
    payload.validate()?;

    let mut invoice = state
        .repository
        .find_invoice(payload.invoice_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice not found")))?;

    let now = Utc::now();
    invoice
        .register_payment(payload.amount, now)
        .map_err(|e| AppError::BadRequest(anyhow::anyhow!(e)))?;

    let payment = Payment::new(
        invoice.id,
        invoice.client_id,
        payload.amount,
        payload.payment_method.clone(),
        payload.transaction_id,
        payload.notes,
        now,
    );

    tracing::info!(
        payment_id = %payment.id,
        invoice_number = %invoice.invoice_number,
        amount = payload.amount,
        "Recording payment"
    );

    // Payment first so the invoice delete-guard sees it even if the
    // balance write below fails.
    state.repository.insert_payment(&payment).await?;
    state.repository.save_invoice(&invoice).await?;

    state.notifier.notify(LifecycleEvent::PaymentRecorded {
        invoice_number: invoice.invoice_number.clone(),
        client_id: invoice.client_id,
        amount: payload.amount,
    });
    if invoice.is_paid() {
        state.notifier.notify(LifecycleEvent::InvoicePaid {
            invoice_number: invoice.invoice_number.clone(),
            client_id: invoice.client_id,
            amount: payload.amount,
        });
    }
    record_document("payment", "created");
    record_revenue(&payload.payment_method, payload.amount);

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(PaymentResponse::from(payment))),
    ))
}

pub async fn list_payments(
    State(state): State<AppState>,
    Query(query): Query<ListPaymentsQuery>,
) -> Result<Json<ApiResponse<Vec<PaymentResponse>>>, AppError> {
    let payments = state
        .repository
        .list_payments(query.invoice_id, query.limit, query.offset)
        .await?;

    Ok(Json(ApiResponse::ok(
        payments.into_iter().map(PaymentResponse::from).collect(),
    )))
}

pub async fn get_payment(
    State(state): State<AppState>,
    Path(payment_id): Path<Uuid>,
) -> Result<Json<ApiResponse<PaymentResponse>>, AppError> {
    let payment = state
        .repository
        .find_payment(payment_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Payment not found")))?;

    Ok(Json(ApiResponse::ok(PaymentResponse::from(payment))))
}
