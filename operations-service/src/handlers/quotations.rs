//! Quotation lifecycle handlers.
//!
//! Monetary totals are recomputed on every persist; caller-supplied totals
//! are never trusted. Terminal states are `rejected` and `converted`.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use ops_core::{error::AppError, response::ApiResponse};
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{
        ConvertQuotationRequest, ConvertToInvoiceResponse, CreateQuotationRequest,
        InvoiceResponse, ListQuotationsQuery, QuotationResponse, RejectQuotationRequest,
        UpdateQuotationRequest,
    },
    handlers::invoices::convert_quotation_to_invoice,
    models::{compute_totals, LineItemInput, Quotation, QuotationStatus},
    services::{record_document, sequence::QUOTATION_PREFIX, LifecycleEvent},
    AppState,
};

pub async fn create_quotation(
    State(state): State<AppState>,
    Json(payload): Json<CreateQuotationRequest>,
) -> Result<(StatusCode, Json<ApiResponse<QuotationResponse>>), AppError> {
    payload.validate()?;

    let mut project = state
        .repository
        .find_project(payload.project_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Project not found")))?;

    let tax = payload.tax.unwrap_or(0.0);
    let discount = payload.discount.unwrap_or(0.0);
    let totals = compute_totals(&payload.items, tax, discount)
        .map_err(|e| AppError::BadRequest(anyhow::anyhow!(e)))?;

    let now = Utc::now();
    let quotation_number = state
        .repository
        .next_document_number(QUOTATION_PREFIX, now)
        .await?;

    let quotation = Quotation {
        id: Uuid::new_v4(),
        quotation_number,
        project_id: project.id,
        client_id: project.client_id,
        items: totals.items,
        subtotal: totals.subtotal,
        tax,
        discount,
        total_amount: totals.total_amount,
        status: QuotationStatus::Pending,
        valid_until: payload.valid_until,
        converted_to_invoice: None,
        notes: payload.notes,
        created_by: payload.created_by,
        created_utc: now,
        updated_utc: now,
    };

    tracing::info!(
        quotation_id = %quotation.id,
        quotation_number = %quotation.quotation_number,
        total_amount = quotation.total_amount,
        "Creating quotation"
    );

    state.repository.insert_quotation(&quotation).await?;

    // Forward pointer, set exactly once.
    if project.quotation_id.is_none() {
        project.quotation_id = Some(quotation.id);
        project.updated_utc = now;
        state.repository.save_project(&project).await?;
    }

    state.notifier.notify(LifecycleEvent::QuotationCreated {
        quotation_number: quotation.quotation_number.clone(),
        client_id: quotation.client_id,
        total_amount: quotation.total_amount,
    });
    record_document("quotation", "created");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(QuotationResponse::from(quotation))),
    ))
}

pub async fn list_quotations(
    State(state): State<AppState>,
    Query(query): Query<ListQuotationsQuery>,
) -> Result<Json<ApiResponse<Vec<QuotationResponse>>>, AppError> {
    let quotations = state
        .repository
        .list_quotations(query.status, query.client_id, query.limit, query.offset)
        .await?;

    Ok(Json(ApiResponse::ok(
        quotations.into_iter().map(QuotationResponse::from).collect(),
    )))
}

pub async fn get_quotation(
    State(state): State<AppState>,
    Path(quotation_id): Path<Uuid>,
) -> Result<Json<ApiResponse<QuotationResponse>>, AppError> {
    let quotation = find_quotation(&state, quotation_id).await?;
    Ok(Json(ApiResponse::ok(QuotationResponse::from(quotation))))
}

pub async fn update_quotation(
    State(state): State<AppState>,
    Path(quotation_id): Path<Uuid>,
    Json(payload): Json<UpdateQuotationRequest>,
) -> Result<Json<ApiResponse<QuotationResponse>>, AppError> {
    payload.validate()?;

    let mut quotation = find_quotation(&state, quotation_id).await?;
    if !quotation.is_editable() {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "An accepted or converted quotation can no longer be edited"
        )));
    }

    let items: Vec<LineItemInput> = match payload.items {
        Some(items) => items,
        None => quotation
            .items
            .iter()
            .map(|item| LineItemInput {
                description: item.description.clone(),
                quantity: item.quantity,
                unit_price: item.unit_price,
            })
            .collect(),
    };
    let tax = payload.tax.unwrap_or(quotation.tax);
    let discount = payload.discount.unwrap_or(quotation.discount);

    let totals = compute_totals(&items, tax, discount)
        .map_err(|e| AppError::BadRequest(anyhow::anyhow!(e)))?;

    quotation.items = totals.items;
    quotation.subtotal = totals.subtotal;
    quotation.tax = tax;
    quotation.discount = discount;
    quotation.total_amount = totals.total_amount;
    if let Some(valid_until) = payload.valid_until {
        quotation.valid_until = valid_until;
    }
    if let Some(notes) = payload.notes {
        quotation.notes = Some(notes);
    }
    quotation.updated_utc = Utc::now();

    state.repository.save_quotation(&quotation).await?;
    record_document("quotation", "updated");

    Ok(Json(ApiResponse::ok(QuotationResponse::from(quotation))))
}

pub async fn send_quotation(
    State(state): State<AppState>,
    Path(quotation_id): Path<Uuid>,
) -> Result<Json<ApiResponse<QuotationResponse>>, AppError> {
    let mut quotation = find_quotation(&state, quotation_id).await?;
    quotation
        .can_send()
        .map_err(|e| AppError::BadRequest(anyhow::anyhow!(e)))?;

    quotation.status = QuotationStatus::Sent;
    quotation.updated_utc = Utc::now();
    state.repository.save_quotation(&quotation).await?;

    state.notifier.notify(LifecycleEvent::QuotationSent {
        quotation_number: quotation.quotation_number.clone(),
        client_id: quotation.client_id,
    });
    record_document("quotation", "sent");

    Ok(Json(ApiResponse::with_message(
        "Quotation sent",
        QuotationResponse::from(quotation),
    )))
}

pub async fn accept_quotation(
    State(state): State<AppState>,
    Path(quotation_id): Path<Uuid>,
) -> Result<Json<ApiResponse<QuotationResponse>>, AppError> {
    let mut quotation = find_quotation(&state, quotation_id).await?;

    let now = Utc::now();
    quotation
        .can_accept(now)
        .map_err(|e| AppError::BadRequest(anyhow::anyhow!(e)))?;

    quotation.status = QuotationStatus::Accepted;
    quotation.updated_utc = now;
    state.repository.save_quotation(&quotation).await?;

    tracing::info!(
        quotation_number = %quotation.quotation_number,
        "Quotation accepted"
    );

    state.notifier.notify(LifecycleEvent::QuotationAccepted {
        quotation_number: quotation.quotation_number.clone(),
        client_id: quotation.client_id,
    });
    record_document("quotation", "accepted");

    Ok(Json(ApiResponse::with_message(
        "Quotation accepted",
        QuotationResponse::from(quotation),
    )))
}

pub async fn reject_quotation(
    State(state): State<AppState>,
    Path(quotation_id): Path<Uuid>,
    payload: Option<Json<RejectQuotationRequest>>,
) -> Result<Json<ApiResponse<QuotationResponse>>, AppError> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();

    let mut quotation = find_quotation(&state, quotation_id).await?;
    quotation
        .can_reject()
        .map_err(|e| AppError::BadRequest(anyhow::anyhow!(e)))?;

    quotation.status = QuotationStatus::Rejected;
    if let Some(reason) = &payload.reason {
        let note = format!("Rejected: {}", reason);
        quotation.notes = match quotation.notes.take() {
            Some(existing) => Some(format!("{}\n{}", existing, note)),
            None => Some(note),
        };
    }
    quotation.updated_utc = Utc::now();
    state.repository.save_quotation(&quotation).await?;

    state.notifier.notify(LifecycleEvent::QuotationRejected {
        quotation_number: quotation.quotation_number.clone(),
        client_id: quotation.client_id,
        reason: payload.reason,
    });
    record_document("quotation", "rejected");

    Ok(Json(ApiResponse::with_message(
        "Quotation rejected",
        QuotationResponse::from(quotation),
    )))
}

pub async fn convert_to_invoice(
    State(state): State<AppState>,
    Path(quotation_id): Path<Uuid>,
    payload: Option<Json<ConvertQuotationRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<ConvertToInvoiceResponse>>), AppError> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();

    let quotation = find_quotation(&state, quotation_id).await?;
    let (invoice, quotation) =
        convert_quotation_to_invoice(&state, quotation, payload.due_date).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "Quotation converted to invoice",
            ConvertToInvoiceResponse {
                invoice: InvoiceResponse::from(invoice),
                quotation: QuotationResponse::from(quotation),
            },
        )),
    ))
}

pub async fn delete_quotation(
    State(state): State<AppState>,
    Path(quotation_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let quotation = find_quotation(&state, quotation_id).await?;
    if !quotation.is_deletable() {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "A converted quotation cannot be deleted"
        )));
    }

    let deleted = state.repository.delete_quotation(quotation_id).await?;
    if !deleted {
        return Err(AppError::NotFound(anyhow::anyhow!("Quotation not found")));
    }
    record_document("quotation", "deleted");

    Ok(Json(ApiResponse::with_message(
        "Quotation deleted",
        json!({ "id": quotation_id }),
    )))
}

async fn find_quotation(state: &AppState, quotation_id: Uuid) -> Result<Quotation, AppError> {
    state
        .repository
        .find_quotation(quotation_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Quotation not found")))
}
