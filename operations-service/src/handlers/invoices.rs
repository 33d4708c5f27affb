//! Invoice lifecycle handlers.
//!
//! Status is derived from `(paid_amount, total_amount, due_date, now)` at
//! the end of every mutation that touches the balance; the explicit
//! `sent`/`cancelled`/`overdue` transitions are caller-driven.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Duration, Utc};
use ops_core::{error::AppError, response::ApiResponse};
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{
        CreateInvoiceRequest, InvoiceResponse, ListInvoicesQuery, MarkPaidRequest,
        PaymentResponse, StatsQuery, UpdateInvoiceRequest,
    },
    models::{
        compute_totals, Invoice, InvoiceStatus, LineItemInput, Payment, Quotation,
        QuotationStatus,
    },
    services::{
        record_document, record_revenue, sequence::INVOICE_PREFIX, summarize_invoices,
        InvoiceStats, LifecycleEvent,
    },
    AppState,
};

/// Default payment horizon when the caller does not supply a due date.
const DEFAULT_DUE_DAYS: i64 = 30;

/// Convert an accepted quotation into an invoice.
///
/// Items, tax and discount are a structural snapshot of the quotation at
/// conversion time; no re-pricing happens. The three writes (invoice,
/// quotation, project) are sequential and non-transactional: the invoice
/// is inserted first so a partial failure leaves the quotation
/// unconverted rather than pointing at nothing.
pub(crate) async fn convert_quotation_to_invoice(
    state: &AppState,
    mut quotation: Quotation,
    due_date: Option<DateTime<Utc>>,
) -> Result<(Invoice, Quotation), AppError> {
    quotation
        .can_convert()
        .map_err(|e| AppError::BadRequest(anyhow::anyhow!(e)))?;
    if quotation.items.is_empty() {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Quotation has no line items"
        )));
    }

    let now = Utc::now();
    let invoice_number = state
        .repository
        .next_document_number(INVOICE_PREFIX, now)
        .await?;

    let project = state.repository.find_project(quotation.project_id).await?;
    let project_title = project.as_ref().map(|p| p.title.clone());

    let invoice = Invoice {
        id: Uuid::new_v4(),
        invoice_number,
        client_id: quotation.client_id,
        quotation_id: Some(quotation.id),
        project_title,
        items: quotation.items.clone(),
        subtotal: quotation.subtotal,
        tax: quotation.tax,
        discount: quotation.discount,
        total_amount: quotation.total_amount,
        paid_amount: 0.0,
        status: InvoiceStatus::Draft,
        due_date: due_date.unwrap_or(now + Duration::days(DEFAULT_DUE_DAYS)),
        paid_date: None,
        notes: quotation.notes.clone(),
        created_by: quotation.created_by.clone(),
        created_utc: now,
        updated_utc: now,
    };

    state.repository.insert_invoice(&invoice).await?;

    quotation.status = QuotationStatus::Converted;
    quotation.converted_to_invoice = Some(invoice.id);
    quotation.updated_utc = now;
    state.repository.save_quotation(&quotation).await?;

    if let Some(mut project) = project {
        if project.invoice_id.is_none() {
            project.invoice_id = Some(invoice.id);
            project.updated_utc = now;
            state.repository.save_project(&project).await?;
        }
    }

    tracing::info!(
        quotation_number = %quotation.quotation_number,
        invoice_number = %invoice.invoice_number,
        "Quotation converted to invoice"
    );

    state.notifier.notify(LifecycleEvent::QuotationConverted {
        quotation_number: quotation.quotation_number.clone(),
        invoice_number: invoice.invoice_number.clone(),
        client_id: quotation.client_id,
    });
    record_document("quotation", "converted");
    record_document("invoice", "created");

    Ok((invoice, quotation))
}

pub async fn create_invoice(
    State(state): State<AppState>,
    Json(payload): Json<CreateInvoiceRequest>,
) -> Result<(StatusCode, Json<ApiResponse<InvoiceResponse>>), AppError> {
    payload.validate()?;

    // Derived creation: everything comes from the accepted quotation.
    if let Some(quotation_id) = payload.quotation_id {
        let quotation = state
            .repository
            .find_quotation(quotation_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Quotation not found")))?;

        let (invoice, _) =
            convert_quotation_to_invoice(&state, quotation, payload.due_date).await?;
        return Ok((
            StatusCode::CREATED,
            Json(ApiResponse::ok(InvoiceResponse::from(invoice))),
        ));
    }

    // Standalone creation.
    let client_id = payload.client_id.ok_or_else(|| {
        AppError::BadRequest(anyhow::anyhow!(
            "client_id is required when no quotation is given"
        ))
    })?;
    let items = payload.items.unwrap_or_default();
    if items.is_empty() {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "At least one line item is required"
        )));
    }

    let tax = payload.tax.unwrap_or(0.0);
    let discount = payload.discount.unwrap_or(0.0);
    let totals = compute_totals(&items, tax, discount)
        .map_err(|e| AppError::BadRequest(anyhow::anyhow!(e)))?;

    let now = Utc::now();
    let invoice_number = state
        .repository
        .next_document_number(INVOICE_PREFIX, now)
        .await?;

    let invoice = Invoice {
        id: Uuid::new_v4(),
        invoice_number,
        client_id,
        quotation_id: None,
        project_title: payload.project_title,
        items: totals.items,
        subtotal: totals.subtotal,
        tax,
        discount,
        total_amount: totals.total_amount,
        paid_amount: 0.0,
        status: InvoiceStatus::Draft,
        due_date: payload
            .due_date
            .unwrap_or(now + Duration::days(DEFAULT_DUE_DAYS)),
        paid_date: None,
        notes: payload.notes,
        created_by: payload.created_by,
        created_utc: now,
        updated_utc: now,
    };

    tracing::info!(
        invoice_id = %invoice.id,
        invoice_number = %invoice.invoice_number,
        total_amount = invoice.total_amount,
        "Creating invoice"
    );

    state.repository.insert_invoice(&invoice).await?;

    state.notifier.notify(LifecycleEvent::InvoiceCreated {
        invoice_number: invoice.invoice_number.clone(),
        client_id: invoice.client_id,
        total_amount: invoice.total_amount,
    });
    record_document("invoice", "created");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(InvoiceResponse::from(invoice))),
    ))
}

pub async fn list_invoices(
    State(state): State<AppState>,
    Query(query): Query<ListInvoicesQuery>,
) -> Result<Json<ApiResponse<Vec<InvoiceResponse>>>, AppError> {
    let invoices = state
        .repository
        .list_invoices(query.status, query.client_id, query.limit, query.offset)
        .await?;

    Ok(Json(ApiResponse::ok(
        invoices.into_iter().map(InvoiceResponse::from).collect(),
    )))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<ApiResponse<InvoiceResponse>>, AppError> {
    let invoice = find_invoice(&state, invoice_id).await?;
    Ok(Json(ApiResponse::ok(InvoiceResponse::from(invoice))))
}

pub async fn update_invoice(
    State(state): State<AppState>,
    Path(invoice_id): Path<Uuid>,
    Json(payload): Json<UpdateInvoiceRequest>,
) -> Result<Json<ApiResponse<InvoiceResponse>>, AppError> {
    payload.validate()?;

    let mut invoice = find_invoice(&state, invoice_id).await?;
    if !invoice.is_content_editable() {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "A paid or cancelled invoice can no longer be edited"
        )));
    }

    let items: Vec<LineItemInput> = match payload.items {
        Some(items) => items,
        None => invoice
            .items
            .iter()
            .map(|item| LineItemInput {
                description: item.description.clone(),
                quantity: item.quantity,
                unit_price: item.unit_price,
            })
            .collect(),
    };
    let tax = payload.tax.unwrap_or(invoice.tax);
    let discount = payload.discount.unwrap_or(invoice.discount);

    let totals = compute_totals(&items, tax, discount)
        .map_err(|e| AppError::BadRequest(anyhow::anyhow!(e)))?;

    invoice.items = totals.items;
    invoice.subtotal = totals.subtotal;
    invoice.tax = tax;
    invoice.discount = discount;
    invoice.total_amount = totals.total_amount;
    if let Some(due_date) = payload.due_date {
        invoice.due_date = due_date;
    }
    if let Some(project_title) = payload.project_title {
        invoice.project_title = Some(project_title);
    }
    if let Some(notes) = payload.notes {
        invoice.notes = Some(notes);
    }
    // The total or due date may have moved relative to the balance.
    invoice.refresh_derived_status(Utc::now());

    state.repository.save_invoice(&invoice).await?;
    record_document("invoice", "updated");

    Ok(Json(ApiResponse::ok(InvoiceResponse::from(invoice))))
}

pub async fn send_invoice(
    State(state): State<AppState>,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<ApiResponse<InvoiceResponse>>, AppError> {
    let mut invoice = find_invoice(&state, invoice_id).await?;

    // Sending is idempotent: only a draft transitions (and notifies).
    if invoice.status != InvoiceStatus::Draft {
        return Ok(Json(ApiResponse::with_message(
            "Invoice already sent",
            InvoiceResponse::from(invoice),
        )));
    }

    invoice.status = InvoiceStatus::Sent;
    invoice.updated_utc = Utc::now();
    state.repository.save_invoice(&invoice).await?;

    state.notifier.notify(LifecycleEvent::InvoiceSent {
        invoice_number: invoice.invoice_number.clone(),
        client_id: invoice.client_id,
    });
    record_document("invoice", "sent");

    Ok(Json(ApiResponse::with_message(
        "Invoice sent",
        InvoiceResponse::from(invoice),
    )))
}

pub async fn mark_paid(
    State(state): State<AppState>,
    Path(invoice_id): Path<Uuid>,
    payload: Option<Json<MarkPaidRequest>>,
) -> Result<Json<ApiResponse<InvoiceResponse>>, AppError> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();

    let mut invoice = find_invoice(&state, invoice_id).await?;
    let outstanding = invoice.outstanding_amount();

    let now = Utc::now();
    invoice
        .mark_paid(now)
        .map_err(|e| AppError::BadRequest(anyhow::anyhow!(e)))?;

    let payment_method = payload
        .payment_method
        .unwrap_or_else(|| "manual".to_string());

    // Nothing outstanding (zero-total invoice) means nothing to record;
    // payments are strictly positive.
    if outstanding > 0.0 {
        let payment = Payment::new(
            invoice.id,
            invoice.client_id,
            outstanding,
            payment_method.clone(),
            payload.transaction_id,
            Some(format!("Settled invoice {}", invoice.invoice_number)),
            now,
        );
        state.repository.insert_payment(&payment).await?;
    }
    state.repository.save_invoice(&invoice).await?;

    tracing::info!(
        invoice_number = %invoice.invoice_number,
        amount = outstanding,
        "Invoice marked paid"
    );

    state.notifier.notify(LifecycleEvent::InvoicePaid {
        invoice_number: invoice.invoice_number.clone(),
        client_id: invoice.client_id,
        amount: outstanding,
    });
    record_document("invoice", "paid");
    if outstanding > 0.0 {
        record_revenue(&payment_method, outstanding);
    }

    Ok(Json(ApiResponse::with_message(
        "Invoice marked as paid",
        InvoiceResponse::from(invoice),
    )))
}

pub async fn cancel_invoice(
    State(state): State<AppState>,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<ApiResponse<InvoiceResponse>>, AppError> {
    let mut invoice = find_invoice(&state, invoice_id).await?;
    invoice
        .can_cancel()
        .map_err(|e| AppError::BadRequest(anyhow::anyhow!(e)))?;

    invoice.status = InvoiceStatus::Cancelled;
    invoice.updated_utc = Utc::now();
    state.repository.save_invoice(&invoice).await?;

    state.notifier.notify(LifecycleEvent::InvoiceCancelled {
        invoice_number: invoice.invoice_number.clone(),
        client_id: invoice.client_id,
    });
    record_document("invoice", "cancelled");

    Ok(Json(ApiResponse::with_message(
        "Invoice cancelled",
        InvoiceResponse::from(invoice),
    )))
}

pub async fn mark_overdue(
    State(state): State<AppState>,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<ApiResponse<InvoiceResponse>>, AppError> {
    let mut invoice = find_invoice(&state, invoice_id).await?;
    invoice
        .can_mark_overdue()
        .map_err(|e| AppError::BadRequest(anyhow::anyhow!(e)))?;

    invoice.status = InvoiceStatus::Overdue;
    invoice.updated_utc = Utc::now();
    state.repository.save_invoice(&invoice).await?;
    record_document("invoice", "overdue");

    Ok(Json(ApiResponse::with_message(
        "Invoice marked overdue",
        InvoiceResponse::from(invoice),
    )))
}

pub async fn delete_invoice(
    State(state): State<AppState>,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let invoice = find_invoice(&state, invoice_id).await?;
    if invoice.is_paid() {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "A paid invoice cannot be deleted"
        )));
    }

    let payment_count = state
        .repository
        .count_payments_for_invoice(invoice_id)
        .await?;
    if payment_count > 0 {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "An invoice with recorded payments cannot be deleted"
        )));
    }

    let deleted = state.repository.delete_invoice(invoice_id).await?;
    if !deleted {
        return Err(AppError::NotFound(anyhow::anyhow!("Invoice not found")));
    }
    record_document("invoice", "deleted");

    Ok(Json(ApiResponse::with_message(
        "Invoice deleted",
        json!({ "id": invoice_id }),
    )))
}

pub async fn invoice_stats(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<ApiResponse<InvoiceStats>>, AppError> {
    let mut invoices = state.repository.scan_invoices(query.client_id).await?;
    invoices.retain(|inv| query.contains(inv.created_utc));
    Ok(Json(ApiResponse::ok(summarize_invoices(&invoices))))
}

pub async fn overdue_invoices(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<InvoiceResponse>>>, AppError> {
    let now = Utc::now();
    let invoices = state.repository.scan_invoices(None).await?;

    let overdue: Vec<InvoiceResponse> = invoices
        .into_iter()
        .filter(|inv| {
            inv.status == InvoiceStatus::Overdue
                || (now > inv.due_date
                    && !matches!(inv.status, InvoiceStatus::Paid | InvoiceStatus::Cancelled))
        })
        .map(InvoiceResponse::from)
        .collect();

    Ok(Json(ApiResponse::ok(overdue)))
}

pub async fn list_invoice_payments(
    State(state): State<AppState>,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<PaymentResponse>>>, AppError> {
    // 404 before an empty list when the invoice itself is unknown.
    find_invoice(&state, invoice_id).await?;

    let payments = state
        .repository
        .list_payments(Some(invoice_id), 100, 0)
        .await?;

    Ok(Json(ApiResponse::ok(
        payments.into_iter().map(PaymentResponse::from).collect(),
    )))
}

async fn find_invoice(state: &AppState, invoice_id: Uuid) -> Result<Invoice, AppError> {
    state
        .repository
        .find_invoice(invoice_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice not found")))
}
