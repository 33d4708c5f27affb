//! Request and response bodies for the REST surface.
//!
//! Responses are explicit DTOs rather than the persisted documents so
//! timestamps serialize as RFC 3339 instead of BSON extended JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{
    Invoice, InvoiceStatus, LineItem, LineItemInput, Notification, NotificationStatus, Payment,
    PaymentStatus, Project, Quotation, QuotationStatus,
};

// Requests

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, message = "title is required"))]
    pub title: String,
    pub client_id: Uuid,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuotationRequest {
    pub project_id: Uuid,
    #[validate(length(min = 1, message = "at least one line item is required"), nested)]
    pub items: Vec<LineItemInput>,
    pub tax: Option<f64>,
    pub discount: Option<f64>,
    pub valid_until: DateTime<Utc>,
    pub notes: Option<String>,
    pub created_by: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateQuotationRequest {
    #[validate(nested)]
    pub items: Option<Vec<LineItemInput>>,
    pub tax: Option<f64>,
    pub discount: Option<f64>,
    pub valid_until: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RejectQuotationRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ConvertQuotationRequest {
    pub due_date: Option<DateTime<Utc>>,
}

/// Standalone creation requires `client_id` and `items`; creation from a
/// quotation requires only `quotation_id`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateInvoiceRequest {
    pub quotation_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
    pub project_title: Option<String>,
    #[validate(nested)]
    pub items: Option<Vec<LineItemInput>>,
    pub tax: Option<f64>,
    pub discount: Option<f64>,
    pub due_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_by: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateInvoiceRequest {
    #[validate(nested)]
    pub items: Option<Vec<LineItemInput>>,
    pub tax: Option<f64>,
    pub discount: Option<f64>,
    pub due_date: Option<DateTime<Utc>>,
    pub project_title: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MarkPaidRequest {
    pub payment_method: Option<String>,
    pub transaction_id: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePaymentRequest {
    pub invoice_id: Uuid,
    #[validate(range(exclusive_min = 0.0, message = "amount must be greater than zero"))]
    pub amount: f64,
    #[validate(length(min = 1, message = "payment method is required"))]
    pub payment_method: String,
    pub transaction_id: Option<String>,
    pub notes: Option<String>,
}

// Query parameters

fn default_limit() -> i64 {
    50
}

#[derive(Debug, Deserialize)]
pub struct ListQuotationsQuery {
    pub status: Option<QuotationStatus>,
    pub client_id: Option<Uuid>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: u64,
}

#[derive(Debug, Deserialize)]
pub struct ListInvoicesQuery {
    pub status: Option<InvoiceStatus>,
    pub client_id: Option<Uuid>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: u64,
}

#[derive(Debug, Deserialize)]
pub struct ListPaymentsQuery {
    pub invoice_id: Option<Uuid>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: u64,
}

#[derive(Debug, Deserialize)]
pub struct ListNotificationsQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: u64,
}

/// Reporting filters. `from`/`to` bound the document creation time.
#[derive(Debug, Default, Deserialize)]
pub struct StatsQuery {
    pub client_id: Option<Uuid>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl StatsQuery {
    pub fn contains(&self, created_utc: DateTime<Utc>) -> bool {
        if let Some(from) = self.from {
            if created_utc < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if created_utc > to {
                return false;
            }
        }
        true
    }
}

// Responses

#[derive(Debug, Serialize)]
pub struct ProjectResponse {
    pub id: Uuid,
    pub title: String,
    pub client_id: Uuid,
    pub description: Option<String>,
    pub quotation_id: Option<Uuid>,
    pub invoice_id: Option<Uuid>,
    pub created_utc: DateTime<Utc>,
}

impl From<Project> for ProjectResponse {
    fn from(project: Project) -> Self {
        Self {
            id: project.id,
            title: project.title,
            client_id: project.client_id,
            description: project.description,
            quotation_id: project.quotation_id,
            invoice_id: project.invoice_id,
            created_utc: project.created_utc,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct QuotationResponse {
    pub id: Uuid,
    pub quotation_number: String,
    pub project_id: Uuid,
    pub client_id: Uuid,
    pub items: Vec<LineItem>,
    pub subtotal: f64,
    pub tax: f64,
    pub discount: f64,
    pub total_amount: f64,
    pub status: QuotationStatus,
    pub valid_until: DateTime<Utc>,
    pub converted_to_invoice: Option<Uuid>,
    pub notes: Option<String>,
    pub created_by: Option<String>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl From<Quotation> for QuotationResponse {
    fn from(q: Quotation) -> Self {
        Self {
            id: q.id,
            quotation_number: q.quotation_number,
            project_id: q.project_id,
            client_id: q.client_id,
            items: q.items,
            subtotal: q.subtotal,
            tax: q.tax,
            discount: q.discount,
            total_amount: q.total_amount,
            status: q.status,
            valid_until: q.valid_until,
            converted_to_invoice: q.converted_to_invoice,
            notes: q.notes,
            created_by: q.created_by,
            created_utc: q.created_utc,
            updated_utc: q.updated_utc,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InvoiceResponse {
    pub id: Uuid,
    pub invoice_number: String,
    pub client_id: Uuid,
    pub quotation_id: Option<Uuid>,
    pub project_title: Option<String>,
    pub items: Vec<LineItem>,
    pub subtotal: f64,
    pub tax: f64,
    pub discount: f64,
    pub total_amount: f64,
    pub paid_amount: f64,
    pub status: InvoiceStatus,
    pub due_date: DateTime<Utc>,
    pub paid_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_by: Option<String>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl From<Invoice> for InvoiceResponse {
    fn from(inv: Invoice) -> Self {
        Self {
            id: inv.id,
            invoice_number: inv.invoice_number,
            client_id: inv.client_id,
            quotation_id: inv.quotation_id,
            project_title: inv.project_title,
            items: inv.items,
            subtotal: inv.subtotal,
            tax: inv.tax,
            discount: inv.discount,
            total_amount: inv.total_amount,
            paid_amount: inv.paid_amount,
            status: inv.status,
            due_date: inv.due_date,
            paid_date: inv.paid_date,
            notes: inv.notes,
            created_by: inv.created_by,
            created_utc: inv.created_utc,
            updated_utc: inv.updated_utc,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub client_id: Uuid,
    pub amount: f64,
    pub payment_method: String,
    pub status: PaymentStatus,
    pub transaction_id: Option<String>,
    pub payment_date: DateTime<Utc>,
    pub notes: Option<String>,
}

impl From<Payment> for PaymentResponse {
    fn from(p: Payment) -> Self {
        Self {
            id: p.id,
            invoice_id: p.invoice_id,
            client_id: p.client_id,
            amount: p.amount,
            payment_method: p.payment_method,
            status: p.status,
            transaction_id: p.transaction_id,
            payment_date: p.payment_date,
            notes: p.notes,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct NotificationResponse {
    pub id: Uuid,
    pub recipient: String,
    pub kind: String,
    pub subject: String,
    pub body: String,
    pub status: NotificationStatus,
    pub error_message: Option<String>,
    pub created_utc: DateTime<Utc>,
}

impl From<Notification> for NotificationResponse {
    fn from(n: Notification) -> Self {
        Self {
            id: n.id,
            recipient: n.recipient,
            kind: n.kind,
            subject: n.subject,
            body: n.body,
            status: n.status,
            error_message: n.error_message,
            created_utc: n.created_utc,
        }
    }
}

/// Conversion returns both sides of the one-way pointer.
#[derive(Debug, Serialize)]
pub struct ConvertToInvoiceResponse {
    pub invoice: InvoiceResponse,
    pub quotation: QuotationResponse,
}
