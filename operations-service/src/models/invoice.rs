//! Invoice document, lifecycle guards, and the derived-status rule.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::line_item::LineItem;
use super::opt_chrono_datetime_as_bson_datetime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Paid,
    PartiallyPaid,
    Overdue,
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::PartiallyPaid => "partially_paid",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvoiceTransitionError {
    #[error("invoice is already paid")]
    AlreadyPaid,

    #[error("invoice is cancelled")]
    Cancelled,

    #[error("invoice is already overdue")]
    AlreadyOverdue,

    #[error("payment exceeds the outstanding balance")]
    Overpayment,

    #[error("payment amount must be greater than zero")]
    NonPositiveAmount,
}

/// Tolerance for monetary comparisons. Totals are sums of f64 products,
/// so an exact settlement can be off by a few ulps.
const AMOUNT_EPSILON: f64 = 1e-6;

/// Derive the invoice status from its financial fields.
///
/// Called explicitly at the end of every mutation that changes
/// `paid_amount`; explicit `cancelled`/`overdue` transitions win until the
/// next such mutation. `cancelled` is never reverted here because payments
/// against a cancelled invoice are rejected upstream. A zero-total invoice
/// (discount equal to subtotal plus tax) has nothing outstanding, so it
/// derives `paid` rather than lingering as unpayable.
pub fn derive_status(
    paid_amount: f64,
    total_amount: f64,
    due_date: DateTime<Utc>,
    now: DateTime<Utc>,
    current: InvoiceStatus,
) -> InvoiceStatus {
    if current == InvoiceStatus::Cancelled {
        return InvoiceStatus::Cancelled;
    }

    if paid_amount <= 0.0 && total_amount > 0.0 {
        if now > due_date {
            return InvoiceStatus::Overdue;
        }
        if current == InvoiceStatus::Overdue {
            return InvoiceStatus::Sent;
        }
        return current;
    }

    if paid_amount + AMOUNT_EPSILON < total_amount {
        InvoiceStatus::PartiallyPaid
    } else {
        InvoiceStatus::Paid
    }
}

/// A binding payment obligation, standalone or derived from an accepted
/// quotation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub invoice_number: String,
    pub client_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quotation_id: Option<Uuid>,
    /// Denormalised snapshot of the project title at creation, not a live
    /// reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_title: Option<String>,
    pub items: Vec<LineItem>,
    pub subtotal: f64,
    pub tax: f64,
    pub discount: f64,
    pub total_amount: f64,
    pub paid_amount: f64,
    pub status: InvoiceStatus,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub due_date: DateTime<Utc>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "opt_chrono_datetime_as_bson_datetime"
    )]
    pub paid_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_utc: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_utc: DateTime<Utc>,
}

impl Invoice {
    pub fn is_paid(&self) -> bool {
        self.status == InvoiceStatus::Paid
    }

    /// Content edits are rejected once the invoice is paid or cancelled.
    pub fn is_content_editable(&self) -> bool {
        !matches!(self.status, InvoiceStatus::Paid | InvoiceStatus::Cancelled)
    }

    pub fn outstanding_amount(&self) -> f64 {
        (self.total_amount - self.paid_amount).max(0.0)
    }

    pub fn can_cancel(&self) -> Result<(), InvoiceTransitionError> {
        match self.status {
            InvoiceStatus::Paid => Err(InvoiceTransitionError::AlreadyPaid),
            InvoiceStatus::Cancelled => Err(InvoiceTransitionError::Cancelled),
            _ => Ok(()),
        }
    }

    /// Explicit admin action, independent of the derived rule.
    pub fn can_mark_overdue(&self) -> Result<(), InvoiceTransitionError> {
        match self.status {
            InvoiceStatus::Paid => Err(InvoiceTransitionError::AlreadyPaid),
            InvoiceStatus::Cancelled => Err(InvoiceTransitionError::Cancelled),
            InvoiceStatus::Overdue => Err(InvoiceTransitionError::AlreadyOverdue),
            _ => Ok(()),
        }
    }

    /// Re-apply the derived-status rule and stamp `paid_date` the first
    /// time the invoice becomes paid. `paid_date` is never overwritten.
    pub fn refresh_derived_status(&mut self, now: DateTime<Utc>) {
        self.status = derive_status(
            self.paid_amount,
            self.total_amount,
            self.due_date,
            now,
            self.status,
        );
        if self.status == InvoiceStatus::Paid && self.paid_date.is_none() {
            self.paid_date = Some(now);
        }
        self.updated_utc = now;
    }

    /// Apply a received payment to the balance and rederive the status.
    pub fn register_payment(
        &mut self,
        amount: f64,
        now: DateTime<Utc>,
    ) -> Result<(), InvoiceTransitionError> {
        if amount <= 0.0 {
            return Err(InvoiceTransitionError::NonPositiveAmount);
        }
        if self.status == InvoiceStatus::Cancelled {
            return Err(InvoiceTransitionError::Cancelled);
        }
        if self.is_paid() {
            return Err(InvoiceTransitionError::AlreadyPaid);
        }
        if amount > self.outstanding_amount() + AMOUNT_EPSILON {
            return Err(InvoiceTransitionError::Overpayment);
        }

        self.paid_amount += amount;
        self.refresh_derived_status(now);
        Ok(())
    }

    /// Settle the full balance in one step.
    pub fn mark_paid(&mut self, now: DateTime<Utc>) -> Result<(), InvoiceTransitionError> {
        if self.is_paid() {
            return Err(InvoiceTransitionError::AlreadyPaid);
        }
        if self.status == InvoiceStatus::Cancelled {
            return Err(InvoiceTransitionError::Cancelled);
        }

        self.paid_amount = self.total_amount;
        self.refresh_derived_status(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn invoice(status: InvoiceStatus, total: f64, paid: f64, due: DateTime<Utc>) -> Invoice {
        let now = Utc::now();
        Invoice {
            id: Uuid::new_v4(),
            invoice_number: "INV-2026-0001".to_string(),
            client_id: Uuid::new_v4(),
            quotation_id: None,
            project_title: None,
            items: vec![],
            subtotal: total,
            tax: 0.0,
            discount: 0.0,
            total_amount: total,
            paid_amount: paid,
            status,
            due_date: due,
            paid_date: None,
            notes: None,
            created_by: None,
            created_utc: now,
            updated_utc: now,
        }
    }

    #[test]
    fn unpaid_invoice_past_due_derives_overdue() {
        let now = Utc::now();
        let status = derive_status(0.0, 205.0, now - Duration::days(1), now, InvoiceStatus::Sent);
        assert_eq!(status, InvoiceStatus::Overdue);
    }

    #[test]
    fn overdue_reverts_to_sent_when_due_date_moves_out() {
        let now = Utc::now();
        let status = derive_status(
            0.0,
            205.0,
            now + Duration::days(5),
            now,
            InvoiceStatus::Overdue,
        );
        assert_eq!(status, InvoiceStatus::Sent);
    }

    #[test]
    fn partial_payment_derives_partially_paid() {
        let now = Utc::now();
        let status = derive_status(
            50.0,
            205.0,
            now + Duration::days(5),
            now,
            InvoiceStatus::Sent,
        );
        assert_eq!(status, InvoiceStatus::PartiallyPaid);
    }

    #[test]
    fn full_payment_derives_paid_even_past_due() {
        let now = Utc::now();
        let status = derive_status(
            205.0,
            205.0,
            now - Duration::days(5),
            now,
            InvoiceStatus::Overdue,
        );
        assert_eq!(status, InvoiceStatus::Paid);
    }

    #[test]
    fn cancelled_is_never_rederived() {
        let now = Utc::now();
        let status = derive_status(
            0.0,
            205.0,
            now - Duration::days(5),
            now,
            InvoiceStatus::Cancelled,
        );
        assert_eq!(status, InvoiceStatus::Cancelled);
    }

    #[test]
    fn zero_total_invoice_derives_paid_even_past_due() {
        let now = Utc::now();
        let status = derive_status(0.0, 0.0, now - Duration::days(5), now, InvoiceStatus::Sent);
        assert_eq!(status, InvoiceStatus::Paid);
    }

    #[test]
    fn zero_total_invoice_can_be_marked_paid_exactly_once() {
        let now = Utc::now();
        let mut inv = invoice(InvoiceStatus::Sent, 0.0, 0.0, now + Duration::days(30));

        inv.mark_paid(now).unwrap();
        assert_eq!(inv.status, InvoiceStatus::Paid);
        assert!(inv.paid_date.is_some());

        assert_eq!(
            inv.mark_paid(now + Duration::hours(1)),
            Err(InvoiceTransitionError::AlreadyPaid)
        );
    }

    #[test]
    fn near_exact_final_payment_settles_despite_float_error() {
        let now = Utc::now();
        let mut inv = invoice(InvoiceStatus::Sent, 0.3, 0.0, now + Duration::days(30));

        inv.register_payment(0.1, now).unwrap();
        inv.register_payment(0.1, now).unwrap();
        // 0.3 - 0.2 carries float error; the last 0.1 still settles.
        inv.register_payment(0.1, now).unwrap();
        assert_eq!(inv.status, InvoiceStatus::Paid);
    }

    #[test]
    fn register_payment_updates_balance_and_status() {
        let now = Utc::now();
        let mut inv = invoice(InvoiceStatus::Sent, 205.0, 0.0, now + Duration::days(30));

        inv.register_payment(100.0, now).unwrap();
        assert_eq!(inv.paid_amount, 100.0);
        assert_eq!(inv.status, InvoiceStatus::PartiallyPaid);
        assert!(inv.paid_date.is_none());

        inv.register_payment(105.0, now).unwrap();
        assert_eq!(inv.paid_amount, 205.0);
        assert_eq!(inv.status, InvoiceStatus::Paid);
        assert!(inv.paid_date.is_some());
    }

    #[test]
    fn overpayment_is_rejected() {
        let now = Utc::now();
        let mut inv = invoice(InvoiceStatus::Sent, 205.0, 200.0, now + Duration::days(30));
        assert_eq!(
            inv.register_payment(10.0, now),
            Err(InvoiceTransitionError::Overpayment)
        );
        assert_eq!(inv.paid_amount, 200.0);
    }

    #[test]
    fn payments_against_cancelled_invoice_are_rejected() {
        let now = Utc::now();
        let mut inv = invoice(InvoiceStatus::Cancelled, 205.0, 0.0, now + Duration::days(30));
        assert_eq!(
            inv.register_payment(10.0, now),
            Err(InvoiceTransitionError::Cancelled)
        );
    }

    #[test]
    fn mark_paid_is_not_repeatable_and_keeps_paid_date() {
        let now = Utc::now();
        let mut inv = invoice(InvoiceStatus::Sent, 205.0, 0.0, now + Duration::days(30));

        inv.mark_paid(now).unwrap();
        assert_eq!(inv.paid_amount, 205.0);
        assert_eq!(inv.status, InvoiceStatus::Paid);
        let first_paid_date = inv.paid_date;
        assert!(first_paid_date.is_some());

        let later = now + Duration::hours(1);
        assert_eq!(inv.mark_paid(later), Err(InvoiceTransitionError::AlreadyPaid));
        assert_eq!(inv.paid_amount, 205.0);
        assert_eq!(inv.paid_date, first_paid_date);
    }

    #[test]
    fn paid_invoice_cannot_be_cancelled() {
        let now = Utc::now();
        let inv = invoice(InvoiceStatus::Paid, 205.0, 205.0, now + Duration::days(30));
        assert_eq!(inv.can_cancel(), Err(InvoiceTransitionError::AlreadyPaid));
        assert!(!inv.is_content_editable());
    }

    #[test]
    fn explicit_overdue_guards() {
        let now = Utc::now();
        let inv = invoice(InvoiceStatus::Sent, 205.0, 0.0, now + Duration::days(30));
        assert!(inv.can_mark_overdue().is_ok());

        let inv = invoice(InvoiceStatus::Overdue, 205.0, 0.0, now - Duration::days(1));
        assert_eq!(
            inv.can_mark_overdue(),
            Err(InvoiceTransitionError::AlreadyOverdue)
        );
    }
}
