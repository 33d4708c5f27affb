//! Read-only rollups over the financial collections.
//!
//! Every call recomputes from a fresh scan; nothing is materialized. The
//! numbers are only as consistent as the documents were at read time.

use serde::Serialize;

use crate::models::{Invoice, InvoiceStatus, Quotation, QuotationStatus};

#[derive(Debug, Default, Serialize)]
pub struct InvoiceStats {
    pub total_invoices: u64,
    pub draft: u64,
    pub sent: u64,
    pub paid: u64,
    pub partially_paid: u64,
    pub overdue: u64,
    pub cancelled: u64,
    pub total_billed: f64,
    pub total_paid: f64,
    pub total_outstanding: f64,
}

#[derive(Debug, Default, Serialize)]
pub struct QuotationStats {
    pub total_quotations: u64,
    pub pending: u64,
    pub sent: u64,
    pub accepted: u64,
    pub rejected: u64,
    pub converted: u64,
    pub total_quoted: f64,
}

#[derive(Debug, Serialize)]
pub struct DashboardSummary {
    pub quotations: QuotationStats,
    pub invoices: InvoiceStats,
    pub total_revenue: f64,
    pub outstanding_balance: f64,
}

/// Fold an invoice scan into counts and sums. Cancelled invoices are
/// excluded from the billed/outstanding sums.
pub fn summarize_invoices(invoices: &[Invoice]) -> InvoiceStats {
    let mut stats = InvoiceStats {
        total_invoices: invoices.len() as u64,
        ..Default::default()
    };

    for invoice in invoices {
        match invoice.status {
            InvoiceStatus::Draft => stats.draft += 1,
            InvoiceStatus::Sent => stats.sent += 1,
            InvoiceStatus::Paid => stats.paid += 1,
            InvoiceStatus::PartiallyPaid => stats.partially_paid += 1,
            InvoiceStatus::Overdue => stats.overdue += 1,
            InvoiceStatus::Cancelled => stats.cancelled += 1,
        }

        stats.total_paid += invoice.paid_amount;
        if invoice.status != InvoiceStatus::Cancelled {
            stats.total_billed += invoice.total_amount;
            stats.total_outstanding += invoice.outstanding_amount();
        }
    }

    stats
}

pub fn summarize_quotations(quotations: &[Quotation]) -> QuotationStats {
    let mut stats = QuotationStats {
        total_quotations: quotations.len() as u64,
        ..Default::default()
    };

    for quotation in quotations {
        match quotation.status {
            QuotationStatus::Pending => stats.pending += 1,
            QuotationStatus::Sent => stats.sent += 1,
            QuotationStatus::Accepted => stats.accepted += 1,
            QuotationStatus::Rejected => stats.rejected += 1,
            QuotationStatus::Converted => stats.converted += 1,
        }
        stats.total_quoted += quotation.total_amount;
    }

    stats
}
