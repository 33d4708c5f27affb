//! Quotation document and its lifecycle rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::line_item::LineItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotationStatus {
    Pending,
    Sent,
    Accepted,
    Rejected,
    Converted,
}

impl QuotationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuotationStatus::Pending => "pending",
            QuotationStatus::Sent => "sent",
            QuotationStatus::Accepted => "accepted",
            QuotationStatus::Rejected => "rejected",
            QuotationStatus::Converted => "converted",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuotationTransitionError {
    #[error("quotation must be sent before it can be accepted")]
    NotSent,

    #[error("quotation expired")]
    Expired,

    #[error("quotation is already {0}")]
    AlreadyTerminal(&'static str),

    #[error("only pending quotations can be sent")]
    NotPending,

    #[error("only accepted quotations can be converted to an invoice")]
    NotAccepted,

    #[error("quotation has already been converted to an invoice")]
    AlreadyConverted,
}

/// A proposed scope of work and price, with a validity deadline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quotation {
    #[serde(rename = "_id")]
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
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub valid_until: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub converted_to_invoice: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_utc: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_utc: DateTime<Utc>,
}

impl Quotation {
    /// Items, tax, discount, validity and notes are frozen once the client
    /// has accepted (or the quotation has been converted).
    pub fn is_editable(&self) -> bool {
        !matches!(
            self.status,
            QuotationStatus::Accepted | QuotationStatus::Converted
        )
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.valid_until
    }

    pub fn can_send(&self) -> Result<(), QuotationTransitionError> {
        match self.status {
            QuotationStatus::Pending => Ok(()),
            _ => Err(QuotationTransitionError::NotPending),
        }
    }

    /// Accepting requires the quotation to be exactly `sent` and still valid.
    pub fn can_accept(&self, now: DateTime<Utc>) -> Result<(), QuotationTransitionError> {
        if self.status != QuotationStatus::Sent {
            return Err(QuotationTransitionError::NotSent);
        }
        if self.is_expired(now) {
            return Err(QuotationTransitionError::Expired);
        }
        Ok(())
    }

    pub fn can_reject(&self) -> Result<(), QuotationTransitionError> {
        match self.status {
            QuotationStatus::Accepted => Err(QuotationTransitionError::AlreadyTerminal("accepted")),
            QuotationStatus::Converted => {
                Err(QuotationTransitionError::AlreadyTerminal("converted"))
            }
            QuotationStatus::Rejected => Err(QuotationTransitionError::AlreadyTerminal("rejected")),
            _ => Ok(()),
        }
    }

    /// Conversion is one-way and happens at most once.
    pub fn can_convert(&self) -> Result<(), QuotationTransitionError> {
        if self.converted_to_invoice.is_some() {
            return Err(QuotationTransitionError::AlreadyConverted);
        }
        if self.status != QuotationStatus::Accepted {
            return Err(QuotationTransitionError::NotAccepted);
        }
        Ok(())
    }

    /// A quotation that produced an invoice can no longer be deleted.
    pub fn is_deletable(&self) -> bool {
        self.converted_to_invoice.is_none()
    }
}
