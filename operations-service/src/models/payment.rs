//! Append-only payment records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

/// Money received against exactly one invoice. Records are never updated
/// or deleted; applying one to the invoice balance happens in the same
/// operation that created it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub client_id: Uuid,
    pub amount: f64,
    pub payment_method: String,
    pub status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub payment_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_utc: DateTime<Utc>,
}

impl Payment {
    pub fn new(
        invoice_id: Uuid,
        client_id: Uuid,
        amount: f64,
        payment_method: String,
        transaction_id: Option<String>,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            invoice_id,
            client_id,
            amount,
            payment_method,
            status: PaymentStatus::Completed,
            transaction_id,
            payment_date: now,
            notes,
            created_utc: now,
        }
    }
}
