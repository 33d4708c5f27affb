//! Project document. Owns the forward pointers to its quotation and
//! invoice but not their lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    pub client_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Set exactly once, when the first quotation is created for this
    /// project.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quotation_id: Option<Uuid>,
    /// Set exactly once, when a quotation is converted or an invoice is
    /// first created for this project.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_id: Option<Uuid>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_utc: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_utc: DateTime<Utc>,
}
