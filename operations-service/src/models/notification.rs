//! Fire-and-forget notification records. Not part of financial
//! correctness; delivery failures never surface to the caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::opt_chrono_datetime_as_bson_datetime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    Queued,
    Sent,
    Failed,
}

impl std::fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationStatus::Queued => write!(f, "queued"),
            NotificationStatus::Sent => write!(f, "sent"),
            NotificationStatus::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub recipient: String,
    /// Lifecycle event name, e.g. `quotation.accepted`.
    pub kind: String,
    pub subject: String,
    pub body: String,
    pub status: NotificationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_utc: DateTime<Utc>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "opt_chrono_datetime_as_bson_datetime"
    )]
    pub sent_utc: Option<DateTime<Utc>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "opt_chrono_datetime_as_bson_datetime"
    )]
    pub failed_utc: Option<DateTime<Utc>>,
}

impl Notification {
    pub fn new(recipient: String, kind: String, subject: String, body: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            recipient,
            kind,
            subject,
            body,
            status: NotificationStatus::Queued,
            error_message: None,
            created_utc: Utc::now(),
            sent_utc: None,
            failed_utc: None,
        }
    }

    pub fn mark_sent(&mut self) {
        self.status = NotificationStatus::Sent;
        self.sent_utc = Some(Utc::now());
    }

    pub fn mark_failed(&mut self, error: String) {
        self.status = NotificationStatus::Failed;
        self.failed_utc = Some(Utc::now());
        self.error_message = Some(error);
    }
}
