pub mod invoice;
pub mod line_item;
pub mod notification;
pub mod payment;
pub mod project;
pub mod quotation;

pub use invoice::{derive_status, Invoice, InvoiceStatus};
pub use line_item::{compute_totals, DocumentTotals, LineItem, LineItemInput, TotalsError};
pub use notification::{Notification, NotificationStatus};
pub use payment::{Payment, PaymentStatus};
pub use project::Project;
pub use quotation::{Quotation, QuotationStatus};

// Helper module for optional DateTime<Utc> as BSON DateTime
pub mod opt_chrono_datetime_as_bson_datetime {
    use chrono::{DateTime, Utc};
    use mongodb::bson;
    use serde::{self, Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(date: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(dt) => {
                let bson_dt = bson::DateTime::from_chrono(*dt);
                bson_dt.serialize(serializer)
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let opt: Option<bson::DateTime> = Option::deserialize(deserializer)?;
        Ok(opt.map(|dt| dt.to_chrono()))
    }
}
