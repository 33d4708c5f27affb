//! Yearly document-number sequences (`QT-<year>-<seq>`, `INV-<year>-<seq>`).
//!
//! Numbers come from a dedicated counter document incremented with an
//! atomic `$inc`, so concurrent creates never observe the same sequence
//! value. The unique index on the number column is the backstop.

use anyhow::Result;
use chrono::{DateTime, Datelike, Utc};
use mongodb::bson::doc;
use mongodb::options::{FindOneAndUpdateOptions, ReturnDocument};
use serde::{Deserialize, Serialize};

use super::repository::OpsRepository;

pub const QUOTATION_PREFIX: &str = "QT";
pub const INVOICE_PREFIX: &str = "INV";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Counter {
    #[serde(rename = "_id")]
    pub id: String,
    pub seq: i64,
}

pub fn format_document_number(prefix: &str, year: i32, seq: i64) -> String {
    format!("{}-{}-{:04}", prefix, year, seq)
}

impl OpsRepository {
    /// Reserve the next number in the `<prefix>-<year>` sequence.
    pub async fn next_document_number(
        &self,
        prefix: &str,
        now: DateTime<Utc>,
    ) -> Result<String> {
        let year = now.year();
        let key = format!("{}-{}", prefix.to_lowercase(), year);

        let options = FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::After)
            .build();

        let counter = self
            .counters
            .find_one_and_update(doc! { "_id": &key }, doc! { "$inc": { "seq": 1 } }, options)
            .await?;

        // ReturnDocument::After with upsert always yields a document.
        let seq = counter.map(|c| c.seq).unwrap_or(1);
        Ok(format_document_number(prefix, year, seq))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_are_zero_padded_per_year() {
        assert_eq!(format_document_number("QT", 2026, 1), "QT-2026-0001");
        assert_eq!(format_document_number("INV", 2026, 42), "INV-2026-0042");
        assert_eq!(format_document_number("INV", 2027, 12345), "INV-2027-12345");
    }
}
