//! MongoDB repository for the operations collections.
//!
//! One collection per entity, referenced by opaque ids. Referential
//! integrity is enforced by application-level existence checks before
//! linking; the storage layer has no foreign keys.

use anyhow::Result;
use futures::TryStreamExt;
use mongodb::options::{FindOptions, IndexOptions};
use mongodb::{bson::doc, Collection, Database, IndexModel};
use uuid::Uuid;

use crate::models::{
    Invoice, InvoiceStatus, Notification, Payment, Project, Quotation, QuotationStatus,
};
use crate::services::sequence::Counter;

#[derive(Clone)]
pub struct OpsRepository {
    pub(crate) quotations: Collection<Quotation>,
    pub(crate) invoices: Collection<Invoice>,
    pub(crate) payments: Collection<Payment>,
    pub(crate) projects: Collection<Project>,
    pub(crate) notifications: Collection<Notification>,
    pub(crate) counters: Collection<Counter>,
}

impl OpsRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            quotations: db.collection("quotations"),
            invoices: db.collection("invoices"),
            payments: db.collection("payments"),
            projects: db.collection("projects"),
            notifications: db.collection("notifications"),
            counters: db.collection("counters"),
        }
    }

    /// Create the indexes the read paths depend on. Document numbers get a
    /// unique index so the atomic counter is backstopped at the storage
    /// layer.
    pub async fn init_indexes(&self) -> Result<()> {
        let quotation_number_idx = IndexModel::builder()
            .keys(doc! { "quotation_number": 1 })
            .options(
                IndexOptions::builder()
                    .name("quotation_number_idx".to_string())
                    .unique(true)
                    .build(),
            )
            .build();

        let quotation_status_idx = IndexModel::builder()
            .keys(doc! { "status": 1 })
            .options(
                IndexOptions::builder()
                    .name("quotation_status_idx".to_string())
                    .build(),
            )
            .build();

        self.quotations
            .create_indexes([quotation_number_idx, quotation_status_idx], None)
            .await?;

        let invoice_number_idx = IndexModel::builder()
            .keys(doc! { "invoice_number": 1 })
            .options(
                IndexOptions::builder()
                    .name("invoice_number_idx".to_string())
                    .unique(true)
                    .build(),
            )
            .build();

        let invoice_status_idx = IndexModel::builder()
            .keys(doc! { "status": 1, "due_date": 1 })
            .options(
                IndexOptions::builder()
                    .name("invoice_status_due_idx".to_string())
                    .build(),
            )
            .build();

        let invoice_client_idx = IndexModel::builder()
            .keys(doc! { "client_id": 1 })
            .options(
                IndexOptions::builder()
                    .name("invoice_client_idx".to_string())
                    .build(),
            )
            .build();

        self.invoices
            .create_indexes(
                [invoice_number_idx, invoice_status_idx, invoice_client_idx],
                None,
            )
            .await?;

        let payment_invoice_idx = IndexModel::builder()
            .keys(doc! { "invoice_id": 1 })
            .options(
                IndexOptions::builder()
                    .name("payment_invoice_idx".to_string())
                    .build(),
            )
            .build();

        self.payments
            .create_indexes([payment_invoice_idx], None)
            .await?;

        let notification_created_idx = IndexModel::builder()
            .keys(doc! { "created_utc": -1 })
            .options(
                IndexOptions::builder()
                    .name("notification_created_idx".to_string())
                    .build(),
            )
            .build();

        self.notifications
            .create_indexes([notification_created_idx], None)
            .await?;

        tracing::info!("Operations service indexes initialized");
        Ok(())
    }

    // Projects

    pub async fn insert_project(&self, project: &Project) -> Result<()> {
        self.projects.insert_one(project, None).await?;
        Ok(())
    }

    pub async fn find_project(&self, id: Uuid) -> Result<Option<Project>> {
        let project = self.projects.find_one(doc! { "_id": id.to_string() }, None).await?;
        Ok(project)
    }

    pub async fn save_project(&self, project: &Project) -> Result<()> {
        self.projects
            .replace_one(doc! { "_id": project.id.to_string() }, project, None)
            .await?;
        Ok(())
    }

    // Quotations

    pub async fn insert_quotation(&self, quotation: &Quotation) -> Result<()> {
        self.quotations.insert_one(quotation, None).await?;
        Ok(())
    }

    pub async fn find_quotation(&self, id: Uuid) -> Result<Option<Quotation>> {
        let quotation = self.quotations.find_one(doc! { "_id": id.to_string() }, None).await?;
        Ok(quotation)
    }

    /// Persist the full document. Mutations follow the read-modify-write
    /// pattern; there is no version check on the write.
    pub async fn save_quotation(&self, quotation: &Quotation) -> Result<()> {
        self.quotations
            .replace_one(doc! { "_id": quotation.id.to_string() }, quotation, None)
            .await?;
        Ok(())
    }

    /// Returns true when a document was actually removed.
    pub async fn delete_quotation(&self, id: Uuid) -> Result<bool> {
        let result = self.quotations.delete_one(doc! { "_id": id.to_string() }, None).await?;
        Ok(result.deleted_count > 0)
    }

    pub async fn list_quotations(
        &self,
        status: Option<QuotationStatus>,
        client_id: Option<Uuid>,
        limit: i64,
        offset: u64,
    ) -> Result<Vec<Quotation>> {
        let mut filter = doc! {};
        if let Some(status) = status {
            filter.insert("status", mongodb::bson::to_bson(&status)?);
        }
        if let Some(client_id) = client_id {
            filter.insert("client_id", client_id.to_string());
        }

        let options = FindOptions::builder()
            .sort(doc! { "created_utc": -1 })
            .skip(offset)
            .limit(limit)
            .build();

        let cursor = self.quotations.find(filter, options).await?;
        let quotations = cursor.try_collect().await?;
        Ok(quotations)
    }

    pub async fn scan_quotations(&self) -> Result<Vec<Quotation>> {
        let cursor = self.quotations.find(doc! {}, None).await?;
        let quotations = cursor.try_collect().await?;
        Ok(quotations)
    }

    // Invoices

    pub async fn insert_invoice(&self, invoice: &Invoice) -> Result<()> {
        self.invoices.insert_one(invoice, None).await?;
        Ok(())
    }

    pub async fn find_invoice(&self, id: Uuid) -> Result<Option<Invoice>> {
        let invoice = self.invoices.find_one(doc! { "_id": id.to_string() }, None).await?;
        Ok(invoice)
    }

    pub async fn save_invoice(&self, invoice: &Invoice) -> Result<()> {
        self.invoices
            .replace_one(doc! { "_id": invoice.id.to_string() }, invoice, None)
            .await?;
        Ok(())
    }

    pub async fn delete_invoice(&self, id: Uuid) -> Result<bool> {
        let result = self.invoices.delete_one(doc! { "_id": id.to_string() }, None).await?;
        Ok(result.deleted_count > 0)
    }

    pub async fn list_invoices(
        &self,
        status: Option<InvoiceStatus>,
        client_id: Option<Uuid>,
        limit: i64,
        offset: u64,
    ) -> Result<Vec<Invoice>> {
        let mut filter = doc! {};
        if let Some(status) = status {
            filter.insert("status", mongodb::bson::to_bson(&status)?);
        }
        if let Some(client_id) = client_id {
            filter.insert("client_id", client_id.to_string());
        }

        let options = FindOptions::builder()
            .sort(doc! { "created_utc": -1 })
            .skip(offset)
            .limit(limit)
            .build();

        let cursor = self.invoices.find(filter, options).await?;
        let invoices = cursor.try_collect().await?;
        Ok(invoices)
    }

    /// Full scan for the reporting rollups; aggregates are recomputed from
    /// scratch on every call.
    pub async fn scan_invoices(&self, client_id: Option<Uuid>) -> Result<Vec<Invoice>> {
        let mut filter = doc! {};
        if let Some(client_id) = client_id {
            filter.insert("client_id", client_id.to_string());
        }
        let cursor = self.invoices.find(filter, None).await?;
        let invoices = cursor.try_collect().await?;
        Ok(invoices)
    }

    // Payments

    pub async fn insert_payment(&self, payment: &Payment) -> Result<()> {
        self.payments.insert_one(payment, None).await?;
        Ok(())
    }

    pub async fn find_payment(&self, id: Uuid) -> Result<Option<Payment>> {
        let payment = self.payments.find_one(doc! { "_id": id.to_string() }, None).await?;
        Ok(payment)
    }

    pub async fn list_payments(
        &self,
        invoice_id: Option<Uuid>,
        limit: i64,
        offset: u64,
    ) -> Result<Vec<Payment>> {
        let mut filter = doc! {};
        if let Some(invoice_id) = invoice_id {
            filter.insert("invoice_id", invoice_id.to_string());
        }

        let options = FindOptions::builder()
            .sort(doc! { "payment_date": -1 })
            .skip(offset)
            .limit(limit)
            .build();

        let cursor = self.payments.find(filter, options).await?;
        let payments = cursor.try_collect().await?;
        Ok(payments)
    }

    pub async fn count_payments_for_invoice(&self, invoice_id: Uuid) -> Result<u64> {
        let count = self
            .payments
            .count_documents(doc! { "invoice_id": invoice_id.to_string() }, None)
            .await?;
        Ok(count)
    }

    // Notifications

    pub async fn insert_notification(&self, notification: &Notification) -> Result<()> {
        self.notifications.insert_one(notification, None).await?;
        Ok(())
    }

    pub async fn save_notification(&self, notification: &Notification) -> Result<()> {
        self.notifications
            .replace_one(doc! { "_id": notification.id.to_string() }, notification, None)
            .await?;
        Ok(())
    }

    pub async fn list_notifications(&self, limit: i64, offset: u64) -> Result<Vec<Notification>> {
        let options = FindOptions::builder()
            .sort(doc! { "created_utc": -1 })
            .skip(offset)
            .limit(limit)
            .build();

        let cursor = self.notifications.find(doc! {}, options).await?;
        let notifications = cursor.try_collect().await?;
        Ok(notifications)
    }
}
