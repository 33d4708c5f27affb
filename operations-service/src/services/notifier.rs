//! Best-effort notification fan-out.
//!
//! Lifecycle operations enqueue an event and return immediately; a spawned
//! worker persists a notification record and attempts delivery through a
//! [`NotificationChannel`]. Every failure on this path is logged and
//! swallowed. At-most-once, no retry, no ordering guarantee across events.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::models::Notification;
use crate::services::repository::OpsRepository;

#[derive(Debug, Clone)]
pub enum LifecycleEvent {
    QuotationCreated {
        quotation_number: String,
        client_id: Uuid,
        total_amount: f64,
    },
    QuotationSent {
        quotation_number: String,
        client_id: Uuid,
    },
    QuotationAccepted {
        quotation_number: String,
        client_id: Uuid,
    },
    QuotationRejected {
        quotation_number: String,
        client_id: Uuid,
        reason: Option<String>,
    },
    QuotationConverted {
        quotation_number: String,
        invoice_number: String,
        client_id: Uuid,
    },
    InvoiceCreated {
        invoice_number: String,
        client_id: Uuid,
        total_amount: f64,
    },
    InvoiceSent {
        invoice_number: String,
        client_id: Uuid,
    },
    InvoicePaid {
        invoice_number: String,
        client_id: Uuid,
        amount: f64,
    },
    InvoiceCancelled {
        invoice_number: String,
        client_id: Uuid,
    },
    PaymentRecorded {
        invoice_number: String,
        client_id: Uuid,
        amount: f64,
    },
}

impl LifecycleEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            LifecycleEvent::QuotationCreated { .. } => "quotation.created",
            LifecycleEvent::QuotationSent { .. } => "quotation.sent",
            LifecycleEvent::QuotationAccepted { .. } => "quotation.accepted",
            LifecycleEvent::QuotationRejected { .. } => "quotation.rejected",
            LifecycleEvent::QuotationConverted { .. } => "quotation.converted",
            LifecycleEvent::InvoiceCreated { .. } => "invoice.created",
            LifecycleEvent::InvoiceSent { .. } => "invoice.sent",
            LifecycleEvent::InvoicePaid { .. } => "invoice.paid",
            LifecycleEvent::InvoiceCancelled { .. } => "invoice.cancelled",
            LifecycleEvent::PaymentRecorded { .. } => "payment.recorded",
        }
    }

    pub fn client_id(&self) -> Uuid {
        match self {
            LifecycleEvent::QuotationCreated { client_id, .. }
            | LifecycleEvent::QuotationSent { client_id, .. }
            | LifecycleEvent::QuotationAccepted { client_id, .. }
            | LifecycleEvent::QuotationRejected { client_id, .. }
            | LifecycleEvent::QuotationConverted { client_id, .. }
            | LifecycleEvent::InvoiceCreated { client_id, .. }
            | LifecycleEvent::InvoiceSent { client_id, .. }
            | LifecycleEvent::InvoicePaid { client_id, .. }
            | LifecycleEvent::InvoiceCancelled { client_id, .. }
            | LifecycleEvent::PaymentRecorded { client_id, .. } => *client_id,
        }
    }

    pub fn subject(&self) -> String {
        match self {
            LifecycleEvent::QuotationCreated {
                quotation_number, ..
            } => format!("Quotation {} created", quotation_number),
            LifecycleEvent::QuotationSent {
                quotation_number, ..
            } => format!("Quotation {} sent", quotation_number),
            LifecycleEvent::QuotationAccepted {
                quotation_number, ..
            } => format!("Quotation {} accepted", quotation_number),
            LifecycleEvent::QuotationRejected {
                quotation_number, ..
            } => format!("Quotation {} rejected", quotation_number),
            LifecycleEvent::QuotationConverted {
                quotation_number,
                invoice_number,
                ..
            } => format!(
                "Quotation {} converted to invoice {}",
                quotation_number, invoice_number
            ),
            LifecycleEvent::InvoiceCreated { invoice_number, .. } => {
                format!("Invoice {} created", invoice_number)
            }
            LifecycleEvent::InvoiceSent { invoice_number, .. } => {
                format!("Invoice {} sent", invoice_number)
            }
            LifecycleEvent::InvoicePaid { invoice_number, .. } => {
                format!("Invoice {} paid in full", invoice_number)
            }
            LifecycleEvent::InvoiceCancelled { invoice_number, .. } => {
                format!("Invoice {} cancelled", invoice_number)
            }
            LifecycleEvent::PaymentRecorded { invoice_number, .. } => {
                format!("Payment received for invoice {}", invoice_number)
            }
        }
    }

    pub fn body(&self) -> String {
        match self {
            LifecycleEvent::QuotationCreated { total_amount, .. } => {
                format!("A quotation totalling {:.2} has been prepared.", total_amount)
            }
            LifecycleEvent::QuotationSent { .. } => {
                "Your quotation is ready for review.".to_string()
            }
            LifecycleEvent::QuotationAccepted { .. } => {
                "The quotation has been accepted.".to_string()
            }
            LifecycleEvent::QuotationRejected { reason, .. } => match reason {
                Some(reason) => format!("The quotation was rejected: {}", reason),
                None => "The quotation was rejected.".to_string(),
            },
            LifecycleEvent::QuotationConverted { .. } => {
                "The accepted quotation has been converted to an invoice.".to_string()
            }
            LifecycleEvent::InvoiceCreated { total_amount, .. } => {
                format!("An invoice totalling {:.2} has been issued.", total_amount)
            }
            LifecycleEvent::InvoiceSent { .. } => "Your invoice is ready.".to_string(),
            LifecycleEvent::InvoicePaid { amount, .. } => {
                format!("Payment of {:.2} settled the invoice.", amount)
            }
            LifecycleEvent::InvoiceCancelled { .. } => "The invoice was cancelled.".to_string(),
            LifecycleEvent::PaymentRecorded { amount, .. } => {
                format!("A payment of {:.2} was recorded.", amount)
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Delivery failed: {0}")]
    DeliveryFailed(String),
}

/// Outbound delivery channel. Email/SMS/push transports live behind this
/// seam; the default implementation only writes to the log.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn deliver(&self, notification: &Notification) -> Result<(), ChannelError>;
}

/// Logs the notification instead of delivering it. Stands in for the
/// external email/SMS gateway, which is outside this service.
pub struct LogChannel;

#[async_trait]
impl NotificationChannel for LogChannel {
    async fn deliver(&self, notification: &Notification) -> Result<(), ChannelError> {
        tracing::info!(
            recipient = %notification.recipient,
            kind = %notification.kind,
            subject = %notification.subject,
            "Delivering notification"
        );
        Ok(())
    }
}

/// Drops notifications silently; used in tests.
pub struct NullChannel;

#[async_trait]
impl NotificationChannel for NullChannel {
    async fn deliver(&self, _notification: &Notification) -> Result<(), ChannelError> {
        Ok(())
    }
}

/// Queue front-end held by the handlers. `notify` never blocks and never
/// fails the calling operation.
#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<LifecycleEvent>,
}

impl Notifier {
    /// Spawn the consumer task and return the queue handle.
    pub fn spawn(
        repository: OpsRepository,
        channel: std::sync::Arc<dyn NotificationChannel>,
    ) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<LifecycleEvent>();

        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                deliver_event(&repository, channel.as_ref(), event).await;
            }
            tracing::debug!("Notification queue closed");
        });

        Self { tx }
    }

    pub fn notify(&self, event: LifecycleEvent) {
        if self.tx.send(event).is_err() {
            tracing::warn!("Notification worker stopped; dropping event");
        }
    }
}

async fn deliver_event(
    repository: &OpsRepository,
    channel: &dyn NotificationChannel,
    event: LifecycleEvent,
) {
    let mut notification = Notification::new(
        event.client_id().to_string(),
        event.kind().to_string(),
        event.subject(),
        event.body(),
    );

    if let Err(e) = repository.insert_notification(&notification).await {
        tracing::warn!(kind = %notification.kind, "Failed to persist notification: {}", e);
        return;
    }

    match channel.deliver(&notification).await {
        Ok(()) => notification.mark_sent(),
        Err(e) => {
            tracing::warn!(kind = %notification.kind, "Notification delivery failed: {}", e);
            notification.mark_failed(e.to_string());
        }
    }

    if let Err(e) = repository.save_notification(&notification).await {
        tracing::warn!(kind = %notification.kind, "Failed to update notification: {}", e);
    }
}
