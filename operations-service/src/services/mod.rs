pub mod metrics;
pub mod notifier;
pub mod reports;
pub mod repository;
pub mod sequence;

pub use metrics::{get_metrics, init_metrics, record_document, record_revenue};
pub use notifier::{
    LifecycleEvent, LogChannel, NotificationChannel, Notifier, NullChannel,
};
pub use reports::{summarize_invoices, summarize_quotations, DashboardSummary, InvoiceStats};
pub use repository::OpsRepository;
