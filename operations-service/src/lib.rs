pub mod config;
pub mod dtos;
pub mod handlers;
pub mod models;
pub mod services;

use axum::middleware::from_fn;
use axum::{
    routing::{get, patch, post},
    Router,
};
use mongodb::{options::ClientOptions, Client};
use ops_core::middleware::{metrics::metrics_middleware, tracing::request_id_middleware};
use secrecy::ExposeSecret;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use config::Config;
use services::{LogChannel, NotificationChannel, Notifier, OpsRepository};

#[derive(Clone)]
pub struct AppState {
    pub db: mongodb::Database,
    pub config: Config,
    pub repository: OpsRepository,
    pub notifier: Notifier,
}

pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
    db: mongodb::Database,
}

impl Application {
    /// Build the application with the default (log-only) notification
    /// channel.
    pub async fn build(config: Config) -> anyhow::Result<Self> {
        Self::build_with_channel(config, Arc::new(LogChannel)).await
    }

    pub async fn build_with_channel(
        config: Config,
        channel: Arc<dyn NotificationChannel>,
    ) -> anyhow::Result<Self> {
        let mut client_options = ClientOptions::parse(config.database.url.expose_secret()).await?;
        client_options.app_name = Some(config.service_name.clone());

        let client = Client::with_options(client_options)?;
        let db = client.database(&config.database.db_name);

        let repository = OpsRepository::new(&db);
        repository.init_indexes().await?;

        let notifier = Notifier::spawn(repository.clone(), channel);

        let state = AppState {
            db: db.clone(),
            config: config.clone(),
            repository,
            notifier,
        };

        let router = Router::new()
            .route("/health", get(handlers::health_check))
            .route("/ready", get(handlers::readiness_check))
            .route("/metrics", get(handlers::metrics))
            // Projects
            .route("/projects", post(handlers::projects::create_project))
            .route("/projects/:id", get(handlers::projects::get_project))
            // Quotations
            .route(
                "/quotations",
                post(handlers::quotations::create_quotation)
                    .get(handlers::quotations::list_quotations),
            )
            .route(
                "/quotations/:id",
                get(handlers::quotations::get_quotation)
                    .patch(handlers::quotations::update_quotation)
                    .delete(handlers::quotations::delete_quotation),
            )
            .route(
                "/quotations/:id/send",
                patch(handlers::quotations::send_quotation),
            )
            .route(
                "/quotations/:id/accept",
                patch(handlers::quotations::accept_quotation),
            )
            .route(
                "/quotations/:id/reject",
                patch(handlers::quotations::reject_quotation),
            )
            .route(
                "/quotations/:id/convert-to-invoice",
                post(handlers::quotations::convert_to_invoice),
            )
            // Invoices
            .route(
                "/invoices",
                post(handlers::invoices::create_invoice).get(handlers::invoices::list_invoices),
            )
            .route("/invoices/stats", get(handlers::invoices::invoice_stats))
            .route(
                "/invoices/overdue",
                get(handlers::invoices::overdue_invoices),
            )
            .route(
                "/invoices/:id",
                get(handlers::invoices::get_invoice)
                    .patch(handlers::invoices::update_invoice)
                    .delete(handlers::invoices::delete_invoice),
            )
            .route("/invoices/:id/send", patch(handlers::invoices::send_invoice))
            .route(
                "/invoices/:id/mark-paid",
                patch(handlers::invoices::mark_paid),
            )
            .route(
                "/invoices/:id/cancel",
                patch(handlers::invoices::cancel_invoice),
            )
            .route(
                "/invoices/:id/mark-overdue",
                patch(handlers::invoices::mark_overdue),
            )
            .route(
                "/invoices/:id/payments",
                get(handlers::invoices::list_invoice_payments),
            )
            // Payments
            .route(
                "/payments",
                post(handlers::payments::create_payment).get(handlers::payments::list_payments),
            )
            .route("/payments/:id", get(handlers::payments::get_payment))
            // Reporting
            .route("/dashboard/summary", get(handlers::dashboard::summary))
            .route(
                "/notifications",
                get(handlers::notifications::list_notifications),
            )
            .layer(CorsLayer::permissive())
            .layer(from_fn(metrics_middleware))
            .layer(from_fn(request_id_middleware))
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                    let request_id = request
                        .headers()
                        .get("x-request-id")
                        .and_then(|value| value.to_str().ok())
                        .unwrap_or("-");

                    tracing::info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = %request.method(),
                        uri = %request.uri(),
                        version = ?request.version(),
                    )
                }),
            )
            .with_state(state);

        // Port 0 binds a random port for tests.
        let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
        let listener = TcpListener::bind(addr).await?;
        let port = listener.local_addr()?.port();

        Ok(Self {
            port,
            listener,
            router,
            db,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn db(&self) -> &mongodb::Database {
        &self.db
    }

    pub async fn run_until_stopped(self) -> anyhow::Result<()> {
        tracing::info!("Listening on port {}", self.port);
        axum::serve(self.listener, self.router).await?;
        Ok(())
    }
}
