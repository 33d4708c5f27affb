//! Dashboard rollups. Recomputed from full scans on every call; the two
//! collections are read non-transactionally.

use axum::{
    extract::{Query, State},
    Json,
};
use ops_core::{error::AppError, response::ApiResponse};

use crate::{
    dtos::StatsQuery,
    services::{summarize_invoices, summarize_quotations, DashboardSummary},
    AppState,
};

pub async fn summary(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<ApiResponse<DashboardSummary>>, AppError> {
    let mut quotations = state.repository.scan_quotations().await?;
    let mut invoices = state.repository.scan_invoices(query.client_id).await?;
    quotations.retain(|q| query.contains(q.created_utc));
    invoices.retain(|inv| query.contains(inv.created_utc));

    let quotation_stats = summarize_quotations(&quotations);
    let invoice_stats = summarize_invoices(&invoices);

    let total_revenue = invoice_stats.total_paid;
    let outstanding_balance = invoice_stats.total_outstanding;

    Ok(Json(ApiResponse::ok(DashboardSummary {
        quotations: quotation_stats,
        invoices: invoice_stats,
        total_revenue,
        outstanding_balance,
    })))
}
