//! Read access to the notification audit trail.

use axum::{
    extract::{Query, State},
    Json,
};
use ops_core::{error::AppError, response::ApiResponse};

use crate::{
    dtos::{ListNotificationsQuery, NotificationResponse},
    AppState,
};

pub async fn list_notifications(
    State(state): State<AppState>,
    Query(query): Query<ListNotificationsQuery>,
) -> Result<Json<ApiResponse<Vec<NotificationResponse>>>, AppError> {
    let notifications = state
        .repository
        .list_notifications(query.limit, query.offset)
        .await?;

    Ok(Json(ApiResponse::ok(
        notifications
            .into_iter()
            .map(NotificationResponse::from)
            .collect(),
    )))
}
