//! Project handlers. Projects exist here mainly as the owners of the
//! quotation/invoice forward pointers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use ops_core::{error::AppError, response::ApiResponse};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{CreateProjectRequest, ProjectResponse},
    models::Project,
    services::record_document,
    AppState,
};

pub async fn create_project(
    State(state): State<AppState>,
    Json(payload): Json<CreateProjectRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ProjectResponse>>), AppError> {
    payload.validate()?;

    let now = Utc::now();
    let project = Project {
        id: Uuid::new_v4(),
        title: payload.title,
        client_id: payload.client_id,
        description: payload.description,
        quotation_id: None,
        invoice_id: None,
        created_utc: now,
        updated_utc: now,
    };

    tracing::info!(project_id = %project.id, client_id = %project.client_id, "Creating project");

    state.repository.insert_project(&project).await?;
    record_document("project", "created");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(ProjectResponse::from(project))),
    ))
}

pub async fn get_project(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<ApiResponse<ProjectResponse>>, AppError> {
    let project = state
        .repository
        .find_project(project_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Project not found")))?;

    Ok(Json(ApiResponse::ok(ProjectResponse::from(project))))
}
