//! Project CRUD

use axum::extract::{Extension, Json, Path};
use axum::http::StatusCode;
use serde_json::json;
use tracing::instrument;
use validator::Validate;

use ld_api_contract::{CreateProjectRequest, Project, UpdateProjectRequest};
use ld_backend::{Filter, OrderBy};

use crate::api::{decode_row, find_owned_project, PROJECTS_TABLE};
use crate::error::{ErrorKind, ServerResult};
use crate::extract::CurrentUser;
use crate::state::State;

/// Lists the caller's projects, newest first.
#[instrument(skip_all)]
#[axum_macros::debug_handler]
pub(crate) async fn list(
    Extension(state): Extension<State>,
    CurrentUser(user): CurrentUser,
) -> ServerResult<Json<Vec<Project>>> {
    let rows = state
        .tables
        .select(
            PROJECTS_TABLE,
            &[Filter::eq("user_id", &user.id)],
            Some(&OrderBy::desc("created_at")),
        )
        .await?;
    let projects = rows.into_iter().map(decode_row).collect::<ServerResult<_>>()?;
    Ok(Json(projects))
}

/// Creates a project owned by the caller.
#[instrument(skip_all)]
#[axum_macros::debug_handler]
pub(crate) async fn create(
    Extension(state): Extension<State>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<CreateProjectRequest>,
) -> ServerResult<(StatusCode, Json<Project>)> {
    request.validate()?;

    let row = state
        .tables
        .insert(
            PROJECTS_TABLE,
            json!({
                "user_id": user.id,
                "title": request.title,
                "description": request.description,
                "quiz_responses": request.quiz_responses,
                "status": request.status,
            }),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(decode_row(row)?)))
}

/// Fetches one project.
#[instrument(skip_all)]
#[axum_macros::debug_handler]
pub(crate) async fn get(
    Extension(state): Extension<State>,
    CurrentUser(user): CurrentUser,
    Path(project_id): Path<String>,
) -> ServerResult<Json<Project>> {
    let project = find_owned_project(&state, &project_id, &user.id).await?;
    Ok(Json(project))
}

/// Merges the supplied fields into a project, leaving the rest as-is.
#[instrument(skip_all)]
#[axum_macros::debug_handler]
pub(crate) async fn update(
    Extension(state): Extension<State>,
    CurrentUser(user): CurrentUser,
    Path(project_id): Path<String>,
    Json(request): Json<UpdateProjectRequest>,
) -> ServerResult<Json<Project>> {
    find_owned_project(&state, &project_id, &user.id).await?;

    let rows = state
        .tables
        .update(
            PROJECTS_TABLE,
            &[Filter::eq("id", &project_id), Filter::eq("user_id", &user.id)],
            request.into_patch(),
        )
        .await?;
    let row = rows
        .into_iter()
        .next()
        .ok_or_else(|| ErrorKind::Validation("Failed to update project".into()))?;
    Ok(Json(decode_row(row)?))
}

/// Deletes a project row. Dependent rows are removed only as far as the
/// backend's own cascade rules go.
#[instrument(skip_all)]
#[axum_macros::debug_handler]
pub(crate) async fn delete(
    Extension(state): Extension<State>,
    CurrentUser(user): CurrentUser,
    Path(project_id): Path<String>,
) -> ServerResult<StatusCode> {
    state
        .tables
        .delete(
            PROJECTS_TABLE,
            &[Filter::eq("id", &project_id), Filter::eq("user_id", &user.id)],
        )
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
