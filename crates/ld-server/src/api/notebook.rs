//! Notebook endpoints
//!
//! One notebook per project by convention; the routes address it through
//! the project rather than by its own id.

use axum::extract::{Extension, Json, Path};
use axum::http::StatusCode;
use serde_json::json;
use tracing::instrument;

use ld_api_contract::{CreateNotebookRequest, Notebook, UpdateNotebookRequest};
use ld_backend::Filter;

use crate::api::{decode_row, find_owned_project, NOTEBOOKS_TABLE};
use crate::error::{ErrorKind, ServerResult};
use crate::extract::CurrentUser;
use crate::state::State;

/// Fetches the project's notebook.
#[instrument(skip_all)]
#[axum_macros::debug_handler]
pub(crate) async fn get(
    Extension(state): Extension<State>,
    CurrentUser(user): CurrentUser,
    Path(project_id): Path<String>,
) -> ServerResult<Json<Notebook>> {
    find_owned_project(&state, &project_id, &user.id).await?;

    let rows = state
        .tables
        .select(NOTEBOOKS_TABLE, &[Filter::eq("project_id", &project_id)], None)
        .await?;
    let row = rows
        .into_iter()
        .next()
        .ok_or(ErrorKind::NotFound("Notebook"))?;
    Ok(Json(decode_row(row)?))
}

/// Creates the project's notebook.
#[instrument(skip_all)]
#[axum_macros::debug_handler]
pub(crate) async fn create(
    Extension(state): Extension<State>,
    CurrentUser(user): CurrentUser,
    Path(project_id): Path<String>,
    Json(request): Json<CreateNotebookRequest>,
) -> ServerResult<(StatusCode, Json<Notebook>)> {
    find_owned_project(&state, &project_id, &user.id).await?;

    let row = state
        .tables
        .insert(
            NOTEBOOKS_TABLE,
            json!({
                "project_id": project_id,
                "cells": request.cells,
            }),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(decode_row(row)?)))
}

/// Merges the supplied fields into the project's notebook.
#[instrument(skip_all)]
#[axum_macros::debug_handler]
pub(crate) async fn update(
    Extension(state): Extension<State>,
    CurrentUser(user): CurrentUser,
    Path(project_id): Path<String>,
    Json(request): Json<UpdateNotebookRequest>,
) -> ServerResult<Json<Notebook>> {
    find_owned_project(&state, &project_id, &user.id).await?;

    let rows = state
        .tables
        .update(
            NOTEBOOKS_TABLE,
            &[Filter::eq("project_id", &project_id)],
            request.into_patch(),
        )
        .await?;
    let row = rows
        .into_iter()
        .next()
        .ok_or(ErrorKind::NotFound("Notebook"))?;
    Ok(Json(decode_row(row)?))
}
