//! File endpoints
//!
//! Uploads go straight from the frontend to object storage; this layer
//! only lists the rows and performs the two-step delete.

use axum::extract::{Extension, Json, Path};
use axum::http::StatusCode;
use tracing::instrument;

use ld_api_contract::FileRecord;
use ld_backend::{Filter, OrderBy};

use crate::api::{decode_row, find_owned_project, FILES_BUCKET, FILES_TABLE};
use crate::error::{ErrorKind, ServerResult};
use crate::extract::CurrentUser;
use crate::state::State;

/// Lists the project's files, newest first.
#[instrument(skip_all)]
#[axum_macros::debug_handler]
pub(crate) async fn list(
    Extension(state): Extension<State>,
    CurrentUser(user): CurrentUser,
    Path(project_id): Path<String>,
) -> ServerResult<Json<Vec<FileRecord>>> {
    find_owned_project(&state, &project_id, &user.id).await?;

    let rows = state
        .tables
        .select(
            FILES_TABLE,
            &[Filter::eq("project_id", &project_id)],
            Some(&OrderBy::desc("created_at")),
        )
        .await?;
    let files = rows.into_iter().map(decode_row).collect::<ServerResult<_>>()?;
    Ok(Json(files))
}

/// Deletes a file: storage object first, then the row.
///
/// The two removals are not transactional. When the row delete fails
/// after the object is gone (or the object removal fails and the request
/// errors with the row still present) the two stay out of sync; callers
/// get the error and nothing compensates.
#[instrument(skip_all)]
#[axum_macros::debug_handler]
pub(crate) async fn delete(
    Extension(state): Extension<State>,
    CurrentUser(user): CurrentUser,
    Path((project_id, file_id)): Path<(String, String)>,
) -> ServerResult<StatusCode> {
    find_owned_project(&state, &project_id, &user.id).await?;

    let rows = state
        .tables
        .select(
            FILES_TABLE,
            &[Filter::eq("id", &file_id), Filter::eq("project_id", &project_id)],
            None,
        )
        .await?;
    let row = rows.into_iter().next().ok_or(ErrorKind::NotFound("File"))?;
    let record: FileRecord = decode_row(row)?;

    state
        .storage
        .remove(FILES_BUCKET, &[record.path])
        .await?;
    state
        .tables
        .delete(FILES_TABLE, &[Filter::eq("id", &file_id)])
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
