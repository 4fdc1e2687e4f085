//! Route handlers, grouped by resource

pub mod agent;
pub mod files;
pub mod notebook;
pub mod projects;

use anyhow::anyhow;
use ld_api_contract::{AgentSession, Project};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ErrorKind, ServerResult};
use crate::state::State;
use ld_backend::Filter;

pub(crate) const PROJECTS_TABLE: &str = "projects";
pub(crate) const NOTEBOOKS_TABLE: &str = "notebooks";
pub(crate) const FILES_TABLE: &str = "files";
pub(crate) const SESSIONS_TABLE: &str = "agent_sessions";
pub(crate) const FILES_BUCKET: &str = "project-files";

/// Shape a backend row into a typed record.
pub(crate) fn decode_row<T: DeserializeOwned>(row: Value) -> ServerResult<T> {
    serde_json::from_value(row)
        .map_err(|e| ErrorKind::Remote(anyhow!("malformed row from backend: {e}")).into())
}

/// Fetch a project scoped to its owner; an existing but foreign project
/// is indistinguishable from a missing one.
pub(crate) async fn find_owned_project(
    state: &State,
    project_id: &str,
    user_id: &str,
) -> ServerResult<Project> {
    let rows = state
        .tables
        .select(
            PROJECTS_TABLE,
            &[Filter::eq("id", project_id), Filter::eq("user_id", user_id)],
            None,
        )
        .await?;
    let row = rows
        .into_iter()
        .next()
        .ok_or(ErrorKind::NotFound("Project"))?;
    decode_row(row)
}

/// Fetch the at-most-one agent session of a project.
pub(crate) async fn find_session(state: &State, project_id: &str) -> ServerResult<AgentSession> {
    let rows = state
        .tables
        .select(SESSIONS_TABLE, &[Filter::eq("project_id", project_id)], None)
        .await?;
    let row = rows
        .into_iter()
        .next()
        .ok_or(ErrorKind::NotFound("Agent session"))?;
    decode_row(row)
}
