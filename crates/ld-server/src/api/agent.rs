//! Agent session endpoints

use axum::extract::{Extension, Json, Path};
use axum::http::StatusCode;
use serde_json::json;
use tracing::instrument;
use validator::Validate;

use ld_api_contract::{
    AgentSession, ChatMessage, ChatRequest, ChatResponse, SessionStatus,
    UpdateAgentSessionRequest,
};
use ld_backend::Filter;

use crate::api::{decode_row, find_owned_project, find_session, SESSIONS_TABLE};
use crate::error::{ErrorKind, ServerResult};
use crate::extract::CurrentUser;
use crate::state::State;

/// Turns the project's quiz responses into a fresh planning session.
///
/// Replaces any existing session for the project via the keyed upsert;
/// two concurrent calls race last-write-wins.
#[instrument(skip_all)]
#[axum_macros::debug_handler]
pub(crate) async fn analyze(
    Extension(state): Extension<State>,
    CurrentUser(user): CurrentUser,
    Path(project_id): Path<String>,
) -> ServerResult<(StatusCode, Json<AgentSession>)> {
    let planner = state.planner()?;
    let project = find_owned_project(&state, &project_id, &user.id).await?;

    let quiz_responses = project.quiz_responses.ok_or_else(|| {
        ErrorKind::Validation("Quiz responses not found. Please complete the quiz first.".into())
    })?;

    let steps = planner.analyze_research_goal(&quiz_responses).await?;

    let row = state
        .tables
        .upsert(
            SESSIONS_TABLE,
            json!({
                "project_id": project_id,
                "steps": steps,
                "current_step": 0,
                "status": SessionStatus::Planning,
                "conversation_history": [],
            }),
            "project_id",
        )
        .await?;
    Ok((StatusCode::CREATED, Json(decode_row(row)?)))
}

/// Fetches the project's agent session.
#[instrument(skip_all)]
#[axum_macros::debug_handler]
pub(crate) async fn get(
    Extension(state): Extension<State>,
    CurrentUser(user): CurrentUser,
    Path(project_id): Path<String>,
) -> ServerResult<Json<AgentSession>> {
    find_owned_project(&state, &project_id, &user.id).await?;
    let session = find_session(&state, &project_id).await?;
    Ok(Json(session))
}

/// Merges the supplied fields into the session (steps editor surface).
#[instrument(skip_all)]
#[axum_macros::debug_handler]
pub(crate) async fn update_steps(
    Extension(state): Extension<State>,
    CurrentUser(user): CurrentUser,
    Path(project_id): Path<String>,
    Json(request): Json<UpdateAgentSessionRequest>,
) -> ServerResult<Json<AgentSession>> {
    find_owned_project(&state, &project_id, &user.id).await?;

    let rows = state
        .tables
        .update(
            SESSIONS_TABLE,
            &[Filter::eq("project_id", &project_id)],
            request.into_patch(),
        )
        .await?;
    let row = rows
        .into_iter()
        .next()
        .ok_or(ErrorKind::NotFound("Agent session"))?;
    Ok(Json(decode_row(row)?))
}

/// Refinement chat: asks the model against the current plan and appends
/// both sides of the exchange to the persisted history.
#[instrument(skip_all)]
#[axum_macros::debug_handler]
pub(crate) async fn chat(
    Extension(state): Extension<State>,
    CurrentUser(user): CurrentUser,
    Path(project_id): Path<String>,
    Json(request): Json<ChatRequest>,
) -> ServerResult<Json<ChatResponse>> {
    let planner = state.planner()?;
    request.validate()?;
    find_owned_project(&state, &project_id, &user.id).await?;
    let session = find_session(&state, &project_id).await?;

    let reply = planner
        .chat(&request.message, &session.conversation_history, &session.steps)
        .await?;

    let mut history = session.conversation_history;
    history.push(ChatMessage::user(request.message.as_str()));
    history.push(ChatMessage::assistant(reply.clone()));

    state
        .tables
        .update(
            SESSIONS_TABLE,
            &[Filter::eq("project_id", &project_id)],
            json!({ "conversation_history": history }),
        )
        .await?;
    Ok(Json(ChatResponse { response: reply }))
}

/// Marks one step as the current one and moves the session to
/// `executing`. The only automated status transition there is.
#[instrument(skip_all)]
#[axum_macros::debug_handler]
pub(crate) async fn execute_step(
    Extension(state): Extension<State>,
    CurrentUser(user): CurrentUser,
    Path((project_id, step_index)): Path<(String, u32)>,
) -> ServerResult<Json<AgentSession>> {
    find_owned_project(&state, &project_id, &user.id).await?;
    let session = find_session(&state, &project_id).await?;

    if step_index as usize >= session.steps.len() {
        return Err(ErrorKind::Validation("Invalid step index".into()).into());
    }

    let rows = state
        .tables
        .update(
            SESSIONS_TABLE,
            &[Filter::eq("project_id", &project_id)],
            json!({
                "current_step": step_index,
                "status": SessionStatus::Executing,
            }),
        )
        .await?;
    let row = rows
        .into_iter()
        .next()
        .ok_or_else(|| ErrorKind::Validation("Failed to update agent session".into()))?;
    Ok(Json(decode_row(row)?))
}
