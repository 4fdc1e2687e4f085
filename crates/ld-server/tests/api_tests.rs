//! End-to-end tests for the route layer, run against the in-memory
//! backend fakes and a scripted text model.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use ld_agent::Planner;
use ld_backend::TableStore;
use ld_backend_mock::{InMemoryStorage, InMemoryTables, ScriptedModel, StaticAuth};
use ld_server::{router, State};

const TOKEN_A: &str = "token-a";
const TOKEN_B: &str = "token-b";

struct TestApp {
    router: Router,
    tables: Arc<InMemoryTables>,
    storage: Arc<InMemoryStorage>,
    model: Arc<ScriptedModel>,
}

fn test_app(with_model: bool) -> TestApp {
    let tables = Arc::new(InMemoryTables::new());
    let storage = Arc::new(InMemoryStorage::new());
    let model = Arc::new(ScriptedModel::new());
    let auth = Arc::new(
        StaticAuth::new()
            .with_user(TOKEN_A, "user-a")
            .with_user(TOKEN_B, "user-b"),
    );

    let planner = with_model.then(|| Planner::new(model.clone() as Arc<dyn ld_agent::TextModel>));
    let state = State::new(tables.clone(), auth, storage.clone(), planner);

    TestApp {
        router: router(state),
        tables,
        storage,
        model,
    }
}

async fn send(
    app: &TestApp,
    method: Method,
    path: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn create_project(app: &TestApp, token: &str, body: Value) -> Value {
    let (status, project) = send(app, Method::POST, "/api/projects", Some(token), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    project
}

fn quiz_project_body() -> Value {
    json!({
        "title": "Gene expression study",
        "description": "RNA-seq of treated samples",
        "quiz_responses": {
            "field": "Biology",
            "question": "Which genes respond to the treatment?",
            "dataType": "tabular",
            "dataFormat": "CSV",
            "outcomes": "Differentially expressed genes"
        }
    })
}

const PLAN_REPLY: &str = r#"```json
[
  {"step_number": 1, "title": "Load data", "description": "Read the CSV", "code": "import pandas as pd", "dependencies": []},
  {"step_number": 2, "title": "Normalize", "description": "Scale counts", "code": "df = df / df.sum()", "dependencies": [1]},
  {"step_number": 3, "title": "Test", "description": "Run t-tests", "code": "from scipy import stats", "dependencies": [1, 2]}
]
```"#;

#[tokio::test]
async fn test_health_requires_no_auth() {
    let app = test_app(false);
    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_missing_or_invalid_token_is_unauthorized() {
    let app = test_app(false);

    let (status, body) = send(&app, Method::GET, "/api/projects", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let (status, _) = send(&app, Method::GET, "/api/projects", Some("forged"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_projects_are_listed_newest_first() {
    let app = test_app(false);
    create_project(&app, TOKEN_A, json!({ "title": "First" })).await;
    create_project(&app, TOKEN_A, json!({ "title": "Second" })).await;

    let (status, body) = send(&app, Method::GET, "/api/projects", Some(TOKEN_A), None).await;
    assert_eq!(status, StatusCode::OK);
    let projects = body.as_array().unwrap();
    assert_eq!(projects.len(), 2);
    assert_eq!(projects[0]["title"], "Second");
    assert_eq!(projects[1]["title"], "First");
}

#[tokio::test]
async fn test_create_rejects_empty_title() {
    let app = test_app(false);
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/projects",
        Some(TOKEN_A),
        Some(json!({ "title": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");
}

#[tokio::test]
async fn test_project_is_invisible_to_other_users() {
    let app = test_app(false);
    let project = create_project(&app, TOKEN_A, json!({ "title": "Private" })).await;
    let path = format!("/api/projects/{}", project["id"].as_str().unwrap());

    let (status, body) = send(&app, Method::GET, &path, Some(TOKEN_B), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, _) = send(
        &app,
        Method::PUT,
        &path,
        Some(TOKEN_B),
        Some(json!({ "title": "Taken over" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, list) = send(&app, Method::GET, "/api/projects", Some(TOKEN_B), None).await;
    assert_eq!(list.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_partial_update_preserves_unset_fields() {
    let app = test_app(false);
    let project = create_project(&app, TOKEN_A, quiz_project_body()).await;
    let path = format!("/api/projects/{}", project["id"].as_str().unwrap());

    let (status, updated) = send(
        &app,
        Method::PUT,
        &path,
        Some(TOKEN_A),
        Some(json!({ "title": "Renamed study" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "Renamed study");
    assert_eq!(updated["description"], "RNA-seq of treated samples");
    assert_eq!(updated["status"], "draft");
    assert_eq!(updated["quiz_responses"]["field"], "Biology");
}

#[tokio::test]
async fn test_delete_project_returns_no_content() {
    let app = test_app(false);
    let project = create_project(&app, TOKEN_A, json!({ "title": "Short-lived" })).await;
    let path = format!("/api/projects/{}", project["id"].as_str().unwrap());

    let (status, body) = send(&app, Method::DELETE, &path, Some(TOKEN_A), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, _) = send(&app, Method::GET, &path, Some(TOKEN_A), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_notebook_lifecycle() {
    let app = test_app(false);
    let project = create_project(&app, TOKEN_A, json!({ "title": "With notebook" })).await;
    let path = format!("/api/projects/{}/notebook", project["id"].as_str().unwrap());

    let (status, _) = send(&app, Method::GET, &path, Some(TOKEN_A), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let cells = json!([{ "type": "code", "source": "print('hi')" }]);
    let (status, notebook) = send(
        &app,
        Method::POST,
        &path,
        Some(TOKEN_A),
        Some(json!({ "cells": cells })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(notebook["cells"], cells);

    let (status, updated) = send(
        &app,
        Method::PUT,
        &path,
        Some(TOKEN_A),
        Some(json!({ "metadata": { "kernel": "python3" } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["metadata"]["kernel"], "python3");
    assert_eq!(updated["cells"], cells, "cells survive a metadata-only update");
}

#[tokio::test]
async fn test_file_delete_removes_object_and_row() {
    let app = test_app(false);
    let project = create_project(&app, TOKEN_A, json!({ "title": "With files" })).await;
    let project_id = project["id"].as_str().unwrap();

    app.storage.put("project-files", "user-a/data.csv");
    let file = app
        .tables
        .insert(
            "files",
            json!({
                "project_id": project_id,
                "user_id": "user-a",
                "name": "data.csv",
                "path": "user-a/data.csv",
                "size": 2048
            }),
        )
        .await
        .unwrap();

    let path = format!(
        "/api/projects/{}/files/{}",
        project_id,
        file["id"].as_str().unwrap()
    );
    let (status, _) = send(&app, Method::DELETE, &path, Some(TOKEN_A), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(!app.storage.contains("project-files", "user-a/data.csv"));
    assert!(app.tables.rows("files").is_empty());
}

#[tokio::test]
async fn test_file_delete_storage_failure_leaves_row() {
    // The two-step delete has no compensation: when object removal
    // fails, the request errors and the row stays. Asserted here as the
    // known out-of-sync gap rather than fixed.
    let app = test_app(false);
    let project = create_project(&app, TOKEN_A, json!({ "title": "With files" })).await;
    let project_id = project["id"].as_str().unwrap();

    app.storage.put("project-files", "user-a/data.csv");
    let file = app
        .tables
        .insert(
            "files",
            json!({
                "project_id": project_id,
                "user_id": "user-a",
                "name": "data.csv",
                "path": "user-a/data.csv",
                "size": 2048
            }),
        )
        .await
        .unwrap();
    app.storage.fail_removals(true);

    let path = format!(
        "/api/projects/{}/files/{}",
        project_id,
        file["id"].as_str().unwrap()
    );
    let (status, body) = send(&app, Method::DELETE, &path, Some(TOKEN_A), None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "remote_failure");
    assert_eq!(app.tables.rows("files").len(), 1);
    assert!(app.storage.contains("project-files", "user-a/data.csv"));
}

#[tokio::test]
async fn test_analyze_unavailable_without_model() {
    let app = test_app(false);
    let project = create_project(&app, TOKEN_A, quiz_project_body()).await;
    let path = format!(
        "/api/projects/{}/agent/analyze",
        project["id"].as_str().unwrap()
    );

    let (status, body) = send(&app, Method::POST, &path, Some(TOKEN_A), None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "agent_unavailable");
}

#[tokio::test]
async fn test_analyze_requires_quiz_responses() {
    let app = test_app(true);
    let project = create_project(&app, TOKEN_A, json!({ "title": "No quiz yet" })).await;
    let path = format!(
        "/api/projects/{}/agent/analyze",
        project["id"].as_str().unwrap()
    );

    let (status, body) = send(&app, Method::POST, &path, Some(TOKEN_A), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");
}

#[tokio::test]
async fn test_analyze_creates_planning_session() {
    let app = test_app(true);
    app.model.push_reply(PLAN_REPLY);
    let project = create_project(&app, TOKEN_A, quiz_project_body()).await;
    let path = format!(
        "/api/projects/{}/agent/analyze",
        project["id"].as_str().unwrap()
    );

    let (status, session) = send(&app, Method::POST, &path, Some(TOKEN_A), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(session["status"], "planning");
    assert_eq!(session["current_step"], 0);
    assert_eq!(session["conversation_history"], json!([]));

    // Plan invariants: numbers unique, increasing from 1; dependencies
    // only reference earlier steps.
    let steps = session["steps"].as_array().unwrap();
    assert_eq!(steps.len(), 3);
    for (index, step) in steps.iter().enumerate() {
        let number = step["step_number"].as_u64().unwrap();
        assert_eq!(number, index as u64 + 1);
        for dep in step["dependencies"].as_array().unwrap() {
            assert!(dep.as_u64().unwrap() < number);
        }
    }

    // The quiz responses made it into the model prompt.
    let prompts = app.model.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Biology researcher"));
    assert!(prompts[0].contains("Which genes respond to the treatment?"));
}

#[tokio::test]
async fn test_reanalyze_keeps_a_single_session() {
    let app = test_app(true);
    app.model.push_reply(PLAN_REPLY);
    app.model
        .push_reply(r#"[{"step_number": 1, "title": "Only step", "description": "All at once", "code": "pass"}]"#);
    let project = create_project(&app, TOKEN_A, quiz_project_body()).await;
    let path = format!(
        "/api/projects/{}/agent/analyze",
        project["id"].as_str().unwrap()
    );

    let (status, first) = send(&app, Method::POST, &path, Some(TOKEN_A), None).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, second) = send(&app, Method::POST, &path, Some(TOKEN_A), None).await;
    assert_eq!(status, StatusCode::CREATED);

    assert_eq!(first["id"], second["id"], "analyze upserts by project");
    assert_eq!(second["steps"].as_array().unwrap().len(), 1);
    assert_eq!(app.tables.rows("agent_sessions").len(), 1);
}

#[tokio::test]
async fn test_malformed_reply_still_yields_a_plan() {
    let app = test_app(true);
    app.model.push_reply("I am sorry, I cannot produce a plan today.");
    let project = create_project(&app, TOKEN_A, quiz_project_body()).await;
    let path = format!(
        "/api/projects/{}/agent/analyze",
        project["id"].as_str().unwrap()
    );

    let (status, session) = send(&app, Method::POST, &path, Some(TOKEN_A), None).await;
    assert_eq!(status, StatusCode::CREATED);
    let steps = session["steps"].as_array().unwrap();
    assert_eq!(steps.len(), 1);
    assert_eq!(steps[0]["step_number"], 1);
    assert_eq!(steps[0]["title"], "Load and analyze data");
}

#[tokio::test]
async fn test_chat_appends_two_history_entries() {
    let app = test_app(true);
    app.model.push_reply(PLAN_REPLY);
    let project = create_project(&app, TOKEN_A, quiz_project_body()).await;
    let project_id = project["id"].as_str().unwrap().to_string();
    let analyze = format!("/api/projects/{project_id}/agent/analyze");
    send(&app, Method::POST, &analyze, Some(TOKEN_A), None).await;

    app.model.push_reply("You could add a PCA step after normalization.");
    let chat = format!("/api/projects/{project_id}/agent/chat");
    let (status, body) = send(
        &app,
        Method::POST,
        &chat,
        Some(TOKEN_A),
        Some(json!({ "message": "How do I reduce dimensionality?" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["response"],
        "You could add a PCA step after normalization."
    );

    app.model.push_reply("Scree plots help pick the component count.");
    let (status, _) = send(
        &app,
        Method::POST,
        &chat,
        Some(TOKEN_A),
        Some(json!({ "message": "How many components?" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let agent = format!("/api/projects/{project_id}/agent");
    let (_, session) = send(&app, Method::GET, &agent, Some(TOKEN_A), None).await;
    let history = session["conversation_history"].as_array().unwrap();
    assert_eq!(history.len(), 4, "each exchange appends exactly two entries");
    assert_eq!(history[0]["role"], "user");
    assert_eq!(history[0]["content"], "How do I reduce dimensionality?");
    assert_eq!(history[1]["role"], "assistant");
    assert_eq!(history[2]["content"], "How many components?");
    assert_eq!(history[3]["role"], "assistant");
}

#[tokio::test]
async fn test_chat_rejects_empty_message() {
    let app = test_app(true);
    let project = create_project(&app, TOKEN_A, quiz_project_body()).await;
    let chat = format!(
        "/api/projects/{}/agent/chat",
        project["id"].as_str().unwrap()
    );

    let (status, body) = send(
        &app,
        Method::POST,
        &chat,
        Some(TOKEN_A),
        Some(json!({ "message": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");
    assert!(app.model.prompts().is_empty(), "no model call on invalid input");
}

#[tokio::test]
async fn test_chat_requires_existing_session() {
    let app = test_app(true);
    let project = create_project(&app, TOKEN_A, quiz_project_body()).await;
    let chat = format!(
        "/api/projects/{}/agent/chat",
        project["id"].as_str().unwrap()
    );

    let (status, body) = send(
        &app,
        Method::POST,
        &chat,
        Some(TOKEN_A),
        Some(json!({ "message": "Hello?" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_update_steps_replaces_the_plan() {
    let app = test_app(true);
    app.model.push_reply(PLAN_REPLY);
    let project = create_project(&app, TOKEN_A, quiz_project_body()).await;
    let project_id = project["id"].as_str().unwrap().to_string();
    let analyze = format!("/api/projects/{project_id}/agent/analyze");
    send(&app, Method::POST, &analyze, Some(TOKEN_A), None).await;

    let steps_path = format!("/api/projects/{project_id}/agent/steps");
    let (status, session) = send(
        &app,
        Method::PUT,
        &steps_path,
        Some(TOKEN_A),
        Some(json!({
            "steps": [{
                "step_number": 1,
                "title": "Hand-written step",
                "description": "Replaces the generated plan",
                "code": "print('custom')",
                "dependencies": []
            }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let steps = session["steps"].as_array().unwrap();
    assert_eq!(steps.len(), 1);
    assert_eq!(steps[0]["title"], "Hand-written step");
    assert_eq!(session["status"], "planning", "status untouched by a steps-only update");
}

#[tokio::test]
async fn test_execute_step_out_of_bounds_does_not_mutate() {
    let app = test_app(true);
    app.model.push_reply(PLAN_REPLY);
    let project = create_project(&app, TOKEN_A, quiz_project_body()).await;
    let project_id = project["id"].as_str().unwrap().to_string();
    let analyze = format!("/api/projects/{project_id}/agent/analyze");
    send(&app, Method::POST, &analyze, Some(TOKEN_A), None).await;

    let execute = format!("/api/projects/{project_id}/agent/execute/7");
    let (status, body) = send(&app, Method::POST, &execute, Some(TOKEN_A), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");

    let agent = format!("/api/projects/{project_id}/agent");
    let (_, session) = send(&app, Method::GET, &agent, Some(TOKEN_A), None).await;
    assert_eq!(session["current_step"], 0);
    assert_eq!(session["status"], "planning");
}

#[tokio::test]
async fn test_execute_step_marks_session_executing() {
    let app = test_app(true);
    app.model.push_reply(PLAN_REPLY);
    let project = create_project(&app, TOKEN_A, quiz_project_body()).await;
    let project_id = project["id"].as_str().unwrap().to_string();
    let analyze = format!("/api/projects/{project_id}/agent/analyze");
    send(&app, Method::POST, &analyze, Some(TOKEN_A), None).await;

    let execute = format!("/api/projects/{project_id}/agent/execute/1");
    let (status, session) = send(&app, Method::POST, &execute, Some(TOKEN_A), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["current_step"], 1);
    assert_eq!(session["status"], "executing");
}
