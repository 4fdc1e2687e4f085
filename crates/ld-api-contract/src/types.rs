//! Row types and request/response DTOs for the LabDesk API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::Validate;

/// Project lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    Draft,
    Active,
    Completed,
    Archived,
}

impl Default for ProjectStatus {
    fn default() -> Self {
        Self::Draft
    }
}

/// Agent session lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Planning,
    Executing,
    Completed,
    Error,
    Paused,
}

/// Role of one conversation history entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One entry of an agent session's conversation history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// A research project row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub user_id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quiz_responses: Option<Value>,
    pub status: ProjectStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A notebook row; cells are opaque blobs owned by the frontend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notebook {
    pub id: String,
    pub project_id: String,
    pub cells: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An uploaded file row; the bytes live in object storage under `path`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: String,
    pub project_id: String,
    pub user_id: String,
    pub name: String,
    pub path: String,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One unit of a generated research plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentStep {
    pub step_number: u32,
    pub title: String,
    pub description: String,
    pub code: String,
    #[serde(default)]
    pub dependencies: Vec<u32>,
}

/// The persisted state of one project's plan-execution workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSession {
    pub id: String,
    pub project_id: String,
    pub steps: Vec<AgentStep>,
    pub current_step: u32,
    pub status: SessionStatus,
    #[serde(default)]
    pub conversation_history: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Project creation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, message = "Title cannot be empty"))]
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quiz_responses: Option<Value>,
    #[serde(default)]
    pub status: ProjectStatus,
}

/// Partial project update; absent fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateProjectRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quiz_responses: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ProjectStatus>,
}

impl UpdateProjectRequest {
    /// Render only the supplied fields as a row patch.
    pub fn into_patch(self) -> Value {
        let mut patch = Map::new();
        if let Some(title) = self.title {
            patch.insert("title".into(), Value::String(title));
        }
        if let Some(description) = self.description {
            patch.insert("description".into(), Value::String(description));
        }
        if let Some(quiz_responses) = self.quiz_responses {
            patch.insert("quiz_responses".into(), quiz_responses);
        }
        if let Some(status) = self.status {
            patch.insert("status".into(), serde_json::to_value(status).unwrap());
        }
        Value::Object(patch)
    }
}

/// Notebook creation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateNotebookRequest {
    pub cells: Vec<Value>,
}

/// Partial notebook update
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateNotebookRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cells: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl UpdateNotebookRequest {
    /// Render only the supplied fields as a row patch.
    pub fn into_patch(self) -> Value {
        let mut patch = Map::new();
        if let Some(cells) = self.cells {
            patch.insert("cells".into(), Value::Array(cells));
        }
        if let Some(metadata) = self.metadata {
            patch.insert("metadata".into(), metadata);
        }
        Value::Object(patch)
    }
}

/// Partial agent session update (steps editor surface)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateAgentSessionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<AgentStep>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_step: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<SessionStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_history: Option<Vec<ChatMessage>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl UpdateAgentSessionRequest {
    /// Render only the supplied fields as a row patch.
    pub fn into_patch(self) -> Value {
        let mut patch = Map::new();
        if let Some(steps) = self.steps {
            patch.insert("steps".into(), serde_json::to_value(steps).unwrap());
        }
        if let Some(current_step) = self.current_step {
            patch.insert("current_step".into(), current_step.into());
        }
        if let Some(status) = self.status {
            patch.insert("status".into(), serde_json::to_value(status).unwrap());
        }
        if let Some(history) = self.conversation_history {
            patch.insert(
                "conversation_history".into(),
                serde_json::to_value(history).unwrap(),
            );
        }
        if let Some(metadata) = self.metadata {
            patch.insert("metadata".into(), metadata);
        }
        Value::Object(patch)
    }
}

/// Agent chat request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ChatRequest {
    #[validate(length(min = 1, message = "Message cannot be empty"))]
    pub message: String,
}

/// Agent chat response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}
