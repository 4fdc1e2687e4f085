//! Injection seams for the managed backend
//!
//! Rows cross these traits as `serde_json::Value`; the server shapes them
//! into typed records at the edge. Only equality filters and a single
//! order column are modeled because that is the entire query surface the
//! route layer needs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::StoreResult;

/// An equality filter on one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: String,
    pub value: String,
}

impl Filter {
    /// Match rows whose `column` equals `value`.
    pub fn eq(column: impl Into<String>, value: impl ToString) -> Self {
        Self {
            column: column.into(),
            value: value.to_string(),
        }
    }
}

/// Result ordering on one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub descending: bool,
}

impl OrderBy {
    /// Order by `column`, newest-style descending.
    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: true,
        }
    }
}

/// Generic row CRUD against the backend's table API.
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Fetch all rows matching `filters`, optionally ordered.
    async fn select(
        &self,
        table: &str,
        filters: &[Filter],
        order: Option<&OrderBy>,
    ) -> StoreResult<Vec<Value>>;

    /// Insert one row and return it as stored.
    async fn insert(&self, table: &str, row: Value) -> StoreResult<Value>;

    /// Merge `patch` into every row matching `filters`; returns the
    /// updated rows (empty when nothing matched).
    async fn update(&self, table: &str, filters: &[Filter], patch: Value)
        -> StoreResult<Vec<Value>>;

    /// Insert `row`, replacing an existing row with the same value in the
    /// `on_conflict` column. Returns the winning row.
    async fn upsert(&self, table: &str, row: Value, on_conflict: &str) -> StoreResult<Value>;

    /// Delete every row matching `filters`. Deleting nothing is not an
    /// error.
    async fn delete(&self, table: &str, filters: &[Filter]) -> StoreResult<()>;
}

/// The authenticated identity behind a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Token verification against the identity provider.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Resolve a bearer token to a user, or `StoreError::Unauthorized`.
    async fn get_user(&self, access_token: &str) -> StoreResult<AuthUser>;
}

/// Object storage operations used by the route layer.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Remove the objects at `paths` from `bucket`.
    async fn remove(&self, bucket: &str, paths: &[String]) -> StoreResult<()>;
}
