//! In-memory fakes for the LabDesk backend seams
//!
//! One fake per injection seam: tables, auth, object storage, and the
//! text model. The table fake reproduces the semantics the server relies
//! on (equality filters, created_at ordering, partial-merge updates,
//! keyed upsert) without any of the wire layer.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

use ld_agent::{ModelError, ModelResult, TextModel};
use ld_backend::{
    AuthApi, AuthUser, Filter, ObjectStorage, OrderBy, StoreError, StoreResult, TableStore,
};

fn now_rfc3339() -> String {
    // Fixed precision keeps lexicographic order equal to time order.
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn matches(row: &Value, filters: &[Filter]) -> bool {
    filters.iter().all(|filter| match row.get(&filter.column) {
        Some(Value::String(s)) => *s == filter.value,
        Some(Value::Null) | None => false,
        Some(other) => other.to_string() == filter.value,
    })
}

fn column_key(row: &Value, column: &str) -> String {
    match row.get(column) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

fn merge_into(target: &mut Map<String, Value>, patch: Value) {
    if let Value::Object(patch) = patch {
        for (key, value) in patch {
            target.insert(key, value);
        }
    }
}

/// In-memory table store.
#[derive(Default)]
pub struct InMemoryTables {
    tables: Mutex<HashMap<String, Vec<Value>>>,
}

impl InMemoryTables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every row currently in `table`, for assertions.
    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl TableStore for InMemoryTables {
    async fn select(
        &self,
        table: &str,
        filters: &[Filter],
        order: Option<&OrderBy>,
    ) -> StoreResult<Vec<Value>> {
        let tables = self.tables.lock().unwrap();
        let mut rows: Vec<Value> = tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| matches(row, filters))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(order) = order {
            rows.sort_by(|a, b| {
                let (ka, kb) = (column_key(a, &order.column), column_key(b, &order.column));
                if order.descending {
                    kb.cmp(&ka)
                } else {
                    ka.cmp(&kb)
                }
            });
        }
        Ok(rows)
    }

    async fn insert(&self, table: &str, row: Value) -> StoreResult<Value> {
        let mut stored = match row {
            Value::Object(map) => map,
            other => {
                return Err(StoreError::Api {
                    status: 400,
                    message: format!("expected a row object, got {}", other),
                })
            }
        };
        stored
            .entry("id")
            .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
        let now = now_rfc3339();
        stored
            .entry("created_at")
            .or_insert_with(|| Value::String(now.clone()));
        stored
            .entry("updated_at")
            .or_insert_with(|| Value::String(now));

        let row = Value::Object(stored);
        self.tables
            .lock()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .push(row.clone());
        Ok(row)
    }

    async fn update(
        &self,
        table: &str,
        filters: &[Filter],
        patch: Value,
    ) -> StoreResult<Vec<Value>> {
        let mut tables = self.tables.lock().unwrap();
        let mut updated = Vec::new();
        if let Some(rows) = tables.get_mut(table) {
            for row in rows.iter_mut() {
                if !matches(row, filters) {
                    continue;
                }
                if let Value::Object(target) = row {
                    merge_into(target, patch.clone());
                    target.insert("updated_at".into(), Value::String(now_rfc3339()));
                }
                updated.push(row.clone());
            }
        }
        Ok(updated)
    }

    async fn upsert(&self, table: &str, row: Value, on_conflict: &str) -> StoreResult<Value> {
        let key = column_key(&row, on_conflict);
        {
            let mut tables = self.tables.lock().unwrap();
            if let Some(rows) = tables.get_mut(table) {
                if let Some(existing) = rows
                    .iter_mut()
                    .find(|existing| column_key(existing, on_conflict) == key)
                {
                    if let Value::Object(target) = existing {
                        let mut patch = row;
                        if let Value::Object(patch) = &mut patch {
                            // The stored identity survives a conflict merge.
                            patch.remove("id");
                            patch.remove("created_at");
                        }
                        merge_into(target, patch);
                        target.insert("updated_at".into(), Value::String(now_rfc3339()));
                    }
                    return Ok(existing.clone());
                }
            }
        }
        self.insert(table, row).await
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> StoreResult<()> {
        let mut tables = self.tables.lock().unwrap();
        if let Some(rows) = tables.get_mut(table) {
            rows.retain(|row| !matches(row, filters));
        }
        Ok(())
    }
}

/// Token-to-user map standing in for the identity provider.
#[derive(Default)]
pub struct StaticAuth {
    users: HashMap<String, AuthUser>,
}

impl StaticAuth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, token: impl Into<String>, user_id: impl Into<String>) -> Self {
        self.users.insert(
            token.into(),
            AuthUser {
                id: user_id.into(),
                email: None,
            },
        );
        self
    }
}

#[async_trait]
impl AuthApi for StaticAuth {
    async fn get_user(&self, access_token: &str) -> StoreResult<AuthUser> {
        self.users
            .get(access_token)
            .cloned()
            .ok_or(StoreError::Unauthorized)
    }
}

/// Object storage fake with a switchable failure mode for the
/// delete-out-of-sync gap.
#[derive(Default)]
pub struct InMemoryStorage {
    objects: Mutex<HashSet<String>>,
    fail_removals: AtomicBool,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(bucket: &str, path: &str) -> String {
        format!("{}/{}", bucket, path)
    }

    pub fn put(&self, bucket: &str, path: &str) {
        self.objects.lock().unwrap().insert(Self::key(bucket, path));
    }

    pub fn contains(&self, bucket: &str, path: &str) -> bool {
        self.objects.lock().unwrap().contains(&Self::key(bucket, path))
    }

    /// Make every subsequent removal fail with a backend error.
    pub fn fail_removals(&self, fail: bool) {
        self.fail_removals.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ObjectStorage for InMemoryStorage {
    async fn remove(&self, bucket: &str, paths: &[String]) -> StoreResult<()> {
        if self.fail_removals.load(Ordering::SeqCst) {
            return Err(StoreError::Api {
                status: 500,
                message: "storage removal failed".into(),
            });
        }
        let mut objects = self.objects.lock().unwrap();
        for path in paths {
            objects.remove(&Self::key(bucket, path));
        }
        Ok(())
    }
}

/// Text model that replays queued replies and records prompts.
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        self.replies.lock().unwrap().push_back(reply.into());
    }

    /// Every prompt seen so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextModel for ScriptedModel {
    async fn generate(&self, prompt: &str) -> ModelResult<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(ModelError::EmptyResponse)
    }
}
