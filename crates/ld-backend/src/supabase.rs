//! Production backend client speaking the Supabase HTTP surface
//!
//! Tables go through the PostgREST conventions (`?col=eq.val`,
//! `order=col.desc`, `Prefer: return=representation`), auth through
//! `/auth/v1/user`, and storage through `/storage/v1/object`. All table
//! and storage calls authenticate with the service-role key; only token
//! verification forwards the caller's own token.

use async_trait::async_trait;
use reqwest::{Client as HttpClient, Method, RequestBuilder, Response, StatusCode};
use serde_json::{json, Value};
use url::Url;

use crate::error::{StoreError, StoreResult};
use crate::store::{AuthApi, AuthUser, Filter, ObjectStorage, OrderBy, TableStore};

/// Client for the managed identity/table/storage backend
#[derive(Debug, Clone)]
pub struct SupabaseClient {
    http_client: HttpClient,
    base_url: Url,
    service_key: String,
}

impl SupabaseClient {
    /// Create a new client authenticated with the service-role key.
    pub fn new(base_url: Url, service_key: impl Into<String>) -> Self {
        let http_client = HttpClient::builder()
            .user_agent("labdesk-server/0.1")
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http_client,
            base_url,
            service_key: service_key.into(),
        }
    }

    /// Create a client from a base URL string.
    pub fn from_url(base_url: &str, service_key: impl Into<String>) -> StoreResult<Self> {
        let base_url = Url::parse(base_url)?;
        Ok(Self::new(base_url, service_key))
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build the REST URL for a table query.
    fn table_url(
        &self,
        table: &str,
        filters: &[Filter],
        order: Option<&OrderBy>,
    ) -> StoreResult<Url> {
        let mut url = self.base_url.join(&format!("rest/v1/{}", table))?;
        {
            let mut pairs = url.query_pairs_mut();
            for filter in filters {
                pairs.append_pair(&filter.column, &format!("eq.{}", filter.value));
            }
            if let Some(order) = order {
                let direction = if order.descending { "desc" } else { "asc" };
                pairs.append_pair("order", &format!("{}.{}", order.column, direction));
            }
        }
        Ok(url)
    }

    /// Start a request authenticated with the service-role key.
    fn service_request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http_client
            .request(method, url)
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    async fn rows_response(&self, response: Response) -> StoreResult<Vec<Value>> {
        let response = Self::check_status(response).await?;
        let rows: Vec<Value> = response.json().await?;
        Ok(rows)
    }

    /// Representation responses always carry an array; mutations that
    /// affected nothing come back empty.
    async fn single_row_response(&self, response: Response) -> StoreResult<Value> {
        let mut rows = self.rows_response(response).await?;
        if rows.is_empty() {
            return Err(StoreError::Api {
                status: 200,
                message: "backend returned no rows for a returning mutation".into(),
            });
        }
        Ok(rows.remove(0))
    }

    async fn check_status(response: Response) -> StoreResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(StoreError::Unauthorized);
        }
        let message = response.text().await.unwrap_or_default();
        Err(StoreError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl TableStore for SupabaseClient {
    async fn select(
        &self,
        table: &str,
        filters: &[Filter],
        order: Option<&OrderBy>,
    ) -> StoreResult<Vec<Value>> {
        let mut url = self.table_url(table, filters, order)?;
        url.query_pairs_mut().append_pair("select", "*");
        let response = self.service_request(Method::GET, url).send().await?;
        self.rows_response(response).await
    }

    async fn insert(&self, table: &str, row: Value) -> StoreResult<Value> {
        let url = self.table_url(table, &[], None)?;
        let response = self
            .service_request(Method::POST, url)
            .header("Prefer", "return=representation")
            .json(&row)
            .send()
            .await?;
        self.single_row_response(response).await
    }

    async fn update(
        &self,
        table: &str,
        filters: &[Filter],
        patch: Value,
    ) -> StoreResult<Vec<Value>> {
        let url = self.table_url(table, filters, None)?;
        let response = self
            .service_request(Method::PATCH, url)
            .header("Prefer", "return=representation")
            .json(&patch)
            .send()
            .await?;
        self.rows_response(response).await
    }

    async fn upsert(&self, table: &str, row: Value, on_conflict: &str) -> StoreResult<Value> {
        let mut url = self.table_url(table, &[], None)?;
        url.query_pairs_mut().append_pair("on_conflict", on_conflict);
        let response = self
            .service_request(Method::POST, url)
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(&row)
            .send()
            .await?;
        self.single_row_response(response).await
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> StoreResult<()> {
        let url = self.table_url(table, filters, None)?;
        let response = self.service_request(Method::DELETE, url).send().await?;
        Self::check_status(response).await?;
        Ok(())
    }
}

#[async_trait]
impl AuthApi for SupabaseClient {
    async fn get_user(&self, access_token: &str) -> StoreResult<AuthUser> {
        let url = self.base_url.join("auth/v1/user")?;
        let response = self
            .http_client
            .get(url)
            .header("apikey", &self.service_key)
            .bearer_auth(access_token)
            .send()
            .await?;
        let response = Self::check_status(response).await?;
        let user: AuthUser = response.json().await?;
        Ok(user)
    }
}

#[async_trait]
impl ObjectStorage for SupabaseClient {
    async fn remove(&self, bucket: &str, paths: &[String]) -> StoreResult<()> {
        let url = self.base_url.join(&format!("storage/v1/object/{}", bucket))?;
        let response = self
            .service_request(Method::DELETE, url)
            .json(&json!({ "prefixes": paths }))
            .send()
            .await?;
        Self::check_status(response).await?;
        Ok(())
    }
}
