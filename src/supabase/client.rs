//! HTTP client for the Supabase REST interface.

use async_trait::async_trait;
use reqwest::header::CONTENT_RANGE;
use reqwest::{Client, Method, Url};

use super::{ChunkRow, ChunkStore, StoreError};
use crate::config::Config;

/// Chunk table accessed through PostgREST with a service role key.
pub struct SupabaseStore {
    client: Client,
    base_url: String,
    table: String,
    service_key: String,
}

impl SupabaseStore {
    /// Construct a store client for `table` under the project at `base_url`.
    pub fn new(
        base_url: &str,
        service_key: impl Into<String>,
        table: impl Into<String>,
    ) -> Result<Self, StoreError> {
        let client = Client::builder().user_agent("tgp-ingest/0.1").build()?;
        let base_url = normalize_base_url(base_url).map_err(StoreError::InvalidUrl)?;
        let table = table.into();
        tracing::debug!(url = %base_url, table = %table, "Initialized Supabase client");
        Ok(Self {
            client,
            base_url,
            table,
            service_key: service_key.into(),
        })
    }

    /// Construct the store from the run configuration.
    pub fn from_config(config: &Config) -> Result<Self, StoreError> {
        Self::new(
            &config.supabase_url,
            config.supabase_service_role_key.clone(),
            config.supabase_chunks_table.clone(),
        )
    }

    fn request(&self, method: Method) -> reqwest::RequestBuilder {
        let url = format_endpoint(&self.base_url, &format!("rest/v1/{}", self.table));
        self.client
            .request(method, url)
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, StoreError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let error = StoreError::UnexpectedStatus { status, body };
        tracing::error!(error = %error, "Supabase request failed");
        Err(error)
    }
}

#[async_trait]
impl ChunkStore for SupabaseStore {
    async fn count_chunks(&self, file_name: &str) -> Result<u64, StoreError> {
        let response = self
            .request(Method::HEAD)
            .header("Prefer", "count=exact")
            .query(&[("select", "*".to_string()), ("file_name", format!("eq.{file_name}"))])
            .send()
            .await?;
        let response = Self::ensure_success(response).await?;

        let range = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| StoreError::MissingCount("no Content-Range header".to_string()))?;
        parse_content_range_total(range)
            .ok_or_else(|| StoreError::MissingCount(range.to_string()))
    }

    async fn insert_chunks(&self, rows: &[ChunkRow]) -> Result<(), StoreError> {
        if rows.is_empty() {
            return Ok(());
        }
        let response = self
            .request(Method::POST)
            .header("Prefer", "return=minimal")
            .json(rows)
            .send()
            .await?;
        Self::ensure_success(response).await?;
        tracing::debug!(table = %self.table, rows = rows.len(), "Chunk rows inserted");
        Ok(())
    }
}

/// Extract the total from a PostgREST `Content-Range` value such as `0-9/42` or `*/0`.
fn parse_content_range_total(value: &str) -> Option<u64> {
    let (_, total) = value.trim().rsplit_once('/')?;
    total.parse().ok()
}

fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = Url::parse(url).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string())
}

fn format_endpoint(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}
