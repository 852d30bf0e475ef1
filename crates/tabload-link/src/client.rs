//! HTTP implementation of the ingestion contract against a
//! PostgREST-style tabular store.
//!
//! Success is any 2xx status; the store's empty-body `204 No Content`
//! responses are success like any other. Every request carries the
//! configured timeout so a hung call can never block the run.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde_json::json;

use tabload_core::api::{IngestionApi, JsonRow};
use tabload_core::error::ApiError;

use crate::auth::StoreAuth;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// SQL RPC endpoint that executes DDL and returns no body, sidestepping
/// response-parsing problems on statements that produce no rows.
const SQL_RPC: &str = "rpc/execute_sql_with_minimal_response";

/// Client for the store's REST surface.
#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    auth: StoreAuth,
    timeout: Duration,
}

/// Builder for [`RestClient`].
pub struct RestClientBuilder {
    base_url: String,
    auth: StoreAuth,
    timeout: Duration,
}

impl RestClientBuilder {
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn auth(mut self, auth: StoreAuth) -> Self {
        self.auth = auth;
        self
    }

    pub fn service_key(self, key: impl Into<String>) -> Self {
        self.auth(StoreAuth::service_key(key))
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> Result<RestClient, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Ok(RestClient {
            http,
            base_url: self.base_url,
            auth: self.auth,
            timeout: self.timeout,
        })
    }
}

impl RestClient {
    pub fn builder() -> RestClientBuilder {
        RestClientBuilder {
            base_url: "http://localhost:8000".to_string(),
            auth: StoreAuth::none(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn rest_url(&self, path: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, path)
    }

    fn prepare(&self, request: RequestBuilder) -> RequestBuilder {
        self.auth.apply_to_request(request.timeout(self.timeout))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request.send().await.map_err(map_transport_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Status { status: status.as_u16(), body })
    }
}

fn map_transport_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::Timeout
    } else {
        ApiError::Transport(err.to_string())
    }
}

/// Total row count from a `content-range` header such as `0-0/8152`
/// or `*/8152`.
fn parse_content_range(value: &str) -> Option<u64> {
    value.rsplit('/').next()?.trim().parse().ok()
}

#[async_trait]
impl IngestionApi for RestClient {
    async fn table_exists(&self, table: &str) -> Result<bool, ApiError> {
        let url = self.rest_url(&format!("{}?limit=0", table));
        let request = self.prepare(self.http.head(&url));
        let response = request.send().await.map_err(map_transport_error)?;
        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(ApiError::Status { status: status.as_u16(), body })
            }
        }
    }

    async fn execute_ddl(&self, sql: &str) -> Result<(), ApiError> {
        log::debug!("executing DDL: {}", sql);
        let request = self
            .prepare(self.http.post(self.rest_url(SQL_RPC)))
            .header("Prefer", "return=minimal")
            .json(&json!({ "sql_query": sql }));
        self.send(request).await.map(|_| ())
    }

    async fn insert_batch(
        &self,
        table: &str,
        rows: &[JsonRow],
        ignore_duplicates: bool,
    ) -> Result<(), ApiError> {
        let prefer = if ignore_duplicates {
            "return=minimal,resolution=ignore-duplicates"
        } else {
            "return=minimal"
        };
        let request = self
            .prepare(self.http.post(self.rest_url(table)))
            .header("Prefer", prefer)
            .json(rows);
        self.send(request).await.map(|_| ())
    }

    async fn row_count(&self, table: &str) -> Result<u64, ApiError> {
        let url = self.rest_url(&format!("{}?select=id&limit=0", table));
        let request = self.prepare(self.http.get(&url)).header("Prefer", "count=exact");
        let response = self.send(request).await?;
        let count = response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range);
        match count {
            Some(count) => Ok(count),
            None => {
                log::debug!("no readable content-range for {}, assuming empty", table);
                Ok(0)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_content_range_variants() {
        assert_eq!(parse_content_range("0-0/8152"), Some(8152));
        assert_eq!(parse_content_range("*/42"), Some(42));
        assert_eq!(parse_content_range("*/0"), Some(0));
        assert_eq!(parse_content_range("*/*"), None);
        assert_eq!(parse_content_range("garbage"), None);
    }

    #[test]
    fn test_builder_trims_trailing_slash() {
        let client = RestClient::builder()
            .base_url("https://store.example.com/")
            .service_key("svc_123")
            .build()
            .expect("build client");
        assert_eq!(client.base_url(), "https://store.example.com");
        assert_eq!(
            client.rest_url("my_table?limit=0"),
            "https://store.example.com/rest/v1/my_table?limit=0"
        );
    }

    #[tokio::test]
    async fn test_insert_request_carries_prefer_header() {
        let client = RestClient::builder()
            .base_url("http://localhost:8000")
            .service_key("svc_123")
            .build()
            .expect("build client");

        let rows: Vec<JsonRow> = vec![JsonRow::new()];
        let request = client
            .prepare(client.http.post(client.rest_url("t")))
            .header("Prefer", "return=minimal,resolution=ignore-duplicates")
            .json(&rows)
            .build()
            .expect("build request");

        assert_eq!(
            request.headers().get("Prefer").unwrap(),
            "return=minimal,resolution=ignore-duplicates"
        );
        assert_eq!(request.headers().get("apikey").unwrap(), "svc_123");
        assert!(request.timeout().is_some());
    }
}
