//! Supabase PostgREST record store implementation.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, Response};
use tracing::debug;

use crate::error::{RecordError, RecordResult};
use crate::store::{Filter, RecordStore, Row};

/// Configuration for the PostgREST client.
#[derive(Debug, Clone)]
pub struct RecordStoreConfig {
    /// Base URL of the Supabase project (without `/rest/v1`)
    pub base_url: String,
    /// Service role key (server-side, bypasses row-level security)
    pub service_key: String,
}

impl RecordStoreConfig {
    /// Create config from environment variables.
    pub fn from_env() -> RecordResult<Self> {
        Ok(Self {
            base_url: std::env::var("SUPABASE_URL")
                .map_err(|_| RecordError::config_error("SUPABASE_URL not set"))?,
            service_key: std::env::var("SUPABASE_SERVICE_ROLE_KEY")
                .map_err(|_| RecordError::config_error("SUPABASE_SERVICE_ROLE_KEY not set"))?,
        })
    }
}

/// Record store backed by the Supabase PostgREST API.
#[derive(Clone)]
pub struct RestRecordStore {
    client: Client,
    base_url: String,
}

impl RestRecordStore {
    /// Create a new client from configuration.
    pub fn new(config: RecordStoreConfig) -> RecordResult<Self> {
        let mut headers = HeaderMap::new();
        let key_value = HeaderValue::from_str(&config.service_key)
            .map_err(|_| RecordError::config_error("service key is not a valid header value"))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", config.service_key))
            .map_err(|_| RecordError::config_error("service key is not a valid header value"))?;
        headers.insert("apikey", key_value);
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(RecordError::Http)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> RecordResult<Self> {
        Self::new(RecordStoreConfig::from_env()?)
    }

    fn request(&self, method: Method, collection: &str, filter: &Filter) -> RequestBuilder {
        let url = format!("{}/rest/v1/{}", self.base_url, collection);
        self.client.request(method, url).query(&filter.to_query())
    }

    async fn check(response: Response) -> RecordResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(RecordError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl RecordStore for RestRecordStore {
    async fn insert(&self, collection: &str, row: Row) -> RecordResult<Row> {
        debug!("Inserting into {}", collection);

        let response = self
            .request(Method::POST, collection, &Filter::new())
            .header("Prefer", "return=representation")
            .json(&row)
            .send()
            .await?;
        let response = Self::check(response).await?;

        // PostgREST returns an array even for a single insert.
        let mut rows: Vec<Row> = response.json().await?;
        rows.pop()
            .ok_or_else(|| RecordError::not_found(format!("{}: insert returned no row", collection)))
    }

    async fn update(&self, collection: &str, filter: &Filter, fields: Row) -> RecordResult<()> {
        debug!("Updating {}", collection);

        let response = self
            .request(Method::PATCH, collection, filter)
            .json(&fields)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn select(&self, collection: &str, filter: &Filter) -> RecordResult<Vec<Row>> {
        let response = self
            .request(Method::GET, collection, filter)
            .query(&[("select", "*")])
            .send()
            .await?;
        let response = Self::check(response).await?;
        Ok(response.json().await?)
    }

    async fn delete(&self, collection: &str, filter: &Filter) -> RecordResult<()> {
        debug!("Deleting from {}", collection);

        let response = self.request(Method::DELETE, collection, filter).send().await?;
        Self::check(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn store_for(server: &MockServer) -> RestRecordStore {
        RestRecordStore::new(RecordStoreConfig {
            base_url: server.uri(),
            service_key: "service-key".to_string(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_select_builds_postgrest_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/videos"))
            .and(query_param("id", "eq.v1"))
            .and(query_param("select", "*"))
            .and(header("apikey", "service-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "v1"}])))
            .mount(&server)
            .await;

        let store = store_for(&server).await;
        let rows = store
            .select("videos", &Filter::new().eq("id", "v1"))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], "v1");
    }

    #[tokio::test]
    async fn test_insert_returns_representation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/thumbnails"))
            .and(header("Prefer", "return=representation"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!([{"id": "t1"}])))
            .mount(&server)
            .await;

        let store = store_for(&server).await;
        let row = store
            .insert("thumbnails", json!({"video_id": "v1"}))
            .await
            .unwrap();
        assert_eq!(row["id"], "t1");
    }

    #[tokio::test]
    async fn test_error_status_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/videos"))
            .respond_with(ResponseTemplate::new(409).set_body_string("conflict"))
            .mount(&server)
            .await;

        let store = store_for(&server).await;
        let err = store
            .update("videos", &Filter::new().eq("id", "v1"), json!({"status": "READY"}))
            .await
            .unwrap_err();
        match err {
            RecordError::Status { status, body } => {
                assert_eq!(status, 409);
                assert_eq!(body, "conflict");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
