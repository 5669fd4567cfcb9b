//! HTTP connection management and the shared EM-Infra client.

use std::time::Duration;

use emgraph_core::config::ClientConfig;
use emgraph_core::SourceError;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::Deserialize;

/// Response header carrying the cursor of the next search page.
pub const NEXT_CURSOR_HEADER: &str = "em-paging-next-cursor";

/// Errors from API operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("EM-Infra returned {status} for {path}: {body}")]
    Status {
        status: u16,
        path: String,
        body: String,
    },

    #[error("Failed to decode {path} response: {message}")]
    Decode { path: String, message: String },

    #[error("Client configuration error: {0}")]
    Config(String),
}

impl From<ClientError> for SourceError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Status { status, body, .. } => SourceError::Status { status, body },
            ClientError::Decode { .. } => SourceError::Decode(err.to_string()),
            other => SourceError::Transport(other.to_string()),
        }
    }
}

/// One page of a search response.
#[derive(Debug, Default)]
pub struct SearchPage {
    pub records: Vec<serde_json::Value>,
    pub next_cursor: Option<String>,
}

#[derive(Deserialize)]
struct SearchBody {
    #[serde(rename = "@graph", default)]
    graph: Vec<serde_json::Value>,
}

/// Client for the EM-Infra REST API.
///
/// Clone is cheap (the inner reqwest client is reference counted).
#[derive(Clone)]
pub struct EmInfraClient {
    http: reqwest::Client,
    base_url: String,
    page_size: usize,
}

impl EmInfraClient {
    /// Build a client from the given configuration.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &config.token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| ClientError::Config(format!("invalid token: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("emgraph/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()?;

        tracing::info!(base_url = %config.base_url, "EM-Infra client ready");
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            page_size: config.page_size.max(1),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// POST one search request and return the page it yields.
    pub async fn search_page(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<SearchPage, ClientError> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let response = self.http.post(&url).json(body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                path: path.to_string(),
                body,
            });
        }

        let next_cursor = response
            .headers()
            .get(NEXT_CURSOR_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string);

        let parsed: SearchBody = response.json().await.map_err(|e| ClientError::Decode {
            path: path.to_string(),
            message: e.to_string(),
        })?;

        Ok(SearchPage {
            records: parsed.graph,
            next_cursor,
        })
    }

    /// Walk every page of a search until the cursor runs out.
    pub async fn search_all(
        &self,
        path: &str,
        filters: serde_json::Value,
    ) -> Result<Vec<serde_json::Value>, ClientError> {
        let mut records = Vec::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let body = search_body(self.page_size, cursor.as_deref(), &filters);
            let page = self.search_page(path, &body).await?;
            pages += 1;
            let received = page.records.len();
            records.extend(page.records);

            match page.next_cursor {
                // An empty page with a cursor would loop forever.
                Some(next) if received > 0 => cursor = Some(next),
                _ => break,
            }
        }

        tracing::debug!(path, pages, records = records.len(), "Search complete");
        Ok(records)
    }
}

/// Request body for a cursor-paged search.
pub fn search_body(
    page_size: usize,
    cursor: Option<&str>,
    filters: &serde_json::Value,
) -> serde_json::Value {
    serde_json::json!({
        "size": page_size,
        "fromCursor": cursor,
        "filters": filters,
    })
}
