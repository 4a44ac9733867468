//! Generation backend HTTP client.

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use reqwest::Client;
use reqwest::header::ACCEPT;
use std::time::Duration;
use tokio_util::io::StreamReader;
use tracing::debug;

use super::error::{GenerationError, GenerationResult};
use super::source::{TokenSource, TokenStream, decode_lines};
use super::types::GenerationRequest;
use crate::config::GenerationConfig;

const STREAM_PATH: &str = "/api/v1/generate/stream";
const NDJSON: &str = "application/x-ndjson";
const MAX_ERROR_BODY: usize = 512;

/// Client for the generation backend.
#[derive(Debug, Clone)]
pub struct GenerationClient {
    /// Streaming client. Connect timeout only.
    stream_client: Client,
    /// Client for health checks, with a total timeout.
    health_client: Client,
    /// Base URL without trailing slash.
    base_url: String,
}

impl GenerationClient {
    /// Create a new client from config.
    pub fn new(config: &GenerationConfig) -> GenerationResult<Self> {
        let stream_client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(GenerationError::ClientBuild)?;

        let health_client = Client::builder()
            .timeout(Duration::from_secs(config.health_timeout_secs))
            .build()
            .map_err(GenerationError::ClientBuild)?;

        Ok(Self {
            stream_client,
            health_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check if the backend answers `GET /health` within the health-check timeout.
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match self.health_client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(url = %url, error = %e, "generation backend health check failed");
                false
            }
        }
    }

    /// Start a generation and return its event stream.
    pub async fn open_stream(&self, request: &GenerationRequest) -> GenerationResult<TokenStream> {
        let url = format!("{}{}", self.base_url, STREAM_PATH);
        debug!(url = %url, model = %request.model, history = request.history.len(), "opening generation stream");

        let response = self
            .stream_client
            .post(&url)
            .header(ACCEPT, NDJSON)
            .json(request)
            .send()
            .await
            .map_err(|e| GenerationError::ConnectionFailed {
                url: url.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let mut end = MAX_ERROR_BODY;
                while !body.is_char_boundary(end) {
                    end -= 1;
                }
                body.truncate(end);
            }
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.bytes_stream().map_err(std::io::Error::other).boxed();
        Ok(decode_lines(StreamReader::new(body)))
    }
}

#[async_trait]
impl TokenSource for GenerationClient {
    async fn open(&self, request: GenerationRequest) -> GenerationResult<TokenStream> {
        self.open_stream(&request).await
    }
}
