//! Backend client seam and the reqwest implementation.
//!
//! The engine consumes the fixed HTTP surface through `BackendClient`;
//! `HttpBackend` is the production implementation pinned to the three
//! endpoint paths, which are a server contract and must not be altered.

use async_trait::async_trait;
use gigi_rs_config::BackendConfig;
use gigi_rs_protocol::{ChatRequest, ChatResponse, ReportRequest, TtsRequest};
use log::debug;
use std::time::Duration;
use thiserror::Error;

/// Chat endpoint path.
const CHAT_PATH: &str = "/assistant/api/chat/";
/// Speech synthesis endpoint path.
const TTS_PATH: &str = "/assistant/api/tts/";
/// Report submission endpoint path.
const REPORT_PATH: &str = "/assistant/api/report/";

/// Errors returned by backend requests.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Network-level failure before a response was received.
    #[error("transport error: {0}")]
    Transport(String),
    /// Non-2xx response status.
    #[error("unexpected status: {0}")]
    Status(u16),
    /// Response body could not be decoded.
    #[error("malformed response body: {0}")]
    Decode(String),
}

/// Client for the assistant backend HTTP surface.
#[async_trait]
pub trait BackendClient: Send + Sync {
    /// Submit a chat message and return the assistant response.
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, BackendError>;

    /// Synthesize speech for a text, returning raw audio bytes.
    async fn synthesize(&self, request: TtsRequest) -> Result<Vec<u8>, BackendError>;

    /// Submit a bug/content report.
    async fn report(&self, request: ReportRequest) -> Result<(), BackendError>;
}

/// Reqwest-backed client for the fixed endpoints.
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    /// Build a client from backend config.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| BackendError::Transport(err.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Build the full URL for an endpoint path.
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Issue a JSON POST and return the raw response after status checks.
    async fn post_json<T: serde::Serialize + Sync>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<reqwest::Response, BackendError> {
        debug!("POST {}", path);
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|err| BackendError::Transport(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Status(status.as_u16()));
        }
        Ok(response)
    }
}

#[async_trait]
impl BackendClient for HttpBackend {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, BackendError> {
        let response = self.post_json(CHAT_PATH, &request).await?;
        response
            .json::<ChatResponse>()
            .await
            .map_err(|err| BackendError::Decode(err.to_string()))
    }

    async fn synthesize(&self, request: TtsRequest) -> Result<Vec<u8>, BackendError> {
        let response = self.post_json(TTS_PATH, &request).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|err| BackendError::Transport(err.to_string()))?;
        Ok(bytes.to_vec())
    }

    async fn report(&self, request: ReportRequest) -> Result<(), BackendError> {
        self.post_json(REPORT_PATH, &request).await?;
        Ok(())
    }
}
