//! HTTP client: post a question, receive the answer and its sources.

use url::Url;

use crate::config::ApiSection;
use crate::messages::{ChatRequest, ChatResponse, HealthStatus};

/// Why an exchange failed. Every variant ends the exchange; none is retried.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid API URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("HTTP error! status: {0}")]
    Status(u16),
    #[error("response is not valid JSON: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("unexpected response shape: {0}")]
    Schema(String),
}

/// Client for one Quasar API. Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    chat_url: Url,
    health_url: Url,
}

impl ApiClient {
    /// `chat_path` is resolved against `base_url` with the usual URL rules.
    pub fn new(api: &ApiSection) -> Result<Self, ClientError> {
        let base = Url::parse(api.base_url())?;
        let chat_url = base.join(api.chat_path())?;
        let health_url = base.join("/")?;

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = api.timeout() {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            chat_url,
            health_url,
        })
    }

    /// Client for `base_url` with the default chat path and no timeout.
    pub fn from_base_url(base_url: &str) -> Result<Self, ClientError> {
        Self::new(&ApiSection {
            base_url: Some(base_url.to_string()),
            ..ApiSection::default()
        })
    }

    pub fn chat_url(&self) -> &Url {
        &self.chat_url
    }

    /// Ask one question. Any non-2xx status is a failure regardless of body.
    pub async fn ask(&self, question: &str) -> Result<ChatResponse, ClientError> {
        tracing::debug!(url = %self.chat_url, "posting question");
        let response = self
            .http
            .post(self.chat_url.clone())
            .json(&ChatRequest { question })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        let answer = ChatResponse::from_slice(&body)?;
        tracing::debug!(sources = answer.sources.len(), "answer received");
        Ok(answer)
    }

    /// Probe the API root.
    pub async fn health(&self) -> Result<HealthStatus, ClientError> {
        let response = self.http.get(self.health_url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status(status.as_u16()));
        }
        let body = response.bytes().await?;
        HealthStatus::from_slice(&body)
    }
}
