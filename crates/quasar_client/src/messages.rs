//! HTTP message types for the Quasar API. Client ↔ server JSON.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::client::ClientError;

/// Client → server: `POST /api/v1/chat` body.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest<'a> {
    pub question: &'a str,
}

/// Page reference of a citation. The server sends an integer when the
/// document has page numbers and sometimes a text label instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Page {
    Number(i64),
    Label(String),
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Page::Number(0) => f.write_str(NO_PAGE),
            Page::Number(n) => write!(f, "{}", n),
            Page::Label(s) if s.trim().is_empty() => f.write_str(NO_PAGE),
            Page::Label(s) => f.write_str(s),
        }
    }
}

/// Shown in place of a missing page.
pub const NO_PAGE: &str = "N/A";

/// One supporting document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub source: String,
    #[serde(default)]
    pub page: Option<Page>,
}

impl Source {
    pub fn new(source: impl Into<String>, page: Option<Page>) -> Self {
        Self {
            source: source.into(),
            page,
        }
    }

    pub fn page_label(&self) -> String {
        match &self.page {
            Some(page) => page.to_string(),
            None => NO_PAGE.to_string(),
        }
    }
}

/// Server → client: answer with its sources.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChatResponse {
    /// Markup-capable text, kept verbatim.
    pub answer: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub sources: Vec<Source>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Source>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Source>>::deserialize(deserializer)?.unwrap_or_default())
}

impl ChatResponse {
    pub fn from_slice(body: &[u8]) -> Result<Self, ClientError> {
        decode_object(body)
    }

    pub fn from_json(value: serde_json::Value) -> Result<Self, ClientError> {
        object_from_json(value)
    }
}

/// Parse a response body: bytes must be JSON (`Decode`), and the JSON must
/// be an object matching `T` (`Schema`).
pub fn decode_object<T: DeserializeOwned>(body: &[u8]) -> Result<T, ClientError> {
    let value: serde_json::Value = serde_json::from_slice(body).map_err(ClientError::Decode)?;
    object_from_json(value)
}

fn object_from_json<T: DeserializeOwned>(value: serde_json::Value) -> Result<T, ClientError> {
    if !value.is_object() {
        return Err(ClientError::Schema(format!(
            "expected a JSON object, got {}",
            json_kind(&value)
        )));
    }
    serde_json::from_value(value).map_err(|e| ClientError::Schema(e.to_string()))
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

/// Server → client: `GET /` health check.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl HealthStatus {
    pub fn from_slice(body: &[u8]) -> Result<Self, ClientError> {
        decode_object(body)
    }

    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}
