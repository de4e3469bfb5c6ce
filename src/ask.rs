//! Question-answering client.
//!
//! With an endpoint configured, [`AskClient::ask`] sends one
//! `POST {endpoint}/ask` with `{"question": ...}` and reads the answer from
//! the first non-empty of `answer`, `result`, `text` in the JSON response.
//! Without an endpoint it waits a short fixed delay and returns a
//! placeholder answer that echoes the question.
//!
//! Nothing is retried. No timeout is applied unless `ask.timeout_secs` is set.

use std::time::Duration;

use anyhow::Result;
use serde::Serialize;
use serde_json::Value;

use crate::config::AskConfig;

/// Answer fields, in priority order.
const ANSWER_FIELDS: [&str; 3] = ["answer", "result", "text"];

/// Shown when the service responds without any usable answer field.
pub const NO_ANSWER: &str = "No answer was returned by the server.";

/// The placeholder answer returned when no endpoint is configured.
pub fn placeholder_answer(question: &str) -> String {
    format!(
        "This is a sample answer: you asked \u{201c}{}\u{201d}. Set ASK_API_URL to call a real service.",
        question
    )
}

#[derive(Debug, thiserror::Error)]
pub enum AskError {
    /// The service answered with a non-success HTTP status.
    #[error("request failed: {0}")]
    Status(u16),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The body could not be read as JSON. Carries the full message.
    #[error("{0}")]
    Decode(String),
}

#[derive(Serialize)]
struct AskRequest<'a> {
    question: &'a str,
}

pub struct AskClient {
    http: reqwest::Client,
    endpoint: Option<String>,
    placeholder_delay: Duration,
}

impl AskClient {
    pub fn new(
        endpoint: Option<&str>,
        placeholder_delay: Duration,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            endpoint: endpoint
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .map(str::to_string),
            placeholder_delay,
        })
    }

    pub fn from_config(config: &AskConfig) -> Result<Self> {
        Self::new(
            config.endpoint.as_deref(),
            Duration::from_millis(config.placeholder_delay_ms),
            config.timeout_secs.map(Duration::from_secs),
        )
    }

    /// True when no endpoint is configured.
    pub fn is_placeholder(&self) -> bool {
        self.endpoint.is_none()
    }

    /// Full URL questions are posted to, if an endpoint is configured.
    pub fn ask_url(&self) -> Option<String> {
        self.endpoint.as_deref().map(|endpoint| {
            let base = endpoint.strip_suffix('/').unwrap_or(endpoint);
            format!("{}/ask", base)
        })
    }

    /// Asks one question.
    ///
    /// Returns `Ok(None)` without doing anything when the trimmed question is
    /// empty.
    pub async fn ask(&self, question: &str) -> Result<Option<String>, AskError> {
        let question = question.trim();
        if question.is_empty() {
            return Ok(None);
        }

        let Some(url) = self.ask_url() else {
            tokio::time::sleep(self.placeholder_delay).await;
            return Ok(Some(placeholder_answer(question)));
        };

        tracing::debug!(%url, "asking remote service");
        let response = self
            .http
            .post(&url)
            .json(&AskRequest { question })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "ask request failed");
            return Err(AskError::Status(status.as_u16()));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AskError::Decode(format!("invalid response body: {}", e)))?;
        Ok(Some(resolve_answer(&body)))
    }
}

/// Picks the answer text out of a response body.
///
/// The first field of `answer`, `result`, `text` holding a non-empty value
/// wins. Empty strings, `0`, `false` and `null` count as absent; non-string
/// values are rendered as JSON text.
pub fn resolve_answer(body: &Value) -> String {
    ANSWER_FIELDS
        .iter()
        .find_map(|field| body.get(field).and_then(non_empty_text))
        .unwrap_or_else(|| NO_ANSWER.to_string())
}

fn non_empty_text(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        other => Some(other.to_string()),
    }
}
