//! Outbound side of a turn: the request we send and the raw reply we get back.
//!
//! A transport never fails in the `Result` sense. Whatever happens on the wire
//! ends up as a [`RawReply`], and the normalizer decides what it means.

pub mod http;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

pub use http::HttpTransport;

/// Body of `POST /v1/chat`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    pub message: String,
    pub user_id: String,
    pub session_id: String,
}

/// Raw result of one request attempt, before normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawReply {
    /// The service answered with some status and some body (possibly not JSON)
    Http { status: u16, body: String },
    /// The request never produced a readable response
    Transport(TransportError),
}

impl RawReply {
    pub fn http(status: u16, body: impl Into<String>) -> Self {
        RawReply::Http {
            status,
            body: body.into(),
        }
    }
}

/// Transport-level failure classification
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("{0}")]
    Connect(String),
    #[error("{0}")]
    Body(String),
    #[error("request aborted")]
    Aborted,
    #[error("{}", .0.as_deref().unwrap_or("request failed"))]
    Other(Option<String>),
}

impl TransportError {
    /// Human-readable description, if the failure carried one
    pub fn description(&self) -> Option<String> {
        match self {
            TransportError::Connect(msg) | TransportError::Body(msg) => {
                let msg = msg.trim();
                (!msg.is_empty()).then(|| msg.to_string())
            }
            TransportError::Other(msg) => msg
                .as_deref()
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_string),
            TransportError::Timeout | TransportError::Aborted => Some(self.to_string()),
        }
    }

    pub(crate) fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else if err.is_body() || err.is_decode() {
            TransportError::Body(err.to_string())
        } else {
            TransportError::Other(Some(err.to_string()))
        }
    }
}

/// Anything that can carry a [`ChatRequest`] to the answering service
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, request: &ChatRequest) -> RawReply;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_names() {
        let request = ChatRequest {
            message: "where is my order".to_string(),
            user_id: "demo-user".to_string(),
            session_id: "session-1".to_string(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "message": "where is my order",
                "user_id": "demo-user",
                "session_id": "session-1",
            })
        );
    }

    #[test]
    fn test_description_skips_blank_messages() {
        assert_eq!(TransportError::Other(None).description(), None);
        assert_eq!(TransportError::Other(Some("  ".into())).description(), None);
        assert_eq!(TransportError::Connect(String::new()).description(), None);
        assert_eq!(
            TransportError::Connect("connection refused".into()).description(),
            Some("connection refused".to_string())
        );
        assert_eq!(
            TransportError::Timeout.description(),
            Some("request timed out".to_string())
        );
    }

    #[test]
    fn test_display_has_fallback() {
        assert_eq!(TransportError::Other(None).to_string(), "request failed");
        assert_eq!(TransportError::Aborted.to_string(), "request aborted");
    }
}
