//! Response normalization
//!
//! Every request attempt ends here. The service may answer with a proper
//! success body, a structured error, something that isn't JSON at all, or the
//! request may never complete. All of those collapse into one [`Outcome`].

use serde_json::{Map, Value};

use crate::client::RawReply;

/// Message used when a failure carries no description of its own
pub const FALLBACK_FAILURE: &str = "Network or request failed";

/// Normalized result of one request attempt
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success {
        answer: String,
        citations: Vec<Citation>,
        usage: Usage,
        request_id: Option<String>,
        /// Non-fatal problems the service reported alongside the answer
        warnings: Vec<String>,
    },
    Error {
        message: String,
    },
}

impl Outcome {
    pub fn error(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.trim().is_empty() {
            return Outcome::Error {
                message: FALLBACK_FAILURE.to_string(),
            };
        }
        Outcome::Error { message }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Outcome::Error { message } => Some(message),
            Outcome::Success { .. } => None,
        }
    }

    /// Text of the assistant turn this outcome produces
    pub fn transcript_text(&self) -> String {
        match self {
            Outcome::Success { answer, .. } => answer.clone(),
            Outcome::Error { message } => format!("Error: {}", message),
        }
    }
}

/// A source the service cites for its answer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Citation {
    pub title: Option<String>,
    pub url: Option<String>,
    pub id: Option<String>,
}

impl Citation {
    /// Display label: title, then id, then a dash
    pub fn label(&self) -> &str {
        self.title
            .as_deref()
            .or(self.id.as_deref())
            .unwrap_or("—")
    }
}

/// Usage metrics reported by the service; every field is optional
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Usage {
    pub tokens_in: Option<u64>,
    pub tokens_out: Option<u64>,
    pub estimated_cost_usd: Option<f64>,
    pub latency_ms: Option<f64>,
    pub prompt_version: Option<String>,
}

impl Usage {
    /// True when no numeric metric is present
    pub fn is_empty(&self) -> bool {
        self.tokens_in.is_none()
            && self.tokens_out.is_none()
            && self.estimated_cost_usd.is_none()
            && self.latency_ms.is_none()
    }
}

/// Convert a raw reply into exactly one outcome. Never panics.
pub fn normalize(reply: RawReply) -> Outcome {
    match reply {
        RawReply::Transport(err) => Outcome::error(
            err.description()
                .unwrap_or_else(|| FALLBACK_FAILURE.to_string()),
        ),
        RawReply::Http { status, body } => normalize_http(status, &body),
    }
}

fn normalize_http(status: u16, body: &str) -> Outcome {
    let payload: Option<Value> = serde_json::from_str(body).ok();

    if !(200..300).contains(&status) {
        return Outcome::error(error_message(status, payload.as_ref()));
    }

    let Some(payload) = payload else {
        return Outcome::error(format!("Malformed response body (HTTP {})", status));
    };

    match success_from(&payload) {
        Some(outcome) => outcome,
        None => Outcome::error(error_message(status, Some(&payload))),
    }
}

fn success_from(payload: &Value) -> Option<Outcome> {
    let obj = payload.as_object()?;
    let answer = obj.get("answer")?.as_str()?.to_string();

    let citations = obj
        .get("citations")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(citation_from).collect())
        .unwrap_or_default();

    let mut usage = obj
        .get("usage")
        .and_then(Value::as_object)
        .map(usage_from)
        .unwrap_or_default();

    // Some gateway builds report latency next to usage rather than inside it
    if usage.latency_ms.is_none() {
        usage.latency_ms = obj.get("latency_ms").and_then(Value::as_f64);
    }

    Some(Outcome::Success {
        answer,
        citations,
        usage,
        request_id: text_field(obj, "request_id").filter(|id| !id.is_empty()),
        warnings: warnings_from(obj.get("errors")),
    })
}

fn citation_from(item: &Value) -> Option<Citation> {
    match item {
        Value::Object(obj) => Some(Citation {
            title: text_field(obj, "title"),
            url: text_field(obj, "url"),
            id: text_field(obj, "id"),
        }),
        Value::String(title) => Some(Citation {
            title: Some(title.clone()),
            ..Citation::default()
        }),
        _ => None,
    }
}

fn usage_from(obj: &Map<String, Value>) -> Usage {
    Usage {
        tokens_in: count_field(obj, "tokens_in"),
        tokens_out: count_field(obj, "tokens_out"),
        estimated_cost_usd: obj.get("estimated_cost_usd").and_then(Value::as_f64),
        latency_ms: obj.get("latency_ms").and_then(Value::as_f64),
        prompt_version: text_field(obj, "prompt_version"),
    }
}

fn warnings_from(errors: Option<&Value>) -> Vec<String> {
    match errors {
        Some(Value::Array(items)) => items.iter().filter_map(display_value).collect(),
        Some(Value::Object(obj)) => obj
            .iter()
            .filter_map(|(key, value)| display_value(value).map(|v| format!("{}: {}", key, v)))
            .collect(),
        Some(other) => display_value(other).into_iter().collect(),
        None => Vec::new(),
    }
}

/// Pick the most useful failure message out of an error payload
fn error_message(status: u16, payload: Option<&Value>) -> String {
    if let Some(Value::Object(obj)) = payload {
        for key in ["detail", "message"] {
            if let Some(message) = obj.get(key).and_then(display_value) {
                return message;
            }
        }
    }

    payload
        .and_then(display_value)
        .unwrap_or_else(|| format!("HTTP {}", status))
}

/// Strings as-is, everything else as compact JSON; blank and empty values are skipped
fn display_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Array(items) if items.is_empty() => None,
        Value::Object(obj) if obj.is_empty() => None,
        other => serde_json::to_string(other).ok(),
    }
}

fn text_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn count_field(obj: &Map<String, Value>, key: &str) -> Option<u64> {
    let value = obj.get(key)?;
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|n| n.is_finite() && *n >= 0.0)
            .map(|n| n.round() as u64)
    })
}
