//! "Last response" panel model
//!
//! Reflects only the most recent outcome. While a new request is in flight the
//! previous outcome keeps showing; it is replaced when that request settles.

use crate::conversation::Conversation;
use crate::normalize::{Citation, Outcome, Usage};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Inspection<'a> {
    /// Nothing has been answered yet
    Empty,
    Answer {
        request_id: Option<&'a str>,
        /// `None` when the service cited nothing
        citations: Option<&'a [Citation]>,
        /// `None` when no metric was reported
        usage: Option<&'a Usage>,
        warnings: &'a [String],
    },
    Failure {
        message: &'a str,
    },
}

pub fn inspect(conversation: &Conversation) -> Inspection<'_> {
    match conversation.last_outcome() {
        None => Inspection::Empty,
        Some(Outcome::Error { message }) => Inspection::Failure {
            message: message.as_str(),
        },
        Some(Outcome::Success {
            citations,
            usage,
            request_id,
            warnings,
            ..
        }) => Inspection::Answer {
            request_id: request_id.as_deref(),
            citations: (!citations.is_empty()).then_some(citations.as_slice()),
            usage: (!usage.is_empty()).then_some(usage),
            warnings: warnings.as_slice(),
        },
    }
}
