//! Render-ready projection of the conversation transcript

use crate::conversation::Conversation;
use crate::state::ChatRole;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriptEntry<'a> {
    Message { role: ChatRole, content: &'a str },
    /// Placeholder for the reply still in flight
    Typing,
}

/// One entry per turn, in order, plus a typing marker while a request is outstanding
pub fn project(conversation: &Conversation) -> Vec<TranscriptEntry<'_>> {
    let mut entries: Vec<TranscriptEntry<'_>> = conversation
        .turns()
        .iter()
        .map(|turn| TranscriptEntry::Message {
            role: turn.role(),
            content: turn.content(),
        })
        .collect();

    if conversation.is_pending() {
        entries.push(TranscriptEntry::Typing);
    }

    entries
}
