pub mod client;
pub mod config;
pub mod conversation;
pub mod inspection;
pub mod normalize;
pub mod notify;
pub mod state;
pub mod transcript;

// Re-export main types for convenience
pub use client::{ChatRequest, ChatTransport, HttpTransport, RawReply, TransportError};
pub use config::Config;
pub use conversation::{Conversation, Phase, Session, TurnMachine};
pub use inspection::{inspect, Inspection};
pub use normalize::{normalize, Citation, Outcome, Usage, FALLBACK_FAILURE};
pub use notify::{Notification, NotificationId, NotificationKind, Notifications};
pub use state::{ChatRole, Turn};
pub use transcript::{project, TranscriptEntry};
