mod content;
mod conversation;
mod error;
mod event;
mod session;
mod util;

pub use content::ContentBlock;
pub use conversation::{ConversationItem, Role};
pub use error::{Error, Result};
pub use event::{
    BridgeEvent, ClaudeStatusPayload, EventKind, EventPayload, FileChangedPayload,
    HeartbeatPayload, PermissionRequestPayload, PermissionResponsePayload, RepoStatus,
    SessionJoinedPayload, SessionLeftPayload, StreamReadCompletePayload,
};
pub use session::{ProjectSummary, SessionIndexEntry};
pub use util::{collapse_and_truncate, collapse_whitespace, truncate};
