//! Chat session types and the persisted history format.
//!
//! A session identifier is human-readable (`Chat 2026-01-15 10:05:00`), but
//! ordering uses the explicit `created_at` field. The identifier is only parsed
//! for legacy stored entries that predate that field.

use std::collections::BTreeMap;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ChatError;

// Re-export the message types (they are shared with the llm module).
pub use crate::llm::{Message, MessageRole};

/// Prefix of every session identifier.
pub const SESSION_ID_PREFIX: &str = "Chat ";

/// One-second resolution timestamp embedded in identifiers.
pub const SESSION_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Label shown for a session with no messages yet.
pub const EMPTY_SESSION_LABEL: &str = "New Chat";

/// Number of characters of the first message shown in a session label.
const PREVIEW_CHARS: usize = 30;

/// Persisted mapping from session identifier to stored session.
pub type HistoryMap = BTreeMap<String, StoredSession>;

/// A named conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub messages: Vec<Message>,
}

impl Session {
    /// Create an empty session.
    pub fn new(id: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            created_at,
            messages: Vec::new(),
        }
    }

    /// First user-visible words of the conversation, or "New Chat".
    pub fn preview(&self) -> String {
        match self.messages.first() {
            Some(first) => {
                let mut chars = first.content.chars();
                let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
                if chars.next().is_some() {
                    format!("{head}...")
                } else {
                    head
                }
            }
            None => EMPTY_SESSION_LABEL.to_string(),
        }
    }

    /// Sidebar-style label: local creation time plus preview, e.g. `10:05 - Hello`.
    pub fn display_label(&self) -> String {
        let local = self.created_at.with_timezone(&Local);
        format!("{} - {}", local.format("%H:%M"), self.preview())
    }
}

/// A session as written to the store.
///
/// `Record` is what this crate writes. `Legacy` is a bare message list whose
/// only timestamp is the one encoded in its identifier. Anything else lands in
/// `Unreadable` and is written back verbatim, so one bad entry never fails the
/// whole document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredSession {
    Record {
        created_at: DateTime<Utc>,
        messages: Vec<Message>,
    },
    Legacy(Vec<Message>),
    Unreadable(serde_json::Value),
}

impl StoredSession {
    /// Number of messages in the stored transcript.
    pub fn message_count(&self) -> usize {
        match self {
            StoredSession::Record { messages, .. } => messages.len(),
            StoredSession::Legacy(messages) => messages.len(),
            StoredSession::Unreadable(_) => 0,
        }
    }

    /// Rebuild a live session, deriving `created_at` from the identifier for
    /// legacy entries. Unreadable entries are rejected.
    pub fn into_session(self, id: String) -> Result<Session, ChatError> {
        match self {
            StoredSession::Record {
                created_at,
                messages,
            } => Ok(Session {
                id,
                created_at,
                messages,
            }),
            StoredSession::Legacy(messages) => {
                let created_at = parse_session_timestamp(&id)?;
                Ok(Session {
                    id,
                    created_at,
                    messages,
                })
            }
            StoredSession::Unreadable(_) => Err(ChatError::UnreadableEntry {
                id,
                reason: "not a message list or session record".to_string(),
            }),
        }
    }
}

impl From<&Session> for StoredSession {
    fn from(session: &Session) -> Self {
        StoredSession::Record {
            created_at: session.created_at,
            messages: session.messages.clone(),
        }
    }
}

/// Build a session identifier for a local wall-clock time.
///
/// `ordinal` disambiguates identifiers minted within the same second:
/// `1` yields the bare form, `n >= 2` appends ` #n`.
pub fn format_session_id(at: &DateTime<Local>, ordinal: u32) -> String {
    let base = format!("{SESSION_ID_PREFIX}{}", at.format(SESSION_TIMESTAMP_FORMAT));
    if ordinal <= 1 {
        base
    } else {
        format!("{base} #{ordinal}")
    }
}

/// Parse the creation time encoded in a session identifier.
///
/// Accepts `Chat YYYY-MM-DD HH:MM:SS` with an optional ` #n` suffix. The
/// timestamp is interpreted in local time.
pub fn parse_session_timestamp(id: &str) -> Result<DateTime<Utc>, ChatError> {
    let malformed = |reason: String| ChatError::MalformedIdentifier {
        id: id.to_string(),
        reason,
    };

    let rest = id
        .strip_prefix(SESSION_ID_PREFIX)
        .ok_or_else(|| malformed(format!("missing '{}' prefix", SESSION_ID_PREFIX.trim_end())))?;

    let stamp = match rest.rsplit_once(" #") {
        Some((stamp, ordinal)) if ordinal.parse::<u32>().is_ok_and(|n| n >= 2) => stamp,
        Some(_) => return Err(malformed("invalid ordinal suffix".to_string())),
        None => rest,
    };

    let naive = NaiveDateTime::parse_from_str(stamp, SESSION_TIMESTAMP_FORMAT)
        .map_err(|e| malformed(e.to_string()))?;

    // A local time inside a DST gap has no mapping; fall back to reading it as UTC.
    Ok(Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| naive.and_utc()))
}
