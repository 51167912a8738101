use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use crate::locator::Locator;

/// Position of a conversation that has not been placed in a listing.
pub const NO_POSITION: i32 = -1;

// ===== Conversation Summary =====

/// Summary of one mail conversation as shown in a conversation list.
///
/// Fields are declared in wire order. `position` is transient: it is never
/// persisted or transferred and is reset to [`NO_POSITION`] whenever a
/// conversation is decoded from a row or a wire payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conversation {
    pub id: i64,
    pub uri: Option<Locator>,
    pub subject: String,
    pub date_ms: i64,
    pub snippet: Option<String>,
    pub has_attachments: bool,
    pub message_list_uri: Option<Locator>,
    pub senders: String,
    pub num_messages: i32,
    pub num_drafts: i32,
    pub sending_state: i32,
    pub priority: i32,
    pub read: bool,
    pub starred: bool,
    #[serde(skip)]
    pub position: i32,
}

impl Default for Conversation {
    /// The zero-valued conversation produced when no row is available.
    fn default() -> Self {
        Self {
            id: 0,
            uri: None,
            subject: String::new(),
            date_ms: 0,
            snippet: None,
            has_attachments: false,
            message_list_uri: None,
            senders: String::new(),
            num_messages: 0,
            num_drafts: 0,
            sending_state: 0,
            priority: 0,
            read: false,
            starred: false,
            position: NO_POSITION,
        }
    }
}

impl Conversation {
    /// Receive date as a UTC timestamp, if `date_ms` is in chrono's range.
    pub fn date(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.date_ms)
    }

    /// Compare every persisted field, ignoring the transient `position`.
    pub fn same_content(&self, other: &Conversation) -> bool {
        Conversation {
            position: NO_POSITION,
            ..self.clone()
        } == Conversation {
            position: NO_POSITION,
            ..other.clone()
        }
    }
}

impl fmt::Display for Conversation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[conversation id={}]", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_zero_valued() {
        let conversation = Conversation::default();
        assert_eq!(conversation.id, 0);
        assert_eq!(conversation.subject, "");
        assert!(conversation.uri.is_none());
        assert!(!conversation.read && !conversation.starred && !conversation.has_attachments);
        assert_eq!(conversation.position, NO_POSITION);
    }

    #[test]
    fn display_names_the_id() {
        let conversation = Conversation {
            id: 42,
            ..Conversation::default()
        };
        assert_eq!(conversation.to_string(), "[conversation id=42]");
    }

    #[test]
    fn same_content_ignores_position() {
        let listed = Conversation {
            id: 7,
            position: 3,
            ..Conversation::default()
        };
        let fresh = Conversation {
            id: 7,
            ..Conversation::default()
        };
        assert_ne!(listed, fresh);
        assert!(listed.same_content(&fresh));
    }

    #[test]
    fn date_converts_millis() {
        let conversation = Conversation {
            date_ms: 1_000,
            ..Conversation::default()
        };
        let date = conversation.date().expect("in range");
        assert_eq!(date.timestamp_millis(), 1_000);
    }
}
