//! Fixed column layout of the conversation table.
//!
//! The row codec reads columns by position, so the order of [`COLUMNS`] is
//! the contract between queries built here and [`crate::row`].

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConversationColumn {
    Id,
    Uri,
    DateMs,
    Subject,
    Snippet,
    HasAttachments,
    MessageListUri,
    Senders,
    NumMessages,
    NumDrafts,
    SendingState,
    Priority,
    Read,
    Starred,
}

pub const COLUMN_COUNT: usize = 14;

/// Columns in row order.
pub const COLUMNS: [ConversationColumn; COLUMN_COUNT] = [
    ConversationColumn::Id,
    ConversationColumn::Uri,
    ConversationColumn::DateMs,
    ConversationColumn::Subject,
    ConversationColumn::Snippet,
    ConversationColumn::HasAttachments,
    ConversationColumn::MessageListUri,
    ConversationColumn::Senders,
    ConversationColumn::NumMessages,
    ConversationColumn::NumDrafts,
    ConversationColumn::SendingState,
    ConversationColumn::Priority,
    ConversationColumn::Read,
    ConversationColumn::Starred,
];

/// Storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    BigInt,
    Int,
    /// Integer column holding 0/1.
    Flag,
    NullableText,
    Locator,
}

impl ColumnKind {
    pub fn describe(self) -> &'static str {
        match self {
            ColumnKind::BigInt => "integer",
            ColumnKind::Int => "32-bit integer",
            ColumnKind::Flag => "flag (0/1)",
            ColumnKind::NullableText => "text",
            ColumnKind::Locator => "locator",
        }
    }
}

impl ConversationColumn {
    pub fn name(self) -> &'static str {
        match self {
            ConversationColumn::Id => "id",
            ConversationColumn::Uri => "uri",
            ConversationColumn::DateMs => "date_ms",
            ConversationColumn::Subject => "subject",
            ConversationColumn::Snippet => "snippet",
            ConversationColumn::HasAttachments => "has_attachments",
            ConversationColumn::MessageListUri => "message_list_uri",
            ConversationColumn::Senders => "senders",
            ConversationColumn::NumMessages => "num_messages",
            ConversationColumn::NumDrafts => "num_drafts",
            ConversationColumn::SendingState => "sending_state",
            ConversationColumn::Priority => "priority",
            ConversationColumn::Read => "read",
            ConversationColumn::Starred => "starred",
        }
    }

    /// Position of the column in a row.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn kind(self) -> ColumnKind {
        match self {
            ConversationColumn::Id | ConversationColumn::DateMs => ColumnKind::BigInt,
            ConversationColumn::Uri | ConversationColumn::MessageListUri => ColumnKind::Locator,
            ConversationColumn::Subject
            | ConversationColumn::Snippet
            | ConversationColumn::Senders => ColumnKind::NullableText,
            ConversationColumn::HasAttachments
            | ConversationColumn::Read
            | ConversationColumn::Starred => ColumnKind::Flag,
            ConversationColumn::NumMessages
            | ConversationColumn::NumDrafts
            | ConversationColumn::SendingState
            | ConversationColumn::Priority => ColumnKind::Int,
        }
    }

    pub fn is_boolean(self) -> bool {
        self.kind() == ColumnKind::Flag
    }

    /// Columns that batched updates may target. `id` is the row identity.
    pub fn is_mutable(self) -> bool {
        self != ConversationColumn::Id
    }

    pub fn from_name(name: &str) -> Option<Self> {
        COLUMNS.iter().copied().find(|column| column.name() == name)
    }

    /// Comma separated column list in row order, for SELECT statements.
    pub fn select_list() -> String {
        COLUMNS
            .iter()
            .map(|column| column.name())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for ConversationColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single typed cell value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ColumnValue {
    Null,
    Integer(i64),
    Text(String),
}

impl ColumnValue {
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            ColumnValue::Integer(value) => Some(*value),
            _ => None,
        }
    }
}

impl From<bool> for ColumnValue {
    fn from(value: bool) -> Self {
        ColumnValue::Integer(i64::from(value))
    }
}

impl From<i64> for ColumnValue {
    fn from(value: i64) -> Self {
        ColumnValue::Integer(value)
    }
}

impl From<i32> for ColumnValue {
    fn from(value: i32) -> Self {
        ColumnValue::Integer(i64::from(value))
    }
}

impl From<String> for ColumnValue {
    fn from(value: String) -> Self {
        ColumnValue::Text(value)
    }
}

impl From<Option<String>> for ColumnValue {
    fn from(value: Option<String>) -> Self {
        value.map(ColumnValue::Text).unwrap_or(ColumnValue::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_are_indexed_in_row_order() {
        for (position, column) in COLUMNS.iter().enumerate() {
            assert_eq!(column.index(), position);
        }
        assert_eq!(COLUMNS[2], ConversationColumn::DateMs);
        assert_eq!(COLUMNS[3], ConversationColumn::Subject);
    }

    #[test]
    fn names_round_trip() {
        for column in COLUMNS {
            assert_eq!(ConversationColumn::from_name(column.name()), Some(column));
        }
        assert_eq!(ConversationColumn::from_name("position"), None);
    }

    #[test]
    fn boolean_columns() {
        let flags: Vec<_> = COLUMNS.iter().filter(|c| c.is_boolean()).map(|c| c.name()).collect();
        assert_eq!(flags, vec!["has_attachments", "read", "starred"]);
    }

    #[test]
    fn select_list_starts_with_identity() {
        let list = ConversationColumn::select_list();
        assert!(list.starts_with("id, uri, date_ms, subject"));
        assert!(list.ends_with("read, starred"));
    }
}
