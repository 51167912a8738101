//! Row codec: reads a [`Conversation`] out of a tabular row.
//!
//! Rows are read positionally through [`ConversationRow`] using the fixed
//! layout in [`crate::schema`]. Postgres rows and the owned [`MemoryRow`]
//! both implement it.

use sqlx::Row;
use sqlx::postgres::PgRow;

use crate::error::{ConversationError, ConversationResult};
use crate::locator::Locator;
use crate::models::{Conversation, NO_POSITION};
use crate::schema::{COLUMN_COUNT, COLUMNS, ColumnValue, ConversationColumn};

/// Positional, typed access to one conversation row.
pub trait ConversationRow {
    fn get_i64(&self, column: ConversationColumn) -> ConversationResult<i64>;

    fn get_i32(&self, column: ConversationColumn) -> ConversationResult<i32>;

    /// Text cell; `None` when the cell is NULL.
    fn get_string(&self, column: ConversationColumn) -> ConversationResult<Option<String>>;

    fn get_flag(&self, column: ConversationColumn) -> ConversationResult<bool> {
        Ok(self.get_i32(column)? == 1)
    }

    fn get_locator(&self, column: ConversationColumn) -> ConversationResult<Locator> {
        match self.get_string(column)? {
            Some(raw) => Locator::parse_field(column.name(), &raw),
            None => Err(ConversationError::missing_locator(column.name())),
        }
    }
}

impl ConversationRow for PgRow {
    fn get_i64(&self, column: ConversationColumn) -> ConversationResult<i64> {
        Ok(self.try_get::<i64, _>(column.index())?)
    }

    fn get_i32(&self, column: ConversationColumn) -> ConversationResult<i32> {
        Ok(self.try_get::<i32, _>(column.index())?)
    }

    fn get_string(&self, column: ConversationColumn) -> ConversationResult<Option<String>> {
        Ok(self.try_get::<Option<String>, _>(column.index())?)
    }
}

impl Conversation {
    /// Decode a conversation from a row.
    ///
    /// With no row this yields the zero-valued conversation rather than an
    /// error; list adapters rely on that when a cursor is not positioned.
    pub fn from_row<R: ConversationRow + ?Sized>(row: Option<&R>) -> ConversationResult<Self> {
        let Some(row) = row else {
            return Ok(Conversation::default());
        };

        Ok(Conversation {
            id: row.get_i64(ConversationColumn::Id)?,
            uri: Some(row.get_locator(ConversationColumn::Uri)?),
            date_ms: row.get_i64(ConversationColumn::DateMs)?,
            // Never allow an absent subject.
            subject: row
                .get_string(ConversationColumn::Subject)?
                .unwrap_or_default(),
            snippet: row.get_string(ConversationColumn::Snippet)?,
            has_attachments: row.get_flag(ConversationColumn::HasAttachments)?,
            message_list_uri: Some(row.get_locator(ConversationColumn::MessageListUri)?),
            senders: row
                .get_string(ConversationColumn::Senders)?
                .unwrap_or_default(),
            num_messages: row.get_i32(ConversationColumn::NumMessages)?,
            num_drafts: row.get_i32(ConversationColumn::NumDrafts)?,
            sending_state: row.get_i32(ConversationColumn::SendingState)?,
            priority: row.get_i32(ConversationColumn::Priority)?,
            read: row.get_flag(ConversationColumn::Read)?,
            starred: row.get_flag(ConversationColumn::Starred)?,
            position: NO_POSITION,
        })
    }
}

/// Owned row with one cell per column, in row order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryRow {
    values: Vec<ColumnValue>,
}

impl MemoryRow {
    /// Row with every cell NULL.
    pub fn new() -> Self {
        Self {
            values: vec![ColumnValue::Null; COLUMN_COUNT],
        }
    }

    pub fn with(mut self, column: ConversationColumn, value: impl Into<ColumnValue>) -> Self {
        self.set(column, value);
        self
    }

    pub fn set(&mut self, column: ConversationColumn, value: impl Into<ColumnValue>) {
        self.values[column.index()] = value.into();
    }

    pub fn get(&self, column: ConversationColumn) -> &ColumnValue {
        &self.values[column.index()]
    }

    /// The row a store would hold for `conversation`. Absent locators become NULL.
    pub fn from_conversation(conversation: &Conversation) -> Self {
        let locator =
            |value: &Option<Locator>| ColumnValue::from(value.as_ref().map(|l| l.to_string()));
        let mut row = MemoryRow::new();
        for column in COLUMNS {
            let value = match column {
                ConversationColumn::Id => ColumnValue::from(conversation.id),
                ConversationColumn::Uri => locator(&conversation.uri),
                ConversationColumn::DateMs => ColumnValue::from(conversation.date_ms),
                ConversationColumn::Subject => ColumnValue::from(conversation.subject.clone()),
                ConversationColumn::Snippet => ColumnValue::from(conversation.snippet.clone()),
                ConversationColumn::HasAttachments => {
                    ColumnValue::from(conversation.has_attachments)
                }
                ConversationColumn::MessageListUri => locator(&conversation.message_list_uri),
                ConversationColumn::Senders => ColumnValue::from(conversation.senders.clone()),
                ConversationColumn::NumMessages => ColumnValue::from(conversation.num_messages),
                ConversationColumn::NumDrafts => ColumnValue::from(conversation.num_drafts),
                ConversationColumn::SendingState => ColumnValue::from(conversation.sending_state),
                ConversationColumn::Priority => ColumnValue::from(conversation.priority),
                ConversationColumn::Read => ColumnValue::from(conversation.read),
                ConversationColumn::Starred => ColumnValue::from(conversation.starred),
            };
            row.set(column, value);
        }
        row
    }
}

impl Default for MemoryRow {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationRow for MemoryRow {
    fn get_i64(&self, column: ConversationColumn) -> ConversationResult<i64> {
        self.get(column)
            .as_integer()
            .ok_or(ConversationError::ColumnType {
                column: column.name(),
                expected: "integer",
            })
    }

    fn get_i32(&self, column: ConversationColumn) -> ConversationResult<i32> {
        self.get(column)
            .as_integer()
            .and_then(|value| i32::try_from(value).ok())
            .ok_or(ConversationError::ColumnType {
                column: column.name(),
                expected: "32-bit integer",
            })
    }

    fn get_string(&self, column: ConversationColumn) -> ConversationResult<Option<String>> {
        match self.get(column) {
            ColumnValue::Null => Ok(None),
            ColumnValue::Text(value) => Ok(Some(value.clone())),
            ColumnValue::Integer(_) => Err(ConversationError::ColumnType {
                column: column.name(),
                expected: "text",
            }),
        }
    }
}
