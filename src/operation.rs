//! Mutation intents submitted to a store as one batch.

use serde::Serialize;
use std::fmt;

use crate::error::{ConversationError, ConversationResult};
use crate::locator::Locator;
use crate::models::Conversation;
use crate::schema::{ColumnKind, ColumnValue, ConversationColumn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Update,
    Delete,
}

impl OperationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::Update => "update",
            OperationKind::Delete => "delete",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of the conversation an operation applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationTarget {
    pub id: i64,
    pub uri: Option<Locator>,
}

impl From<&Conversation> for OperationTarget {
    fn from(conversation: &Conversation) -> Self {
        Self {
            id: conversation.id,
            uri: conversation.uri.clone(),
        }
    }
}

/// New value carried by an update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OperationValue {
    Bool(bool),
    Integer(i64),
    Text(String),
}

impl OperationValue {
    /// Cell to store in `column`. Booleans are stored as 0/1 and only flag
    /// columns take them.
    pub fn for_column(&self, column: ConversationColumn) -> ConversationResult<ColumnValue> {
        match (column.kind(), self) {
            (ColumnKind::Flag, OperationValue::Bool(value)) => Ok(ColumnValue::from(*value)),
            (ColumnKind::Flag, OperationValue::Integer(value @ (0 | 1))) => {
                Ok(ColumnValue::Integer(*value))
            }
            (ColumnKind::Int, OperationValue::Integer(value)) if i32::try_from(*value).is_ok() => {
                Ok(ColumnValue::Integer(*value))
            }
            (ColumnKind::BigInt, OperationValue::Integer(value)) => Ok(ColumnValue::Integer(*value)),
            (ColumnKind::NullableText, OperationValue::Text(value)) => {
                Ok(ColumnValue::Text(value.clone()))
            }
            (ColumnKind::Locator, OperationValue::Text(value)) => {
                Locator::parse_field(column.name(), value)?;
                Ok(ColumnValue::Text(value.clone()))
            }
            (kind, _) => Err(ConversationError::ColumnType {
                column: column.name(),
                expected: kind.describe(),
            }),
        }
    }
}

impl fmt::Display for OperationValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationValue::Bool(value) => write!(f, "{}", i32::from(*value)),
            OperationValue::Integer(value) => write!(f, "{value}"),
            OperationValue::Text(value) => f.write_str(value),
        }
    }
}

/// One update per conversation, in iteration order.
pub fn update_boolean_operations<'a, I>(conversations: I, column: &str, value: bool) -> Vec<Operation>
where
    I: IntoIterator<Item = &'a Conversation>,
{
    conversations
        .into_iter()
        .map(|conversation| Operation::update(conversation, column, OperationValue::Bool(value)))
        .collect()
}

/// One delete per conversation, in iteration order.
pub fn delete_operations<'a, I>(conversations: I) -> Vec<Operation>
where
    I: IntoIterator<Item = &'a Conversation>,
{
    conversations.into_iter().map(Operation::delete).collect()
}

/// One intended change to one conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Operation {
    Update {
        target: OperationTarget,
        column: String,
        value: OperationValue,
    },
    Delete {
        target: OperationTarget,
    },
}

impl Operation {
    pub fn update(conversation: &Conversation, column: &str, value: OperationValue) -> Self {
        Operation::Update {
            target: OperationTarget::from(conversation),
            column: column.to_string(),
            value,
        }
    }

    pub fn delete(conversation: &Conversation) -> Self {
        Operation::Delete {
            target: OperationTarget::from(conversation),
        }
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Update { .. } => OperationKind::Update,
            Operation::Delete { .. } => OperationKind::Delete,
        }
    }

    pub fn target(&self) -> &OperationTarget {
        match self {
            Operation::Update { target, .. } | Operation::Delete { target } => target,
        }
    }

    /// Changed column, present only for updates.
    pub fn column(&self) -> Option<&str> {
        match self {
            Operation::Update { column, .. } => Some(column),
            Operation::Delete { .. } => None,
        }
    }

    pub fn value(&self) -> Option<&OperationValue> {
        match self {
            Operation::Update { value, .. } => Some(value),
            Operation::Delete { .. } => None,
        }
    }
}
