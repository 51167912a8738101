use thiserror::Error;

pub type ConversationResult<T> = Result<T, ConversationError>;

/// Errors raised while decoding conversations or applying batched mutations.
#[derive(Debug, Error)]
pub enum ConversationError {
    /// `input` is `None` when the source held no value at all.
    #[error("malformed locator in {field}: {}", describe_input(.input))]
    MalformedLocator {
        field: &'static str,
        input: Option<String>,
    },
    #[error("truncated wire payload: {0}")]
    TruncatedWire(String),
    #[error("invalid wire payload: {0}")]
    InvalidWire(String),
    #[error("applier '{applier}' unavailable: {reason}")]
    ApplierUnavailable { applier: String, reason: String },
    #[error("unknown or immutable column: {0}")]
    UnknownColumn(String),
    #[error("column {column} expected {expected}")]
    ColumnType {
        column: &'static str,
        expected: &'static str,
    },
    #[error("batch rejected: {0}")]
    Rejected(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

fn describe_input(input: &Option<String>) -> String {
    match input {
        Some(input) => format!("{input:?}"),
        None => "missing value".to_string(),
    }
}

impl ConversationError {
    pub fn malformed_locator(field: &'static str, input: impl Into<String>) -> Self {
        ConversationError::MalformedLocator {
            field,
            input: Some(input.into()),
        }
    }

    pub fn missing_locator(field: &'static str) -> Self {
        ConversationError::MalformedLocator { field, input: None }
    }

    pub fn applier_unavailable(applier: &str, reason: impl Into<String>) -> Self {
        ConversationError::ApplierUnavailable {
            applier: applier.to_string(),
            reason: reason.into(),
        }
    }
}
