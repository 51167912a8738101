//! Batched conversation mutations.
//!
//! A [`BatchMutator`] turns a flag change or a delete over one or more
//! conversations into an ordered list of [`Operation`]s and hands the whole
//! list to a store in a single call. The store answers with a sequence number
//! that identifies the batch (for example to undo it later); the mutator
//! returns it untouched.
//!
//! ## Handle discipline
//!
//! The applier handle is acquired right before submission and dropped right
//! after it, whether the store accepted the batch or not. Handles are RAII
//! guards, so an unwinding panic releases them as well.

use std::future::Future;

use crate::error::{ConversationError, ConversationResult};
use crate::models::Conversation;
use crate::operation::{self, Operation};

/// Identifier under which conversation appliers are looked up.
pub const CONVERSATION_APPLIER_ID: &str = "conversations";

/// A store that applies an ordered operation list as one transaction.
pub trait OperationApplier {
    /// Apply every operation or none, returning the batch sequence number.
    fn apply(
        &mut self,
        operations: &[Operation],
    ) -> impl Future<Output = ConversationResult<i64>> + Send;
}

/// Hands out applier handles. Dropping a handle releases it.
pub trait ApplierSource {
    type Handle: OperationApplier + Send;

    fn acquire(
        &self,
        applier_id: &str,
    ) -> impl Future<Output = ConversationResult<Self::Handle>> + Send;
}

/// Submits flag updates and deletes as single batches.
#[derive(Debug, Clone)]
pub struct BatchMutator<S> {
    source: S,
}

impl<S: ApplierSource> BatchMutator<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Set a boolean column on every conversation, in iteration order.
    pub async fn update_boolean<'a, I>(
        &self,
        conversations: I,
        column: &str,
        value: bool,
    ) -> ConversationResult<i64>
    where
        I: IntoIterator<Item = &'a Conversation>,
    {
        let operations = operation::update_boolean_operations(conversations, column, value);
        self.apply(operations).await
    }

    pub async fn update_boolean_one(
        &self,
        conversation: &Conversation,
        column: &str,
        value: bool,
    ) -> ConversationResult<i64> {
        self.update_boolean(std::slice::from_ref(conversation), column, value)
            .await
    }

    /// Delete every conversation, in iteration order.
    pub async fn delete<'a, I>(&self, conversations: I) -> ConversationResult<i64>
    where
        I: IntoIterator<Item = &'a Conversation>,
    {
        let operations = operation::delete_operations(conversations);
        self.apply(operations).await
    }

    pub async fn delete_one(&self, conversation: &Conversation) -> ConversationResult<i64> {
        self.delete(std::slice::from_ref(conversation)).await
    }

    async fn apply(&self, operations: Vec<Operation>) -> ConversationResult<i64> {
        let mut handle = self
            .source
            .acquire(CONVERSATION_APPLIER_ID)
            .await
            .map_err(|err| match err {
                ConversationError::ApplierUnavailable { .. } => err,
                other => {
                    ConversationError::applier_unavailable(CONVERSATION_APPLIER_ID, other.to_string())
                }
            })
            .inspect_err(|err| {
                log::warn!(
                    "batch of {} operations not submitted: {}",
                    operations.len(),
                    err
                )
            })?;

        let result = handle.apply(&operations).await;
        drop(handle);

        match &result {
            Ok(sequence) => log::debug!(
                "applied batch {} ({} operations)",
                sequence,
                operations.len()
            ),
            Err(err) => log::warn!(
                "batch of {} operations rejected by applier: {}",
                operations.len(),
                err
            ),
        }

        result
    }
}
