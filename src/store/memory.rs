//! In-process conversation store.
//!
//! Rows are kept as [`MemoryRow`]s behind a mutex. A batch is applied to a
//! copy of the rows and swapped in only when every operation succeeded, so a
//! failed batch leaves nothing behind. The store also counts handle
//! acquisitions and releases and can be told to refuse handles or the next
//! batch, which is what tests of the mutation path need.

use parking_lot::Mutex;
use std::sync::Arc;

use crate::error::{ConversationError, ConversationResult};
use crate::models::Conversation;
use crate::mutation::{ApplierSource, CONVERSATION_APPLIER_ID, OperationApplier};
use crate::operation::Operation;
use crate::row::MemoryRow;
use crate::schema::ConversationColumn;

/// One committed batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedBatch {
    pub sequence: i64,
    pub operations: Vec<Operation>,
}

#[derive(Debug, Default)]
struct MemoryState {
    rows: Vec<MemoryRow>,
    last_sequence: i64,
    batches: Vec<AppliedBatch>,
    outstanding: usize,
    acquisitions: usize,
    unavailable: Option<String>,
    reject_next: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryConversationStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_conversations(conversations: impl IntoIterator<Item = Conversation>) -> Self {
        let store = Self::new();
        for conversation in conversations {
            store.insert(&conversation);
        }
        store
    }

    pub fn insert(&self, conversation: &Conversation) {
        self.insert_row(MemoryRow::from_conversation(conversation));
    }

    pub fn insert_row(&self, row: MemoryRow) {
        self.state.lock().rows.push(row);
    }

    pub fn get(&self, id: i64) -> ConversationResult<Option<Conversation>> {
        let state = self.state.lock();
        let row = state.rows.iter().find(|row| row_id(row) == Some(id));
        match row {
            Some(row) => Conversation::from_row(Some(row)).map(Some),
            None => Ok(None),
        }
    }

    /// All conversations in insertion order.
    pub fn list(&self) -> ConversationResult<Vec<Conversation>> {
        let state = self.state.lock();
        state
            .rows
            .iter()
            .map(|row| Conversation::from_row(Some(row)))
            .collect()
    }

    pub fn batches(&self) -> Vec<AppliedBatch> {
        self.state.lock().batches.clone()
    }

    /// Handles acquired and not yet released.
    pub fn outstanding_handles(&self) -> usize {
        self.state.lock().outstanding
    }

    pub fn acquisitions(&self) -> usize {
        self.state.lock().acquisitions
    }

    /// Refuse handle acquisition with `reason` until cleared with `None`.
    pub fn set_unavailable(&self, reason: Option<&str>) {
        self.state.lock().unavailable = reason.map(str::to_string);
    }

    /// Reject the next submitted batch with `reason`.
    pub fn reject_next_batch(&self, reason: &str) {
        self.state.lock().reject_next = Some(reason.to_string());
    }
}

fn row_id(row: &MemoryRow) -> Option<i64> {
    row.get(ConversationColumn::Id).as_integer()
}

fn apply_operation(rows: &mut Vec<MemoryRow>, operation: &Operation) -> ConversationResult<()> {
    match operation {
        Operation::Update {
            target,
            column,
            value,
        } => {
            let column_ref = ConversationColumn::from_name(column)
                .filter(|c| c.is_mutable())
                .ok_or_else(|| ConversationError::UnknownColumn(column.clone()))?;
            let cell = value.for_column(column_ref)?;
            for row in rows.iter_mut().filter(|row| row_id(row) == Some(target.id)) {
                row.set(column_ref, cell.clone());
            }
            log::trace!("update {} set {} = {}", target.id, column, value);
        }
        Operation::Delete { target } => {
            rows.retain(|row| row_id(row) != Some(target.id));
            log::trace!("delete {}", target.id);
        }
    }
    Ok(())
}

impl ApplierSource for MemoryConversationStore {
    type Handle = MemoryApplier;

    async fn acquire(&self, applier_id: &str) -> ConversationResult<MemoryApplier> {
        if applier_id != CONVERSATION_APPLIER_ID {
            return Err(ConversationError::applier_unavailable(
                applier_id,
                "no applier registered under this id",
            ));
        }

        let mut state = self.state.lock();
        if let Some(reason) = &state.unavailable {
            return Err(ConversationError::applier_unavailable(applier_id, reason.clone()));
        }
        state.outstanding += 1;
        state.acquisitions += 1;

        Ok(MemoryApplier {
            state: Arc::clone(&self.state),
        })
    }
}

/// Handle onto a [`MemoryConversationStore`]; released on drop.
#[derive(Debug)]
pub struct MemoryApplier {
    state: Arc<Mutex<MemoryState>>,
}

impl OperationApplier for MemoryApplier {
    async fn apply(&mut self, operations: &[Operation]) -> ConversationResult<i64> {
        let mut state = self.state.lock();
        if let Some(reason) = state.reject_next.take() {
            return Err(ConversationError::Rejected(reason));
        }

        let mut rows = state.rows.clone();
        for operation in operations {
            apply_operation(&mut rows, operation)?;
        }

        state.rows = rows;
        state.last_sequence += 1;
        let sequence = state.last_sequence;
        state.batches.push(AppliedBatch {
            sequence,
            operations: operations.to_vec(),
        });

        Ok(sequence)
    }
}

impl Drop for MemoryApplier {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        state.outstanding = state.outstanding.saturating_sub(1);
    }
}
