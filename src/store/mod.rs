//! Conversation storage backends.

pub mod memory;
pub mod postgres;

pub use memory::{AppliedBatch, MemoryApplier, MemoryConversationStore};
pub use postgres::{JournaledOperation, PgApplier, PgConversationStore};
