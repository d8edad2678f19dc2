//! Seam Store
//!
//! This crate provides the storage trait and implementations for stacks.
//! A stack is persisted as a self-describing JSON record keyed by its id.
//!
//! The [`StackStore`] trait defines the three operations the dispatcher
//! needs:
//! - Finding a stack by id
//! - Saving a stack (create or update)
//! - Removing a stack once its workflow has finished

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::{SqliteStore, StackSummary};

use async_trait::async_trait;
use seam_stack::{Stack, StackError};

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  /// A persisted record could not be turned back into a stack.
  #[error("stack record '{id}' is corrupt: {source}")]
  Corrupt {
    id: String,
    #[source]
    source: StackError,
  },

  /// A stack could not be serialized.
  #[error("failed to encode stack: {0}")]
  Encode(#[from] StackError),

  /// A database error occurred.
  #[error("database error: {0}")]
  Database(#[from] sqlx::Error),

  #[error("migration error: {0}")]
  Migrate(#[from] sqlx::migrate::MigrateError),
}

/// Storage for stacks.
///
/// Writes to the same id are expected to be serialized by the caller; the
/// store only guarantees that each call is atomic on its own.
#[async_trait]
pub trait StackStore: Send + Sync {
  /// Get a stack by id, or `None` if it does not exist.
  async fn find_stack(&self, id: &str) -> Result<Option<Stack>, StoreError>;

  /// Create or update a stack.
  async fn save_stack(&self, stack: &Stack) -> Result<(), StoreError>;

  /// Delete a stack. Removing a missing stack is not an error.
  async fn remove_stack(&self, id: &str) -> Result<(), StoreError>;
}
