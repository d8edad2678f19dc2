//! Seam Stack
//!
//! A [`Stack`] is one running instance of a workflow. It records which
//! machine governs it, the state it is in, the tasks that must complete
//! before the machine may move on, and flat metadata that is forwarded to
//! task executors.
//!
//! Stacks are plain data. The state machine mutates them, the dispatcher
//! persists them.

mod error;
mod stack;
mod task;

pub use error::StackError;
pub use stack::{INITIAL_STATE, Metadata, Stack};
pub use task::{TaskRecord, TaskStatus};
