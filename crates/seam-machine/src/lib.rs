//! Seam Machine
//!
//! This crate provides the validated machine representation and the
//! interpreter that drives stacks through it.
//!
//! Key differences from `seam-config`:
//! - Every state, event and task reference has been checked
//! - Tasks carry their own name alongside the executor configuration
//! - The implicit `NEXT` event is part of every state's vocabulary
//!
//! [`StateMachine`] holds no per-stack data. All mutable state lives on the
//! [`Stack`](seam_stack::Stack) passed into each call.

mod config;
mod error;
mod machine;

pub use config::{Action, MachineConfig, NEXT_EVENT, StateConfig, TaskConfig};
pub use error::MachineError;
pub use machine::{MAX_AUTO_ADVANCE_STEPS, StateMachine};
