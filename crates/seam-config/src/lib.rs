//! Seam Config
//!
//! This crate contains the serializable machine document types for Seam.
//! These types represent state machine definitions before they are validated
//! and turned into a runnable machine.
//!
//! Documents can be loaded from:
//! - YAML files (`*.yml`, `*.yaml`)
//! - JSON files (`*.json`)
//!
//! The validator takes a [`MachineDocument`], dispatches on its `version`,
//! and checks it against the matching schema (currently only [`v1`]).

mod document;
mod error;
mod executor;
pub mod v1;

pub use document::{DocumentFormat, MachineDocument};
pub use error::ConfigError;
pub use executor::{ExecutorConfig, LambdaConfig, TerraformAction, TerraformConfig, TerraformSource};
