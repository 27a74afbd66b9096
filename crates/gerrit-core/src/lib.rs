//! Core traits, types, and error handling for gerrit-mcp.
//!
//! This crate provides the foundational abstractions used across all gerrit-mcp
//! components: the review provider trait, the unified change model, the batch
//! runner, and the external sync tool.

pub mod batch;
pub mod config;
pub mod error;
pub mod provider;
pub mod sync;
pub mod types;

pub use batch::{BatchReport, ItemOutcome, VoteSubmitSettings};
pub use config::{Config, ConnectionConfig};
pub use error::{Error, Result};
pub use provider::ReviewProvider;
pub use sync::{CommandSyncTool, SyncTool};
pub use types::{Account, Change, ChangeSelector, ReviewInput, SubmitInput};
