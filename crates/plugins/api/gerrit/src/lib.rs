//! Gerrit provider implementation for gerrit-mcp.
//!
//! This crate provides integration with the Gerrit REST API for querying,
//! reviewing, and submitting changes.

mod client;
mod types;
pub mod xssi;

pub use client::GerritClient;
