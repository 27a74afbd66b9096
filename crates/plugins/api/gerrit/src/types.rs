//! Gerrit REST API response types.
//!
//! These types represent the raw JSON entities returned by the Gerrit REST
//! API. They are deserialized and then mapped to unified types.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Gerrit `AccountInfo`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GerritAccount {
    #[serde(rename = "_account_id", default)]
    pub account_id: Option<u64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Gerrit `RevisionInfo`, reduced to the fields we consume.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GerritRevision {
    /// Patchset number
    #[serde(rename = "_number")]
    pub number: u32,
    #[serde(rename = "ref", default)]
    pub git_ref: Option<String>,
}

/// Gerrit `ChangeInfo`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GerritChange {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "_number")]
    pub number: u64,
    #[serde(default)]
    pub change_id: String,
    pub project: String,
    #[serde(default)]
    pub branch: String,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub owner: Option<GerritAccount>,
    #[serde(default)]
    pub updated: Option<String>,
    #[serde(default)]
    pub current_revision: Option<String>,
    #[serde(default)]
    pub revisions: HashMap<String, GerritRevision>,
}
