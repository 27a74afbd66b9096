//! Common types shared between providers, the batch runner, and MCP handlers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Gerrit label voted by the batch approval flow.
pub const CODE_REVIEW_LABEL: &str = "Code-Review";

/// Gerrit label marking a change as verified.
pub const VERIFIED_LABEL: &str = "Verified";

/// Represents a Gerrit account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub account_id: Option<u64>,
    pub name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
}

/// Snapshot of a change under review.
///
/// Owned entirely by the remote system; a snapshot is read per invocation
/// and never cached.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Change {
    /// Triplet id (`project~branch~Change-Id`)
    pub id: String,
    /// Legacy numeric change number
    pub number: u64,
    /// `Change-Id` footer value
    pub change_id: String,
    pub project: String,
    pub branch: String,
    pub topic: Option<String>,
    pub subject: String,
    pub status: String,
    pub owner: Option<Account>,
    pub updated: Option<String>,
    /// Commit SHA of the current revision, when requested from the server
    pub current_revision: Option<String>,
    /// Patchset number of the current revision
    pub current_patchset: Option<u32>,
}

impl Change {
    /// `<change-number>/<patchset-number>` reference used by download tools.
    pub fn download_ref(&self) -> Result<String> {
        let patchset = self.current_patchset.ok_or_else(|| {
            Error::InvalidData(format!(
                "Change {} has no current revision to download",
                self.number
            ))
        })?;
        Ok(format!("{}/{}", self.number, patchset))
    }
}

/// Review payload posted against a revision.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, i32>,
}

impl ReviewInput {
    /// Review carrying the batch approval votes and audit message.
    pub fn approval(message: impl Into<String>, code_review: i32, verified: i32) -> Self {
        let mut labels = BTreeMap::new();
        labels.insert(CODE_REVIEW_LABEL.to_string(), code_review);
        labels.insert(VERIFIED_LABEL.to_string(), verified);
        Self {
            message: Some(message.into()),
            labels,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.message.as_deref().is_none_or(str::is_empty) && self.labels.is_empty()
    }
}

/// Submit payload.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubmitInput {
    pub wait_for_merge: bool,
}

impl Default for SubmitInput {
    fn default() -> Self {
        Self {
            wait_for_merge: true,
        }
    }
}

/// How a set of changes is resolved for a batch operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeSelector {
    /// All open changes sharing a topic
    Topic(String),
    /// A single change by any identifier Gerrit accepts
    Change(String),
}

impl ChangeSelector {
    /// Build a selector from optional tool arguments.
    ///
    /// A topic wins when both are supplied. Blank values count as missing.
    pub fn from_args(topic: Option<&str>, change_id: Option<&str>) -> Result<Self> {
        let topic = topic.map(str::trim).filter(|t| !t.is_empty());
        let change_id = change_id.map(str::trim).filter(|c| !c.is_empty());

        match (topic, change_id) {
            (Some(topic), _) => Ok(ChangeSelector::Topic(topic.to_string())),
            (None, Some(change_id)) => Ok(ChangeSelector::Change(change_id.to_string())),
            (None, None) => Err(Error::InvalidInput(
                "Either topic or change_id must be provided".to_string(),
            )),
        }
    }
}

/// Query matching every open change of a topic.
pub fn open_topic_query(topic: &str) -> String {
    let escaped = topic.replace('\\', "\\\\").replace('"', "\\\"");
    format!("topic:\"{}\" status:open", escaped)
}
