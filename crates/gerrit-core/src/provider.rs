//! Provider trait for code review services.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::types::{Change, ReviewInput, SubmitInput};

/// Trait for code review backends (Gerrit).
///
/// Every call is a single remote round trip; implementations keep no state
/// between calls apart from their connection settings.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReviewProvider: Send + Sync {
    /// Get the provider name (e.g., "gerrit")
    fn provider_name(&self) -> &'static str;

    /// Query changes. Returned changes carry their current revision.
    async fn query_changes(&self, query: &str, limit: Option<u32>) -> Result<Vec<Change>>;

    /// Get a single change with its current revision.
    async fn get_change(&self, change_id: &str) -> Result<Change>;

    /// Get the detailed change payload as returned by the server.
    ///
    /// `options` are passed through as repeated `o` query parameters.
    async fn get_change_detail(&self, change_id: &str, options: &[String]) -> Result<Value>;

    /// Post a review (message and/or votes) on a revision.
    async fn post_review(
        &self,
        change_id: &str,
        revision_id: &str,
        input: &ReviewInput,
    ) -> Result<Value>;

    /// Submit a change for merging.
    async fn submit_change(&self, change_id: &str, input: &SubmitInput) -> Result<Change>;
}
