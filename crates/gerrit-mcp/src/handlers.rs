//! Tool handlers for MCP server.
//!
//! This module implements the actual tool execution logic: argument
//! validation, the provider call, and conversion of every failure into an
//! error-flagged text result. Nothing is propagated past this boundary.

use std::collections::BTreeMap;
use std::sync::Arc;

use gerrit_core::batch::{
    review_submit_topic, sync_to_local, VoteSubmitSettings, DEFAULT_CODE_REVIEW_VOTE,
    DEFAULT_VERIFIED_VOTE,
};
use gerrit_core::{ChangeSelector, Error, ReviewInput, ReviewProvider, SubmitInput, SyncTool};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::protocol::{ToolCallResult, ToolDefinition};
use crate::tools;

const DEFAULT_QUERY: &str = "status:open";
const DEFAULT_LIMIT: u32 = 25;

/// Tool handler that executes tools against a review provider.
pub struct ToolHandler {
    provider: Arc<dyn ReviewProvider>,
    sync_tool: Arc<dyn SyncTool>,
    batch_settings: VoteSubmitSettings,
}

impl ToolHandler {
    /// Create a new tool handler.
    pub fn new(provider: Arc<dyn ReviewProvider>, sync_tool: Arc<dyn SyncTool>) -> Self {
        Self {
            provider,
            sync_tool,
            batch_settings: VoteSubmitSettings::default(),
        }
    }

    /// Override the batch vote-then-submit settings.
    pub fn with_batch_settings(mut self, settings: VoteSubmitSettings) -> Self {
        self.batch_settings = settings;
        self
    }

    /// Get available tool definitions.
    pub fn available_tools(&self) -> Vec<ToolDefinition> {
        tools::available_tools()
    }

    /// Execute a tool by name with arguments.
    pub async fn execute(&self, name: &str, arguments: Option<Value>) -> ToolCallResult {
        let result = match name {
            tools::LIST_CHANGES => self.handle_list_changes(arguments).await,
            tools::GET_CHANGE_DETAIL => self.handle_get_change_detail(arguments).await,
            tools::POST_REVIEW => self.handle_post_review(arguments).await,
            tools::SUBMIT_CHANGE => self.handle_submit_change(arguments).await,
            tools::BATCH_REVIEW_SUBMIT_BY_TOPIC => self.handle_batch_review_submit(arguments).await,
            tools::SYNC_GERRIT_TO_LOCAL => self.handle_sync_to_local(arguments).await,
            _ => return ToolCallResult::error(format!("Unknown tool: {}", name)),
        };

        match result {
            Ok(text) => ToolCallResult::text(text),
            Err(e) => {
                tracing::warn!("Tool {} failed: {}", name, e);
                ToolCallResult::error(format!("Error: {}", e.detail()))
            }
        }
    }

    /// Handle list_changes tool call.
    async fn handle_list_changes(&self, arguments: Option<Value>) -> gerrit_core::Result<String> {
        let params: ListChangesParams = parse_args(arguments)?;
        let query = params
            .query
            .filter(|q| !q.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_QUERY.to_string());
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
        if limit == 0 {
            return Err(Error::InvalidInput("limit must be at least 1".to_string()));
        }

        let changes = self.provider.query_changes(&query, Some(limit)).await?;
        tracing::debug!("Got {} changes for '{}'", changes.len(), query);
        to_pretty_json(&changes)
    }

    /// Handle get_change_detail tool call.
    async fn handle_get_change_detail(
        &self,
        arguments: Option<Value>,
    ) -> gerrit_core::Result<String> {
        let params: ChangeDetailParams = parse_args(arguments)?;
        let change_id = required(&params.change_id, "change_id")?;

        let detail = self
            .provider
            .get_change_detail(change_id, &params.options)
            .await?;
        to_pretty_json(&detail)
    }

    /// Handle post_review tool call.
    async fn handle_post_review(&self, arguments: Option<Value>) -> gerrit_core::Result<String> {
        let params: PostReviewParams = parse_args(arguments)?;
        let change_id = required(&params.change_id, "change_id")?;
        let revision_id = params
            .revision_id
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or("current");

        let input = ReviewInput {
            message: params.message,
            labels: params.labels,
        };
        if input.is_empty() {
            return Err(Error::InvalidInput(
                "Either message or labels must be provided".to_string(),
            ));
        }

        let result = self
            .provider
            .post_review(change_id, revision_id, &input)
            .await?;
        to_pretty_json(&result)
    }

    /// Handle submit_change tool call.
    async fn handle_submit_change(&self, arguments: Option<Value>) -> gerrit_core::Result<String> {
        let params: SubmitChangeParams = parse_args(arguments)?;
        let change_id = required(&params.change_id, "change_id")?;

        let change = self
            .provider
            .submit_change(change_id, &SubmitInput::default())
            .await?;
        to_pretty_json(&change)
    }

    /// Handle batch_review_submit_by_topic tool call.
    async fn handle_batch_review_submit(
        &self,
        arguments: Option<Value>,
    ) -> gerrit_core::Result<String> {
        let params: BatchReviewSubmitParams = parse_args(arguments)?;
        let topic = required(&params.topic, "topic")?;

        let settings = VoteSubmitSettings {
            code_review: params.code_review.unwrap_or(DEFAULT_CODE_REVIEW_VOTE),
            verified: params.verified.unwrap_or(DEFAULT_VERIFIED_VOTE),
            ..self.batch_settings.clone()
        };

        let report = review_submit_topic(self.provider.as_ref(), topic, &settings).await?;
        tracing::info!(
            "Batch for topic '{}' finished with {} failures",
            topic,
            report.failed_count()
        );
        Ok(report.to_string())
    }

    /// Handle sync_gerrit_to_local tool call.
    async fn handle_sync_to_local(&self, arguments: Option<Value>) -> gerrit_core::Result<String> {
        let params: SyncParams = parse_args(arguments)?;
        let selector =
            ChangeSelector::from_args(params.topic.as_deref(), params.change_id.as_deref())?;

        let report =
            sync_to_local(self.provider.as_ref(), self.sync_tool.as_ref(), &selector).await?;
        Ok(report.to_string())
    }
}

/// Deserialize tool arguments, treating absent arguments as an empty object.
fn parse_args<T: DeserializeOwned>(arguments: Option<Value>) -> gerrit_core::Result<T> {
    let value = arguments.unwrap_or_else(|| Value::Object(Default::default()));
    serde_json::from_value(value).map_err(|e| Error::InvalidInput(e.to_string()))
}

fn required<'a>(value: &'a Option<String>, field: &str) -> gerrit_core::Result<&'a str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::InvalidInput(format!("Missing required argument: {}", field)))
}

fn to_pretty_json<T: Serialize>(value: &T) -> gerrit_core::Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Parameters for list_changes tool.
#[derive(Debug, Default, Serialize, Deserialize)]
struct ListChangesParams {
    query: Option<String>,
    limit: Option<u32>,
}

/// Parameters for get_change_detail tool.
#[derive(Debug, Default, Serialize, Deserialize)]
struct ChangeDetailParams {
    change_id: Option<String>,
    #[serde(default)]
    options: Vec<String>,
}

/// Parameters for post_review tool.
#[derive(Debug, Default, Serialize, Deserialize)]
struct PostReviewParams {
    change_id: Option<String>,
    revision_id: Option<String>,
    message: Option<String>,
    #[serde(default)]
    labels: BTreeMap<String, i32>,
}

/// Parameters for submit_change tool.
#[derive(Debug, Default, Serialize, Deserialize)]
struct SubmitChangeParams {
    change_id: Option<String>,
}

/// Parameters for batch_review_submit_by_topic tool.
#[derive(Debug, Default, Serialize, Deserialize)]
struct BatchReviewSubmitParams {
    topic: Option<String>,
    code_review: Option<i32>,
    verified: Option<i32>,
}

/// Parameters for sync_gerrit_to_local tool.
#[derive(Debug, Default, Serialize, Deserialize)]
struct SyncParams {
    topic: Option<String>,
    change_id: Option<String>,
}
