//! MCP tool definitions.

use serde_json::json;

use crate::protocol::ToolDefinition;

pub const LIST_CHANGES: &str = "list_changes";
pub const GET_CHANGE_DETAIL: &str = "get_change_detail";
pub const POST_REVIEW: &str = "post_review";
pub const SUBMIT_CHANGE: &str = "submit_change";
pub const BATCH_REVIEW_SUBMIT_BY_TOPIC: &str = "batch_review_submit_by_topic";
pub const SYNC_GERRIT_TO_LOCAL: &str = "sync_gerrit_to_local";

/// Available MCP tools.
pub fn available_tools() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: LIST_CHANGES.to_string(),
            description: "List Gerrit changes matching a search query".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Gerrit search query (default: status:open)"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Maximum number of results (default: 25)",
                        "minimum": 1,
                        "maximum": 500
                    }
                }
            }),
        },
        ToolDefinition {
            name: GET_CHANGE_DETAIL.to_string(),
            description: "Get detailed information about a Gerrit change".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "change_id": {
                        "type": "string",
                        "description": "Change number, Change-Id, or project~branch~Change-Id"
                    },
                    "options": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Extra output options, e.g. LABELS, MESSAGES, CURRENT_REVISION"
                    }
                },
                "required": ["change_id"]
            }),
        },
        ToolDefinition {
            name: POST_REVIEW.to_string(),
            description: "Post a review message and/or label votes on a change revision"
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "change_id": {
                        "type": "string",
                        "description": "Change identifier"
                    },
                    "revision_id": {
                        "type": "string",
                        "description": "Revision to review (default: current)"
                    },
                    "message": {
                        "type": "string",
                        "description": "Review message"
                    },
                    "labels": {
                        "type": "object",
                        "additionalProperties": { "type": "integer" },
                        "description": "Label votes, e.g. {\"Code-Review\": 2, \"Verified\": 1}"
                    }
                },
                "required": ["change_id"]
            }),
        },
        ToolDefinition {
            name: SUBMIT_CHANGE.to_string(),
            description: "Submit a change for merging".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "change_id": {
                        "type": "string",
                        "description": "Change identifier"
                    }
                },
                "required": ["change_id"]
            }),
        },
        ToolDefinition {
            name: BATCH_REVIEW_SUBMIT_BY_TOPIC.to_string(),
            description: "Vote on and submit every open change of a topic, one change at a time"
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "topic": {
                        "type": "string",
                        "description": "Topic grouping the changes"
                    },
                    "code_review": {
                        "type": "integer",
                        "description": "Code-Review vote (default: 2)",
                        "minimum": -2,
                        "maximum": 2
                    },
                    "verified": {
                        "type": "integer",
                        "description": "Verified vote (default: 1)",
                        "minimum": -1,
                        "maximum": 1
                    }
                },
                "required": ["topic"]
            }),
        },
        ToolDefinition {
            name: SYNC_GERRIT_TO_LOCAL.to_string(),
            description:
                "Download the current patchset of a change, or of every open change of a topic, into the local workspace"
                    .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "topic": {
                        "type": "string",
                        "description": "Topic grouping the changes"
                    },
                    "change_id": {
                        "type": "string",
                        "description": "Single change identifier (used when no topic is given)"
                    }
                }
            }),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_names_unique() {
        let tools = available_tools();
        let mut names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), tools.len());
        assert_eq!(tools.len(), 6);
    }

    #[test]
    fn test_schemas_are_objects() {
        for tool in available_tools() {
            assert_eq!(tool.input_schema["type"], "object", "{}", tool.name);
            assert!(tool.input_schema["properties"].is_object(), "{}", tool.name);
        }
    }

    #[test]
    fn test_required_fields() {
        let tools = available_tools();
        let batch = tools
            .iter()
            .find(|t| t.name == BATCH_REVIEW_SUBMIT_BY_TOPIC)
            .unwrap();
        assert_eq!(batch.input_schema["required"], json!(["topic"]));

        let sync = tools.iter().find(|t| t.name == SYNC_GERRIT_TO_LOCAL).unwrap();
        assert!(sync.input_schema.get("required").is_none());
    }
}
