//! Lead Tools
//!
//! Tools for managing leads and lead lists, including the bulk move
//! operation between campaigns and lists.

use reqwest::Method;
use serde_json::{json, Value};
use tracing::instrument;

use super::{require_str, tool_result};
use crate::mcp::error::McpError;
use crate::mcp::protocol::{Tool, ToolCallResult};
use crate::upstream::Upstream;

pub fn list_leads_tool() -> Tool {
    Tool::new(
        "list_leads",
        "Search leads with optional filters (campaign, list, search text). Returns lead \
         records with contact details and status.",
        json!({
            "type": "object",
            "properties": {
                "campaign_id": {
                    "type": "string",
                    "description": "Restrict to leads in one campaign"
                },
                "list_id": {
                    "type": "string",
                    "description": "Restrict to leads in one lead list"
                },
                "search": {
                    "type": "string",
                    "description": "Filter by name, email or company"
                },
                "limit": {
                    "type": "integer",
                    "description": "Maximum number of leads to return",
                    "minimum": 1,
                    "maximum": 100
                },
                "starting_after": {
                    "type": "string",
                    "description": "Pagination cursor returned by a previous call"
                }
            }
        }),
    )
    .read_only()
}

pub fn get_lead_tool() -> Tool {
    Tool::new(
        "get_lead",
        "Get one lead by id, including custom variables and engagement history.",
        json!({
            "type": "object",
            "properties": {
                "lead_id": {"type": "string", "description": "The lead identifier"}
            },
            "required": ["lead_id"]
        }),
    )
    .read_only()
}

pub fn create_lead_tool() -> Tool {
    Tool::new(
        "create_lead",
        "Create a lead. Requires an email address; accepts name, company, campaign or list \
         placement and custom variables.",
        json!({
            "type": "object",
            "properties": {
                "email": {"type": "string", "description": "Lead email address"},
                "first_name": {"type": "string"},
                "last_name": {"type": "string"},
                "company_name": {"type": "string"},
                "campaign": {"type": "string", "description": "Campaign to place the lead in"},
                "list_id": {"type": "string", "description": "Lead list to place the lead in"},
                "custom_variables": {
                    "type": "object",
                    "description": "Arbitrary personalization variables"
                }
            },
            "required": ["email"]
        }),
    )
}

pub fn update_lead_tool() -> Tool {
    Tool::new(
        "update_lead",
        "Update a lead's fields or custom variables.",
        json!({
            "type": "object",
            "properties": {
                "lead_id": {"type": "string", "description": "The lead identifier"},
                "first_name": {"type": "string"},
                "last_name": {"type": "string"},
                "company_name": {"type": "string"},
                "custom_variables": {"type": "object"}
            },
            "required": ["lead_id"]
        }),
    )
}

pub fn move_leads_tool() -> Tool {
    Tool::new(
        "move_leads",
        "Move leads in bulk to another campaign or lead list. This operation runs \
         asynchronously upstream and may take a while for large batches.",
        json!({
            "type": "object",
            "properties": {
                "lead_ids": {
                    "type": "array",
                    "description": "Ids of the leads to move",
                    "items": {"type": "string"},
                    "minItems": 1
                },
                "to_campaign_id": {
                    "type": "string",
                    "description": "Destination campaign"
                },
                "to_list_id": {
                    "type": "string",
                    "description": "Destination lead list"
                }
            },
            "required": ["lead_ids"]
        }),
    )
}

pub fn list_lead_lists_tool() -> Tool {
    Tool::new(
        "list_lead_lists",
        "List lead lists in the workspace.",
        json!({
            "type": "object",
            "properties": {
                "limit": {"type": "integer", "minimum": 1, "maximum": 100},
                "starting_after": {"type": "string"}
            }
        }),
    )
    .read_only()
}

pub fn create_lead_list_tool() -> Tool {
    Tool::new(
        "create_lead_list",
        "Create an empty lead list.",
        json!({
            "type": "object",
            "properties": {
                "name": {"type": "string", "description": "Lead list name"}
            },
            "required": ["name"]
        }),
    )
}

/// Execute the list_leads tool.
///
/// The upstream lead search is a POST endpoint; filters travel in the body.
#[instrument(skip(upstream, args), name = "mcp_list_leads")]
pub async fn execute_list_leads(
    upstream: &dyn Upstream,
    api_key: &str,
    args: Value,
) -> Result<ToolCallResult, McpError> {
    let mut body = serde_json::Map::new();
    for field in ["campaign_id", "list_id", "search", "starting_after"] {
        if let Some(value) = args.get(field).and_then(|v| v.as_str()) {
            body.insert(field.to_string(), Value::String(value.to_string()));
        }
    }
    if let Some(limit) = args.get("limit").and_then(|v| v.as_u64()) {
        body.insert("limit".to_string(), Value::from(limit));
    }

    let result = upstream
        .request(Method::POST, "/leads/list", api_key, &[], Some(Value::Object(body)))
        .await?;
    tool_result(result)
}

pub async fn execute_get_lead(
    upstream: &dyn Upstream,
    api_key: &str,
    args: Value,
) -> Result<ToolCallResult, McpError> {
    let id = require_str(&args, "lead_id")?;
    let result =
        upstream.request(Method::GET, &format!("/leads/{}", id), api_key, &[], None).await?;
    tool_result(result)
}

pub async fn execute_create_lead(
    upstream: &dyn Upstream,
    api_key: &str,
    args: Value,
) -> Result<ToolCallResult, McpError> {
    require_str(&args, "email")?;
    let result = upstream.request(Method::POST, "/leads", api_key, &[], Some(args)).await?;
    tool_result(result)
}

pub async fn execute_update_lead(
    upstream: &dyn Upstream,
    api_key: &str,
    args: Value,
) -> Result<ToolCallResult, McpError> {
    let id = require_str(&args, "lead_id")?.to_string();
    let mut body = args;
    if let Some(map) = body.as_object_mut() {
        map.remove("lead_id");
    }

    let result = upstream
        .request(Method::PATCH, &format!("/leads/{}", id), api_key, &[], Some(body))
        .await?;
    tool_result(result)
}

/// Execute the move_leads bulk operation.
#[instrument(skip(upstream, args), name = "mcp_move_leads")]
pub async fn execute_move_leads(
    upstream: &dyn Upstream,
    api_key: &str,
    args: Value,
) -> Result<ToolCallResult, McpError> {
    let lead_ids = args
        .get("lead_ids")
        .and_then(|v| v.as_array())
        .filter(|a| !a.is_empty())
        .ok_or_else(|| {
            McpError::InvalidParams("Missing required parameter 'lead_ids'".to_string())
        })?;

    if args.get("to_campaign_id").is_none() && args.get("to_list_id").is_none() {
        return Err(McpError::InvalidParams(
            "Provide a destination: 'to_campaign_id' or 'to_list_id'".to_string(),
        ));
    }

    let mut body = json!({ "ids": lead_ids });
    for field in ["to_campaign_id", "to_list_id"] {
        if let Some(value) = args.get(field) {
            body[field] = value.clone();
        }
    }

    let result = upstream.request(Method::POST, "/leads/move", api_key, &[], Some(body)).await?;
    tool_result(result)
}

pub async fn execute_list_lead_lists(
    upstream: &dyn Upstream,
    api_key: &str,
    args: Value,
) -> Result<ToolCallResult, McpError> {
    let query = super::paging_query(&args);
    let result = upstream.request(Method::GET, "/lead-lists", api_key, &query, None).await?;
    tool_result(result)
}

pub async fn execute_create_lead_list(
    upstream: &dyn Upstream,
    api_key: &str,
    args: Value,
) -> Result<ToolCallResult, McpError> {
    require_str(&args, "name")?;
    let result = upstream.request(Method::POST, "/lead-lists", api_key, &[], Some(args)).await?;
    tool_result(result)
}
