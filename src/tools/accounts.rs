//! Sending-Account Tools
//!
//! Tools for managing the workspace's sending accounts, warmup analytics and
//! API keys.

use reqwest::Method;
use serde_json::{json, Value};

use super::{paging_query, require_str, tool_result};
use crate::mcp::error::McpError;
use crate::mcp::protocol::{Tool, ToolCallResult};
use crate::upstream::Upstream;

pub fn list_accounts_tool() -> Tool {
    Tool::new(
        "list_accounts",
        "List sending accounts with status, daily limit and warmup state. Supports pagination \
         via limit and starting_after parameters.",
        json!({
            "type": "object",
            "properties": {
                "limit": {
                    "type": "integer",
                    "description": "Maximum number of accounts to return",
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

pub fn get_account_tool() -> Tool {
    Tool::new(
        "get_account",
        "Get the full configuration of one sending account by email address.",
        account_email_schema(),
    )
    .read_only()
}

pub fn update_account_tool() -> Tool {
    Tool::new(
        "update_account",
        "Update a sending account's settings, e.g. daily sending limit or warmup configuration.",
        json!({
            "type": "object",
            "properties": {
                "email": {
                    "type": "string",
                    "description": "Email address of the sending account"
                },
                "daily_limit": {
                    "type": "integer",
                    "description": "Maximum emails sent per day",
                    "minimum": 1
                },
                "warmup": {
                    "type": "object",
                    "description": "Warmup settings to apply"
                }
            },
            "required": ["email"]
        }),
    )
}

pub fn pause_account_tool() -> Tool {
    Tool::new("pause_account", "Pause sending from an account.", account_email_schema())
}

pub fn resume_account_tool() -> Tool {
    Tool::new("resume_account", "Resume sending from a paused account.", account_email_schema())
}

pub fn get_warmup_analytics_tool() -> Tool {
    Tool::new(
        "get_warmup_analytics",
        "Get warmup analytics (health score, sent/landed counts) for one or more sending \
         accounts.",
        json!({
            "type": "object",
            "properties": {
                "emails": {
                    "type": "array",
                    "description": "Sending account addresses to report on",
                    "items": {"type": "string"},
                    "minItems": 1
                }
            },
            "required": ["emails"]
        }),
    )
    .read_only()
}

pub fn list_api_keys_tool() -> Tool {
    Tool::new(
        "list_api_keys",
        "List API keys configured for the workspace.",
        json!({"type": "object", "properties": {}}),
    )
    .read_only()
}

fn account_email_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "email": {
                "type": "string",
                "description": "Email address of the sending account"
            }
        },
        "required": ["email"]
    })
}

pub async fn execute_list_accounts(
    upstream: &dyn Upstream,
    api_key: &str,
    args: Value,
) -> Result<ToolCallResult, McpError> {
    let query = paging_query(&args);
    let result = upstream.request(Method::GET, "/accounts", api_key, &query, None).await?;
    tool_result(result)
}

pub async fn execute_get_account(
    upstream: &dyn Upstream,
    api_key: &str,
    args: Value,
) -> Result<ToolCallResult, McpError> {
    let email = require_str(&args, "email")?;
    let result =
        upstream.request(Method::GET, &format!("/accounts/{}", email), api_key, &[], None).await?;
    tool_result(result)
}

pub async fn execute_update_account(
    upstream: &dyn Upstream,
    api_key: &str,
    args: Value,
) -> Result<ToolCallResult, McpError> {
    let email = require_str(&args, "email")?.to_string();
    let mut body = args;
    // The address identifies the resource in the path, not the body.
    if let Some(map) = body.as_object_mut() {
        map.remove("email");
    }

    let result = upstream
        .request(Method::PATCH, &format!("/accounts/{}", email), api_key, &[], Some(body))
        .await?;
    tool_result(result)
}

pub async fn execute_pause_account(
    upstream: &dyn Upstream,
    api_key: &str,
    args: Value,
) -> Result<ToolCallResult, McpError> {
    let email = require_str(&args, "email")?;
    let result = upstream
        .request(Method::POST, &format!("/accounts/{}/pause", email), api_key, &[], None)
        .await?;
    tool_result(result)
}

pub async fn execute_resume_account(
    upstream: &dyn Upstream,
    api_key: &str,
    args: Value,
) -> Result<ToolCallResult, McpError> {
    let email = require_str(&args, "email")?;
    let result = upstream
        .request(Method::POST, &format!("/accounts/{}/resume", email), api_key, &[], None)
        .await?;
    tool_result(result)
}

pub async fn execute_get_warmup_analytics(
    upstream: &dyn Upstream,
    api_key: &str,
    args: Value,
) -> Result<ToolCallResult, McpError> {
    let emails = args
        .get("emails")
        .and_then(|v| v.as_array())
        .filter(|a| !a.is_empty())
        .ok_or_else(|| {
            McpError::InvalidParams("Missing required parameter 'emails'".to_string())
        })?;

    let body = json!({ "emails": emails });
    let result = upstream
        .request(Method::POST, "/accounts/warmup-analytics", api_key, &[], Some(body))
        .await?;
    tool_result(result)
}

pub async fn execute_list_api_keys(
    upstream: &dyn Upstream,
    api_key: &str,
    _args: Value,
) -> Result<ToolCallResult, McpError> {
    let result = upstream.request(Method::GET, "/api-keys", api_key, &[], None).await?;
    tool_result(result)
}
