//! Campaign Tools
//!
//! Tools for listing, inspecting and managing Instantly campaigns, plus the
//! campaign analytics endpoints.

use reqwest::Method;
use serde_json::{json, Value};
use tracing::instrument;

use super::{paging_query, require_str, tool_result};
use crate::mcp::error::McpError;
use crate::mcp::protocol::{Tool, ToolCallResult};
use crate::upstream::Upstream;

/// Returns the tool definition for listing campaigns.
///
/// Supports upstream pagination via `limit` and `starting_after`.
pub fn list_campaigns_tool() -> Tool {
    Tool::new(
        "list_campaigns",
        "List campaigns in the workspace. Returns campaign names, statuses and schedules. \
         Supports pagination via limit and starting_after parameters.",
        json!({
            "type": "object",
            "properties": {
                "limit": {
                    "type": "integer",
                    "description": "Maximum number of campaigns to return (default: 10, max: 100)",
                    "minimum": 1,
                    "maximum": 100
                },
                "starting_after": {
                    "type": "string",
                    "description": "Pagination cursor returned by a previous call"
                },
                "search": {
                    "type": "string",
                    "description": "Filter campaigns by name"
                }
            }
        }),
    )
    .read_only()
}

/// Returns the tool definition for fetching one campaign by id.
pub fn get_campaign_tool() -> Tool {
    Tool::new(
        "get_campaign",
        "Get the complete configuration of a campaign: sequences, schedule, sending accounts \
         and status.",
        json!({
            "type": "object",
            "properties": {
                "campaign_id": {
                    "type": "string",
                    "description": "The campaign identifier"
                }
            },
            "required": ["campaign_id"]
        }),
    )
    .read_only()
}

pub fn create_campaign_tool() -> Tool {
    Tool::new(
        "create_campaign",
        "Create a new campaign. Requires a name; accepts an optional sequence of email steps \
         and a sending schedule. The campaign is created paused.",
        json!({
            "type": "object",
            "properties": {
                "name": {
                    "type": "string",
                    "description": "Campaign name"
                },
                "sequence_steps": {
                    "type": "array",
                    "description": "Email steps, each with subject and body",
                    "items": {
                        "type": "object",
                        "properties": {
                            "subject": {"type": "string"},
                            "body": {"type": "string"},
                            "wait_days": {"type": "integer", "minimum": 0}
                        },
                        "required": ["subject", "body"]
                    }
                },
                "schedule": {
                    "type": "object",
                    "description": "Sending schedule (timezone, days, hours)"
                },
                "email_list": {
                    "type": "array",
                    "description": "Sending account addresses to use",
                    "items": {"type": "string"}
                }
            },
            "required": ["name"]
        }),
    )
}

pub fn activate_campaign_tool() -> Tool {
    Tool::new(
        "activate_campaign",
        "Start sending for a paused or draft campaign.",
        campaign_id_schema(),
    )
}

pub fn pause_campaign_tool() -> Tool {
    Tool::new("pause_campaign", "Pause sending for an active campaign.", campaign_id_schema())
}

pub fn get_campaign_analytics_tool() -> Tool {
    Tool::new(
        "get_campaign_analytics",
        "Get per-campaign analytics (sent, opened, replied, bounced) for an optional date range.",
        json!({
            "type": "object",
            "properties": {
                "campaign_id": {
                    "type": "string",
                    "description": "Restrict analytics to one campaign"
                },
                "start_date": {
                    "type": "string",
                    "description": "Range start, YYYY-MM-DD"
                },
                "end_date": {
                    "type": "string",
                    "description": "Range end, YYYY-MM-DD"
                }
            }
        }),
    )
    .read_only()
}

pub fn get_campaign_analytics_overview_tool() -> Tool {
    Tool::new(
        "get_campaign_analytics_overview",
        "Get aggregate analytics across all campaigns in the workspace.",
        json!({
            "type": "object",
            "properties": {
                "start_date": {"type": "string", "description": "Range start, YYYY-MM-DD"},
                "end_date": {"type": "string", "description": "Range end, YYYY-MM-DD"}
            }
        }),
    )
    .read_only()
}

fn campaign_id_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "campaign_id": {
                "type": "string",
                "description": "The campaign identifier"
            }
        },
        "required": ["campaign_id"]
    })
}

/// Execute the list_campaigns tool.
#[instrument(skip(upstream, args), name = "mcp_list_campaigns")]
pub async fn execute_list_campaigns(
    upstream: &dyn Upstream,
    api_key: &str,
    args: Value,
) -> Result<ToolCallResult, McpError> {
    let mut query = paging_query(&args);
    if let Some(search) = args.get("search").and_then(|v| v.as_str()) {
        query.push(("search".to_string(), search.to_string()));
    }

    let result = upstream.request(Method::GET, "/campaigns", api_key, &query, None).await?;
    tool_result(result)
}

pub async fn execute_get_campaign(
    upstream: &dyn Upstream,
    api_key: &str,
    args: Value,
) -> Result<ToolCallResult, McpError> {
    let id = require_str(&args, "campaign_id")?;
    let result =
        upstream.request(Method::GET, &format!("/campaigns/{}", id), api_key, &[], None).await?;
    tool_result(result)
}

/// Execute the create_campaign tool.
///
/// Forwards the validated argument record as the request body; business-rule
/// validation of the payload belongs to the upstream API.
#[instrument(skip(upstream, args), name = "mcp_create_campaign")]
pub async fn execute_create_campaign(
    upstream: &dyn Upstream,
    api_key: &str,
    args: Value,
) -> Result<ToolCallResult, McpError> {
    require_str(&args, "name")?;
    let result = upstream.request(Method::POST, "/campaigns", api_key, &[], Some(args)).await?;
    tool_result(result)
}

pub async fn execute_activate_campaign(
    upstream: &dyn Upstream,
    api_key: &str,
    args: Value,
) -> Result<ToolCallResult, McpError> {
    let id = require_str(&args, "campaign_id")?;
    let result = upstream
        .request(Method::POST, &format!("/campaigns/{}/activate", id), api_key, &[], None)
        .await?;
    tool_result(result)
}

pub async fn execute_pause_campaign(
    upstream: &dyn Upstream,
    api_key: &str,
    args: Value,
) -> Result<ToolCallResult, McpError> {
    let id = require_str(&args, "campaign_id")?;
    let result = upstream
        .request(Method::POST, &format!("/campaigns/{}/pause", id), api_key, &[], None)
        .await?;
    tool_result(result)
}

pub async fn execute_get_campaign_analytics(
    upstream: &dyn Upstream,
    api_key: &str,
    args: Value,
) -> Result<ToolCallResult, McpError> {
    let mut query = Vec::new();
    for (arg, param) in
        [("campaign_id", "id"), ("start_date", "start_date"), ("end_date", "end_date")]
    {
        if let Some(value) = args.get(arg).and_then(|v| v.as_str()) {
            query.push((param.to_string(), value.to_string()));
        }
    }

    let result =
        upstream.request(Method::GET, "/campaigns/analytics", api_key, &query, None).await?;
    tool_result(result)
}

pub async fn execute_get_campaign_analytics_overview(
    upstream: &dyn Upstream,
    api_key: &str,
    args: Value,
) -> Result<ToolCallResult, McpError> {
    let mut query = Vec::new();
    for param in ["start_date", "end_date"] {
        if let Some(value) = args.get(param).and_then(|v| v.as_str()) {
            query.push((param.to_string(), value.to_string()));
        }
    }

    let result = upstream
        .request(Method::GET, "/campaigns/analytics/overview", api_key, &query, None)
        .await?;
    tool_result(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// Records the last request so tests can assert on shaping
    struct RecordingUpstream {
        last: std::sync::Mutex<Option<(Method, String, Vec<(String, String)>, Option<Value>)>>,
    }

    impl RecordingUpstream {
        fn new() -> Self {
            Self { last: std::sync::Mutex::new(None) }
        }

        fn last(&self) -> (Method, String, Vec<(String, String)>, Option<Value>) {
            self.last.lock().unwrap().clone().expect("no request recorded")
        }
    }

    #[async_trait]
    impl Upstream for RecordingUpstream {
        async fn request(
            &self,
            method: Method,
            path: &str,
            _api_key: &str,
            query: &[(String, String)],
            body: Option<Value>,
        ) -> Result<Value, McpError> {
            *self.last.lock().unwrap() = Some((method, path.to_string(), query.to_vec(), body));
            Ok(json!({"items": []}))
        }
    }

    #[tokio::test]
    async fn test_list_campaigns_shapes_query() {
        let upstream = RecordingUpstream::new();
        let args = json!({"limit": 5, "starting_after": "c1", "search": "welcome"});

        execute_list_campaigns(&upstream, "key", args).await.unwrap();

        let (method, path, query, body) = upstream.last();
        assert_eq!(method, Method::GET);
        assert_eq!(path, "/campaigns");
        assert!(query.contains(&("search".to_string(), "welcome".to_string())));
        assert!(query.contains(&("limit".to_string(), "5".to_string())));
        assert!(body.is_none());
    }

    #[tokio::test]
    async fn test_get_campaign_requires_id() {
        let upstream = RecordingUpstream::new();
        let err = execute_get_campaign(&upstream, "key", json!({})).await.unwrap_err();
        assert!(matches!(err, McpError::InvalidParams(_)));
    }

    #[tokio::test]
    async fn test_activate_campaign_path() {
        let upstream = RecordingUpstream::new();
        execute_activate_campaign(&upstream, "key", json!({"campaign_id": "cmp-9"}))
            .await
            .unwrap();

        let (method, path, _, _) = upstream.last();
        assert_eq!(method, Method::POST);
        assert_eq!(path, "/campaigns/cmp-9/activate");
    }

    #[tokio::test]
    async fn test_analytics_maps_campaign_id_to_id_param() {
        let upstream = RecordingUpstream::new();
        execute_get_campaign_analytics(
            &upstream,
            "key",
            json!({"campaign_id": "cmp-1", "start_date": "2026-01-01"}),
        )
        .await
        .unwrap();

        let (_, path, query, _) = upstream.last();
        assert_eq!(path, "/campaigns/analytics");
        assert!(query.contains(&("id".to_string(), "cmp-1".to_string())));
        assert!(query.contains(&("start_date".to_string(), "2026-01-01".to_string())));
    }

    #[test]
    fn test_read_only_annotations() {
        assert!(list_campaigns_tool().annotations.is_some());
        assert!(get_campaign_tool().annotations.is_some());
        assert!(create_campaign_tool().annotations.is_none());
        assert!(activate_campaign_tool().annotations.is_none());
    }
}
