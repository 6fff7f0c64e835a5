//! MCP Tools
//!
//! Static catalog of callable Instantly operations and the dispatch into
//! their domain handlers. The transport layer treats this module as an
//! external collaborator: the listing handler pages over [`catalog`] and the
//! invoker routes resolved calls through [`execute`].

use once_cell::sync::Lazy;
use serde_json::Value;

use crate::mcp::error::McpError;
use crate::mcp::protocol::{ContentBlock, Tool, ToolCallResult};
use crate::upstream::Upstream;

pub mod accounts;
pub mod campaigns;
pub mod emails;
pub mod leads;

static CATALOG: Lazy<Vec<Tool>> = Lazy::new(|| {
    vec![
        // Campaign operations
        campaigns::list_campaigns_tool(),
        campaigns::get_campaign_tool(),
        campaigns::create_campaign_tool(),
        campaigns::activate_campaign_tool(),
        campaigns::pause_campaign_tool(),
        campaigns::get_campaign_analytics_tool(),
        campaigns::get_campaign_analytics_overview_tool(),
        // Sending-account operations
        accounts::list_accounts_tool(),
        accounts::get_account_tool(),
        accounts::update_account_tool(),
        accounts::pause_account_tool(),
        accounts::resume_account_tool(),
        accounts::get_warmup_analytics_tool(),
        accounts::list_api_keys_tool(),
        // Lead operations
        leads::list_leads_tool(),
        leads::get_lead_tool(),
        leads::create_lead_tool(),
        leads::update_lead_tool(),
        leads::move_leads_tool(),
        leads::list_lead_lists_tool(),
        leads::create_lead_list_tool(),
        // Email operations
        emails::list_emails_tool(),
        emails::get_email_tool(),
        emails::reply_to_email_tool(),
        emails::verify_email_tool(),
    ]
});

/// The static tool catalog, in stable listing order
pub fn catalog() -> &'static [Tool] {
    &CATALOG
}

/// Dispatch a resolved tool call to its domain handler.
///
/// Unknown names fail with `McpError::ToolNotFound`; this is the only place
/// tool-name strings are matched.
pub async fn execute(
    name: &str,
    args: Value,
    api_key: &str,
    upstream: &dyn Upstream,
) -> Result<ToolCallResult, McpError> {
    match name {
        "list_campaigns" => campaigns::execute_list_campaigns(upstream, api_key, args).await,
        "get_campaign" => campaigns::execute_get_campaign(upstream, api_key, args).await,
        "create_campaign" => campaigns::execute_create_campaign(upstream, api_key, args).await,
        "activate_campaign" => campaigns::execute_activate_campaign(upstream, api_key, args).await,
        "pause_campaign" => campaigns::execute_pause_campaign(upstream, api_key, args).await,
        "get_campaign_analytics" => {
            campaigns::execute_get_campaign_analytics(upstream, api_key, args).await
        }
        "get_campaign_analytics_overview" => {
            campaigns::execute_get_campaign_analytics_overview(upstream, api_key, args).await
        }
        "list_accounts" => accounts::execute_list_accounts(upstream, api_key, args).await,
        "get_account" => accounts::execute_get_account(upstream, api_key, args).await,
        "update_account" => accounts::execute_update_account(upstream, api_key, args).await,
        "pause_account" => accounts::execute_pause_account(upstream, api_key, args).await,
        "resume_account" => accounts::execute_resume_account(upstream, api_key, args).await,
        "get_warmup_analytics" => {
            accounts::execute_get_warmup_analytics(upstream, api_key, args).await
        }
        "list_api_keys" => accounts::execute_list_api_keys(upstream, api_key, args).await,
        "list_leads" => leads::execute_list_leads(upstream, api_key, args).await,
        "get_lead" => leads::execute_get_lead(upstream, api_key, args).await,
        "create_lead" => leads::execute_create_lead(upstream, api_key, args).await,
        "update_lead" => leads::execute_update_lead(upstream, api_key, args).await,
        "move_leads" => leads::execute_move_leads(upstream, api_key, args).await,
        "list_lead_lists" => leads::execute_list_lead_lists(upstream, api_key, args).await,
        "create_lead_list" => leads::execute_create_lead_list(upstream, api_key, args).await,
        "list_emails" => emails::execute_list_emails(upstream, api_key, args).await,
        "get_email" => emails::execute_get_email(upstream, api_key, args).await,
        "reply_to_email" => emails::execute_reply_to_email(upstream, api_key, args).await,
        "verify_email" => emails::execute_verify_email(upstream, api_key, args).await,
        _ => Err(McpError::ToolNotFound(name.to_string())),
    }
}

/// Wrap an upstream JSON payload as MCP text content
pub(crate) fn tool_result(value: Value) -> Result<ToolCallResult, McpError> {
    let text = serde_json::to_string_pretty(&value).map_err(McpError::SerializationError)?;
    Ok(ToolCallResult { content: vec![ContentBlock::Text { text }], is_error: None })
}

/// Extract a required string argument
pub(crate) fn require_str<'a>(args: &'a Value, field: &str) -> Result<&'a str, McpError> {
    args.get(field)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| McpError::InvalidParams(format!("Missing required parameter '{}'", field)))
}

/// Collect the common `limit` / `starting_after` paging arguments into
/// query parameters
pub(crate) fn paging_query(args: &Value) -> Vec<(String, String)> {
    let mut query = Vec::new();
    if let Some(limit) = args.get("limit").and_then(|v| v.as_u64()) {
        query.push(("limit".to_string(), limit.to_string()));
    }
    if let Some(cursor) = args.get("starting_after").and_then(|v| v.as_str()) {
        query.push(("starting_after".to_string(), cursor.to_string()));
    }
    query
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use reqwest::Method;
    use serde_json::json;

    /// Upstream stub that answers every call with an empty object
    struct NullUpstream;

    #[async_trait]
    impl Upstream for NullUpstream {
        async fn request(
            &self,
            _method: Method,
            _path: &str,
            _api_key: &str,
            _query: &[(String, String)],
            _body: Option<Value>,
        ) -> Result<Value, McpError> {
            Ok(json!({}))
        }
    }

    #[test]
    fn test_catalog_is_stable_and_unique() {
        let names: Vec<&str> = catalog().iter().map(|t| t.name.as_str()).collect();
        let mut deduped = names.clone();
        deduped.sort_unstable();
        deduped.dedup();

        assert_eq!(names.len(), deduped.len(), "tool names must be unique");
        assert_eq!(names.first().copied(), Some("list_campaigns"));
        assert!(names.len() >= 25);
    }

    #[tokio::test]
    async fn test_every_catalog_entry_dispatches() {
        // Minimal arguments that satisfy each tool's required fields, so the
        // dispatch match and the catalog can never drift apart silently.
        let args = json!({
            "campaign_id": "cmp-1",
            "email": "a@b.co",
            "emails": ["a@b.co"],
            "lead_id": "lead-1",
            "email_id": "em-1",
            "name": "x",
            "body": "x",
            "to_campaign_id": "cmp-2",
            "lead_ids": ["lead-1"],
            "campaign": "cmp-1",
            "subject": "x",
            "reply_to_uuid": "em-1",
        });

        for tool in catalog() {
            let result = execute(&tool.name, args.clone(), "key", &NullUpstream).await;
            assert!(
                !matches!(result, Err(McpError::ToolNotFound(_))),
                "catalog tool '{}' has no dispatch arm",
                tool.name
            );
        }
    }

    #[tokio::test]
    async fn test_unknown_tool_rejected() {
        let result = execute("does_not_exist", json!({}), "key", &NullUpstream).await;
        match result {
            Err(McpError::ToolNotFound(name)) => assert_eq!(name, "does_not_exist"),
            other => panic!("expected ToolNotFound, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_require_str() {
        let args = json!({"name": "value", "empty": ""});
        assert_eq!(require_str(&args, "name").unwrap(), "value");
        assert!(require_str(&args, "empty").is_err());
        assert!(require_str(&args, "missing").is_err());
    }

    #[test]
    fn test_paging_query() {
        let args = json!({"limit": 25, "starting_after": "cur-1", "other": true});
        let query = paging_query(&args);
        assert_eq!(query.len(), 2);
        assert!(query.contains(&("limit".to_string(), "25".to_string())));
        assert!(query.contains(&("starting_after".to_string(), "cur-1".to_string())));

        assert!(paging_query(&json!({})).is_empty());
    }
}
