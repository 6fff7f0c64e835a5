//! Email Tools
//!
//! Tools for the unibox (sent and received emails), replies, and single
//! address verification.

use reqwest::Method;
use serde_json::{json, Value};

use super::{paging_query, require_str, tool_result};
use crate::mcp::error::McpError;
use crate::mcp::protocol::{Tool, ToolCallResult};
use crate::upstream::Upstream;

pub fn list_emails_tool() -> Tool {
    Tool::new(
        "list_emails",
        "List emails from the unibox, optionally filtered by campaign or lead.",
        json!({
            "type": "object",
            "properties": {
                "campaign_id": {"type": "string", "description": "Restrict to one campaign"},
                "lead_email": {"type": "string", "description": "Restrict to one lead"},
                "limit": {"type": "integer", "minimum": 1, "maximum": 100},
                "starting_after": {"type": "string"}
            }
        }),
    )
    .read_only()
}

pub fn get_email_tool() -> Tool {
    Tool::new(
        "get_email",
        "Get one email by id, including headers and body.",
        json!({
            "type": "object",
            "properties": {
                "email_id": {"type": "string", "description": "The email identifier"}
            },
            "required": ["email_id"]
        }),
    )
    .read_only()
}

pub fn reply_to_email_tool() -> Tool {
    Tool::new(
        "reply_to_email",
        "Send a reply to an email in the unibox. The reply threads under the original message.",
        json!({
            "type": "object",
            "properties": {
                "reply_to_uuid": {
                    "type": "string",
                    "description": "Id of the email being replied to"
                },
                "subject": {"type": "string", "description": "Reply subject"},
                "body": {"type": "string", "description": "Reply body (HTML or plain text)"},
                "eaccount": {
                    "type": "string",
                    "description": "Sending account address to reply from"
                }
            },
            "required": ["reply_to_uuid", "body"]
        }),
    )
}

pub fn verify_email_tool() -> Tool {
    Tool::new(
        "verify_email",
        "Verify the deliverability of a single email address. Verification can take several \
         seconds while the upstream service polls the destination server.",
        json!({
            "type": "object",
            "properties": {
                "email": {"type": "string", "description": "Address to verify"}
            },
            "required": ["email"]
        }),
    )
    .read_only()
}

pub async fn execute_list_emails(
    upstream: &dyn Upstream,
    api_key: &str,
    args: Value,
) -> Result<ToolCallResult, McpError> {
    let mut query = paging_query(&args);
    for field in ["campaign_id", "lead_email"] {
        if let Some(value) = args.get(field).and_then(|v| v.as_str()) {
            query.push((field.to_string(), value.to_string()));
        }
    }

    let result = upstream.request(Method::GET, "/emails", api_key, &query, None).await?;
    tool_result(result)
}

pub async fn execute_get_email(
    upstream: &dyn Upstream,
    api_key: &str,
    args: Value,
) -> Result<ToolCallResult, McpError> {
    let id = require_str(&args, "email_id")?;
    let result =
        upstream.request(Method::GET, &format!("/emails/{}", id), api_key, &[], None).await?;
    tool_result(result)
}

pub async fn execute_reply_to_email(
    upstream: &dyn Upstream,
    api_key: &str,
    args: Value,
) -> Result<ToolCallResult, McpError> {
    require_str(&args, "reply_to_uuid")?;
    require_str(&args, "body")?;

    let result = upstream.request(Method::POST, "/emails/reply", api_key, &[], Some(args)).await?;
    tool_result(result)
}

pub async fn execute_verify_email(
    upstream: &dyn Upstream,
    api_key: &str,
    args: Value,
) -> Result<ToolCallResult, McpError> {
    let email = require_str(&args, "email")?;
    let body = json!({ "email": email });

    let result =
        upstream.request(Method::POST, "/email-verification", api_key, &[], Some(body)).await?;
    tool_result(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

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
            Ok(json!({}))
        }
    }

    #[tokio::test]
    async fn test_list_emails_query_shaping() {
        let upstream = RecordingUpstream::new();
        execute_list_emails(&upstream, "key", json!({"campaign_id": "cmp-1", "limit": 20}))
            .await
            .unwrap();

        let (method, path, query, _) = upstream.last();
        assert_eq!(method, Method::GET);
        assert_eq!(path, "/emails");
        assert!(query.contains(&("campaign_id".to_string(), "cmp-1".to_string())));
    }

    #[tokio::test]
    async fn test_reply_requires_target_and_body() {
        let upstream = RecordingUpstream::new();
        assert!(execute_reply_to_email(&upstream, "key", json!({"body": "hi"})).await.is_err());
        assert!(execute_reply_to_email(&upstream, "key", json!({"reply_to_uuid": "e1"}))
            .await
            .is_err());

        execute_reply_to_email(&upstream, "key", json!({"reply_to_uuid": "e1", "body": "hi"}))
            .await
            .unwrap();
        let (_, path, _, _) = upstream.last();
        assert_eq!(path, "/emails/reply");
    }

    #[tokio::test]
    async fn test_verify_email_builds_body() {
        let upstream = RecordingUpstream::new();
        execute_verify_email(&upstream, "key", json!({"email": "x@y.co"})).await.unwrap();

        let (method, path, _, body) = upstream.last();
        assert_eq!(method, Method::POST);
        assert_eq!(path, "/email-verification");
        assert_eq!(body.unwrap()["email"], "x@y.co");
    }
}
