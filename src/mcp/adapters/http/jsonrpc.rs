//! JSON-RPC 2.0 framing shared by the HTTP transports.

use crate::mcp::domain::McpToolDefinition;
use crate::mcp::ports::{TransportError, TransportResult};
use async_trait::async_trait;
use serde_json::{Map, Value, json};

/// Protocol revision announced in `initialize`.
pub(super) const PROTOCOL_VERSION: &str = "2025-03-26";

const CLIENT_NAME: &str = "switchboard";

/// Upper bound on `tools/list` pages followed for one server.
const MAX_TOOL_PAGES: usize = 64;

/// Request/notification channel implemented by each transport.
#[async_trait]
pub(super) trait RpcChannel: Send + Sync {
    /// Sends a request and waits for its result.
    async fn request(&self, method: &str, params: Value) -> TransportResult<Value>;

    /// Sends a notification.
    async fn notify(&self, method: &str, params: Value) -> TransportResult<()>;
}

pub(super) fn request_body(id: u64, method: &str, params: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
        "params": params,
    })
}

pub(super) fn notification_body(method: &str, params: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "method": method,
        "params": params,
    })
}

/// Returns the numeric id of a response message, if it has one.
pub(super) fn response_id(message: &Value) -> Option<u64> {
    message.get("id").and_then(Value::as_u64)
}

/// Extracts `result` from a response, turning `error` into a protocol error.
pub(super) fn into_result(message: Value) -> TransportResult<Value> {
    let Value::Object(mut fields) = message else {
        return Err(TransportError::Protocol(
            "response is not a JSON object".to_owned(),
        ));
    };
    if let Some(error) = fields.remove("error") {
        let code = error.get("code").and_then(Value::as_i64).unwrap_or_default();
        let text = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        return Err(TransportError::Protocol(format!(
            "JSON-RPC error {code}: {text}"
        )));
    }
    fields
        .remove("result")
        .ok_or_else(|| TransportError::Protocol("response has no result".to_owned()))
}

/// Runs `initialize` followed by `notifications/initialized`.
pub(super) async fn handshake(channel: &dyn RpcChannel) -> TransportResult<()> {
    let params = json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {},
        "clientInfo": {
            "name": CLIENT_NAME,
            "version": env!("CARGO_PKG_VERSION"),
        },
    });
    let result = channel.request("initialize", params).await?;
    if !result.is_object() {
        return Err(TransportError::Protocol(
            "initialize result is not an object".to_owned(),
        ));
    }
    channel
        .notify("notifications/initialized", Value::Object(Map::new()))
        .await
}

/// Collects every page of `tools/list`.
pub(super) async fn list_all_tools(
    channel: &dyn RpcChannel,
) -> TransportResult<Vec<McpToolDefinition>> {
    let mut tools = Vec::new();
    let mut cursor: Option<String> = None;

    for _ in 0..MAX_TOOL_PAGES {
        let params = cursor
            .take()
            .map_or_else(|| json!({}), |next| json!({ "cursor": next }));
        let page = channel.request("tools/list", params).await?;
        let (page_tools, next_cursor) = parse_tools_page(page)?;
        tools.extend(page_tools);
        match next_cursor {
            Some(next) => cursor = Some(next),
            None => return Ok(tools),
        }
    }

    Err(TransportError::Protocol(
        "tools/list pagination did not terminate".to_owned(),
    ))
}

fn parse_tools_page(page: Value) -> TransportResult<(Vec<McpToolDefinition>, Option<String>)> {
    let Value::Object(mut fields) = page else {
        return Err(TransportError::Protocol(
            "tools/list result is not an object".to_owned(),
        ));
    };
    let Some(Value::Array(entries)) = fields.remove("tools") else {
        return Err(TransportError::Protocol(
            "tools/list result has no tools array".to_owned(),
        ));
    };
    let tools = entries
        .into_iter()
        .map(McpToolDefinition::from_wire)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| TransportError::Protocol(err.to_string()))?;
    let next_cursor = fields
        .remove("nextCursor")
        .and_then(|value| value.as_str().map(str::to_owned))
        .filter(|value| !value.is_empty());
    Ok((tools, next_cursor))
}
