//! Streamable HTTP session.

use super::{
    EVENT_STREAM, check_status,
    event_stream::EventStreamDecoder,
    is_event_stream,
    jsonrpc::{
        PROTOCOL_VERSION, RpcChannel, into_result, list_all_tools, notification_body,
        request_body, response_id,
    },
    map_send_error,
};
use crate::mcp::domain::McpToolDefinition;
use crate::mcp::ports::{McpSession, TransportError, TransportResult};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::StatusCode;
use reqwest::header::ACCEPT;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use tracing::debug;

const SESSION_HEADER: &str = "Mcp-Session-Id";
const PROTOCOL_HEADER: &str = "MCP-Protocol-Version";

/// Session that posts each message to a single MCP endpoint.
pub(super) struct StreamableHttpSession {
    client: reqwest::Client,
    url: String,
    bearer: Option<String>,
    request_timeout: Duration,
    next_id: AtomicU64,
    session_id: RwLock<Option<String>>,
    closed: AtomicBool,
}

impl StreamableHttpSession {
    pub(super) fn new(
        client: reqwest::Client,
        url: &str,
        bearer: Option<&str>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            client,
            url: url.to_owned(),
            bearer: bearer.map(str::to_owned),
            request_timeout,
            next_id: AtomicU64::new(1),
            session_id: RwLock::new(None),
            closed: AtomicBool::new(false),
        }
    }

    fn session_id(&self) -> Option<String> {
        self.session_id
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn remember_session_id(&self, response: &reqwest::Response) {
        let Some(assigned) = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|value| value.to_str().ok())
        else {
            return;
        };
        *self
            .session_id
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(assigned.to_owned());
    }

    fn with_headers(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let authorized = match self.bearer.as_deref() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        };
        match self.session_id() {
            Some(session) => authorized.header(SESSION_HEADER, session),
            None => authorized,
        }
    }

    async fn post(&self, body: &Value) -> TransportResult<reqwest::Response> {
        let builder = self
            .client
            .post(&self.url)
            .timeout(self.request_timeout)
            .header(ACCEPT, format!("application/json, {EVENT_STREAM}"))
            .header(PROTOCOL_HEADER, PROTOCOL_VERSION)
            .json(body);
        let response = self
            .with_headers(builder)
            .send()
            .await
            .map_err(|err| map_send_error(&err))?;
        check_status(response.status())?;
        self.remember_session_id(&response);
        Ok(response)
    }
}

async fn read_streamed_response(response: reqwest::Response, id: u64) -> TransportResult<Value> {
    let mut stream = response.bytes_stream();
    let mut decoder = EventStreamDecoder::new();

    while let Some(chunk) = stream.next().await {
        let bytes = chunk.map_err(|err| map_send_error(&err))?;
        for event in decoder.push(&bytes) {
            if event.event != "message" {
                continue;
            }
            let Ok(message) = serde_json::from_str::<Value>(&event.data) else {
                debug!("skipping non-JSON event on MCP response stream");
                continue;
            };
            if response_id(&message) == Some(id) {
                return into_result(message);
            }
        }
    }

    Err(TransportError::Protocol(
        "event stream ended before the response arrived".to_owned(),
    ))
}

#[async_trait]
impl RpcChannel for StreamableHttpSession {
    async fn request(&self, method: &str, params: Value) -> TransportResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let response = self.post(&request_body(id, method, params)).await?;

        if is_event_stream(&response) {
            return read_streamed_response(response, id).await;
        }
        let message: Value = response
            .json()
            .await
            .map_err(|_| TransportError::Protocol("response body is not JSON".to_owned()))?;
        into_result(message)
    }

    async fn notify(&self, method: &str, params: Value) -> TransportResult<()> {
        self.post(&notification_body(method, params)).await?;
        Ok(())
    }
}

#[async_trait]
impl McpSession for StreamableHttpSession {
    async fn list_tools(&self) -> TransportResult<Vec<McpToolDefinition>> {
        list_all_tools(self).await
    }

    async fn close(&self) -> TransportResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let Some(session) = self.session_id() else {
            return Ok(());
        };

        let builder = self
            .client
            .delete(&self.url)
            .timeout(self.request_timeout)
            .header(SESSION_HEADER, session);
        let authorized = match self.bearer.as_deref() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        };
        let response = authorized
            .send()
            .await
            .map_err(|err| map_send_error(&err))?;
        // Servers that do not support explicit termination answer 405.
        if response.status() == StatusCode::METHOD_NOT_ALLOWED {
            return Ok(());
        }
        check_status(response.status())
    }
}
