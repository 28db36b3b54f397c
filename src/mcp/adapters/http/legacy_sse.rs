//! Legacy HTTP+SSE session.

use super::{
    EVENT_STREAM, check_status,
    event_stream::EventStreamDecoder,
    is_event_stream,
    jsonrpc::{
        RpcChannel, into_result, list_all_tools, notification_body, request_body, response_id,
    },
    map_send_error,
};
use crate::mcp::domain::McpToolDefinition;
use crate::mcp::ports::{McpSession, TransportError, TransportResult};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::ACCEPT;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;

type PendingReplies = Mutex<HashMap<u64, oneshot::Sender<TransportResult<Value>>>>;

/// Background reader that is aborted when dropped.
struct ReaderTask(JoinHandle<()>);

impl Drop for ReaderTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Session that reads replies from a long-lived event stream.
pub(super) struct LegacySseSession {
    client: reqwest::Client,
    post_url: String,
    bearer: Option<String>,
    request_timeout: Duration,
    next_id: AtomicU64,
    pending: Arc<PendingReplies>,
    reader: Mutex<Option<ReaderTask>>,
}

impl LegacySseSession {
    /// Opens the event stream and waits for its `endpoint` event.
    pub(super) async fn open(
        client: reqwest::Client,
        url: &str,
        bearer: Option<&str>,
        request_timeout: Duration,
    ) -> TransportResult<Self> {
        let builder = client.get(url).header(ACCEPT, EVENT_STREAM);
        let authorized = match bearer {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        };
        let response = authorized
            .send()
            .await
            .map_err(|err| map_send_error(&err))?;
        check_status(response.status())?;
        if !is_event_stream(&response) {
            return Err(TransportError::Protocol(
                "server did not open an event stream".to_owned(),
            ));
        }

        let pending = Arc::new(PendingReplies::default());
        let (endpoint_tx, endpoint_rx) = oneshot::channel();
        let reader = ReaderTask(tokio::spawn(read_events(
            response,
            endpoint_tx,
            Arc::clone(&pending),
        )));

        let endpoint = match tokio::time::timeout(request_timeout, endpoint_rx).await {
            Ok(Ok(endpoint)) => endpoint,
            Ok(Err(_)) => {
                return Err(TransportError::Protocol(
                    "event stream closed before the endpoint event".to_owned(),
                ));
            }
            Err(_) => return Err(TransportError::Timeout),
        };

        Ok(Self {
            client,
            post_url: resolve_endpoint(url, &endpoint)?,
            bearer: bearer.map(str::to_owned),
            request_timeout,
            next_id: AtomicU64::new(1),
            pending,
            reader: Mutex::new(Some(reader)),
        })
    }

    async fn post(&self, body: &Value) -> TransportResult<()> {
        let builder = self
            .client
            .post(&self.post_url)
            .timeout(self.request_timeout)
            .json(body);
        let authorized = match self.bearer.as_deref() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        };
        let response = authorized
            .send()
            .await
            .map_err(|err| map_send_error(&err))?;
        check_status(response.status())
    }

    fn forget(&self, id: u64) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
    }
}

/// Resolves the announced message endpoint against the stream URL.
///
/// The endpoint must share the stream's origin so the credential is never
/// sent elsewhere.
fn resolve_endpoint(stream_url: &str, endpoint: &str) -> TransportResult<String> {
    let base = url::Url::parse(stream_url)
        .map_err(|_| TransportError::Protocol("stream URL is invalid".to_owned()))?;
    let resolved = base
        .join(endpoint.trim())
        .map_err(|_| TransportError::Protocol("endpoint event is not a URL".to_owned()))?;
    if resolved.origin() != base.origin() {
        return Err(TransportError::Protocol(
            "endpoint event points at another origin".to_owned(),
        ));
    }
    Ok(resolved.into())
}

async fn read_events(
    response: reqwest::Response,
    endpoint_tx: oneshot::Sender<String>,
    pending: Arc<PendingReplies>,
) {
    let mut endpoint_tx = Some(endpoint_tx);
    let mut stream = response.bytes_stream();
    let mut decoder = EventStreamDecoder::new();

    while let Some(Ok(chunk)) = stream.next().await {
        for event in decoder.push(&chunk) {
            match event.event.as_str() {
                "endpoint" => {
                    if let Some(sender) = endpoint_tx.take()
                        && sender.send(event.data).is_err()
                    {
                        debug!("endpoint event arrived after the session was abandoned");
                    }
                }
                "message" => deliver(&pending, &event.data),
                _ => {}
            }
        }
    }

    // Dropping the senders wakes every waiting request.
    pending
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clear();
}

fn deliver(pending: &PendingReplies, data: &str) {
    let Ok(message) = serde_json::from_str::<Value>(data) else {
        debug!("skipping non-JSON event on MCP stream");
        return;
    };
    let Some(id) = response_id(&message) else {
        return;
    };
    let waiter = pending
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .remove(&id);
    if let Some(sender) = waiter
        && sender.send(into_result(message)).is_err()
    {
        debug!(id, "reply arrived after the request was abandoned");
    }
}

#[async_trait]
impl RpcChannel for LegacySseSession {
    async fn request(&self, method: &str, params: Value) -> TransportResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (reply_tx, reply_rx) = oneshot::channel();
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, reply_tx);

        if let Err(err) = self.post(&request_body(id, method, params)).await {
            self.forget(id);
            return Err(err);
        }

        match tokio::time::timeout(self.request_timeout, reply_rx).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(_)) => Err(TransportError::Connection(
                "event stream closed".to_owned(),
            )),
            Err(_) => {
                self.forget(id);
                Err(TransportError::Timeout)
            }
        }
    }

    async fn notify(&self, method: &str, params: Value) -> TransportResult<()> {
        self.post(&notification_body(method, params)).await
    }
}

#[async_trait]
impl McpSession for LegacySseSession {
    async fn list_tools(&self) -> TransportResult<Vec<McpToolDefinition>> {
        list_all_tools(self).await
    }

    async fn close(&self) -> TransportResult<()> {
        let reader = self
            .reader
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        drop(reader);
        Ok(())
    }
}
