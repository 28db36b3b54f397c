//! Scripted remote MCP servers behind the connector port.

use super::auth_server::RotatingAuthServer;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use switchboard::mcp::domain::{McpEndpoint, McpToolDefinition};
use switchboard::mcp::ports::{McpConnector, McpSession, TransportError, TransportResult};

/// How one scripted server treats incoming connections.
#[derive(Clone)]
pub enum Behaviour {
    /// Accepts everyone.
    Open(Vec<&'static str>),
    /// Accepts one static bearer token.
    Bearer(String, Vec<&'static str>),
    /// Accepts live access tokens of an authorization server.
    OAuth(Arc<RotatingAuthServer>, Vec<&'static str>),
    /// Refuses connections.
    Down,
}

/// Connector routing opens to scripted servers by URL.
#[derive(Default)]
pub struct ScriptedMcpServers {
    servers: Mutex<HashMap<String, Behaviour>>,
    opens: Mutex<HashMap<String, usize>>,
    closes: Arc<AtomicUsize>,
    latency: Option<Duration>,
}

impl ScriptedMcpServers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every open.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::default()
        }
    }

    pub fn serve(&self, url: &str, behaviour: Behaviour) {
        self.servers
            .lock()
            .expect("servers lock")
            .insert(url.to_owned(), behaviour);
    }

    pub fn opens(&self, url: &str) -> usize {
        self.opens
            .lock()
            .expect("opens lock")
            .get(url)
            .copied()
            .unwrap_or_default()
    }

    pub fn total_opens(&self) -> usize {
        self.opens.lock().expect("opens lock").values().sum()
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

struct ScriptedSession {
    tools: Vec<McpToolDefinition>,
    closes: Arc<AtomicUsize>,
}

#[async_trait]
impl McpSession for ScriptedSession {
    async fn list_tools(&self) -> TransportResult<Vec<McpToolDefinition>> {
        Ok(self.tools.clone())
    }

    async fn close(&self) -> TransportResult<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn authorize(accepted: bool) -> TransportResult<()> {
    if accepted {
        Ok(())
    } else {
        Err(TransportError::Unauthorized(401))
    }
}

#[async_trait]
impl McpConnector for ScriptedMcpServers {
    async fn open(
        &self,
        endpoint: &McpEndpoint,
        bearer: Option<&str>,
    ) -> TransportResult<Box<dyn McpSession>> {
        let url = endpoint.url.as_str();
        *self
            .opens
            .lock()
            .expect("opens lock")
            .entry(url.to_owned())
            .or_default() += 1;
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let behaviour = self
            .servers
            .lock()
            .expect("servers lock")
            .get(url)
            .cloned()
            .unwrap_or(Behaviour::Down);
        let names = match behaviour {
            Behaviour::Open(names) => names,
            Behaviour::Bearer(token, names) => {
                authorize(bearer == Some(token.as_str()))?;
                names
            }
            Behaviour::OAuth(auth, names) => {
                authorize(bearer.is_some_and(|token| auth.accepts(token)))?;
                names
            }
            Behaviour::Down => {
                return Err(TransportError::Connection("connection refused".to_owned()));
            }
        };

        let tools = names
            .into_iter()
            .map(|name| {
                McpToolDefinition::new(name, format!("Tool {name}"), serde_json::json!({}))
                    .expect("valid tool")
            })
            .collect();
        Ok(Box::new(ScriptedSession {
            tools,
            closes: Arc::clone(&self.closes),
        }))
    }
}
