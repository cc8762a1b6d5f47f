//! Host for MCP clients and servers
//!
//! [`McpHost`] keeps clients and servers under string ids and publishes
//! their tools as function tools a model can call.

use crate::client::McpClient;
use crate::config::McpConfig;
use crate::content::{tool_failed, tool_texts};
use crate::error::{McpError, Result};
use crate::server::McpServerBase;
use relay_types::McpFunctionTool;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinSet;
use tracing::{error, info};

/// Client shared between the host and its callers
pub type SharedClient = Arc<RwLock<McpClient>>;

/// An entity registered on the host under an id
#[derive(Debug, Clone)]
pub struct HostEntry<T> {
    pub id: String,
    pub entity: T,
}

/// Registry of MCP clients and servers
#[derive(Debug, Default)]
pub struct McpHost {
    clients: Vec<HostEntry<SharedClient>>,
    servers: Vec<HostEntry<Arc<McpServerBase>>>,
    function_tools: Vec<McpFunctionTool>,
}

impl McpHost {
    /// Create an empty host
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn clients(&self) -> &[HostEntry<SharedClient>] {
        &self.clients
    }

    #[must_use]
    pub fn servers(&self) -> &[HostEntry<Arc<McpServerBase>>] {
        &self.servers
    }

    /// Add a client; ids are not required to be unique
    pub fn add_client(&mut self, id: impl Into<String>, client: McpClient) -> SharedClient {
        let client = Arc::new(RwLock::new(client));
        self.clients.push(HostEntry {
            id: id.into(),
            entity: Arc::clone(&client),
        });
        client
    }

    /// Add a server; ids are not required to be unique
    pub fn add_server(&mut self, id: impl Into<String>, server: Arc<McpServerBase>) {
        self.servers.push(HostEntry {
            id: id.into(),
            entity: server,
        });
    }

    /// First client registered under `id`
    #[must_use]
    pub fn find_client(&self, id: &str) -> Option<SharedClient> {
        self.clients
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| Arc::clone(&entry.entity))
    }

    /// First server registered under `id`
    #[must_use]
    pub fn find_server(&self, id: &str) -> Option<Arc<McpServerBase>> {
        self.servers
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| Arc::clone(&entry.entity))
    }

    /// Add a client and publish its discovered tools
    pub fn add_client_function_tools(&mut self, id: impl Into<String>, client: McpClient) -> SharedClient {
        let id = id.into();
        self.function_tools.extend(
            client
                .tools()
                .iter()
                .map(|tool| McpFunctionTool::for_client(id.clone(), tool)),
        );
        self.add_client(id, client)
    }

    /// Add a server and publish its registered tools
    pub fn add_server_function_tools(&mut self, id: impl Into<String>, server: Arc<McpServerBase>) {
        let id = id.into();
        self.function_tools.extend(
            server
                .tools()
                .iter()
                .map(|tool| McpFunctionTool::for_server(id.clone(), tool)),
        );
        self.add_server(id, server);
    }

    /// Published function tools, in the order they were added
    #[must_use]
    pub fn function_tools(&self) -> &[McpFunctionTool] {
        &self.function_tools
    }

    /// First function tool named `name`
    #[must_use]
    pub fn find_function_tool(&self, name: &str) -> Option<&McpFunctionTool> {
        self.function_tools.iter().find(|tool| tool.name == name)
    }

    /// Call a function tool on the server or client that published it
    ///
    /// Returns the text items of the tool result.
    ///
    /// # Errors
    /// Returns an error when no function tool or owner matches, the owning
    /// client is closed, or the tool reports a failure
    pub async fn call_function_tool(&self, name: &str, args: Value) -> Result<Vec<String>> {
        let function = self
            .find_function_tool(name)
            .ok_or_else(|| McpError::ToolNotFound {
                owner: "host".to_string(),
                tool: name.to_string(),
            })?;

        let (owner, result) = if let Some(server_id) = &function.server_id {
            let server = self
                .find_server(server_id)
                .ok_or_else(|| McpError::ToolNotFound {
                    owner: server_id.clone(),
                    tool: name.to_string(),
                })?;
            (server_id.clone(), server.call_tool(name, args).await?)
        } else if let Some(client_id) = &function.client_id {
            let client = self
                .find_client(client_id)
                .ok_or_else(|| McpError::ToolNotFound {
                    owner: client_id.clone(),
                    tool: name.to_string(),
                })?;
            let result = client.read().await.call_tool(name, args).await?;
            let result = result.ok_or_else(|| {
                McpError::Transport(format!("client '{client_id}' is not connected"))
            })?;
            (client_id.clone(), result)
        } else {
            return Err(McpError::ToolNotFound {
                owner: "host".to_string(),
                tool: name.to_string(),
            });
        };

        let texts = tool_texts(&result);
        if tool_failed(&result) {
            return Err(McpError::ToolExecution {
                owner,
                tool: name.to_string(),
                reason: texts.join("\n"),
            });
        }
        Ok(texts)
    }

    /// Connect to every configured server concurrently and publish their tools
    ///
    /// Servers that fail to start are logged and skipped. Returns the number
    /// of servers connected.
    pub async fn connect_all(&mut self, config: &McpConfig, version: &str) -> usize {
        if config.servers.is_empty() {
            info!("No MCP servers configured");
            return 0;
        }

        info!("Starting {} MCP server(s)", config.servers.len());

        let mut tasks = JoinSet::new();
        for (id, server_config) in &config.servers {
            let id = id.clone();
            let server_config = server_config.clone();
            let timeout = server_config.get_timeout(config.startup_timeout);
            let mut client = McpClient::new(id.clone(), version);

            tasks.spawn(async move {
                match client.open(&server_config, timeout).await {
                    Ok(()) => {
                        info!("MCP server '{}' started ({} tools)", id, client.tools().len());
                        Some((id, client))
                    }
                    Err(e) => {
                        error!("MCP server '{}' failed: {}", id, e);
                        None
                    }
                }
            });
        }

        let mut connected = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Some(entry)) => connected.push(entry),
                Ok(None) => {}
                Err(e) => error!("MCP startup task failed: {}", e),
            }
        }

        // publish in id order
        connected.sort_by(|a, b| a.0.cmp(&b.0));
        let count = connected.len();
        for (id, client) in connected {
            self.add_client_function_tools(id, client);
        }

        info!("MCP host ready: {}/{} servers started", count, config.servers.len());
        count
    }

    /// Close every client and stop every server
    pub async fn shutdown(&self) {
        for entry in &self.clients {
            entry.entity.write().await.close_connection().await;
        }
        for entry in &self.servers {
            entry.entity.stop_server();
        }
    }
}
