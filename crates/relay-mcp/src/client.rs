//! MCP client wrapper around the rmcp SDK
//!
//! [`McpClient`] opens a connection over stdio (child process) or Streamable
//! HTTP, keeps the tools/prompts/resources the server advertised, and
//! forwards calls to the SDK session while the connection is open.

use crate::config::{McpServerConfig, TransportType};
use crate::content::from_wire;
use crate::error::{McpError, Result};
use crate::events::{EventCallback, EventSink};
use crate::http_client::HeaderHttpClient;
use relay_types::{McpPrompt, McpResource, McpTool};
use rmcp::model::{
    CallToolRequestParams, CallToolResult, ClientInfo, GetPromptRequestParams, GetPromptResult,
    ProtocolVersion, ReadResourceRequestParams, ReadResourceResult,
};
use rmcp::service::{Peer, RoleClient, RunningService};
use rmcp::transport::streamable_http_client::{
    StreamableHttpClientTransport, StreamableHttpClientTransportConfig,
};
use rmcp::ServiceExt;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

type ClientService = RunningService<RoleClient, ClientInfo>;

#[derive(Default)]
struct Discovered {
    tools: Vec<McpTool>,
    prompts: Vec<McpPrompt>,
    resources: Vec<McpResource>,
}

/// Model context protocol client
pub struct McpClient {
    name: String,
    version: String,
    /// Live SDK session; `Some` exactly while the client is open
    service: Option<ClientService>,
    tools: Vec<McpTool>,
    prompts: Vec<McpPrompt>,
    resources: Vec<McpResource>,
    events: EventSink,
}

impl fmt::Debug for McpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("McpClient")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("open", &self.is_connected())
            .field("tools", &self.tools.len())
            .field("prompts", &self.prompts.len())
            .field("resources", &self.resources.len())
            .finish_non_exhaustive()
    }
}

impl McpClient {
    /// Create a closed client; `name` and `version` are advertised at initialization
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            service: None,
            tools: Vec::new(),
            prompts: Vec::new(),
            resources: Vec::new(),
            events: EventSink::default(),
        }
    }

    /// Client name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Client version
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Subscribe to swallowed-failure events
    pub fn on_event(&self, callback: EventCallback) {
        self.events.subscribe(callback);
    }

    /// Event sink shared with wrappers built on this client
    pub fn events(&self) -> &EventSink {
        &self.events
    }

    /// Is connected to the MCP server
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.service.is_some()
    }

    /// Tools discovered at connect; empty when closed
    #[must_use]
    pub fn tools(&self) -> &[McpTool] {
        &self.tools
    }

    /// Mutable access for clients that patch discovered tool metadata
    pub fn tools_mut(&mut self) -> &mut Vec<McpTool> {
        &mut self.tools
    }

    /// Prompts discovered at connect; empty when closed
    #[must_use]
    pub fn prompts(&self) -> &[McpPrompt] {
        &self.prompts
    }

    /// Resources and resource templates discovered at connect; empty when closed
    #[must_use]
    pub fn resources(&self) -> &[McpResource] {
        &self.resources
    }

    /// Capabilities the server reported at initialization; `None` when closed
    #[must_use]
    pub fn server_capabilities(&self) -> Option<Value> {
        let info = self.peer()?.peer_info()?;
        serde_json::to_value(&info.capabilities).ok()
    }

    fn peer(&self) -> Option<&Peer<RoleClient>> {
        self.service.as_ref().map(RunningService::peer)
    }

    fn client_info(&self) -> Result<ClientInfo> {
        from_wire(json!({
            "protocolVersion": ProtocolVersion::default(),
            "capabilities": {},
            "clientInfo": { "name": self.name, "version": self.version },
        }))
    }

    /// Connect to a server script over stdio
    ///
    /// `.py` scripts run under Python, `.js` scripts under Node. Does nothing
    /// when the client is already open.
    ///
    /// # Errors
    /// Returns an error for other script types, or when the process cannot be
    /// spawned or initialized
    pub async fn open_connection_stdio(&mut self, server_script_path: &str) -> Result<()> {
        if self.is_connected() {
            return Ok(());
        }
        let transport = TransportType::for_script(server_script_path)?;
        self.connect(transport).await
    }

    /// Connect to a server over Streamable HTTP
    ///
    /// `headers` customize every request; an `Authorization` header is sent as
    /// bearer auth. Does nothing when the client is already open.
    ///
    /// # Errors
    /// Returns an error when the headers are invalid or initialization fails
    pub async fn open_connection_http(
        &mut self,
        server_url: &str,
        headers: Option<HashMap<String, String>>,
    ) -> Result<()> {
        if self.is_connected() {
            return Ok(());
        }
        let transport = TransportType::Http(server_url.to_string(), headers.unwrap_or_default());
        self.connect(transport).await
    }

    /// Connect using a server configuration, bounded by `timeout`
    ///
    /// # Errors
    /// Returns [`McpError::StartupTimeout`] when the server does not finish
    /// initializing in time, or the underlying connect error
    pub async fn open(&mut self, config: &McpServerConfig, timeout: Duration) -> Result<()> {
        if self.is_connected() {
            return Ok(());
        }
        info!("Opening MCP connection '{}' with timeout {:?}", self.name, timeout);

        let transport = config.detect_transport();
        let name = self.name.clone();
        tokio::time::timeout(timeout, self.connect(transport))
            .await
            .map_err(|_| McpError::StartupTimeout {
                server: name,
                timeout,
            })?
    }

    async fn connect(&mut self, transport: TransportType) -> Result<()> {
        let auth = transport.auth_header().map(str::to_string);
        let service = match transport {
            TransportType::Stdio { program, args, env } => {
                self.start_stdio(&program, &args, &env).await?
            }
            TransportType::Http(url, headers) => self.start_http(&url, &headers, auth).await?,
        };

        // Published together once discovery is over; a cancelled connect
        // drops `service`, which closes the session
        let discovered = self.discover(service.peer()).await;
        self.tools = discovered.tools;
        self.prompts = discovered.prompts;
        self.resources = discovered.resources;
        self.service = Some(service);

        info!(
            "MCP client '{}' connected ({} tools, {} prompts, {} resources)",
            self.name,
            self.tools.len(),
            self.prompts.len(),
            self.resources.len()
        );
        Ok(())
    }

    async fn start_stdio(
        &self,
        program: &str,
        args: &[String],
        env: &HashMap<String, String>,
    ) -> Result<ClientService> {
        debug!("Starting stdio transport for '{}': {} {:?}", self.name, program, args);

        let mut cmd = tokio::process::Command::new(program);
        cmd.args(args).envs(env);
        cmd.stdin(std::process::Stdio::piped());
        cmd.stdout(std::process::Stdio::piped());
        cmd.stderr(std::process::Stdio::inherit());

        let transport =
            rmcp::transport::TokioChildProcess::new(cmd).map_err(|e| McpError::StartupFailed {
                server: self.name.clone(),
                reason: format!("Failed to spawn '{program}': {e}"),
            })?;

        self.client_info()?
            .serve(transport)
            .await
            .map_err(|e| McpError::StartupFailed {
                server: self.name.clone(),
                reason: format!("MCP initialization failed: {e}"),
            })
    }

    async fn start_http(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        auth_header: Option<String>,
    ) -> Result<ClientService> {
        debug!("Starting HTTP transport for '{}': {}", self.name, url);

        let mut config = StreamableHttpClientTransportConfig::with_uri(url);
        // the transport adds the "Bearer " prefix itself
        if let Some(auth) = &auth_header {
            let token = auth.strip_prefix("Bearer ").unwrap_or(auth);
            config = config.auth_header(token.to_string());
        }

        let client = HeaderHttpClient::with_headers(headers)?;
        let transport = StreamableHttpClientTransport::with_client(client, config);

        self.client_info()?
            .serve(transport)
            .await
            .map_err(|e| McpError::StartupFailed {
                server: self.name.clone(),
                reason: format!("MCP initialization failed: {e}"),
            })
    }

    /// Load tools, prompts and resources; a failed listing leaves the others intact
    async fn discover(&self, peer: &Peer<RoleClient>) -> Discovered {
        let capabilities = peer
            .peer_info()
            .and_then(|info| serde_json::to_value(&info.capabilities).ok());
        let advertised = |key: &str| {
            capabilities
                .as_ref()
                .map_or(true, |caps| caps.get(key).is_some_and(|v| !v.is_null()))
        };
        let mut discovered = Discovered::default();

        if advertised("tools") {
            match peer.list_all_tools().await {
                Ok(tools) => {
                    discovered.tools = self.convert_all(&tools, "tools");
                    for tool in &mut discovered.tools {
                        tool.ensure_parameters();
                    }
                }
                Err(e) => self.events.error("tools", "list tools", e),
            }
        }

        if advertised("prompts") {
            match peer.list_all_prompts().await {
                Ok(prompts) => discovered.prompts = self.convert_all(&prompts, "prompts"),
                Err(e) => self.events.error("prompts", "list prompts", e),
            }
        }

        if advertised("resources") {
            match peer.list_all_resources().await {
                Ok(resources) => discovered.resources = self.convert_all(&resources, "resources"),
                Err(e) => self.events.error("resources", "list resources", e),
            }
            match peer.list_all_resource_templates().await {
                Ok(templates) => {
                    let templates: Vec<McpResource> =
                        self.convert_all(&templates, "resource_templates");
                    discovered.resources.extend(templates);
                }
                Err(e) => self
                    .events
                    .error("resource_templates", "list resource templates", e),
            }
        }

        discovered
    }

    fn convert_all<T, U>(&self, records: &[T], area: &str) -> Vec<U>
    where
        T: serde::Serialize,
        U: serde::de::DeserializeOwned,
    {
        records
            .iter()
            .filter_map(|record| match relay_types::convert(record) {
                Ok(converted) => Some(converted),
                Err(e) => {
                    self.events.error(area, "skip malformed record", e);
                    None
                }
            })
            .collect()
    }

    /// Call a tool; `Ok(None)` when the client is closed
    ///
    /// Non-object arguments are wrapped as `{"input": value}`.
    ///
    /// # Errors
    /// Returns an error when the server rejects the call
    pub async fn call_tool(&self, name: &str, args: Value) -> Result<Option<CallToolResult>> {
        let Some(peer) = self.peer() else {
            return Ok(None);
        };
        debug!("Calling tool '{}' on '{}'", name, self.name);

        let arguments = match args {
            Value::Object(map) => Some(map),
            Value::Null => None,
            other => {
                warn!("Tool '{}' called with non-object args, wrapping: {:?}", name, other);
                let mut map = serde_json::Map::new();
                map.insert("input".into(), other);
                Some(map)
            }
        };

        let params: CallToolRequestParams =
            from_wire(json!({ "name": name, "arguments": arguments }))?;
        let result = peer
            .call_tool(params)
            .await
            .map_err(|e| McpError::ToolExecution {
                owner: self.name.clone(),
                tool: name.into(),
                reason: e.to_string(),
            })?;
        Ok(Some(result))
    }

    /// Get a prompt; `Ok(None)` when the client is closed
    ///
    /// # Errors
    /// Returns an error when the server rejects the request
    pub async fn call_prompt(
        &self,
        name: &str,
        args: HashMap<String, String>,
    ) -> Result<Option<GetPromptResult>> {
        let Some(peer) = self.peer() else {
            return Ok(None);
        };
        debug!("Getting prompt '{}' from '{}'", name, self.name);

        let params: GetPromptRequestParams =
            from_wire(json!({ "name": name, "arguments": args }))?;
        let result = peer
            .get_prompt(params)
            .await
            .map_err(|e| McpError::Protocol(format!("get prompt '{name}': {e}")))?;
        Ok(Some(result))
    }

    /// Read a resource; `Ok(None)` when the client is closed
    ///
    /// # Errors
    /// Returns an error when the server rejects the request
    pub async fn call_resource(&self, uri: &str) -> Result<Option<ReadResourceResult>> {
        let Some(peer) = self.peer() else {
            return Ok(None);
        };
        debug!("Reading resource '{}' from '{}'", uri, self.name);

        let params: ReadResourceRequestParams = from_wire(json!({ "uri": uri }))?;
        let result = peer
            .read_resource(params)
            .await
            .map_err(|e| McpError::Protocol(format!("read resource '{uri}': {e}")))?;
        Ok(Some(result))
    }

    /// Disconnect from the MCP server and forget the discovered capabilities
    ///
    /// Shutdown failures are reported through the event callback only.
    pub async fn close_connection(&mut self) {
        let Some(service) = self.service.take() else {
            return;
        };

        self.tools.clear();
        self.prompts.clear();
        self.resources.clear();

        match service.cancel().await {
            Ok(reason) => debug!("MCP client '{}' closed: {:?}", self.name, reason),
            Err(e) => self.events.error("close", "close connection", e),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::events::McpEvent;
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn test_closed_client_returns_none() {
        let client = McpClient::new("test", "1.0.0");
        assert!(!client.is_connected());
        assert!(client.server_capabilities().is_none());

        let tool = client.call_tool("MathExpressionEvaluator", json!({})).await.unwrap();
        assert!(tool.is_none());
        let prompt = client.call_prompt("p", HashMap::new()).await.unwrap();
        assert!(prompt.is_none());
        let resource = client.call_resource("docs://math").await.unwrap();
        assert!(resource.is_none());
    }

    #[tokio::test]
    async fn test_stdio_rejects_unknown_script() {
        let mut client = McpClient::new("test", "1.0.0");
        let err = client.open_connection_stdio("server.exe").await.unwrap_err();
        assert!(matches!(err, McpError::InvalidScript(_)));
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn test_spawn_failure_leaves_client_closed() {
        let mut client = McpClient::new("test", "1.0.0");
        let config = McpServerConfig::Simple("relay-no-such-binary --flag".into());
        let result = client.open(&config, Duration::from_secs(5)).await;

        assert!(result.is_err());
        assert!(!client.is_connected());
        assert!(client.tools().is_empty());
    }

    #[tokio::test]
    async fn test_close_on_closed_client_is_noop() {
        let mut client = McpClient::new("test", "1.0.0");
        let seen = Arc::new(Mutex::new(0));
        let captured = Arc::clone(&seen);
        client.on_event(Arc::new(move |_: &McpEvent| {
            *captured.lock().unwrap() += 1;
        }));

        client.close_connection().await;

        assert!(!client.is_connected());
        assert_eq!(*seen.lock().unwrap(), 0);
    }

    #[test]
    fn test_client_info_carries_name() {
        let client = McpClient::new("SymPyMathExpressionEvaluator", "1.0.1");
        let info = serde_json::to_value(client.client_info().unwrap()).unwrap();
        assert_eq!(info["clientInfo"]["name"], "SymPyMathExpressionEvaluator");
        assert_eq!(info["clientInfo"]["version"], "1.0.1");
    }
}
