//! MCP server base
//!
//! [`McpServerBase`] keeps a registry of tools, prompts, resources and
//! resource templates, each backed by an async callback. The registry can be
//! called in-process or served over stdio or Streamable HTTP.

use crate::content::from_wire;
use crate::error::{McpError, Result};
use crate::events::{EventCallback, EventSink};
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use relay_types::{McpPrompt, McpPromptArgument, McpResource, McpTool, McpToolParameters};
use rmcp::model::{
    CallToolRequestParams, CallToolResult, Content, GetPromptRequestParams, GetPromptResult,
    ListPromptsResult, ListResourceTemplatesResult, ListResourcesResult, ListToolsResult,
    PaginatedRequestParams, ProtocolVersion, ReadResourceRequestParams, ReadResourceResult,
    ServerCapabilities, ServerInfo,
};
use rmcp::service::{RequestContext, RoleServer};
use rmcp::{ErrorData, ServerHandler, ServiceExt};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, error, info};

/// Tool callback: receives the call arguments (an object, or `null`)
pub type ToolCallback = Arc<dyn Fn(Value) -> BoxFuture<'static, Result<CallToolResult>> + Send + Sync>;

/// Prompt callback: receives the prompt arguments
pub type PromptCallback =
    Arc<dyn Fn(HashMap<String, String>) -> BoxFuture<'static, Result<GetPromptResult>> + Send + Sync>;

/// Resource callback: receives the requested URI and, for templates, the
/// matched template variables
pub type ResourceCallback = Arc<
    dyn Fn(String, HashMap<String, String>) -> BoxFuture<'static, Result<ReadResourceResult>>
        + Send
        + Sync,
>;

/// Wrap an async function as a [`ToolCallback`]
pub fn tool_callback<F, Fut>(f: F) -> ToolCallback
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<CallToolResult>> + Send + 'static,
{
    Arc::new(move |args| Box::pin(f(args)))
}

/// Wrap an async function as a [`PromptCallback`]
pub fn prompt_callback<F, Fut>(f: F) -> PromptCallback
where
    F: Fn(HashMap<String, String>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<GetPromptResult>> + Send + 'static,
{
    Arc::new(move |args| Box::pin(f(args)))
}

/// Wrap an async function as a [`ResourceCallback`]
pub fn resource_callback<F, Fut>(f: F) -> ResourceCallback
where
    F: Fn(String, HashMap<String, String>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ReadResourceResult>> + Send + 'static,
{
    Arc::new(move |uri, vars| Box::pin(f(uri, vars)))
}

/// Tool registration options
#[derive(Debug, Clone, Default)]
pub struct ToolConfig {
    pub title: Option<String>,
    pub description: Option<String>,
    /// JSON Schema of the arguments; an empty object schema when `null`
    pub input_schema: Value,
    pub output_schema: Option<Value>,
    pub annotations: Option<Value>,
    /// Overrides the parameters derived from `input_schema`
    pub parameters: Option<McpToolParameters>,
}

/// Resource and resource template registration options
#[derive(Debug, Clone, Default)]
pub struct ResourceConfig {
    pub title: Option<String>,
    pub description: Option<String>,
    pub mime_type: Option<String>,
}

/// Prompt registration options
#[derive(Debug, Clone, Default)]
pub struct PromptConfig {
    pub title: Option<String>,
    pub description: Option<String>,
    pub arguments: Vec<McpPromptArgument>,
}

/// An accepted Streamable HTTP connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct McpHttpTransport {
    /// Identifier assigned when the connection was accepted
    pub session_id: String,
    pub peer: SocketAddr,
    pub connected_at: DateTime<Utc>,
}

struct RegisteredTool {
    tool: McpTool,
    output_schema: Option<Value>,
    annotations: Option<Value>,
    callback: ToolCallback,
}

struct RegisteredPrompt {
    prompt: McpPrompt,
    callback: PromptCallback,
}

struct RegisteredResource {
    resource: McpResource,
    callback: ResourceCallback,
}

#[derive(Default)]
struct Registry {
    tools: Vec<RegisteredTool>,
    prompts: Vec<RegisteredPrompt>,
    resources: Vec<RegisteredResource>,
}

struct TrackedConnection {
    transport: McpHttpTransport,
    abort: Option<AbortHandle>,
}

type Connections = Arc<RwLock<HashMap<String, TrackedConnection>>>;

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// State shared between the server base and the handlers serving it
struct Shared {
    name: String,
    version: String,
    instructions: Option<String>,
    capabilities: Option<ServerCapabilities>,
    registry: RwLock<Registry>,
    events: EventSink,
}

impl Shared {
    async fn call_tool(&self, name: &str, args: Value) -> Result<CallToolResult> {
        let callback = read(&self.registry)
            .tools
            .iter()
            .find(|entry| entry.tool.name == name)
            .map(|entry| Arc::clone(&entry.callback))
            .ok_or_else(|| McpError::ToolNotFound {
                owner: self.name.clone(),
                tool: name.to_string(),
            })?;
        callback(args).await
    }

    async fn get_prompt(&self, name: &str, args: HashMap<String, String>) -> Result<GetPromptResult> {
        let callback = read(&self.registry)
            .prompts
            .iter()
            .find(|entry| entry.prompt.name == name)
            .map(|entry| Arc::clone(&entry.callback))
            .ok_or_else(|| McpError::PromptNotFound {
                owner: self.name.clone(),
                prompt: name.to_string(),
            })?;
        callback(args).await
    }

    /// Read a resource registered under `name`
    async fn read_named(&self, name: &str, uri: &str) -> Result<ReadResourceResult> {
        let (callback, uri, vars) = {
            let registry = read(&self.registry);
            let entry = registry
                .resources
                .iter()
                .find(|entry| entry.resource.name == name)
                .ok_or_else(|| self.resource_not_found(name))?;

            let resource = &entry.resource;
            let uri = if uri.is_empty() { resource.uri.as_str() } else { uri };
            let vars = if resource.is_template() {
                match_template(&resource.uri, uri).ok_or_else(|| self.resource_not_found(uri))?
            } else {
                HashMap::new()
            };
            (Arc::clone(&entry.callback), uri.to_string(), vars)
        };
        callback(uri, vars).await
    }

    /// Read a resource by URI: exact resources first, then templates in registration order
    async fn read_uri(&self, uri: &str) -> Result<ReadResourceResult> {
        let (callback, vars) = {
            let registry = read(&self.registry);
            let exact = registry
                .resources
                .iter()
                .find(|entry| !entry.resource.is_template() && entry.resource.uri == uri)
                .map(|entry| (Arc::clone(&entry.callback), HashMap::new()));
            exact
                .or_else(|| {
                    registry
                        .resources
                        .iter()
                        .filter(|entry| entry.resource.is_template())
                        .find_map(|entry| {
                            match_template(&entry.resource.uri, uri)
                                .map(|vars| (Arc::clone(&entry.callback), vars))
                        })
                })
                .ok_or_else(|| self.resource_not_found(uri))?
        };
        callback(uri.to_string(), vars).await
    }

    fn resource_not_found(&self, resource: &str) -> McpError {
        McpError::ResourceNotFound {
            owner: self.name.clone(),
            resource: resource.to_string(),
        }
    }

    fn server_info(&self) -> ServerInfo {
        let capabilities = match &self.capabilities {
            Some(capabilities) => serde_json::to_value(capabilities).unwrap_or_else(|_| json!({})),
            None => {
                let registry = read(&self.registry);
                let mut capabilities = serde_json::Map::new();
                if !registry.tools.is_empty() {
                    capabilities.insert("tools".into(), json!({}));
                }
                if !registry.prompts.is_empty() {
                    capabilities.insert("prompts".into(), json!({}));
                }
                if !registry.resources.is_empty() {
                    capabilities.insert("resources".into(), json!({}));
                }
                Value::Object(capabilities)
            }
        };

        let info = json!({
            "protocolVersion": ProtocolVersion::default(),
            "capabilities": capabilities,
            "serverInfo": { "name": self.name, "version": self.version },
            "instructions": self.instructions,
        });
        from_wire(info).unwrap_or_else(|e| {
            error!("Failed to build server info for '{}': {}", self.name, e);
            ServerInfo::default()
        })
    }
}

/// Match `uri` against a template such as `sympy://doc/{version}/num`
///
/// Each variable takes the text up to the next literal part of the
/// template. Variables must be non-empty; adjacent variables never match.
fn match_template(template: &str, uri: &str) -> Option<HashMap<String, String>> {
    let mut vars = HashMap::new();
    let mut template = template;
    let mut uri = uri;

    loop {
        let Some(open) = template.find('{') else {
            return (template == uri).then_some(vars);
        };
        uri = uri.strip_prefix(&template[..open])?;

        let rest = &template[open + 1..];
        let close = rest.find('}')?;
        let var = &rest[..close];
        template = &rest[close + 1..];

        let literal = &template[..template.find('{').unwrap_or(template.len())];
        let end = if literal.is_empty() {
            if !template.is_empty() {
                return None;
            }
            uri.len()
        } else {
            uri.find(literal)?
        };

        let value = &uri[..end];
        if value.is_empty() {
            return None;
        }
        vars.insert(var.to_string(), value.to_string());
        uri = &uri[end..];
    }
}

fn error_data(error: McpError) -> ErrorData {
    match error {
        McpError::ResourceNotFound { .. } => ErrorData::resource_not_found(error.to_string(), None),
        McpError::ToolNotFound { .. } | McpError::PromptNotFound { .. } => {
            ErrorData::invalid_params(error.to_string(), None)
        }
        other => ErrorData::internal_error(other.to_string(), None),
    }
}

fn listing<T: serde::de::DeserializeOwned>(value: Value) -> std::result::Result<T, ErrorData> {
    from_wire(value).map_err(error_data)
}

/// rmcp handler answering MCP requests from the shared registry
#[derive(Clone)]
struct RegistryHandler {
    shared: Arc<Shared>,
}

impl ServerHandler for RegistryHandler {
    fn get_info(&self) -> ServerInfo {
        self.shared.server_info()
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> std::result::Result<ListToolsResult, ErrorData> {
        let tools: Vec<Value> = read(&self.shared.registry)
            .tools
            .iter()
            .map(|entry| {
                json!({
                    "name": entry.tool.name,
                    "title": entry.tool.title,
                    "description": entry.tool.description,
                    "inputSchema": entry.tool.input_schema,
                    "outputSchema": entry.output_schema,
                    "annotations": entry.annotations,
                })
            })
            .collect();
        debug!("list_tools on '{}': {} tools", self.shared.name, tools.len());
        listing(json!({ "tools": tools }))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> std::result::Result<CallToolResult, ErrorData> {
        let args = request.arguments.map_or(Value::Null, Value::Object);
        match self.shared.call_tool(&request.name, args).await {
            Ok(result) => Ok(result),
            Err(e @ McpError::ToolNotFound { .. }) => Err(error_data(e)),
            Err(e) => {
                self.shared.events.error("tools", "tool call failed", &e);
                Ok(CallToolResult::error(vec![Content::text(e.to_string())]))
            }
        }
    }

    async fn list_prompts(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> std::result::Result<ListPromptsResult, ErrorData> {
        let prompts: Vec<McpPrompt> = read(&self.shared.registry)
            .prompts
            .iter()
            .map(|entry| entry.prompt.clone())
            .collect();
        listing(json!({ "prompts": prompts }))
    }

    async fn get_prompt(
        &self,
        request: GetPromptRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> std::result::Result<GetPromptResult, ErrorData> {
        let args: HashMap<String, String> = request
            .arguments
            .unwrap_or_default()
            .into_iter()
            .map(|(key, value)| match value {
                Value::String(s) => (key, s),
                other => (key, other.to_string()),
            })
            .collect();
        self.shared
            .get_prompt(&request.name, args)
            .await
            .map_err(error_data)
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> std::result::Result<ListResourcesResult, ErrorData> {
        let resources: Vec<Value> = read(&self.shared.registry)
            .resources
            .iter()
            .map(|entry| &entry.resource)
            .filter(|resource| !resource.is_template())
            .map(|resource| {
                json!({
                    "uri": resource.uri,
                    "name": resource.name,
                    "title": resource.title,
                    "description": resource.description,
                    "mimeType": resource.mime_type,
                })
            })
            .collect();
        listing(json!({ "resources": resources }))
    }

    async fn list_resource_templates(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> std::result::Result<ListResourceTemplatesResult, ErrorData> {
        let templates: Vec<Value> = read(&self.shared.registry)
            .resources
            .iter()
            .map(|entry| &entry.resource)
            .filter(|resource| resource.is_template())
            .map(|resource| {
                json!({
                    "uriTemplate": resource.uri,
                    "name": resource.name,
                    "title": resource.title,
                    "description": resource.description,
                    "mimeType": resource.mime_type,
                })
            })
            .collect();
        listing(json!({ "resourceTemplates": templates }))
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> std::result::Result<ReadResourceResult, ErrorData> {
        self.shared.read_uri(&request.uri).await.map_err(error_data)
    }
}

/// Base for MCP servers built from registered callbacks
pub struct McpServerBase {
    shared: Arc<Shared>,
    stateless: AtomicBool,
    started: AtomicBool,
    /// Task driving the served transport, taken by [`McpServerBase::wait`]
    task: tokio::sync::Mutex<Option<JoinHandle<()>>>,
    abort: std::sync::Mutex<Option<AbortHandle>>,
    connections: Connections,
}

impl std::fmt::Debug for McpServerBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpServerBase")
            .field("name", &self.shared.name)
            .field("version", &self.shared.version)
            .field("started", &self.has_started())
            .finish_non_exhaustive()
    }
}

impl McpServerBase {
    /// Create a server; capabilities default to what ends up registered
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        instructions: Option<String>,
        capabilities: Option<ServerCapabilities>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                name: name.into(),
                version: version.into(),
                instructions,
                capabilities,
                registry: RwLock::new(Registry::default()),
                events: EventSink::default(),
            }),
            stateless: AtomicBool::new(true),
            started: AtomicBool::new(false),
            task: tokio::sync::Mutex::new(None),
            abort: std::sync::Mutex::new(None),
            connections: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    #[must_use]
    pub fn version(&self) -> &str {
        &self.shared.version
    }

    /// Whether the HTTP transport runs without sessions (the default)
    #[must_use]
    pub fn is_http_transport_stateless(&self) -> bool {
        self.stateless.load(Ordering::SeqCst)
    }

    /// Choose stateless or session-based HTTP; applies to the next start
    pub fn set_http_transport_stateless(&self, stateless: bool) {
        self.stateless.store(stateless, Ordering::SeqCst);
    }

    #[must_use]
    pub fn has_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Subscribe to swallowed-failure and lifecycle events
    pub fn on_event(&self, callback: EventCallback) {
        self.shared.events.subscribe(callback);
    }

    #[must_use]
    pub fn events(&self) -> &EventSink {
        &self.shared.events
    }

    /// Insert into the registry unless `name` is empty or `taken`
    ///
    /// Rejections are reported after the registry lock is released, so the
    /// event callback may read the server back.
    fn insert(
        &self,
        area: &str,
        name: &str,
        taken: impl Fn(&Registry) -> bool,
        push: impl FnOnce(&mut Registry),
    ) -> bool {
        let rejection = if name.trim().is_empty() {
            Some("empty name".to_string())
        } else {
            let mut registry = write(&self.shared.registry);
            if taken(&*registry) {
                Some(format!("'{name}' already registered"))
            } else {
                push(&mut *registry);
                None
            }
        };

        match rejection {
            Some(reason) => {
                self.shared.events.error(area, "registration rejected", reason);
                false
            }
            None => true,
        }
    }

    /// Register a tool; returns `false` for an empty or duplicate name
    pub fn register_tool(&self, name: &str, config: ToolConfig, callback: ToolCallback) -> bool {
        let input_schema = match config.input_schema {
            Value::Null => json!({ "type": "object", "properties": {} }),
            schema => schema,
        };
        let mut tool = McpTool::new(name, config.description, input_schema);
        tool.title = config.title;
        if config.parameters.is_some() {
            tool.parameters = config.parameters;
        }
        let entry = RegisteredTool {
            tool,
            output_schema: config.output_schema,
            annotations: config.annotations,
            callback,
        };

        let added = self.insert(
            "tools",
            name,
            |registry| registry.tools.iter().any(|entry| entry.tool.name == name),
            |registry| registry.tools.push(entry),
        );
        if added {
            debug!("Registered tool '{}' on '{}'", name, self.shared.name);
        }
        added
    }

    /// Register a resource at a fixed URI
    pub fn register_resource(
        &self,
        name: &str,
        uri: &str,
        config: ResourceConfig,
        callback: ResourceCallback,
    ) -> bool {
        self.add_resource("resources", name, uri, config, callback)
    }

    /// Register a resource template such as `docs://math/{version}`
    pub fn register_resource_template(
        &self,
        name: &str,
        template: &str,
        config: ResourceConfig,
        callback: ResourceCallback,
    ) -> bool {
        if !template.contains('{') {
            self.shared.events.error(
                "resource_templates",
                "registration rejected",
                format!("'{template}' has no variables"),
            );
            return false;
        }
        self.add_resource("resource_templates", name, template, config, callback)
    }

    fn add_resource(
        &self,
        area: &str,
        name: &str,
        uri: &str,
        config: ResourceConfig,
        callback: ResourceCallback,
    ) -> bool {
        let entry = RegisteredResource {
            resource: McpResource {
                name: name.to_string(),
                title: config.title,
                description: config.description,
                uri: uri.to_string(),
                mime_type: config.mime_type,
            },
            callback,
        };

        let added = self.insert(
            area,
            name,
            |registry| registry.resources.iter().any(|entry| entry.resource.name == name),
            |registry| registry.resources.push(entry),
        );
        if added {
            debug!("Registered resource '{}' ({}) on '{}'", name, uri, self.shared.name);
        }
        added
    }

    /// Register a prompt; returns `false` for an empty or duplicate name
    pub fn register_prompt(&self, name: &str, config: PromptConfig, callback: PromptCallback) -> bool {
        let entry = RegisteredPrompt {
            prompt: McpPrompt {
                name: name.to_string(),
                title: config.title,
                description: config.description,
                arguments: config.arguments,
            },
            callback,
        };

        let added = self.insert(
            "prompts",
            name,
            |registry| registry.prompts.iter().any(|entry| entry.prompt.name == name),
            |registry| registry.prompts.push(entry),
        );
        if added {
            debug!("Registered prompt '{}' on '{}'", name, self.shared.name);
        }
        added
    }

    /// Registered tools, in registration order
    #[must_use]
    pub fn tools(&self) -> Vec<McpTool> {
        read(&self.shared.registry)
            .tools
            .iter()
            .map(|entry| entry.tool.clone())
            .collect()
    }

    /// Registered prompts, in registration order
    #[must_use]
    pub fn prompts(&self) -> Vec<McpPrompt> {
        read(&self.shared.registry)
            .prompts
            .iter()
            .map(|entry| entry.prompt.clone())
            .collect()
    }

    /// Registered resources and resource templates, in registration order
    #[must_use]
    pub fn resources(&self) -> Vec<McpResource> {
        read(&self.shared.registry)
            .resources
            .iter()
            .map(|entry| entry.resource.clone())
            .collect()
    }

    /// Call a registered tool in-process
    ///
    /// # Errors
    /// Returns [`McpError::ToolNotFound`] for unknown names, or the callback error
    pub async fn call_tool(&self, name: &str, args: Value) -> Result<CallToolResult> {
        self.shared.call_tool(name, args).await
    }

    /// Get a registered prompt in-process
    ///
    /// # Errors
    /// Returns [`McpError::PromptNotFound`] for unknown names, or the callback error
    pub async fn call_prompt(
        &self,
        name: &str,
        args: HashMap<String, String>,
    ) -> Result<GetPromptResult> {
        self.shared.get_prompt(name, args).await
    }

    /// Read a registered resource in-process
    ///
    /// An empty `uri` reads a fixed resource at its registered URI. Template
    /// variables are taken from `uri`.
    ///
    /// # Errors
    /// Returns [`McpError::ResourceNotFound`] for unknown names or a URI that
    /// does not match the template
    pub async fn call_resource(&self, name: &str, uri: &str) -> Result<ReadResourceResult> {
        self.shared.read_named(name, uri).await
    }

    fn handler(&self) -> RegistryHandler {
        RegistryHandler {
            shared: Arc::clone(&self.shared),
        }
    }

    fn begin(&self) -> bool {
        if self.started.swap(true, Ordering::SeqCst) {
            info!("MCP server '{}' already started", self.shared.name);
            return false;
        }
        true
    }

    async fn run(&self, task: JoinHandle<()>) {
        if let Ok(mut slot) = self.abort.lock() {
            *slot = Some(task.abort_handle());
        }
        *self.task.lock().await = Some(task);
    }

    /// Serve the registry on stdin/stdout; no-op when already started
    ///
    /// # Errors
    /// Returns [`McpError::StartupFailed`] when the MCP handshake fails
    pub async fn start_server_stdio(&self) -> Result<()> {
        if !self.begin() {
            return Ok(());
        }

        let service = match self.handler().serve(rmcp::transport::stdio()).await {
            Ok(service) => service,
            Err(e) => {
                self.started.store(false, Ordering::SeqCst);
                return Err(McpError::StartupFailed {
                    server: self.shared.name.clone(),
                    reason: e.to_string(),
                });
            }
        };
        self.shared.events.info("start", "serving", "stdio");

        let events = self.shared.events.clone();
        self.run(tokio::spawn(async move {
            match service.waiting().await {
                Ok(reason) => debug!("stdio service finished: {:?}", reason),
                Err(e) => events.error("stdio", "service failed", e),
            }
        }))
        .await;
        Ok(())
    }

    /// Serve the registry over Streamable HTTP at `http://{addr}/mcp`
    ///
    /// Returns the bound address, which differs from `addr` for port 0. When
    /// already started, returns `addr` unchanged.
    ///
    /// # Errors
    /// Returns an error when the address cannot be bound
    pub async fn start_server_http(&self, addr: SocketAddr) -> Result<SocketAddr> {
        use hyper_util::{
            rt::{TokioExecutor, TokioIo},
            server::conn::auto::Builder,
            service::TowerToHyperService,
        };
        use rmcp::transport::streamable_http_server::{
            session::local::LocalSessionManager, StreamableHttpServerConfig, StreamableHttpService,
        };
        use tokio::net::TcpListener;

        if !self.begin() {
            return Ok(addr);
        }

        let listener = match TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(e) => {
                self.started.store(false, Ordering::SeqCst);
                return Err(e.into());
            }
        };
        let local = listener.local_addr()?;
        info!("MCP server '{}' listening on http://{}/mcp", self.shared.name, local);
        self.shared.events.info("start", "serving", format!("http://{local}/mcp"));

        let handler = self.handler();
        let config = StreamableHttpServerConfig {
            stateful_mode: !self.is_http_transport_stateless(),
            ..Default::default()
        };
        let service = StreamableHttpService::new(
            move || Ok(handler.clone()),
            LocalSessionManager::default().into(),
            config,
        );

        let connections = Arc::clone(&self.connections);
        let events = self.shared.events.clone();
        self.run(tokio::spawn(async move {
            loop {
                let (stream, peer) = match listener.accept().await {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        events.error("http", "accept failed", e);
                        break;
                    }
                };

                let session_id = uuid::Uuid::new_v4().to_string();
                debug!("Accepted MCP connection {} from {}", session_id, peer);
                write(&connections).insert(
                    session_id.clone(),
                    TrackedConnection {
                        transport: McpHttpTransport {
                            session_id: session_id.clone(),
                            peer,
                            connected_at: Utc::now(),
                        },
                        abort: None,
                    },
                );

                let io = TokioIo::new(stream);
                let hyper_service = TowerToHyperService::new(service.clone());
                let tracked = Arc::clone(&connections);
                let connection_events = events.clone();
                let id = session_id.clone();
                let task = tokio::spawn(async move {
                    let builder = Builder::new(TokioExecutor::new());
                    if let Err(e) = builder.serve_connection(io, hyper_service).await {
                        connection_events.error("http", "connection failed", e);
                    }
                    write(&tracked).remove(&id);
                    debug!("MCP connection {} closed", id);
                });

                if let Some(entry) = write(&connections).get_mut(&session_id) {
                    entry.abort = Some(task.abort_handle());
                }
            }
        }))
        .await;
        Ok(local)
    }

    /// Open HTTP connections
    #[must_use]
    pub fn http_transports(&self) -> Vec<McpHttpTransport> {
        read(&self.connections)
            .values()
            .map(|entry| entry.transport.clone())
            .collect()
    }

    /// Look up an open HTTP connection by id
    #[must_use]
    pub fn find_http_transport(&self, session_id: &str) -> Option<McpHttpTransport> {
        read(&self.connections)
            .get(session_id)
            .map(|entry| entry.transport.clone())
    }

    /// Stop serving, drop open connections, and clear the registry and event callback
    pub fn stop_server(&self) {
        if !self.started.swap(false, Ordering::SeqCst) {
            return;
        }

        if let Some(abort) = self.abort.lock().ok().and_then(|mut slot| slot.take()) {
            abort.abort();
        }
        for (_, entry) in write(&self.connections).drain() {
            if let Some(abort) = entry.abort {
                abort.abort();
            }
        }

        *write(&self.shared.registry) = Registry::default();
        self.shared.events.info("stop", "stopped", &self.shared.name);
        self.shared.events.clear();
        info!("MCP server '{}' stopped", self.shared.name);
    }

    /// Wait until the served transport finishes; returns at once when not serving
    ///
    /// # Errors
    /// Returns an error when the serving task panicked
    pub async fn wait(&self) -> Result<()> {
        let task = self.task.lock().await.take();
        let Some(task) = task else {
            return Ok(());
        };
        match task.await {
            Ok(()) => Ok(()),
            Err(e) if e.is_cancelled() => Ok(()),
            Err(e) => Err(McpError::Transport(e.to_string())),
        }
    }
}

impl Drop for McpServerBase {
    fn drop(&mut self) {
        self.stop_server();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::content::{prompt_texts, resource_texts, tool_text};
    use crate::events::{EventType, McpEvent};
    use std::sync::Mutex;

    fn echo_server() -> McpServerBase {
        let server = McpServerBase::new("Echo", "1.0.0", None, None);
        server.register_tool(
            "echo",
            ToolConfig {
                description: Some("Echo the text back".into()),
                input_schema: json!({
                    "type": "object",
                    "properties": { "text": { "type": "string" } },
                    "required": ["text"]
                }),
                ..Default::default()
            },
            tool_callback(|args: Value| async move {
                let text = args["text"].as_str().unwrap_or_default().to_string();
                Ok(CallToolResult::success(vec![Content::text(text)]))
            }),
        );
        server
    }

    #[test]
    fn test_match_template() {
        let vars = match_template("sympy://doc/{version}/num", "sympy://doc/1.14/num").unwrap();
        assert_eq!(vars.get("version").map(String::as_str), Some("1.14"));

        let vars = match_template("sympy://{version}", "sympy://1.14").unwrap();
        assert_eq!(vars.get("version").map(String::as_str), Some("1.14"));

        assert!(match_template("sympy://doc/{version}/num", "sympy://doc//num").is_none());
        assert!(match_template("sympy://doc/{version}/num", "sympy://other/1.14/num").is_none());
        assert!(match_template("docs://math", "docs://math").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_call_registered_tool() {
        let server = echo_server();
        let result = server.call_tool("echo", json!({ "text": "hi" })).await.unwrap();
        assert_eq!(tool_text(&result).as_deref(), Some("hi"));

        let tools = server.tools();
        assert_eq!(tools.len(), 1);
        let parameters = tools[0].parameters.as_ref().unwrap();
        assert_eq!(parameters.required.as_deref(), Some(&["text".to_string()][..]));
    }

    #[tokio::test]
    async fn test_unknown_names_are_not_found() {
        let server = echo_server();
        assert!(matches!(
            server.call_tool("missing", Value::Null).await.unwrap_err(),
            McpError::ToolNotFound { .. }
        ));
        assert!(matches!(
            server.call_prompt("missing", HashMap::new()).await.unwrap_err(),
            McpError::PromptNotFound { .. }
        ));
        assert!(matches!(
            server.call_resource("missing", "").await.unwrap_err(),
            McpError::ResourceNotFound { .. }
        ));
    }

    #[test]
    fn test_duplicate_and_empty_names_rejected() {
        let server = echo_server();
        let events = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&events);
        server.on_event(Arc::new(move |event: &McpEvent| {
            captured.lock().unwrap().push(event.clone());
        }));

        let callback = tool_callback(|_| async { Ok(CallToolResult::success(vec![])) });
        assert!(!server.register_tool("echo", ToolConfig::default(), Arc::clone(&callback)));
        assert!(!server.register_tool("  ", ToolConfig::default(), callback));
        assert_eq!(server.tools().len(), 1);

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.event_type == EventType::Error));
    }

    #[test]
    fn test_rejection_callback_can_read_server() {
        let server = Arc::new(echo_server());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&seen);
        let weak = Arc::downgrade(&server);
        server.on_event(Arc::new(move |_: &McpEvent| {
            if let Some(server) = weak.upgrade() {
                let counts = (server.tools().len(), server.prompts().len(), server.resources().len());
                captured.lock().unwrap().push(counts);
            }
        }));

        // Run on a thread so a lock held across the callback fails the test instead of hanging it
        let worker = Arc::clone(&server);
        let (tx, rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            let callback = tool_callback(|_| async { Ok(CallToolResult::success(vec![])) });
            let rejected = [
                worker.register_tool("", ToolConfig::default(), Arc::clone(&callback)),
                worker.register_tool("echo", ToolConfig::default(), callback),
                worker.register_prompt(
                    "",
                    PromptConfig::default(),
                    prompt_callback(|_| async { Err(McpError::Protocol("unused".into())) }),
                ),
                worker.register_resource(
                    "",
                    "docs://x",
                    ResourceConfig::default(),
                    resource_callback(|_, _| async { Err(McpError::Protocol("unused".into())) }),
                ),
            ];
            tx.send(rejected).unwrap();
        });

        let rejected = rx
            .recv_timeout(std::time::Duration::from_secs(5))
            .expect("registration blocked inside the event callback");
        assert_eq!(rejected, [false; 4]);
        assert_eq!(*seen.lock().unwrap(), vec![(1, 0, 0); 4]);
    }

    #[tokio::test]
    async fn test_prompt_and_resource_template() {
        let server = McpServerBase::new("Docs", "1.0.0", None, None);
        assert!(server.register_prompt(
            "greet",
            PromptConfig {
                arguments: vec![McpPromptArgument::required("who", "Who to greet")],
                ..Default::default()
            },
            prompt_callback(|args: HashMap<String, String>| async move {
                let who = args.get("who").cloned().unwrap_or_default();
                from_wire::<GetPromptResult>(json!({
                    "messages": [
                        { "role": "user", "content": { "type": "text", "text": format!("hello {who}") } }
                    ]
                }))
            }),
        ));
        assert!(server.register_resource_template(
            "docs",
            "docs://math/{version}",
            ResourceConfig::default(),
            resource_callback(|uri: String, vars: HashMap<String, String>| async move {
                let version = vars.get("version").cloned().unwrap_or_default();
                from_wire::<ReadResourceResult>(json!({
                    "contents": [ { "uri": uri, "text": format!("docs {version}") } ]
                }))
            }),
        ));

        let mut args = HashMap::new();
        args.insert("who".to_string(), "relay".to_string());
        let prompt = server.call_prompt("greet", args).await.unwrap();
        assert_eq!(prompt_texts(&prompt), vec!["hello relay"]);

        let resource = server.call_resource("docs", "docs://math/2").await.unwrap();
        assert_eq!(resource_texts(&resource), vec!["docs 2"]);

        assert!(server.call_resource("docs", "docs://other/2").await.is_err());
        assert!(server.resources()[0].is_template());
    }

    #[test]
    fn test_template_without_variables_rejected() {
        let server = McpServerBase::new("Docs", "1.0.0", None, None);
        let callback =
            resource_callback(|_, _| async { from_wire::<ReadResourceResult>(json!({ "contents": [] })) });
        assert!(!server.register_resource_template(
            "docs",
            "docs://math",
            ResourceConfig::default(),
            callback
        ));
    }

    #[test]
    fn test_server_info_reflects_registry() {
        let server = echo_server();
        let info = serde_json::to_value(server.handler().get_info()).unwrap();
        assert_eq!(info["serverInfo"]["name"], "Echo");
        assert!(info["capabilities"]["tools"].is_object());
        assert!(info["capabilities"].get("prompts").is_none());
    }

    #[tokio::test]
    async fn test_http_start_stop() {
        let server = echo_server();
        assert!(server.is_http_transport_stateless());

        let addr = server.start_server_http("127.0.0.1:0".parse().unwrap()).await.unwrap();
        assert!(server.has_started());
        assert_ne!(addr.port(), 0);
        assert!(server.http_transports().is_empty());
        assert!(server.find_http_transport("nope").is_none());

        server.stop_server();
        assert!(!server.has_started());
        assert!(server.tools().is_empty());
        server.wait().await.unwrap();
    }
}
