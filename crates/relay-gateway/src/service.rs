use crate::cli::{Command, Transport};
use crate::config::Config;
use anyhow::{bail, Context, Result};
use relay_catalog::{evaluate, math_server};
use relay_mcp::content::prompt_helper;
use relay_mcp::McpHost;
use relay_provider::{
    execute_chat, execute_provider, ChatCompletionClient, ChatCompletionRequest, ProviderService,
    ResponsesClient,
};
use relay_types::{McpItem, McpPromptHelper};
use std::collections::HashMap;
use std::net::SocketAddr;
use tokio::signal;
use tracing::info;

/// Gateway service - runs one command against the loaded config
pub struct GatewayService {
    config: Config,
}

impl GatewayService {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub async fn run(self, command: Command) -> Result<()> {
        match command {
            Command::Serve {
                transport,
                addr,
                stateful,
            } => serve(transport, addr, stateful).await,
            Command::Eval { expression } => {
                println!("{}", evaluate(&expression)?);
                Ok(())
            }
            Command::Tools { json } => self.tools(json).await,
            Command::Query {
                text,
                provider,
                model,
                max_output_tokens,
            } => {
                let mut item = McpItem::new(text, provider, model);
                item.max_output_tokens = max_output_tokens;
                self.query(&item).await
            }
            Command::Prompt { name, args } => self.prompt(&name, args.into_iter().collect()).await,
            Command::Chat { text, hosted } => self.chat(&text, hosted).await,
        }
    }

    /// Host with every configured server connected and its tools published
    async fn host(&self) -> McpHost {
        let mut host = McpHost::new();
        if self.config.mcp.servers.is_empty() {
            info!("No MCP servers configured");
            return host;
        }

        info!("Initializing MCP servers...");
        let started = host.connect_all(&self.config.mcp, env!("CARGO_PKG_VERSION")).await;
        info!(
            "MCP initialized: {} servers, {} tools",
            started,
            host.function_tools().len()
        );
        host
    }

    async fn tools(&self, json: bool) -> Result<()> {
        let host = self.host().await;
        if json {
            println!("{}", serde_json::to_string_pretty(host.function_tools())?);
        } else {
            for tool in host.function_tools() {
                let owner = tool
                    .client_id
                    .as_deref()
                    .or(tool.server_id.as_deref())
                    .unwrap_or("-");
                println!(
                    "{owner}\t{}\t{}",
                    tool.name,
                    tool.description.as_deref().unwrap_or_default()
                );
            }
        }
        host.shutdown().await;
        Ok(())
    }

    async fn query(&self, item: &McpItem) -> Result<()> {
        let host = self.host().await;
        let openai = ResponsesClient::new(self.config.openai_base_url(), self.config.openai_api_key());

        let outcome = execute_provider(item, &host, &openai).await;
        host.shutdown().await;

        println!("{}", outcome.result);
        for result in &outcome.results {
            println!("{result}");
        }
        if outcome.is_error() {
            bail!("query failed: {}", outcome.result);
        }
        Ok(())
    }

    async fn prompt(&self, name: &str, args: HashMap<String, String>) -> Result<()> {
        let host = self.host().await;
        let fetched = fetch_prompt(&host, name, args).await;
        host.shutdown().await;

        let helper = fetched?.with_context(|| format!("no connected MCP server offers prompt '{name}'"))?;
        println!("{}", serde_json::to_string_pretty(&helper)?);
        Ok(())
    }

    async fn chat(&self, text: &str, hosted: bool) -> Result<()> {
        if !hosted {
            let service = ProviderService::new(self.config.provider());
            println!("{}", service.complete(&[], text).await?);
            return Ok(());
        }

        let chat = &self.config.chat;
        let client = ChatCompletionClient::new(chat.endpoint.clone(), self.config.chat_api_key());
        let request = ChatCompletionRequest::ask(text, chat.model.clone(), chat.max_tokens);

        let host = self.host().await;
        let answers = execute_chat(&client, request, &host).await;
        host.shutdown().await;

        let answers = answers.context("hosted chat failed")?;
        if answers.is_empty() {
            bail!("chat completion returned no message");
        }
        for answer in answers {
            println!("{answer}");
        }
        Ok(())
    }
}

/// Prompt `name` from the first connected client listing it
async fn fetch_prompt(
    host: &McpHost,
    name: &str,
    args: HashMap<String, String>,
) -> Result<Option<McpPromptHelper>> {
    for entry in host.clients() {
        let client = entry.entity.read().await;
        if !client.prompts().iter().any(|prompt| prompt.name == name) {
            continue;
        }
        if let Some(result) = client.call_prompt(name, args).await? {
            return Ok(Some(prompt_helper(name, &result)));
        }
        return Ok(None);
    }
    Ok(None)
}

/// Serve the math server until it ends or Ctrl+C
async fn serve(transport: Transport, addr: SocketAddr, stateful: bool) -> Result<()> {
    let server = math_server()?;
    match transport {
        Transport::Stdio => {
            server.start_server_stdio().await?;
            info!("Math server '{}' serving on stdio", server.name());
        }
        Transport::Http => {
            server.set_http_transport_stateless(!stateful);
            let bound = server.start_server_http(addr).await?;
            info!("Math server '{}' serving on http://{}/mcp", server.name(), bound);
        }
    }

    tokio::select! {
        result = server.wait() => result?,
        _ = signal::ctrl_c() => {
            info!("Received shutdown signal");
            server.stop_server();
        }
    }

    info!("Relay stopped");
    Ok(())
}
