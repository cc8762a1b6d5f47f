use anyhow::{anyhow, Result};
use relay_logging::LogFormat;
use relay_mcp::McpConfig;
use relay_provider::{HF_CHAT_COMPLETIONS_URL, OPENAI_BASE_URL};
use relay_types::Provider;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::PathBuf;
use tracing::warn;

/// Default config template created when no config exists
pub const DEFAULT_CONFIG: &str = r#"
[logging]
level = "info"  # trace, debug, info, warn, error
format = "text"  # or "json"

[providers]
default = "openai"  # or "ollama"

[providers.openai]
api_key = ""  # Set via OPENAI_API_KEY env var
model = "gpt-4.1-nano"
base_url = ""  # Optional: Set via OPENAI_BASE_URL env var

[providers.ollama]
base_url = "http://localhost:11434/v1"
model = "llama3.2"

[chat]
endpoint = "https://router.huggingface.co/nebius/v1/chat/completions"
model = "microsoft/phi-4"
api_key = ""  # Set via HF_API_KEY env var
max_tokens = 512

[mcp]
startup_timeout = 10

[mcp.servers]
# math = "python3 servers/math_server.py"
# learn = { url = "https://learn.microsoft.com/api/mcp" }
"#;

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OpenAIConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    pub model: String,
    #[serde(default)]
    pub base_url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProvidersConfig {
    pub default: String,
    pub openai: OpenAIConfig,
    pub ollama: OllamaConfig,
}

/// Hosted chat-completion endpoint
#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    #[serde(default = "default_chat_endpoint")]
    pub endpoint: String,
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_chat_endpoint() -> String {
    HF_CHAT_COMPLETIONS_URL.to_string()
}

fn default_max_tokens() -> u32 {
    512
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub logging: LoggingConfig,
    pub providers: ProvidersConfig,
    pub chat: ChatConfig,
    #[serde(default)]
    pub mcp: McpConfig,
}

/// Empty strings in the template mean "not set"
fn non_empty(value: Option<&String>) -> Option<String> {
    value.filter(|v| !v.is_empty()).cloned()
}

impl Config {
    /// Get the global config path: ~/.relay/relay.toml
    fn global_config_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| anyhow!("Could not find home directory"))?;
        Ok(home.join(".relay").join("relay.toml"))
    }

    /// Ensure global config directory and file exist, creating defaults if needed
    fn ensure_global_config() -> Result<PathBuf> {
        let config_path = Self::global_config_path()?;
        if let Some(config_dir) = config_path.parent() {
            if !config_dir.exists() {
                fs::create_dir_all(config_dir)?;
                eprintln!("Created config directory: {}", config_dir.display());
            }
        }

        if !config_path.exists() {
            fs::write(&config_path, DEFAULT_CONFIG.trim())?;
            eprintln!("Created default config: {}", config_path.display());
            eprintln!("Please edit this file or set environment variables.");
        }

        Ok(config_path)
    }

    /// Load configuration with layered approach:
    /// 1. Built-in defaults
    /// 2. Global config: ~/.relay/relay.toml (auto-created if missing)
    /// 3. Local override: ./relay.toml (workspace, optional)
    /// 4. `RELAY__` environment variables, then the convenience keys
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut builder = config::Config::builder().add_source(config::File::from_str(
            DEFAULT_CONFIG,
            config::FileFormat::Toml,
        ));

        match Self::ensure_global_config() {
            Ok(path) => builder = builder.add_source(config::File::from(path)),
            Err(e) => warn!("Global config unavailable: {}", e),
        }

        let mut builder = builder
            .add_source(config::File::with_name("relay").required(false))
            .add_source(config::Environment::with_prefix("RELAY").separator("__"));

        if let Ok(key) = env::var("OPENAI_API_KEY") {
            builder = builder.set_override("providers.openai.api_key", key)?;
        }
        if let Ok(url) = env::var("OPENAI_BASE_URL") {
            builder = builder.set_override("providers.openai.base_url", url)?;
        }
        if let Ok(key) = env::var("HF_API_KEY") {
            builder = builder.set_override("chat.api_key", key)?;
        }

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Provider for the `chat` command
    pub fn provider(&self) -> Provider {
        let providers = &self.providers;
        match providers.default.as_str() {
            "openai" => Provider::openai_full(
                &providers.openai.model,
                self.openai_api_key(),
                non_empty(providers.openai.base_url.as_ref()),
            ),
            "ollama" => Provider::ollama(&providers.ollama.model, &providers.ollama.base_url),
            other => {
                warn!("Unknown provider '{}', defaulting to OpenAI", other);
                Provider::default()
            }
        }
    }

    pub fn openai_api_key(&self) -> Option<String> {
        non_empty(self.providers.openai.api_key.as_ref())
    }

    /// Base URL of the Responses API
    pub fn openai_base_url(&self) -> String {
        non_empty(self.providers.openai.base_url.as_ref())
            .unwrap_or_else(|| OPENAI_BASE_URL.to_string())
    }

    pub fn chat_api_key(&self) -> Option<String> {
        non_empty(self.chat.api_key.as_ref())
    }
}
