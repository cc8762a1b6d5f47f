//! Configuration types for MCP connections

use crate::error::{McpError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// MCP configuration: servers the host connects to at startup
#[derive(Debug, Deserialize, Clone)]
pub struct McpConfig {
    /// Global startup timeout in seconds
    #[serde(default = "default_startup_timeout")]
    pub startup_timeout: u64,

    /// MCP server configurations keyed by host id
    #[serde(default)]
    pub servers: HashMap<String, McpServerConfig>,
}

fn default_startup_timeout() -> u64 {
    10
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            startup_timeout: default_startup_timeout(),
            servers: HashMap::new(),
        }
    }
}

/// Individual MCP server configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(untagged)]
pub enum McpServerConfig {
    /// Simple form: a command string, a `.py`/`.js` script path or a URL
    Simple(String),

    /// Advanced form with explicit transport and options
    Advanced {
        /// Transport configuration
        #[serde(flatten)]
        transport: TransportConfig,

        /// Override global startup timeout
        #[serde(default)]
        startup_timeout: Option<u64>,
    },
}

/// Transport configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(untagged)]
pub enum TransportConfig {
    /// Streamable HTTP transport
    ///
    /// Listed first: the required `url` field tells it apart from `Stdio`.
    Http {
        /// Server URL
        url: String,

        /// Optional HTTP headers (e.g. `Authorization`)
        #[serde(default)]
        headers: HashMap<String, String>,
    },

    /// stdio transport (launch subprocess)
    Stdio {
        /// Command to execute, or a whole command line when `args` is empty
        command: String,

        /// Optional separate arguments list
        #[serde(default)]
        args: Vec<String>,

        /// Optional environment variables for the child process
        #[serde(default)]
        env: HashMap<String, String>,
    },
}

/// Detected transport type with all parameters needed to open a connection
#[derive(Debug, Clone, PartialEq)]
pub enum TransportType {
    /// stdio transport
    Stdio {
        /// Program to execute
        program: String,
        /// Command-line arguments
        args: Vec<String>,
        /// Environment variables
        env: HashMap<String, String>,
    },
    /// Streamable HTTP transport: (url, headers)
    Http(String, HashMap<String, String>),
}

impl TransportType {
    /// Stdio transport for a server script: `.py` runs under Python, `.js` under Node
    ///
    /// # Errors
    /// Returns [`McpError::InvalidScript`] for any other extension
    pub fn for_script(script_path: &str) -> Result<Self> {
        let extension = Path::new(script_path)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();

        let program = match extension {
            "py" if cfg!(windows) => "python",
            "py" => "python3",
            "js" => "node",
            _ => return Err(McpError::InvalidScript(script_path.to_string())),
        };

        Ok(Self::Stdio {
            program: program.to_string(),
            args: vec![script_path.to_string()],
            env: HashMap::new(),
        })
    }

    /// Split a command line into program + args
    fn from_command_line(command: &str, env: HashMap<String, String>) -> Self {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next().unwrap_or_else(|| command.to_string());
        Self::Stdio {
            program,
            args: parts.collect(),
            env,
        }
    }

    /// Authorization header value, looked up case-insensitively
    #[must_use]
    pub fn auth_header(&self) -> Option<&str> {
        match self {
            Self::Http(_, headers) => headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case("authorization"))
                .map(|(_, v)| v.as_str()),
            Self::Stdio { .. } => None,
        }
    }
}

impl McpServerConfig {
    /// Detect transport type from configuration
    #[must_use]
    pub fn detect_transport(&self) -> TransportType {
        match self {
            McpServerConfig::Simple(s) => {
                if s.starts_with("http://") || s.starts_with("https://") {
                    TransportType::Http(s.clone(), HashMap::new())
                } else if let Ok(script) = TransportType::for_script(s.trim()) {
                    script
                } else {
                    TransportType::from_command_line(s, HashMap::new())
                }
            }
            McpServerConfig::Advanced { transport, .. } => match transport {
                TransportConfig::Stdio { command, args, env } => {
                    if args.is_empty() {
                        TransportType::from_command_line(command, env.clone())
                    } else {
                        TransportType::Stdio {
                            program: command.clone(),
                            args: args.clone(),
                            env: env.clone(),
                        }
                    }
                }
                TransportConfig::Http { url, headers } => {
                    TransportType::Http(url.clone(), headers.clone())
                }
            },
        }
    }

    /// Get startup timeout (with fallback to global default)
    #[must_use]
    pub fn get_timeout(&self, global_timeout: u64) -> Duration {
        match self {
            McpServerConfig::Simple(_) => Duration::from_secs(global_timeout),
            McpServerConfig::Advanced {
                startup_timeout, ..
            } => Duration::from_secs(startup_timeout.unwrap_or(global_timeout)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_config_stdio() {
        let config = McpServerConfig::Simple("npx -y server".into());
        assert_eq!(
            config.detect_transport(),
            TransportType::Stdio {
                program: "npx".into(),
                args: vec!["-y".into(), "server".into()],
                env: HashMap::new(),
            }
        );
    }

    #[test]
    fn test_simple_config_http() {
        let config = McpServerConfig::Simple("http://localhost:3000/mcp".into());
        assert_eq!(
            config.detect_transport(),
            TransportType::Http("http://localhost:3000/mcp".into(), HashMap::new())
        );
    }

    #[test]
    fn test_simple_config_script() {
        let config = McpServerConfig::Simple("/opt/servers/math.js".into());
        assert_eq!(
            config.detect_transport(),
            TransportType::Stdio {
                program: "node".into(),
                args: vec!["/opt/servers/math.js".into()],
                env: HashMap::new(),
            }
        );
    }

    #[test]
    fn test_script_extension_rejected() {
        let err = TransportType::for_script("server.rb").unwrap_err();
        assert!(matches!(err, McpError::InvalidScript(path) if path == "server.rb"));
    }

    #[cfg(not(windows))]
    #[test]
    fn test_python_script_uses_python3() {
        match TransportType::for_script("sympy_server.py").unwrap() {
            TransportType::Stdio { program, args, .. } => {
                assert_eq!(program, "python3");
                assert_eq!(args, vec!["sympy_server.py"]);
            }
            TransportType::Http(..) => panic!("Expected Stdio transport"),
        }
    }

    #[test]
    fn test_timeout_override() {
        let config = McpServerConfig::Advanced {
            transport: TransportConfig::Stdio {
                command: "server".into(),
                args: Vec::new(),
                env: HashMap::new(),
            },
            startup_timeout: Some(30),
        };
        assert_eq!(config.get_timeout(10), Duration::from_secs(30));
    }

    #[test]
    fn test_timeout_default() {
        let config = McpServerConfig::Simple("server".into());
        assert_eq!(config.get_timeout(10), Duration::from_secs(10));
    }

    #[test]
    fn test_toml_deserialization_stdio_with_env() {
        let toml_str = r#"
            [servers.sympy]
            command = "python3"
            args = ["servers/sympy_math.py"]
            env = { SYMPY_PRECISION = "15" }
        "#;

        let config: McpConfig = toml::from_str(toml_str).expect("Failed to parse TOML");
        assert_eq!(config.startup_timeout, 10);
        let server = config.servers.get("sympy").expect("Server not found");

        match server.detect_transport() {
            TransportType::Stdio { program, args, env } => {
                assert_eq!(program, "python3");
                assert_eq!(args, vec!["servers/sympy_math.py"]);
                assert_eq!(env.get("SYMPY_PRECISION").unwrap(), "15");
            }
            TransportType::Http(..) => panic!("Expected Stdio transport"),
        }
    }

    #[test]
    fn test_http_headers_parsing() {
        let toml_str = r#"
            [servers.microsoftlearn]
            url = "https://learn.microsoft.com/api/mcp"
            headers = { authorization = "Bearer token123", "X-Trace" = "on" }
            startup_timeout = 20
        "#;

        let config: McpConfig = toml::from_str(toml_str).expect("Failed to parse TOML");
        let server = config.servers.get("microsoftlearn").expect("Server not found");
        assert_eq!(server.get_timeout(10), Duration::from_secs(20));

        let transport = server.detect_transport();
        assert_eq!(transport.auth_header(), Some("Bearer token123"));
        match transport {
            TransportType::Http(url, headers) => {
                assert_eq!(url, "https://learn.microsoft.com/api/mcp");
                assert_eq!(headers.get("X-Trace").map(String::as_str), Some("on"));
            }
            TransportType::Stdio { .. } => panic!("Expected HTTP transport"),
        }
    }
}
