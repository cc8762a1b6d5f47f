//! `relay serve` over stdio, driven by an MCP client

#![allow(clippy::expect_used, clippy::unwrap_used)]

use relay_mcp::content::{prompt_texts, tool_text};
use relay_mcp::{McpClient, McpServerConfig, TransportConfig};
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;

fn relay_serve() -> McpServerConfig {
    // Keep the auto-created global config out of the real home directory
    let home = std::env::temp_dir().join(format!("relay-serve-{}", std::process::id()));
    std::fs::create_dir_all(&home).unwrap();

    McpServerConfig::Advanced {
        transport: TransportConfig::Stdio {
            command: env!("CARGO_BIN_EXE_relay").into(),
            args: vec!["serve".into(), "--transport".into(), "stdio".into()],
            env: HashMap::from([
                ("HOME".to_string(), home.display().to_string()),
                ("RUST_LOG".to_string(), "warn".to_string()),
            ]),
        },
        startup_timeout: None,
    }
}

#[tokio::test]
async fn test_serve_stdio_math_server() {
    let mut client = McpClient::new("relay-test", "1.0.0");
    client
        .open(&relay_serve(), Duration::from_secs(30))
        .await
        .expect("Failed to start relay serve");

    assert_eq!(client.tools().len(), 1);
    assert_eq!(client.prompts().len(), 2);
    assert_eq!(client.resources().len(), 2);

    let result = client
        .call_tool("MathExpressionEvaluator", json!({ "expression": "6 * 7" }))
        .await
        .expect("call failed")
        .expect("client is open");
    assert_eq!(tool_text(&result).as_deref(), Some("42"));

    let prompt = client
        .call_prompt(
            "MathExpressionEvaluator",
            HashMap::from([("expression".to_string(), "6 * 7".to_string())]),
        )
        .await
        .expect("prompt failed")
        .expect("client is open");
    assert_eq!(prompt_texts(&prompt), vec!["Evaluate the math expression: 6 * 7"]);

    client.close_connection().await;
    assert!(!client.is_connected());
}
