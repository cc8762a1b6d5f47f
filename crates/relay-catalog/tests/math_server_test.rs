//! Math server served over Streamable HTTP and called by the catalog clients

#![allow(clippy::expect_used, clippy::unwrap_used)]

use relay_catalog::{math_server, MathJsMath, SymPyMath};
use relay_mcp::content::{prompt_texts, tool_text};
use relay_mcp::{McpHost, McpServerBase};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;

async fn serve() -> (Arc<McpServerBase>, String) {
    let server = Arc::new(math_server().expect("math server"));
    let addr: SocketAddr = server
        .start_server_http("127.0.0.1:0".parse().expect("valid address"))
        .await
        .expect("Failed to start HTTP server");
    (server, format!("http://{addr}/mcp"))
}

#[tokio::test]
async fn test_sympy_client_against_math_server() {
    let (server, url) = serve().await;

    let mut sympy = SymPyMath::new();
    sympy
        .client_mut()
        .open_connection_http(&url, None)
        .await
        .expect("Failed to connect");

    assert_eq!(sympy.client().tools().len(), 1);
    assert_eq!(sympy.client().prompts().len(), 2);
    assert_eq!(sympy.client().resources().len(), 2);

    let result = sympy
        .call_math_expression_evaluator_tool("2^10")
        .await
        .expect("call failed")
        .expect("client is open");
    assert_eq!(tool_text(&result).as_deref(), Some("1024"));

    let prompt = sympy
        .call_math_expression_result_prompt("1024")
        .await
        .expect("prompt failed")
        .expect("client is open");
    assert_eq!(
        prompt_texts(&prompt),
        vec!["Explain the math expression result: 1024"]
    );

    // The math server publishes math:// docs, not sympy:// ones
    assert!(sympy.call_sympy_docs_url_version_resource("1.14").await.is_err());

    sympy.client_mut().close_connection().await;
    server.stop_server();
    server.wait().await.expect("server task failed");
}

#[tokio::test]
async fn test_mathjs_client_through_host() {
    let (server, url) = serve().await;

    let mut mathjs = MathJsMath::new();
    mathjs
        .open_connection_http(&url, None)
        .await
        .expect("Failed to connect");

    assert!(mathjs.is_connected());
    let mut host = McpHost::new();
    host.add_client_function_tools("mathjs", mathjs.into_client());

    let tool = host
        .find_function_tool("MathExpressionEvaluator")
        .expect("tool published");
    assert_eq!(tool.client_id.as_deref(), Some("mathjs"));
    assert_eq!(
        tool.parameters.as_ref().and_then(|p| p.required.clone()),
        Some(vec!["expression".to_string()])
    );

    let texts = host
        .call_function_tool("MathExpressionEvaluator", json!({ "expression": "sqrt(16)" }))
        .await
        .expect("call failed");
    assert_eq!(texts, vec!["4"]);

    host.shutdown().await;
    server.stop_server();
    server.wait().await.expect("server task failed");
}
