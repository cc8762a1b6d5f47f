//! HTTP clients against a local endpoint

#![allow(clippy::expect_used, clippy::unwrap_used)]

use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::header::{AUTHORIZATION, CONTENT_TYPE};
use hyper::http::request::Parts;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder;
use relay_mcp::{tool_callback, McpHost, McpServerBase, ToolConfig};
use relay_provider::{
    execute_chat, ChatCompletionClient, ChatCompletionRequest, ProviderError, ResponsesBackend,
    ResponsesClient, ResponsesRequest,
};
use relay_types::McpItem;
use rmcp::model::{CallToolResult, Content};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// Request head and JSON body as the server saw them
struct Captured {
    parts: Parts,
    body: Value,
}

impl Captured {
    fn header(&self, name: hyper::header::HeaderName) -> Option<&str> {
        self.parts.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Answer one connection with `status` and `body`, handing back the first request
async fn serve_once(status: u16, body: Value) -> (String, oneshot::Receiver<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();
    let tx = Arc::new(Mutex::new(Some(tx)));
    let status = StatusCode::from_u16(status).unwrap();
    let payload = Bytes::from(body.to_string());

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let service = service_fn(move |request: Request<Incoming>| {
            let tx = Arc::clone(&tx);
            let payload = payload.clone();
            async move {
                let (parts, incoming) = request.into_parts();
                let bytes = incoming.collect().await?.to_bytes();
                let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

                let sender = tx.lock().unwrap().take();
                if let Some(sender) = sender {
                    let _ = sender.send(Captured { parts, body });
                }

                let response = Response::builder()
                    .status(status)
                    .header(CONTENT_TYPE, "application/json")
                    .body(Full::new(payload))
                    .unwrap();
                Ok::<_, hyper::Error>(response)
            }
        });

        let _ = Builder::new(TokioExecutor::new())
            .serve_connection(TokioIo::new(stream), service)
            .await;
    });

    (format!("http://{addr}"), rx)
}

fn doubling_host() -> McpHost {
    let server = McpServerBase::new("Math", "1.0.0", None, None);
    server.register_tool(
        "double",
        ToolConfig {
            input_schema: json!({
                "type": "object",
                "properties": { "x": { "type": "number" } },
                "required": ["x"]
            }),
            ..Default::default()
        },
        tool_callback(|args: Value| async move {
            let x = args["x"].as_f64().unwrap_or_default();
            Ok(CallToolResult::success(vec![Content::text((x * 2.0).to_string())]))
        }),
    );
    let mut host = McpHost::new();
    host.add_server_function_tools("math", Arc::new(server));
    host
}

#[tokio::test]
async fn test_chat_completion_round_trip() {
    let (url, captured) = serve_once(
        200,
        json!({
            "choices": [
                { "index": 0, "message": { "role": "assistant", "content": "Canberra" }, "finish_reason": "stop" }
            ]
        }),
    )
    .await;

    let client = ChatCompletionClient::new(format!("{url}/v1/chat/completions"), Some("hf-key".into()));
    let request = ChatCompletionRequest::ask("What is the capital of Australia?", "microsoft/phi-4", 512);
    let completion = client.complete(&request).await.unwrap();

    assert_eq!(
        completion.first_message().and_then(|m| m.content.as_deref()),
        Some("Canberra")
    );

    let captured = captured.await.unwrap();
    assert_eq!(captured.parts.method, Method::POST);
    assert_eq!(captured.parts.uri.path(), "/v1/chat/completions");
    assert_eq!(captured.header(AUTHORIZATION), Some("Bearer hf-key"));
    assert_eq!(captured.body["model"], "microsoft/phi-4");
    assert_eq!(captured.body["max_tokens"], 512);
}

#[tokio::test]
async fn test_responses_round_trip() {
    let (url, captured) = serve_once(
        200,
        json!({
            "id": "resp_1",
            "output": [
                { "type": "message", "content": [ { "type": "output_text", "text": "42" } ] }
            ]
        }),
    )
    .await;

    let client = ResponsesClient::new(format!("{url}/v1"), Some("sk-test".into()));
    let item = McpItem::new("6*7", "openai", "gpt-4.1-nano");
    let response = client.create(&ResponsesRequest::for_item(&item)).await.unwrap();

    assert_eq!(response.id.as_deref(), Some("resp_1"));
    assert_eq!(response.output_text(), "42");
    let captured = captured.await.unwrap();
    assert_eq!(captured.parts.method, Method::POST);
    assert_eq!(captured.parts.uri.path(), "/v1/responses");
    assert_eq!(captured.header(AUTHORIZATION), Some("Bearer sk-test"));
    assert_eq!(captured.body["model"], "gpt-4.1-nano");
    assert_eq!(captured.body["input"][0]["content"], "6*7");
}

#[tokio::test]
async fn test_hosted_chat_runs_called_tools() {
    let (url, captured) = serve_once(
        200,
        json!({
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": { "name": "double", "arguments": "{\"x\":21}" }
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        }),
    )
    .await;

    let host = doubling_host();
    let client = ChatCompletionClient::new(format!("{url}/v1/chat/completions"), None);
    let request = ChatCompletionRequest::ask("double 21", "microsoft/phi-4", 64);

    let answers = execute_chat(&client, request, &host).await.unwrap();
    assert_eq!(answers, vec!["42"]);

    let captured = captured.await.unwrap();
    let tools = captured.body["tools"].as_array().expect("tools offered");
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0]["function"]["name"], "double");
    assert_eq!(tools[0]["function"]["strict"], true);
    assert_eq!(tools[0]["function"]["parameters"]["additionalProperties"], false);
}

#[tokio::test]
async fn test_hosted_chat_plain_answer() {
    let (url, captured) = serve_once(
        200,
        json!({
            "choices": [
                { "index": 0, "message": { "role": "assistant", "content": "Canberra" }, "finish_reason": "stop" }
            ]
        }),
    )
    .await;

    let client = ChatCompletionClient::new(url, None);
    let request = ChatCompletionRequest::ask("capital of Australia?", "microsoft/phi-4", 64);

    let answers = execute_chat(&client, request, &McpHost::new()).await.unwrap();
    assert_eq!(answers, vec!["Canberra"]);
    assert!(captured.await.unwrap().body.get("tools").is_none());
}

#[tokio::test]
async fn test_error_status_is_api_error() {
    let (url, _captured) = serve_once(401, json!({ "error": "invalid key" })).await;

    let client = ChatCompletionClient::new(url, None);
    let request = ChatCompletionRequest::ask("hi", "microsoft/phi-4", 16);
    let err = client.complete(&request).await.unwrap_err();

    match err {
        ProviderError::Api { status, body, .. } => {
            assert_eq!(status, 401);
            assert!(body.contains("invalid key"));
        }
        other => panic!("unexpected error: {other}"),
    }
}
