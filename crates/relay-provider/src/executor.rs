//! Query loop: let a model pick host function tools, then run them
//!
//! Failures never escape: they are folded into the outcome as `error: ...`
//! strings, either as the overall `result` or as single tool results.

use crate::chat_completion::{ChatCompletionClient, ChatCompletionRequest};
use crate::error::{ProviderError, Result};
use crate::responses::{FunctionCallRef, ResponsesBackend, ResponsesRequest};
use relay_mcp::McpHost;
use relay_types::{McpItem, Tool};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

/// Overall result when a tool produced output
pub const RESULT_SUCCESS: &str = "success";
/// Overall result when the model answered without tools
pub const RESULT_INFO: &str = "info";

/// Outcome of a query
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryOutcome {
    /// `success`, `info` or `error: ...`
    pub result: String,
    pub results: Vec<String>,
}

impl QueryOutcome {
    fn failed(error: &ProviderError, results: Vec<String>) -> Self {
        Self {
            result: format!("error: {error}"),
            results,
        }
    }

    /// Whether the query failed as a whole
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.result.starts_with("error:")
    }
}

/// Run `item` against the provider it names
///
/// `openai` answers items whose provider is `openai` (any case). Other
/// providers are not supported.
pub async fn execute_provider(
    item: &McpItem,
    host: &McpHost,
    openai: &dyn ResponsesBackend,
) -> QueryOutcome {
    if item.provider.eq_ignore_ascii_case("openai") {
        execute_query(openai, item, host).await
    } else {
        warn!("Provider '{}' is not supported", item.provider);
        QueryOutcome {
            result: "error: provider not supported".to_string(),
            results: vec!["error: no result".to_string()],
        }
    }
}

/// Ask the model with the host's function tools and run the tools it calls
///
/// When no tool produced output the query is asked again without tools and
/// the answer text becomes the single result.
pub async fn execute_query(
    backend: &dyn ResponsesBackend,
    item: &McpItem,
    host: &McpHost,
) -> QueryOutcome {
    let request = ResponsesRequest::for_item(item).with_tools(host.function_tools());
    debug!(
        "Querying '{}' with {} function tool(s)",
        item.model,
        request.tools.len()
    );

    let response = match backend.create(&request).await {
        Ok(response) => response,
        Err(e) => return QueryOutcome::failed(&e, Vec::new()),
    };

    let mut results = Vec::new();
    for call in response.function_calls() {
        results.extend(run_function_call(host, call).await);
    }

    if !results.is_empty() {
        info!("Query answered by {} tool result(s)", results.len());
        return QueryOutcome {
            result: RESULT_SUCCESS.to_string(),
            results,
        };
    }

    let answer = match backend.create(&ResponsesRequest::for_item(item)).await {
        Ok(answer) => answer,
        Err(e) => return QueryOutcome::failed(&e, results),
    };

    let text = answer.output_text();
    results.push(if text.is_empty() {
        "error: no response".to_string()
    } else {
        text
    });
    QueryOutcome {
        result: RESULT_INFO.to_string(),
        results,
    }
}

/// Ask a hosted chat endpoint with the host's function tools
///
/// Returns the text of every tool the model called, or the answer text when
/// it called none. Unlike [`execute_query`] failures are returned as errors.
///
/// # Errors
/// Returns an error when the endpoint fails or answers without a choice,
/// when tool arguments are not JSON, or when a called tool fails
pub async fn execute_chat(
    client: &ChatCompletionClient,
    mut request: ChatCompletionRequest,
    host: &McpHost,
) -> Result<Vec<String>> {
    if !host.function_tools().is_empty() {
        request.tools = Some(
            host.function_tools()
                .iter()
                .map(Tool::from_function_tool)
                .collect(),
        );
    }

    let completion = client
        .complete(&request)
        .await?
        .into_completion()
        .ok_or_else(|| ProviderError::InvalidResponse {
            provider: "chat completion".to_string(),
            reason: "no choices".to_string(),
        })?;

    if !completion.has_tool_calls() {
        debug!("Chat finished with '{}'", completion.finish_reason);
        return Ok(completion.content.into_iter().collect());
    }

    let mut results = Vec::new();
    for call in &completion.tool_calls {
        let args: Value = call.parse_args()?;
        info!("Model called '{}'", call.function.name);
        results.extend(host.call_function_tool(&call.function.name, args).await?);
    }
    Ok(results)
}

/// Results of one `function_call`; empty when no host tool has that name
async fn run_function_call(host: &McpHost, call: FunctionCallRef<'_>) -> Option<String> {
    if host.find_function_tool(call.name).is_none() {
        debug!("Model called unknown function '{}'", call.name);
        return None;
    }

    let args: Value = match serde_json::from_str(call.arguments) {
        Ok(args) => args,
        Err(e) => return Some(format!("error: {e}")),
    };

    match host.call_function_tool(call.name, args).await {
        Ok(texts) => Some(
            texts
                .into_iter()
                .next()
                .unwrap_or_else(|| "error: no content".to_string()),
        ),
        Err(e) => {
            warn!("Function '{}' failed: {}", call.name, e);
            Some(format!("error: {e}"))
        }
    }
}
