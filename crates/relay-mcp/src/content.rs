//! Helpers for reading SDK results
//!
//! Tool results are read through the SDK's content accessors. Prompt and
//! resource results are read from their wire JSON, which is what the MCP
//! specification pins down.

use relay_types::McpPromptHelper;
use rmcp::model::{CallToolResult, GetPromptResult, ReadResourceResult};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::Result;

/// Build an SDK request/record from its wire JSON
pub(crate) fn from_wire<T: DeserializeOwned>(value: Value) -> Result<T> {
    Ok(serde_json::from_value(value)?)
}

/// Convert tool result content to a JSON value
///
/// Text items holding JSON are parsed, other text stays a string. A single
/// item is returned as-is, several as an array, none as `null`.
#[must_use]
pub fn tool_output(result: &CallToolResult) -> Value {
    let mut values: Vec<Value> = result
        .content
        .iter()
        .filter_map(|content| content.as_text())
        .map(|text| {
            serde_json::from_str(&text.text)
                .unwrap_or_else(|_| Value::String(text.text.clone()))
        })
        .collect();

    match values.len() {
        0 => Value::Null,
        1 => values.pop().unwrap_or(Value::Null),
        _ => Value::Array(values),
    }
}

/// First text item of a tool result
#[must_use]
pub fn tool_text(result: &CallToolResult) -> Option<String> {
    result
        .content
        .iter()
        .find_map(|content| content.as_text().map(|text| text.text.clone()))
}

/// Every text item of a tool result, in order
#[must_use]
pub fn tool_texts(result: &CallToolResult) -> Vec<String> {
    result
        .content
        .iter()
        .filter_map(|content| content.as_text().map(|text| text.text.clone()))
        .collect()
}

/// Whether the server flagged the tool result as an error
#[must_use]
pub fn tool_failed(result: &CallToolResult) -> bool {
    result.is_error.unwrap_or(false)
}

/// Text of every prompt message, in order
#[must_use]
pub fn prompt_texts(result: &GetPromptResult) -> Vec<String> {
    let Ok(value) = serde_json::to_value(result) else {
        return Vec::new();
    };
    value["messages"]
        .as_array()
        .map(|messages| {
            messages
                .iter()
                .filter_map(|m| m["content"]["text"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// Keep a fetched prompt under `name`, its messages joined by newlines
#[must_use]
pub fn prompt_helper(name: &str, result: &GetPromptResult) -> McpPromptHelper {
    McpPromptHelper {
        name: name.to_string(),
        prompt: prompt_texts(result).join("\n"),
    }
}

/// Text of every text resource content, in order
#[must_use]
pub fn resource_texts(result: &ReadResourceResult) -> Vec<String> {
    let Ok(value) = serde_json::to_value(result) else {
        return Vec::new();
    };
    value["contents"]
        .as_array()
        .map(|contents| {
            contents
                .iter()
                .filter_map(|c| c["text"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
