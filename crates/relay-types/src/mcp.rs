//! MCP capability descriptors
//!
//! These records are what the relay hands around after discovery. They are
//! passthrough copies of the SDK records: field names follow the MCP wire
//! format, unknown fields are ignored.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Model context protocol tool
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpTool {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Input schema (JSON Schema object)
    #[serde(default)]
    pub input_schema: Value,
    /// Flattened view of `input_schema` used when publishing to a model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<McpToolParameters>,
}

impl McpTool {
    /// Create a tool descriptor, deriving `parameters` from the schema
    pub fn new(name: impl Into<String>, description: Option<String>, input_schema: Value) -> Self {
        let parameters = Some(McpToolParameters::from_schema(&input_schema));
        Self {
            name: name.into(),
            title: None,
            description,
            input_schema,
            parameters,
        }
    }

    /// Fill `parameters` from `input_schema` when it is missing
    pub fn ensure_parameters(&mut self) -> &mut McpToolParameters {
        let schema = &self.input_schema;
        self.parameters
            .get_or_insert_with(|| McpToolParameters::from_schema(schema))
    }
}

/// Model context protocol tool parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpToolParameters {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<bool>,
}

impl McpToolParameters {
    /// Read `type`, `properties`, `required` and `additionalProperties` from a JSON schema
    #[must_use]
    pub fn from_schema(schema: &Value) -> Self {
        let required = schema.get("required").and_then(Value::as_array).map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        });

        Self {
            kind: schema.get("type").and_then(Value::as_str).map(str::to_string),
            properties: schema.get("properties").cloned(),
            required,
            additional_properties: schema.get("additionalProperties").and_then(Value::as_bool),
        }
    }
}

/// Model context protocol prompt argument
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct McpPromptArgument {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
}

impl McpPromptArgument {
    /// A required argument with a description
    pub fn required(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: None,
            description: Some(description.into()),
            required: Some(true),
        }
    }
}

/// Model context protocol prompt
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct McpPrompt {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<McpPromptArgument>,
}

/// Model context protocol resource
///
/// `uri` holds either a concrete URI or a template such as
/// `users://{id}/profile`; templates arrive on the wire as `uriTemplate`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpResource {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(alias = "uriTemplate")]
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl McpResource {
    /// Whether `uri` contains template variables
    #[must_use]
    pub fn is_template(&self) -> bool {
        self.uri.contains('{')
    }
}

/// Named prompt text kept alongside a client or server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpPromptHelper {
    pub name: String,
    pub prompt: String,
}

/// A tool published to a model, tagged with the host entity that owns it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpFunctionTool {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub strict: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<McpToolParameters>,
}

impl McpFunctionTool {
    /// Publish a tool owned by the client registered under `client_id`
    pub fn for_client(client_id: impl Into<String>, tool: &McpTool) -> Self {
        let mut function = Self::from_tool(tool);
        function.client_id = Some(client_id.into());
        function
    }

    /// Publish a tool owned by the server registered under `server_id`
    pub fn for_server(server_id: impl Into<String>, tool: &McpTool) -> Self {
        let mut function = Self::from_tool(tool);
        function.server_id = Some(server_id.into());
        function
    }

    fn from_tool(tool: &McpTool) -> Self {
        Self {
            client_id: None,
            server_id: None,
            kind: "function".to_string(),
            name: tool.name.clone(),
            description: tool.description.clone(),
            strict: true,
            input_schema: Some(tool.input_schema.clone()),
            parameters: Some(
                tool.parameters
                    .clone()
                    .unwrap_or_else(|| McpToolParameters::from_schema(&tool.input_schema)),
            ),
        }
    }
}

/// A host query: what to ask and which provider/model to ask it with
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct McpItem {
    pub query: String,
    pub provider: String,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
}

impl McpItem {
    pub fn new(
        query: impl Into<String>,
        provider: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            query: query.into(),
            provider: provider.into(),
            model: model.into(),
            ..Self::default()
        }
    }
}
