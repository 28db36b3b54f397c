//! MCP tool definition value object.

use super::McpDomainError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Metadata for a tool exposed by an MCP server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpToolDefinition {
    name: String,
    description: String,
    input_schema: Value,
    output_schema: Option<Value>,
}

/// Tool entry as it appears in a `tools/list` result.
#[derive(Debug, Deserialize)]
struct WireTool {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(rename = "inputSchema", default)]
    input_schema: Option<Value>,
    #[serde(rename = "outputSchema", default)]
    output_schema: Option<Value>,
}

impl McpToolDefinition {
    /// Creates a tool definition.
    ///
    /// # Errors
    ///
    /// Returns [`McpDomainError::EmptyToolName`] when the name is blank.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
    ) -> Result<Self, McpDomainError> {
        let normalized_name = name.into().trim().to_owned();
        if normalized_name.is_empty() {
            return Err(McpDomainError::EmptyToolName);
        }

        Ok(Self {
            name: normalized_name,
            description: description.into().trim().to_owned(),
            input_schema,
            output_schema: None,
        })
    }

    /// Parses one entry of a `tools/list` result.
    ///
    /// A missing input schema defaults to an empty object schema.
    ///
    /// # Errors
    ///
    /// Returns [`McpDomainError::MalformedTool`] when the entry is not a
    /// tool object, or [`McpDomainError::EmptyToolName`].
    pub fn from_wire(value: Value) -> Result<Self, McpDomainError> {
        let wire: WireTool = serde_json::from_value(value)
            .map_err(|err| McpDomainError::MalformedTool(err.to_string()))?;
        let input_schema = wire
            .input_schema
            .unwrap_or_else(|| serde_json::json!({ "type": "object" }));
        let definition = Self::new(wire.name, wire.description.unwrap_or_default(), input_schema)?;
        Ok(match wire.output_schema {
            Some(schema) => definition.with_output_schema(schema),
            None => definition,
        })
    }

    /// Sets an optional output schema.
    #[must_use]
    pub fn with_output_schema(mut self, output_schema: Value) -> Self {
        self.output_schema = Some(output_schema);
        self
    }

    /// Returns the tool name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the tool description, possibly empty.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the input schema.
    #[must_use]
    pub const fn input_schema(&self) -> &Value {
        &self.input_schema
    }

    /// Returns the optional output schema.
    #[must_use]
    pub const fn output_schema(&self) -> Option<&Value> {
        self.output_schema.as_ref()
    }
}
