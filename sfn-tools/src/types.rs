//! Wire types shared with LLM tool-calling APIs.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// The only tool kind understood by completion endpoints.
pub const FUNCTION_TOOL_TYPE: &str = "function";

/// Tool description sent in requests and returned by the model in responses.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolCall {
    /// Call identifier; present in responses only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Tool kind, always [`FUNCTION_TOOL_TYPE`].
    #[serde(rename = "type")]
    pub kind: String,
    /// Function description or invocation.
    pub function: Function,
}

impl ToolCall {
    /// Wraps a function into a `"function"` tool.
    #[must_use]
    pub fn function(function: Function) -> Self {
        Self {
            id: None,
            kind: FUNCTION_TOOL_TYPE.to_owned(),
            function,
        }
    }

    /// Returns `true` when the tool kind is `"function"`.
    #[must_use]
    pub fn is_function(&self) -> bool {
        self.kind == FUNCTION_TOOL_TYPE
    }
}

/// Function metadata, with arguments populated on model-produced calls.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Function {
    /// Function name.
    pub name: String,
    /// Human-readable description shown to the model.
    #[serde(default)]
    pub description: String,
    /// Parameter schema; absent when no schema could be derived.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<FunctionParameters>,
    /// JSON-encoded arguments chosen by the model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
}

impl Function {
    /// Creates a function description without parameters.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: None,
            arguments: None,
        }
    }

    /// Attaches a parameter schema.
    #[must_use]
    pub fn with_parameters(mut self, parameters: Option<FunctionParameters>) -> Self {
        self.parameters = parameters;
        self
    }

    /// Decodes the model-produced arguments into the requested shape.
    ///
    /// Missing arguments decode as an empty JSON object.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`serde_json::Error`] when the arguments do not
    /// match `T`.
    pub fn parse_arguments<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_str(self.arguments.as_deref().unwrap_or("{}"))
    }
}

/// Parameters accepted by a function, described as a JSON Schema object.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct FunctionParameters {
    /// Schema type of the parameter object, normally `"object"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Properties keyed by field name.
    pub properties: BTreeMap<String, ParameterProperty>,
    /// Names of the non-optional properties.
    #[serde(default)]
    pub required: Vec<String>,
}

/// A single parameter property.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParameterProperty {
    /// JSON Schema primitive type name.
    #[serde(rename = "type")]
    pub kind: String,
    /// Field documentation, empty when undocumented.
    #[serde(default)]
    pub description: String,
    /// Allowed string values, when the field declares an enumeration.
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
}
