//! Function descriptors and their renderings.
//!
//! A [`FunctionInfo`] describes something the model may call: a name, a
//! description, and ordered typed parameters. It renders three ways:
//!
//! - [`FunctionInfo::to_tool_def`]: the JSON Schema tool definition sent
//!   with a request.
//! - [`FunctionInfo::render`]: a natural-language clause kept in a compacted
//!   turn so the model remembers what was asked of it.
//! - [`describe_call`]: an account of the call the model actually made,
//!   recorded in place of the raw arguments.
//!
//! Parameter order is always insertion order, never sorted.

use crate::error::{ContextError, ServiceError};
use crate::ToolDef;
use serde_json::{Map, Value, json};
use std::fmt;
use std::str::FromStr;

/// Element type of an array parameter. Only strings are supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    String,
}

/// Type of a function parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    String,
    Int,
    Boolean,
    Array(ElementType),
}

impl ParamType {
    /// JSON Schema type name.
    pub fn schema_name(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Int => "integer",
            ParamType::Boolean => "boolean",
            ParamType::Array(_) => "array",
        }
    }

    /// Leading phrase used by [`FunctionInfo::render`].
    fn phrase(&self) -> &'static str {
        match self {
            ParamType::String => "a string of",
            ParamType::Int => "a number representing",
            ParamType::Boolean => "a boolean indicating",
            ParamType::Array(ElementType::String) => "an array of strings:",
        }
    }
}

impl FromStr for ParamType {
    type Err = ContextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "string" => Ok(ParamType::String),
            "int" | "integer" => Ok(ParamType::Int),
            "boolean" | "bool" => Ok(ParamType::Boolean),
            // Array elements are fixed to strings.
            "array" => Ok(ParamType::Array(ElementType::String)),
            other => Err(ContextError::Configuration(format!(
                "unknown parameter type '{other}' (expected string, int, boolean, or array)"
            ))),
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.schema_name())
    }
}

/// One declared parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSpec {
    pub name: String,
    pub param_type: ParamType,
    pub description: String,
    pub required: bool,
}

/// Description of a callable function. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionInfo {
    name: String,
    description: String,
    parameters: Vec<ParameterSpec>,
}

impl FunctionInfo {
    /// Build from `(name, type, description, required)` entries.
    ///
    /// Fails with [`ContextError::Configuration`] on an empty function name,
    /// an empty or duplicate parameter name, or an unknown type name.
    pub fn build<N, T, D>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameter_list: impl IntoIterator<Item = (N, T, D, bool)>,
    ) -> Result<Self, ContextError>
    where
        N: Into<String>,
        T: AsRef<str>,
        D: Into<String>,
    {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ContextError::Configuration(
                "function name must not be empty".into(),
            ));
        }

        let mut parameters: Vec<ParameterSpec> = Vec::new();
        for (param_name, param_type, param_description, required) in parameter_list {
            let param_name = param_name.into();
            if param_name.trim().is_empty() {
                return Err(ContextError::Configuration(format!(
                    "function '{name}' has a parameter with an empty name"
                )));
            }
            if parameters.iter().any(|p| p.name == param_name) {
                return Err(ContextError::Configuration(format!(
                    "function '{name}' declares parameter '{param_name}' twice"
                )));
            }
            parameters.push(ParameterSpec {
                param_type: param_type.as_ref().parse()?,
                name: param_name,
                description: param_description.into(),
                required,
            });
        }

        Ok(Self {
            name,
            description: description.into(),
            parameters,
        })
    }

    /// Start a builder. Equivalent to [`FunctionInfo::build`] one parameter at a time.
    pub fn builder(name: impl Into<String>) -> FunctionInfoBuilder {
        FunctionInfoBuilder {
            name: name.into(),
            description: String::new(),
            parameters: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn parameters(&self) -> &[ParameterSpec] {
        &self.parameters
    }

    /// Names of required parameters, in declaration order.
    pub fn required(&self) -> Vec<&str> {
        self.parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect()
    }

    /// JSON Schema object for the parameters.
    pub fn schema(&self) -> Value {
        let mut properties = Map::new();
        for param in &self.parameters {
            let mut prop = Map::new();
            prop.insert("type".into(), json!(param.param_type.schema_name()));
            prop.insert("description".into(), json!(param.description));
            if let ParamType::Array(ElementType::String) = param.param_type {
                prop.insert("items".into(), json!({"type": "string"}));
            }
            properties.insert(param.name.clone(), Value::Object(prop));
        }
        json!({
            "type": "object",
            "properties": properties,
            "required": self.required(),
        })
    }

    /// Convert to the tool definition sent to the API.
    pub fn to_tool_def(&self) -> ToolDef {
        ToolDef::new(self.name.clone(), self.description.clone(), self.schema())
    }

    /// Natural-language clause describing the function and its parameters.
    pub fn render(&self) -> String {
        let mut out = format!("The message requested the function '{}'", self.name);
        if self.description.is_empty() {
            out.push('.');
        } else {
            out.push_str(&format!(" ({}).", self.description));
        }

        if self.parameters.is_empty() {
            out.push_str(" It takes no parameters.");
            return out;
        }

        let clauses: Vec<String> = self
            .parameters
            .iter()
            .map(|p| {
                let mut clause = format!("'{}' is {} {}", p.name, p.param_type.phrase(), p.description);
                if p.required {
                    clause.push_str(" (required)");
                }
                clause
            })
            .collect();
        out.push_str(&format!(" Parameters: {}.", clauses.join("; ")));
        out
    }
}

/// Builder for [`FunctionInfo`]. Errors surface from [`build()`](Self::build).
pub struct FunctionInfoBuilder {
    name: String,
    description: String,
    parameters: Vec<(String, String, String, bool)>,
}

impl FunctionInfoBuilder {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn param(
        mut self,
        name: impl Into<String>,
        param_type: impl Into<String>,
        description: impl Into<String>,
        required: bool,
    ) -> Self {
        self.parameters
            .push((name.into(), param_type.into(), description.into(), required));
        self
    }

    pub fn build(self) -> Result<FunctionInfo, ContextError> {
        FunctionInfo::build(self.name, self.description, self.parameters)
    }
}

// ── Function calls ─────────────────────────────────────────────────

/// Parse function-call arguments into an ordered JSON object.
///
/// Empty or whitespace-only input is an empty argument set. Anything that is
/// not a JSON object is a [`ServiceError::MalformedResponse`].
pub fn parse_arguments(raw: &str) -> Result<Map<String, Value>, ServiceError> {
    if raw.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(ServiceError::MalformedResponse(format!(
            "function arguments are not a JSON object: {other}"
        ))),
        Err(e) => Err(ServiceError::MalformedResponse(format!(
            "function arguments are not valid JSON: {e}"
        ))),
    }
}

/// Describe a function call from its raw JSON arguments.
pub fn describe_call(name: &str, arguments_json: &str) -> Result<String, ServiceError> {
    Ok(describe_arguments(name, &parse_arguments(arguments_json)?))
}

/// Describe a function call from already-parsed arguments, in service order.
pub fn describe_arguments(name: &str, arguments: &Map<String, Value>) -> String {
    if arguments.is_empty() {
        return format!(
            "The model attempted to call the function '{name}' but did not provide any parameters."
        );
    }

    let mut out =
        format!("The model returned function parameters for the requested function '{name}'.");
    for (param, value) in arguments {
        let text = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        out.push_str(&format!(
            " For parameter '{param}', the model generated '{text}'."
        ));
    }
    out
}
