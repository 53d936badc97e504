//! Tools the model may call while generating an answer.
//!
//! A tool is a named, described, side-effect-free function with a JSON-schema
//! parameter list. The catalog handed to a [`crate::services::ChatService`] is
//! fixed when the service is built; the model decides what to call.

mod information_desk;

use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

pub use information_desk::InformationDesk;

/// What the backend is told about a tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments object
    pub parameters: Value,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
}

pub trait Tool: Send + Sync {
    fn declaration(&self) -> ToolDeclaration;

    fn invoke(&self, arguments: &Value) -> Result<Value, ToolError>;
}

type ToolHandler = dyn Fn(&Value) -> Result<Value, ToolError> + Send + Sync;

/// Closure-backed tool, for registering functions without a dedicated type.
#[derive(Clone)]
pub struct FnTool {
    declaration: ToolDeclaration,
    handler: Arc<ToolHandler>,
}

impl FnTool {
    pub fn new<F>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
        handler: F,
    ) -> Self
    where
        F: Fn(&Value) -> Result<Value, ToolError> + Send + Sync + 'static,
    {
        Self {
            declaration: ToolDeclaration {
                name: name.into(),
                description: description.into(),
                parameters,
            },
            handler: Arc::new(handler),
        }
    }

    /// Tool without parameters.
    pub fn nullary<F>(name: impl Into<String>, description: impl Into<String>, handler: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        Self::new(
            name,
            description,
            serde_json::json!({ "type": "object", "properties": {} }),
            move |_| Ok(handler()),
        )
    }
}

impl fmt::Debug for FnTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTool")
            .field("name", &self.declaration.name)
            .finish()
    }
}

impl Tool for FnTool {
    fn declaration(&self) -> ToolDeclaration {
        self.declaration.clone()
    }

    fn invoke(&self, arguments: &Value) -> Result<Value, ToolError> {
        (self.handler)(arguments)
    }
}

/// Named tools in registration order.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    order: Vec<String>,
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool; a tool with the same name is replaced in place.
    pub fn register(&mut self, tool: impl Tool + 'static) -> &mut Self {
        let name = tool.declaration().name;
        if self.tools.insert(name.clone(), Arc::new(tool)).is_none() {
            self.order.push(name);
        }
        self
    }

    pub fn declarations(&self) -> Vec<ToolDeclaration> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| tool.declaration())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn call(&self, name: &str, arguments: &Value) -> Result<Value, ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        tool.invoke(arguments)
    }

    /// Execute a model-issued call and render the result for the model.
    /// Failures are reported as text so the model can recover.
    pub fn invoke(&self, name: &str, raw_arguments: &str) -> String {
        let arguments = if raw_arguments.trim().is_empty() {
            Value::Object(Default::default())
        } else {
            match serde_json::from_str::<Value>(raw_arguments) {
                Ok(value) => value,
                Err(e) => {
                    warn!("Tool {} called with malformed arguments: {}", name, e);
                    return format!("Error: {}", ToolError::InvalidArguments(e.to_string()));
                }
            }
        };

        match self.call(name, &arguments) {
            Ok(result) => {
                debug!("Tool {} returned {}", name, result);
                result.to_string()
            }
            Err(e) => {
                warn!("Tool {} failed: {}", name, e);
                format!("Error: {}", e)
            }
        }
    }
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.order)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn echo_tool() -> FnTool {
        FnTool::new(
            "echo",
            "Echo the text argument",
            json!({
                "type": "object",
                "properties": { "text": { "type": "string" } },
                "required": ["text"]
            }),
            |args| {
                args.get("text")
                    .cloned()
                    .ok_or_else(|| ToolError::InvalidArguments("text is required".to_string()))
            },
        )
    }

    #[test]
    fn test_register_and_declare_in_order() {
        let mut registry = ToolRegistry::new();
        registry
            .register(FnTool::nullary("b", "second", || json!("b")))
            .register(echo_tool());

        let names: Vec<String> = registry.declarations().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["b", "echo"]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_reregister_replaces_without_duplicating() {
        let mut registry = ToolRegistry::new();
        registry.register(FnTool::nullary("t", "old", || json!(1)));
        registry.register(FnTool::nullary("t", "new", || json!(2)));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.declarations()[0].description, "new");
        assert_eq!(registry.invoke("t", ""), "2");
    }

    #[test]
    fn test_invoke_renders_json() {
        let mut registry = ToolRegistry::new();
        registry.register(echo_tool());
        assert_eq!(registry.invoke("echo", r#"{"text":"hi"}"#), "\"hi\"");
    }

    #[test]
    fn test_invoke_reports_failures_as_text() {
        let mut registry = ToolRegistry::new();
        registry.register(echo_tool());

        assert_eq!(registry.invoke("missing", "{}"), "Error: unknown tool 'missing'");
        assert!(registry.invoke("echo", "{not json").starts_with("Error: invalid arguments"));
        assert_eq!(registry.invoke("echo", "{}"), "Error: invalid arguments: text is required");
    }
}
