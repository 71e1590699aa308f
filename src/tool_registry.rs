use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    NotFound(String),
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("{0}")]
    Execution(String),
}

/// The boundary between the dispatch layer and tool implementations.
///
/// Calls are synchronous; arguments are passed through without schema validation.
pub trait ToolRegistry: Send + Sync {
    fn list_tools(&self) -> Vec<ToolDescriptor>;

    fn call_tool(&self, name: &str, arguments: &Map<String, Value>) -> Result<Value, ToolError>;
}

type ToolHandlerFn = Box<dyn Fn(&Map<String, Value>) -> Result<Value, ToolError> + Send + Sync>;

struct RegisteredTool {
    descriptor: ToolDescriptor,
    handler: ToolHandlerFn,
}

/// Registry populated once at startup. Listing order is registration order.
#[derive(Default)]
pub struct StaticToolRegistry {
    tools: IndexMap<String, RegisteredTool>,
}

impl StaticToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(mut self, descriptor: ToolDescriptor, handler: F) -> Self
    where
        F: Fn(&Map<String, Value>) -> Result<Value, ToolError> + Send + Sync + 'static,
    {
        self.tools.insert(
            descriptor.name.clone(),
            RegisteredTool {
                descriptor,
                handler: Box::new(handler),
            },
        );
        self
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl ToolRegistry for StaticToolRegistry {
    fn list_tools(&self) -> Vec<ToolDescriptor> {
        self.tools
            .values()
            .map(|tool| tool.descriptor.clone())
            .collect()
    }

    fn call_tool(&self, name: &str, arguments: &Map<String, Value>) -> Result<Value, ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;

        (tool.handler)(arguments)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn descriptor(name: &str) -> ToolDescriptor {
        ToolDescriptor {
            name: name.to_string(),
            description: format!("{name} tool"),
            input_schema: json!({"type": "object"}),
        }
    }

    #[test]
    fn lists_in_registration_order() {
        let registry = StaticToolRegistry::new()
            .register(descriptor("zeta"), |_| Ok(json!(1)))
            .register(descriptor("alpha"), |_| Ok(json!(2)))
            .register(descriptor("mid"), |_| Ok(json!(3)));

        let first: Vec<_> = registry.list_tools().into_iter().map(|t| t.name).collect();
        let second: Vec<_> = registry.list_tools().into_iter().map(|t| t.name).collect();

        assert_eq!(first, vec!["zeta", "alpha", "mid"]);
        assert_eq!(first, second);
    }

    #[test]
    fn unknown_tool_is_not_found() {
        let registry = StaticToolRegistry::new().register(descriptor("echo"), |args| {
            Ok(Value::Object(args.clone()))
        });

        let err = registry
            .call_tool("missing", &Map::new())
            .expect_err("unknown tool");

        assert!(matches!(err, ToolError::NotFound(ref name) if name == "missing"));
        assert_eq!(err.to_string(), "Unknown tool: missing");
    }

    #[test]
    fn passes_arguments_through() {
        let registry = StaticToolRegistry::new().register(descriptor("echo"), |args| {
            Ok(Value::Object(args.clone()))
        });
        let mut args = Map::new();
        args.insert("anything".to_string(), json!([1, 2]));

        let result = registry.call_tool("echo", &args).expect("echo");
        assert_eq!(result, json!({"anything": [1, 2]}));
    }

    #[test]
    fn descriptor_uses_camel_case_schema_key() {
        let value = serde_json::to_value(descriptor("echo")).expect("serialize");
        assert!(value.get("inputSchema").is_some());
    }
}
