//! Tool Registry
//!
//! Catalogue of reusable callables that step bodies can look up by name.
//! The engine only hands the registry through to steps; it never calls a
//! tool itself.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::{Error, Result};

/// Common trait for all tools
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool name
    fn name(&self) -> &str;

    /// Get a short human-readable description
    fn description(&self) -> &str;

    /// Invoke the tool with a JSON input
    async fn call(&self, input: Value) -> anyhow::Result<Value>;
}

#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under its own name, replacing any previous entry.
    pub fn register_tool(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        debug!("Registering tool: {}", name);
        if self.tools.contains_key(&name) {
            warn!("Overwriting existing tool '{}'", name);
        }
        self.tools.insert(name, tool);
    }

    pub fn get_tool(&self, name: &str) -> Result<Arc<dyn Tool>> {
        self.tools
            .get(name)
            .cloned()
            .ok_or_else(|| Error::ToolNotFound(name.to_string()))
    }

    pub fn list_tools(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn mock_tool(name: &'static str) -> MockTool {
        let mut tool = MockTool::new();
        tool.expect_name().return_const(name.to_string());
        tool.expect_description().return_const("mock".to_string());
        tool
    }

    #[tokio::test]
    async fn registered_tool_is_callable_by_name() {
        let mut tool = mock_tool("echo");
        tool.expect_call().returning(|input| Ok(input));

        let mut registry = ToolRegistry::new();
        registry.register_tool(Arc::new(tool));

        let echo = registry.get_tool("echo").unwrap();
        let out = echo.call(json!({"x": 1})).await.unwrap();
        assert_eq!(out, json!({"x": 1}));
    }

    #[test]
    fn missing_tool_is_an_error() {
        let registry = ToolRegistry::new();
        let err = registry.get_tool("nope").err().unwrap();
        assert!(matches!(err, Error::ToolNotFound(ref n) if n == "nope"));
        assert_eq!(err.to_string(), "Tool 'nope' is not registered");
    }

    #[test]
    fn overwrite_keeps_a_single_entry() {
        let mut registry = ToolRegistry::new();
        registry.register_tool(Arc::new(mock_tool("b")));
        registry.register_tool(Arc::new(mock_tool("a")));
        registry.register_tool(Arc::new(mock_tool("a")));
        assert_eq!(registry.list_tools(), vec!["a".to_string(), "b".to_string()]);
    }
}
