//! Native tools exposed to the model and the registry that dispatches them.

use std::collections::BTreeMap;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;

use crate::llm::{FunctionSchema, ToolSchema};

pub mod file_access;
pub mod python_exec;

pub use file_access::FileAccessTool;
pub use python_exec::PythonExecTool;

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    /// JSON schema of the arguments object.
    fn parameters(&self) -> serde_json::Value;
    async fn call(&self, args: serde_json::Value) -> Result<String>;
}

#[derive(Default)]
pub struct Registry {
    tools: BTreeMap<String, Box<dyn Tool>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, tool: impl Tool + 'static) -> Self {
        self.register(tool);
        self
    }

    pub fn register(&mut self, tool: impl Tool + 'static) {
        self.tools.insert(tool.name().to_string(), Box::new(tool));
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.tools
            .values()
            .map(|t| ToolSchema {
                r#type: "function".into(),
                function: FunctionSchema {
                    name: t.name().to_string(),
                    description: Some(t.description().to_string()),
                    parameters: t.parameters(),
                },
            })
            .collect()
    }

    pub async fn execute(&self, name: &str, args_json: &str) -> Result<String> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| anyhow!("tool not found: {}", name))?;
        let args = if args_json.trim().is_empty() {
            serde_json::Value::Object(Default::default())
        } else {
            serde_json::from_str(args_json)
                .with_context(|| format!("invalid tool args json: {}", args_json))?
        };
        tool.call(args).await
    }
}

/// Pull a required string argument out of a tool call.
pub(crate) fn string_arg<'a>(args: &'a serde_json::Value, key: &str) -> Result<&'a str> {
    args.get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow!("missing string argument: {}", key))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl Tool for Echo {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echo the text argument."
        }
        fn parameters(&self) -> serde_json::Value {
            serde_json::json!({
                "type": "object",
                "properties": { "text": {"type": "string"} },
                "required": ["text"]
            })
        }
        async fn call(&self, args: serde_json::Value) -> Result<String> {
            Ok(string_arg(&args, "text")?.to_uppercase())
        }
    }

    #[test]
    fn schemas_describe_registered_tools() {
        let reg = Registry::new().with(Echo);
        let schemas = reg.schemas();
        assert_eq!(schemas.len(), 1);
        assert_eq!(schemas[0].r#type, "function");
        assert_eq!(schemas[0].function.name, "echo");
        assert_eq!(schemas[0].function.parameters["required"][0], "text");
    }

    #[tokio::test]
    async fn execute_dispatches_by_name() {
        let reg = Registry::new().with(Echo);
        assert_eq!(reg.execute("echo", r#"{"text":"hi"}"#).await.unwrap(), "HI");
    }

    #[tokio::test]
    async fn execute_rejects_unknown_tools_and_bad_args() {
        let reg = Registry::new().with(Echo);
        let err = reg.execute("nope", "{}").await.unwrap_err();
        assert!(err.to_string().contains("tool not found"));
        assert!(reg.execute("echo", "{not json").await.is_err());
        let err = reg.execute("echo", "").await.unwrap_err();
        assert!(err.to_string().contains("missing string argument: text"));
    }
}
