//! `execute_python_code`: run model-generated Python inside the sandbox container.

use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use tracing::info;

use super::{string_arg, Tool};
use crate::sandbox::DockerSandbox;

pub struct PythonExecTool {
    sandbox: Arc<DockerSandbox>,
}

impl PythonExecTool {
    pub fn new(sandbox: Arc<DockerSandbox>) -> Self {
        Self { sandbox }
    }
}

#[async_trait]
impl Tool for PythonExecTool {
    fn name(&self) -> &str {
        "execute_python_code"
    }

    fn description(&self) -> &str {
        "Execute a Python program in an isolated container and return its exit code, \
         standard output and standard error. Print every result you need to see."
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "python_code": {
                    "type": "string",
                    "description": "A complete Python program to run"
                }
            },
            "required": ["python_code"],
            "additionalProperties": false
        })
    }

    async fn call(&self, args: serde_json::Value) -> Result<String> {
        let code = string_arg(&args, "python_code")?;
        if code.trim().is_empty() {
            bail!("python_code must not be empty");
        }
        let result = self.sandbox.run_python(code).await?;
        info!(
            exit_code = result.exit_code,
            timed_out = result.timed_out,
            "sandbox execution finished"
        );
        Ok(result.render())
    }
}
