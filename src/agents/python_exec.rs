//! Agent that answers questions by writing Python and running it in the sandbox.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, info};

use super::{Agent, ChatAgent, DEFAULT_MAX_ROUNDS};
use crate::{
    config::Config,
    llm::{ChatBackend, ChatOptions, LlmClient, ReasoningEffort},
    sandbox::DockerSandbox,
    tools::{PythonExecTool, Registry},
};

fn system_prompt(data_dir: &str) -> String {
    format!(
        "You are an expert Python programmer helping a user analyse a dataset.\n\
         The data files have been copied into an isolated container under {data_dir}; \
         always read them from there using absolute paths.\n\
         To answer a question, write a complete Python program and run it with the \
         execute_python_code tool. pandas and numpy are available. The tool returns only \
         what the program prints, so print every number, table or conclusion you rely on.\n\
         If the program fails, read the error, fix the code and run it again.\n\
         Finish with a concise answer to the question based on the printed output."
    )
}

pub struct PythonExecAgent {
    chat: ChatAgent,
}

impl PythonExecAgent {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        model_name: &str,
        reasoning_effort: ReasoningEffort,
        tool: PythonExecTool,
        sandbox_data_dir: &str,
    ) -> Self {
        let mut options = ChatOptions::new(model_name);
        options.reasoning_effort = Some(reasoning_effort);
        let chat = ChatAgent::new(
            backend,
            system_prompt(sandbox_data_dir),
            options,
            Registry::new().with(tool),
        );
        Self { chat }
    }

    pub fn from_config(cfg: &Config, model_name: &str, reasoning_effort: ReasoningEffort) -> Result<Self> {
        let backend = Arc::new(LlmClient::from_config(cfg)?);
        let sandbox = Arc::new(DockerSandbox::from_config(cfg));
        let data_dir = sandbox.data_dir().to_string();
        debug!(model = model_name, %reasoning_effort, container = sandbox.container(), "python exec agent ready");

        let agent = Self::new(backend, model_name, reasoning_effort, PythonExecTool::new(sandbox), &data_dir);
        Ok(Self {
            chat: agent
                .chat
                .with_max_rounds(cfg.get_usize("MAX_TOOL_ROUNDS").unwrap_or(DEFAULT_MAX_ROUNDS)),
        })
    }

    pub fn chat(&self) -> &ChatAgent {
        &self.chat
    }
}

#[async_trait]
impl Agent for PythonExecAgent {
    fn add_context(&mut self, text: &str) {
        self.chat.add_context(text);
    }

    async fn task(&mut self, prompt: &str) -> Result<String> {
        info!(model = %self.chat.options().model, "python exec agent answering question");
        self.chat.ask(prompt).await
    }

    async fn cleanup(&mut self) -> Result<()> {
        debug!(messages = self.chat.messages().len(), "python exec agent cleanup");
        self.chat.reset();
        Ok(())
    }
}
