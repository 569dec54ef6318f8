//! Agent that inspects a dataset through `safe_file_access` and describes it.

use std::{path::Path, sync::Arc};

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, info};

use super::{Agent, ChatAgent, DEFAULT_MAX_ROUNDS};
use crate::{
    config::Config,
    llm::{ChatBackend, ChatOptions, LlmClient},
    sandbox::DockerSandbox,
    tools::{FileAccessTool, Registry},
};

const SYSTEM_PROMPT: &str = "You are a data analyst preparing a dataset for a colleague.\n\
Use the safe_file_access tool to open the file named in the request; pass only the bare file name.\n\
Then describe the file: its location in the sandbox, the columns and their apparent types, \
value ranges visible in the sample, the number of rows, and anything unusual such as missing values.\n\
Do not invent columns or values that the tool output does not show.";

pub struct FileAccessAgent {
    chat: ChatAgent,
}

impl FileAccessAgent {
    pub fn new(backend: Arc<dyn ChatBackend>, model: &str, tool: FileAccessTool) -> Self {
        let chat = ChatAgent::new(backend, SYSTEM_PROMPT, ChatOptions::new(model), Registry::new().with(tool));
        Self { chat }
    }

    pub fn from_config(cfg: &Config, data_dir: &Path) -> Result<Self> {
        let backend = Arc::new(LlmClient::from_config(cfg)?);
        let sandbox = Arc::new(DockerSandbox::from_config(cfg));
        let tool = FileAccessTool::new(data_dir, cfg.get_usize("CSV_PREVIEW_ROWS").unwrap_or(15))
            .with_sandbox(sandbox);
        let model = cfg.get("DEFAULT_MODEL").unwrap_or_else(|| "gpt-4o".into());
        debug!(%model, data_dir = %data_dir.display(), "file access agent ready");

        let agent = Self::new(backend, &model, tool);
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
impl Agent for FileAccessAgent {
    fn add_context(&mut self, text: &str) {
        self.chat.add_context(text);
    }

    async fn task(&mut self, prompt: &str) -> Result<String> {
        info!("file access agent reading dataset");
        self.chat.ask(prompt).await
    }

    async fn cleanup(&mut self) -> Result<()> {
        debug!(messages = self.chat.messages().len(), "file access agent cleanup");
        self.chat.reset();
        Ok(())
    }
}
