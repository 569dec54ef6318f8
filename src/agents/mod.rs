//! Language-model agents: the `Agent` contract used by the session and the tool-calling core.

use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Result};
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::{
    config::Config,
    llm::{ChatBackend, ChatMessage, ChatOptions, ReasoningEffort, Role},
    tools::Registry,
};

pub mod file_access;
pub mod python_exec;

pub use file_access::FileAccessAgent;
pub use python_exec::PythonExecAgent;

/// A stateful collaborator driven by the session loop.
#[async_trait]
pub trait Agent: Send {
    /// Append background text the agent should consider for every later task.
    fn add_context(&mut self, text: &str);

    async fn task(&mut self, prompt: &str) -> Result<String>;

    /// Release whatever the agent holds. Called once per constructed agent.
    async fn cleanup(&mut self) -> Result<()>;
}

/// Builds the two agents a session needs.
pub trait AgentFactory {
    type FileAgent: Agent;
    type ExecAgent: Agent;

    fn file_agent(&self) -> Result<Self::FileAgent>;
    fn exec_agent(&self, model: &str, reasoning_effort: ReasoningEffort) -> Result<Self::ExecAgent>;
}

/// Factory wired to the real LLM endpoint and Docker sandbox.
pub struct LiveAgents {
    cfg: Config,
    data_dir: PathBuf,
}

impl LiveAgents {
    pub fn new(cfg: Config, data_dir: impl Into<PathBuf>) -> Self {
        Self { cfg, data_dir: data_dir.into() }
    }
}

impl AgentFactory for LiveAgents {
    type FileAgent = FileAccessAgent;
    type ExecAgent = PythonExecAgent;

    fn file_agent(&self) -> Result<FileAccessAgent> {
        FileAccessAgent::from_config(&self.cfg, &self.data_dir)
    }

    fn exec_agent(&self, model: &str, reasoning_effort: ReasoningEffort) -> Result<PythonExecAgent> {
        PythonExecAgent::from_config(&self.cfg, model, reasoning_effort)
    }
}

pub const DEFAULT_MAX_ROUNDS: usize = 5;

/// Conversation state plus the model/tool round-trip shared by both agents.
pub struct ChatAgent {
    backend: Arc<dyn ChatBackend>,
    registry: Registry,
    options: ChatOptions,
    system_prompt: String,
    messages: Vec<ChatMessage>,
    max_rounds: usize,
}

impl ChatAgent {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        system_prompt: impl Into<String>,
        mut options: ChatOptions,
        registry: Registry,
    ) -> Self {
        if !registry.is_empty() {
            options.tools = Some(registry.schemas());
            options.tool_choice = Some("auto".into());
        }
        let system_prompt = system_prompt.into();
        Self {
            backend,
            registry,
            options,
            messages: vec![ChatMessage::new(Role::System, system_prompt.clone())],
            system_prompt,
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }

    pub fn with_max_rounds(mut self, rounds: usize) -> Self {
        self.max_rounds = rounds.max(1);
        self
    }

    pub fn options(&self) -> &ChatOptions {
        &self.options
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn add_context(&mut self, text: &str) {
        self.messages.push(ChatMessage::new(Role::User, text));
    }

    /// Drop everything but the system prompt.
    pub fn reset(&mut self) {
        self.messages.clear();
        self.messages.push(ChatMessage::new(Role::System, self.system_prompt.clone()));
    }

    /// Ask the model, executing requested tools until it answers in plain text.
    pub async fn ask(&mut self, prompt: &str) -> Result<String> {
        self.messages.push(ChatMessage::new(Role::User, prompt));

        for round in 1..=self.max_rounds {
            let reply = self.backend.complete(&self.messages, &self.options).await?;
            if reply.tool_calls.is_empty() {
                let answer = reply.content.clone();
                self.messages.push(reply.into_message());
                return Ok(answer);
            }

            debug!(round, calls = reply.tool_calls.len(), model = %self.options.model, "model requested tools");
            let calls = reply.tool_calls.clone();
            self.messages.push(reply.into_message());
            for call in calls {
                let result = match self
                    .registry
                    .execute(&call.function.name, &call.function.arguments)
                    .await
                {
                    Ok(out) => out,
                    Err(e) => {
                        warn!(tool = %call.function.name, error = %e, "tool call failed");
                        format!("tool error: {:#}", e)
                    }
                };
                self.messages.push(ChatMessage::tool_result(call.id, result));
            }
        }

        bail!(
            "model {} gave no final answer after {} tool rounds",
            self.options.model,
            self.max_rounds
        )
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::tools::Tool;

    struct Adder;

    #[async_trait]
    impl Tool for Adder {
        fn name(&self) -> &str {
            "add"
        }
        fn description(&self) -> &str {
            "Add a and b."
        }
        fn parameters(&self) -> serde_json::Value {
            serde_json::json!({"type": "object"})
        }
        async fn call(&self, args: serde_json::Value) -> Result<String> {
            let a = args["a"].as_i64().unwrap_or_default();
            let b = args["b"].as_i64().unwrap_or_default();
            if a < 0 {
                bail!("negative input");
            }
            Ok((a + b).to_string())
        }
    }

    fn agent(backend: Arc<ScriptedBackend>) -> ChatAgent {
        ChatAgent::new(backend, "system", ChatOptions::new("test-model"), Registry::new().with(Adder))
    }

    #[test]
    fn tools_are_advertised_when_registered() {
        let a = agent(ScriptedBackend::new(vec![]));
        assert_eq!(a.options().tool_choice.as_deref(), Some("auto"));
        assert_eq!(a.options().tools.as_ref().map(Vec::len), Some(1));

        let bare = ChatAgent::new(ScriptedBackend::new(vec![]), "s", ChatOptions::new("m"), Registry::new());
        assert!(bare.options().tools.is_none());
    }

    #[tokio::test]
    async fn plain_answer_needs_one_round() {
        let backend = ScriptedBackend::new(vec![text("hello")]);
        let mut a = agent(backend.clone());
        assert_eq!(a.ask("hi").await.unwrap(), "hello");
        let roles: Vec<Role> = a.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant]);
        assert_eq!(backend.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn tool_results_feed_the_next_round() {
        let backend = ScriptedBackend::new(vec![
            call("c1", "add", serde_json::json!({"a": 2, "b": 3})),
            text("the sum is 5"),
        ]);
        let mut a = agent(backend.clone());
        assert_eq!(a.ask("add 2 and 3").await.unwrap(), "the sum is 5");

        let seen = backend.seen.lock().unwrap();
        let second = &seen[1].0;
        let tool_msg = second.last().unwrap();
        assert_eq!(tool_msg.role, Role::Tool);
        assert_eq!(tool_msg.tool_call_id.as_deref(), Some("c1"));
        assert_eq!(tool_msg.content, "5");
        assert!(second[second.len() - 2].tool_calls.is_some());
    }

    #[tokio::test]
    async fn failing_tool_is_reported_to_the_model() {
        let backend = ScriptedBackend::new(vec![
            call("c1", "add", serde_json::json!({"a": -1, "b": 3})),
            call("c2", "missing_tool", serde_json::json!({})),
            text("could not compute"),
        ]);
        let mut a = agent(backend);
        assert_eq!(a.ask("add").await.unwrap(), "could not compute");
        let tool_msgs: Vec<&ChatMessage> =
            a.messages().iter().filter(|m| m.role == Role::Tool).collect();
        assert_eq!(tool_msgs.len(), 2);
        assert!(tool_msgs[0].content.starts_with("tool error: negative input"));
        assert!(tool_msgs[1].content.contains("tool not found"));
    }

    #[tokio::test]
    async fn round_budget_is_enforced() {
        let backend = ScriptedBackend::new(vec![
            call("c1", "add", serde_json::json!({"a": 1, "b": 1})),
            call("c2", "add", serde_json::json!({"a": 1, "b": 1})),
            text("never reached"),
        ]);
        let mut a = agent(backend).with_max_rounds(2);
        let err = a.ask("loop").await.unwrap_err();
        assert!(err.to_string().contains("no final answer after 2 tool rounds"));
    }

    #[tokio::test]
    async fn context_precedes_questions_and_reset_clears_it() {
        let backend = ScriptedBackend::new(vec![text("ok")]);
        let mut a = agent(backend.clone());
        a.add_context("first");
        a.add_context("second");
        a.ask("question").await.unwrap();

        let sent: Vec<String> = backend.seen.lock().unwrap()[0]
            .0
            .iter()
            .map(|m| m.content.clone())
            .collect();
        assert_eq!(sent, vec!["system", "first", "second", "question"]);

        a.reset();
        assert_eq!(a.messages().len(), 1);
        assert_eq!(a.messages()[0].role, Role::System);
    }
}
