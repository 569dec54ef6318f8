//! Reqwest-based LLM client for OpenAI-compatible Chat Completions with tool calls.

use std::{fmt, str::FromStr, time::Duration};

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self { role, content: content.into(), tool_calls: None, tool_call_id: None }
    }

    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_calls: None,
            tool_call_id: Some(call_id.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSchema {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub parameters: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    #[serde(rename = "type")]
    pub r#type: String, // must be "function"
    pub function: FunctionSchema,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub r#type: String, // "function"
    pub function: FunctionCall,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: String,
}

/// How long a reasoning model may think before answering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    Low,
    Medium,
    High,
}

impl fmt::Display for ReasoningEffort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReasoningEffort::Low => "low",
            ReasoningEffort::Medium => "medium",
            ReasoningEffort::High => "high",
        };
        f.write_str(s)
    }
}

impl FromStr for ReasoningEffort {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(anyhow!("unknown reasoning effort: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatOptions {
    pub model: String,
    pub reasoning_effort: Option<ReasoningEffort>,
    pub tools: Option<Vec<ToolSchema>>,
    pub tool_choice: Option<String>, // e.g., "auto"
}

impl ChatOptions {
    pub fn new(model: impl Into<String>) -> Self {
        Self { model: model.into(), reasoning_effort: None, tools: None, tool_choice: None }
    }
}

/// The assistant turn returned by one completion request.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AssistantReply {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
}

impl AssistantReply {
    pub fn into_message(self) -> ChatMessage {
        ChatMessage {
            role: Role::Assistant,
            content: self.content,
            tool_calls: if self.tool_calls.is_empty() { None } else { Some(self.tool_calls) },
            tool_call_id: None,
        }
    }
}

/// Anything that can turn a conversation into the next assistant turn.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage], opts: &ChatOptions) -> Result<AssistantReply>;
}

#[derive(Debug)]
pub struct LlmClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl LlmClient {
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let timeout = cfg.get_u64("REQUEST_TIMEOUT").unwrap_or(300);
        let api_base_url = cfg.get("API_BASE_URL").unwrap_or_else(|| "default".into());
        let base_url = normalize_base_url(&api_base_url);
        let api_key = cfg.get("OPENAI_API_KEY").filter(|k| !k.trim().is_empty());

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout))
            .build()?;

        Ok(Self { http, base_url, api_key })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl ChatBackend for LlmClient {
    async fn complete(&self, messages: &[ChatMessage], opts: &ChatOptions) -> Result<AssistantReply> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = &self.api_key {
            let hv = HeaderValue::from_str(&format!("Bearer {}", key))?;
            headers.insert(AUTHORIZATION, hv);
        }

        let body = request_body(messages, opts)?;
        debug!(model = %opts.model, messages = messages.len(), "sending chat completion request");

        let resp = self
            .http
            .post(url)
            .headers(headers)
            .json(&body)
            .send()
            .await
            .context("failed to send chat request")?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            bail!("LLM error: {} - {}", status, text);
        }

        let text = resp.text().await.context("failed to read chat response")?;
        parse_reply(&text)
    }
}

fn normalize_base_url(api_base_url: &str) -> String {
    if api_base_url == "default" {
        return "https://api.openai.com/v1".to_string();
    }
    let trimmed = api_base_url.trim_end_matches('/');
    if !trimmed.ends_with("/v1") && !trimmed.contains("/v1/") {
        format!("{}/v1", trimmed)
    } else {
        trimmed.to_string()
    }
}

fn request_body(messages: &[ChatMessage], opts: &ChatOptions) -> Result<serde_json::Value> {
    let mut body = serde_json::json!({
        "model": opts.model,
        "messages": messages,
    });

    if let Some(effort) = opts.reasoning_effort {
        body["reasoning_effort"] = serde_json::to_value(effort)?;
    }
    if let Some(tools) = opts.tools.as_ref().filter(|t| !t.is_empty()) {
        body["tools"] = serde_json::to_value(tools)?;
        if let Some(choice) = &opts.tool_choice {
            body["tool_choice"] = serde_json::json!(choice);
        }
    }
    Ok(body)
}

fn parse_reply(text: &str) -> Result<AssistantReply> {
    let completion: Completion =
        serde_json::from_str(text).context("malformed chat completion response")?;
    let choice = completion
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("chat completion returned no choices"))?;
    debug!(finish_reason = ?choice.finish_reason, "chat completion received");
    Ok(AssistantReply {
        content: choice.message.content.unwrap_or_default(),
        tool_calls: choice.message.tool_calls.unwrap_or_default(),
    })
}

#[derive(Debug, Deserialize)]
struct Completion {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ToolCall>>,
}
