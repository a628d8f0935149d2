//! Planner：组装 system prompt、调用 LLM、解析回复
//!
//! 回复契约为带 type 标签的 JSON（reply / function_call）；不以 `{` 或代码块开头的输出按纯文本回复处理。

use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::core::AgentError;
use crate::llm::{looks_structured, parse_structured, schema_json, LlmClient};
use crate::memory::{ConversationStore, Message};
use crate::tools::ToolRegistry;

/// LLM 的一次回复：直接回复用户，或调用函数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentReply {
    /// 直接回复用户
    Reply { content: String },
    /// 调用已注册的函数
    FunctionCall {
        name: String,
        #[serde(default)]
        arguments: serde_json::Value,
    },
}

/// 解析 LLM 输出：结构化输出按契约严格解析，否则视为纯文本回复
pub fn parse_llm_output(output: &str) -> Result<AgentReply, AgentError> {
    if looks_structured(output) {
        parse_structured(output)
    } else {
        Ok(AgentReply::Reply {
            content: output.trim().to_string(),
        })
    }
}

/// Planner：持有 LLM，plan(messages) 即一次完整请求
pub struct Planner {
    llm: Arc<dyn LlmClient>,
}

impl Planner {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// 获取 LLM 累计 token 使用统计
    pub fn token_usage(&self) -> (u64, u64, u64) {
        self.llm.token_usage()
    }

    pub async fn plan(&self, messages: &[Message]) -> Result<String, AgentError> {
        Ok(self.llm.complete(messages).await?)
    }

    /// 基础 prompt + 可用函数列表 + 回复格式 Schema
    pub fn system_prompt(base: &str, tools: &ToolRegistry) -> String {
        let mut s = String::from(base.trim());
        if !tools.is_empty() {
            s.push_str("\n\n## Available functions\n");
            s.push_str(&tools.to_schema_json());
        }
        s.push_str("\n\n## Reply format\nReply with one JSON object matching this schema:\n");
        s.push_str(&schema_json::<AgentReply>());
        s
    }

    /// 把 system prompt 固定到对话记忆里
    pub fn install_system_prompt(
        memory: &mut dyn ConversationStore,
        base: &str,
        tools: &ToolRegistry,
    ) {
        memory.set_system_message(Message::system(Self::system_prompt(base, tools)));
    }
}
