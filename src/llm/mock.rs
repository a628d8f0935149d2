//! Mock / Scripted LLM 客户端（用于测试与本地演示，无需 API）
//!
//! MockLlmClient：按请求内容给出函数调用、结构化结果或纯文本，足以跑通本地演示。
//! ScriptedLlmClient：按顺序回放预设结果，并记录每次请求。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;

use crate::llm::{LlmClient, LlmError};
use crate::memory::{Message, Role};

/// Mock 客户端：无需 API 即可跑通 ReAct 循环与研究小组流水线
///
/// - 最后一条是函数结果：作为最终回复返回
/// - 请求里带 Ranking / Critique Schema：返回固定的结构化结果
/// - system 消息声明了可用函数：把最后一条 User 消息交给 echo
/// - 其余情况返回纯文本
#[derive(Debug, Default)]
pub struct MockLlmClient;

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        if let Some(last) = messages.last() {
            if last.role == Role::Function {
                return Ok(json!({"type": "reply", "content": last.content}).to_string());
            }
        }

        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or("(no input)");

        if last_user.contains("\"title\": \"Ranking\"") {
            return Ok(json!({"order": [0], "rationale": "Mock ranking"}).to_string());
        }
        if last_user.contains("\"title\": \"Critique\"") {
            return Ok(json!({"approved": true, "feedback": "Looks good."}).to_string());
        }

        let has_functions = messages
            .iter()
            .any(|m| m.role == Role::System && m.content.contains("## Available functions"));
        if !has_functions {
            return Ok(format!("Mock response to: {last_user}"));
        }

        Ok(json!({
            "type": "function_call",
            "name": "echo",
            "arguments": {"text": format!("Echo from Mock: {last_user}")}
        })
        .to_string())
    }
}

/// 回放客户端：队列耗尽后返回 EmptyResponse
#[derive(Debug, Default)]
pub struct ScriptedLlmClient {
    responses: Mutex<VecDeque<Result<String, LlmError>>>,
    requests: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedLlmClient {
    pub fn new(responses: Vec<Result<String, LlmError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// 全部成功的回复
    pub fn replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(replies.into_iter().map(|s| Ok(s.into())).collect())
    }

    pub fn push(&self, response: Result<String, LlmError>) {
        if let Ok(mut queue) = self.responses.lock() {
            queue.push_back(response);
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// 每次调用收到的完整消息序列
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(messages.to_vec());
        }
        self.responses
            .lock()
            .ok()
            .and_then(|mut queue| queue.pop_front())
            .unwrap_or(Err(LlmError::EmptyResponse))
    }
}
