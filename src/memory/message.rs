//! 对话消息：角色、内容、函数调用描述与 token 开销
//!
//! 构造函数会用 TokenEstimator 估算开销；需要精确值（或测试固定值）时用 `with_tokens` 覆盖。

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::memory::TokenEstimator;

/// 消息角色（与 LLM API 一致；User 即对话中的 human 一方）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Function,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Function => "function",
        }
    }
}

/// assistant 发起的函数调用：函数名 + JSON 参数
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FunctionCall {
    /// 已注册的工具名，如 echo
    pub name: String,
    /// 工具参数，依工具不同而不同
    #[serde(default)]
    pub arguments: Value,
}

/// 单条消息
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// 仅 assistant 消息：本轮发起的函数调用
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
    /// 仅 function 消息：产生该结果的函数名
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// token 开销，按 token 计的剪枝策略用它累计预算
    pub tokens: usize,
}

impl Message {
    fn build(
        role: Role,
        content: String,
        function_call: Option<FunctionCall>,
        name: Option<String>,
    ) -> Self {
        let mut msg = Self {
            role,
            content,
            function_call,
            name,
            tokens: 0,
        };
        msg.tokens = TokenEstimator::estimate_message(&msg);
        msg
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::build(Role::User, content.into(), None, None)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::build(Role::Assistant, content.into(), None, None)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::build(Role::System, content.into(), None, None)
    }

    /// assistant 发起函数调用（content 为空）
    pub fn assistant_function_call(name: impl Into<String>, arguments: Value) -> Self {
        let call = FunctionCall {
            name: name.into(),
            arguments,
        };
        Self::build(Role::Assistant, String::new(), Some(call), None)
    }

    /// 函数执行结果，回填给 LLM
    pub fn function_result(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self::build(Role::Function, content.into(), None, Some(name.into()))
    }

    /// 覆盖 token 开销（调用方已有精确分词结果时使用）
    pub fn with_tokens(mut self, tokens: usize) -> Self {
        self.tokens = tokens;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_constructors_estimate_tokens() {
        let msg = Message::user("Hello, how are you today?");
        assert_eq!(msg.role, Role::User);
        assert!(msg.tokens > 0);
        assert!(msg.function_call.is_none());
    }

    #[test]
    fn test_with_tokens_overrides_estimate() {
        let msg = Message::assistant("whatever").with_tokens(42);
        assert_eq!(msg.tokens, 42);
    }

    #[test]
    fn test_function_call_cost_includes_arguments() {
        let bare = Message::assistant_function_call("search", json!({}));
        let heavy = Message::assistant_function_call(
            "search",
            json!({"query": "a fairly long query about rust ownership and borrowing"}),
        );
        assert!(heavy.tokens > bare.tokens);
    }

    #[test]
    fn test_serialize_skips_empty_optionals() {
        let msg = Message::user("hi").with_tokens(1);
        let v = serde_json::to_value(&msg).unwrap();
        assert_eq!(v["role"], "user");
        assert!(v.get("function_call").is_none());
        assert!(v.get("name").is_none());

        let result = Message::function_result("echo", "ok");
        let v = serde_json::to_value(&result).unwrap();
        assert_eq!(v["role"], "function");
        assert_eq!(v["name"], "echo");
    }
}
