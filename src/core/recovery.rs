//! 错误恢复引擎
//!
//! 根据 AgentError 类型返回 RecoveryAction，供 ReAct 循环决定是带提示重试还是终止。
//! LLM 的网络类错误已在 RetryingLlmClient 内重试过，到这里只剩终止。

use crate::core::{AgentError, RecoveryAction};

/// 语义化错误恢复：将错误映射为可执行动作
#[derive(Debug, Default)]
pub struct RecoveryEngine;

impl RecoveryEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, err: &AgentError, available_tools: &[String]) -> RecoveryAction {
        match err {
            AgentError::JsonParseError(raw) => RecoveryAction::RetryWithPrompt(format!(
                "Your previous reply was not valid JSON ({raw}). \
                 Reply with exactly one JSON object: either \
                 {{\"type\": \"reply\", \"content\": \"...\"}} or \
                 {{\"type\": \"function_call\", \"name\": \"...\", \"arguments\": {{...}}}}."
            )),
            AgentError::HallucinatedTool(name) => RecoveryAction::RetryWithPrompt(format!(
                "Function '{name}' does not exist. Available functions: {}.",
                available_tools.join(", ")
            )),
            // 记忆界限无法满足、LLM 重试耗尽、取消等都交给调用方
            _ => RecoveryAction::Abort,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmError;
    use crate::memory::{ConfigurationError, MemoryError};

    #[test]
    fn test_recovery_json_parse_error() {
        let engine = RecoveryEngine::new();
        let err = AgentError::JsonParseError("invalid json".to_string());
        match engine.handle(&err, &[]) {
            RecoveryAction::RetryWithPrompt(msg) => assert!(msg.contains("JSON")),
            other => panic!("Expected RetryWithPrompt, got {other:?}"),
        }
    }

    #[test]
    fn test_recovery_hallucinated_tool_lists_tools() {
        let engine = RecoveryEngine::new();
        let err = AgentError::HallucinatedTool("fake_tool".to_string());
        match engine.handle(&err, &["echo".to_string()]) {
            RecoveryAction::RetryWithPrompt(msg) => {
                assert!(msg.contains("fake_tool"));
                assert!(msg.contains("echo"));
            }
            other => panic!("Expected RetryWithPrompt, got {other:?}"),
        }
    }

    #[test]
    fn test_recovery_memory_budget_aborts() {
        let engine = RecoveryEngine::new();
        let err = AgentError::Memory(MemoryError::Configuration(
            ConfigurationError::MessageExceedsBudget { cost: 8, limit: 5 },
        ));
        assert_eq!(engine.handle(&err, &[]), RecoveryAction::Abort);
    }

    #[test]
    fn test_recovery_llm_error_aborts() {
        let engine = RecoveryEngine::new();
        let err = AgentError::Llm(LlmError::RateLimited {
            retry_after_ms: 1000,
        });
        assert_eq!(engine.handle(&err, &[]), RecoveryAction::Abort);
    }

    #[test]
    fn test_recovery_cancelled() {
        let engine = RecoveryEngine::new();
        assert_eq!(
            engine.handle(&AgentError::Cancelled, &[]),
            RecoveryAction::Abort
        );
    }
}
