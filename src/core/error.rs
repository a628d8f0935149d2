//! Agent 错误类型与恢复动作
//!
//! 与 RecoveryEngine 配合：根据 AgentError 决定 RetryWithPrompt / Abort。
//! 记忆层与 LLM 层的错误原样包裹，不改写。

use thiserror::Error;

use crate::llm::LlmError;
use crate::memory::MemoryError;

/// Agent 运行过程中可能出现的错误（记忆、LLM、解析、工具、取消等）
#[derive(Error, Debug)]
pub enum AgentError {
    #[error(transparent)]
    Memory(#[from] MemoryError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("JSON parse error: {0}")]
    JsonParseError(String),

    #[error("Tool execution failed: {0}")]
    ToolExecutionFailed(String),

    #[error("Tool timeout: {0}")]
    ToolTimeout(String),

    #[error("Hallucinated tool: {0}")]
    HallucinatedTool(String),

    #[error("Step limit exceeded ({0} steps)")]
    StepLimitExceeded(usize),

    #[error("Cancelled")]
    Cancelled,

    #[error("Config error: {0}")]
    ConfigError(String),
}

/// 恢复引擎根据错误类型给出的建议动作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryAction {
    /// 将提示注入下一轮，让 LLM 重试（如 JSON 格式错误、未注册的工具）
    RetryWithPrompt(String),
    /// 终止当前轮次，错误交给调用方
    Abort,
}
