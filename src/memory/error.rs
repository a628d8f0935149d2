//! 记忆层错误
//!
//! ConfigurationError：界限无法满足（构造时或单条消息超预算）；InvariantViolation：剪枝会破坏轮次配对。
//! 两者都从 append / 构造同步返回，记忆层不重试、不吞错误。

use thiserror::Error;

/// 配置无法满足时的具体原因
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("{name} must be a positive integer")]
    NonPositiveBound { name: &'static str },

    #[error("keep_head_rounds ({keep_head_rounds}) must be smaller than max_rounds ({max_rounds})")]
    HeadExceedsWindow {
        keep_head_rounds: usize,
        max_rounds: usize,
    },

    #[error("message costs {cost} tokens, exceeding max_tokens ({limit})")]
    MessageExceedsBudget { cost: usize, limit: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    #[error("memory configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("turn pairing violated: {0}")]
    InvariantViolation(String),
}

impl MemoryError {
    pub fn is_configuration(&self) -> bool {
        matches!(self, MemoryError::Configuration(_))
    }
}
