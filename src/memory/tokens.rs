//! Token 估算（字符计数近似）
//!
//! 英文约 4 字符/token，中日韩约 1.5 字符/token；每条消息另计固定的角色帧开销。

use crate::memory::Message;

/// 每条消息的角色/分隔符开销
pub const MESSAGE_OVERHEAD_TOKENS: usize = 3;

/// Token 估算器（简单的字符计数近似）
pub struct TokenEstimator;

impl TokenEstimator {
    /// 估算文本的 token 数量，最少为 1
    pub fn estimate(text: &str) -> usize {
        let mut ascii_chars = 0usize;
        let mut non_ascii_chars = 0usize;

        for c in text.chars() {
            if c.is_ascii() {
                ascii_chars += 1;
            } else {
                non_ascii_chars += 1;
            }
        }

        let tokens = ascii_chars / 4 + (non_ascii_chars as f64 / 1.5).ceil() as usize;
        tokens.max(1)
    }

    /// 估算整条消息：内容 + 函数调用（名称与参数）+ 函数名 + 帧开销
    pub fn estimate_message(msg: &Message) -> usize {
        let mut tokens = MESSAGE_OVERHEAD_TOKENS;
        if !msg.content.is_empty() {
            tokens += Self::estimate(&msg.content);
        }
        if let Some(call) = &msg.function_call {
            tokens += Self::estimate(&call.name);
            tokens += Self::estimate(&call.arguments.to_string());
        }
        if let Some(name) = &msg.name {
            tokens += Self::estimate(name);
        }
        tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_estimator_english() {
        let text = "Hello, world! This is a test.";
        let tokens = TokenEstimator::estimate(text);
        assert!(tokens > 0);
        assert!(tokens < text.len());
    }

    #[test]
    fn test_token_estimator_chinese() {
        // 12 个非 ASCII 字符 -> ceil(12 / 1.5) = 8
        assert_eq!(TokenEstimator::estimate("你好世界，这是一个测试。"), 8);
    }

    #[test]
    fn test_token_estimator_minimum() {
        assert_eq!(TokenEstimator::estimate(""), 1);
        assert_eq!(TokenEstimator::estimate("ab"), 1);
    }

    #[test]
    fn test_estimate_message_adds_overhead() {
        let msg = Message::user("abcdefgh");
        assert_eq!(
            TokenEstimator::estimate_message(&msg),
            MESSAGE_OVERHEAD_TOKENS + 2
        );
    }
}
