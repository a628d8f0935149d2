//! 短期记忆：有界对话历史
//!
//! 每次 append 后立即按 EvictionPolicy 剪枝；system 消息单独固定，不参与剪枝也不计入界限。
//! get_messages 返回「固定的 system 消息（若有）+ 保留的对话」，供 LLM 请求直接使用。

use tracing::debug;

use crate::memory::{segment_rounds, EvictionPolicy, MemoryError, Message, Role};

/// 对话记忆能力契约：所有记忆实现都提供这四个操作
pub trait ConversationStore: Send {
    /// 追加到末尾并立即剪枝；出错时日志保持不变
    fn append(&mut self, message: Message) -> Result<(), MemoryError>;

    /// 当前消息序列（system 消息在最前）
    fn get_messages(&self) -> Vec<Message>;

    /// 清空可剪枝的对话（固定的 system 消息保留）
    fn clear(&mut self);

    /// 固定唯一一条 system 消息，替换之前的
    fn set_system_message(&mut self, message: Message);
}

/// 有界对话记忆：Vec 日志 + 固定 system 消息 + token 累计
#[derive(Clone, Debug)]
pub struct ConversationMemory {
    messages: Vec<Message>,
    system: Option<Message>,
    policy: EvictionPolicy,
    token_total: usize,
    last_evicted: usize,
    evicted_total: usize,
}

impl Default for ConversationMemory {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl ConversationMemory {
    /// 按策略创建；界限非法时返回 ConfigurationError，对话无法开始
    pub fn new(policy: EvictionPolicy) -> Result<Self, MemoryError> {
        policy.validate()?;
        Ok(Self {
            messages: Vec::new(),
            system: None,
            policy,
            token_total: 0,
            last_evicted: 0,
            evicted_total: 0,
        })
    }

    pub fn unbounded() -> Self {
        Self {
            messages: Vec::new(),
            system: None,
            policy: EvictionPolicy::Unbounded,
            token_total: 0,
            last_evicted: 0,
            evicted_total: 0,
        }
    }

    /// 最近 max_rounds 轮的滑动窗口
    pub fn with_max_rounds(max_rounds: usize) -> Result<Self, MemoryError> {
        Self::new(EvictionPolicy::rounds(max_rounds))
    }

    /// token 总和不超过 max_tokens
    pub fn with_max_tokens(max_tokens: usize) -> Result<Self, MemoryError> {
        Self::new(EvictionPolicy::tokens(max_tokens))
    }

    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    /// 保留的对话（不含 system 消息）
    pub fn history(&self) -> &[Message] {
        &self.messages
    }

    pub fn system_message(&self) -> Option<&Message> {
        self.system.as_ref()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// 保留消息的 token 总和（不含 system 消息）
    pub fn token_total(&self) -> usize {
        self.token_total
    }

    pub fn round_count(&self) -> usize {
        segment_rounds(&self.messages).len()
    }

    /// 最近一次 append 淘汰的消息数
    pub fn last_evicted(&self) -> usize {
        self.last_evicted
    }

    pub fn evicted_total(&self) -> usize {
        self.evicted_total
    }

    /// 同时清空对话与 system 消息
    pub fn reset(&mut self) {
        self.clear();
        self.system = None;
        self.evicted_total = 0;
    }
}

impl ConversationStore for ConversationMemory {
    fn append(&mut self, message: Message) -> Result<(), MemoryError> {
        if message.role == Role::System {
            self.set_system_message(message);
            return Ok(());
        }

        self.policy.admit(&message)?;

        let cost = message.tokens;
        self.messages.push(message);

        let eviction = match self.policy.plan(&self.messages) {
            Ok(e) => e,
            Err(e) => {
                self.messages.pop();
                return Err(e);
            }
        };

        self.token_total = self.token_total + cost - eviction.freed_tokens;
        self.last_evicted = eviction.count();
        if !eviction.is_empty() {
            self.evicted_total += eviction.count();
            self.messages.drain(eviction.range.clone());
            debug!(
                evicted = eviction.count(),
                freed_tokens = eviction.freed_tokens,
                retained = self.messages.len(),
                token_total = self.token_total,
                "pruned conversation memory"
            );
        }
        Ok(())
    }

    fn get_messages(&self) -> Vec<Message> {
        let mut out = Vec::with_capacity(self.messages.len() + 1);
        if let Some(system) = &self.system {
            out.push(system.clone());
        }
        out.extend(self.messages.iter().cloned());
        out
    }

    fn clear(&mut self) {
        self.messages.clear();
        self.token_total = 0;
        self.last_evicted = 0;
    }

    fn set_system_message(&mut self, message: Message) {
        self.system = Some(Message {
            role: Role::System,
            ..message
        });
    }
}
