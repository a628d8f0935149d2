//! 剪枝策略：按轮数（滑动窗口）或按 token 预算
//!
//! 策略不持有消息，只根据当前日志计算出一段要丢弃的连续区间（Eviction），由 ConversationMemory 执行。
//! 轮（round）= 一条 user 消息及其后直到下一条 user 之前的全部消息（assistant 回复、函数调用、函数结果）；
//! 第一条 user 之前的消息单独算作一个不完整的开头轮。

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::memory::{ConfigurationError, MemoryError, Message, Role};

/// 剪枝策略（由配置选择）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EvictionPolicy {
    /// 不剪枝
    Unbounded,
    /// 最多保留 max_rounds 轮；开头 keep_head_rounds 轮永不淘汰
    Rounds {
        max_rounds: usize,
        #[serde(default)]
        keep_head_rounds: usize,
    },
    /// 保留消息的 token 总和不超过 max_tokens
    Tokens { max_tokens: usize },
}

/// 一次剪枝计划：要删除的区间与释放的 token 数
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Eviction {
    pub range: Range<usize>,
    pub freed_tokens: usize,
}

impl Eviction {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

impl EvictionPolicy {
    pub fn rounds(max_rounds: usize) -> Self {
        EvictionPolicy::Rounds {
            max_rounds,
            keep_head_rounds: 0,
        }
    }

    pub fn tokens(max_tokens: usize) -> Self {
        EvictionPolicy::Tokens { max_tokens }
    }

    /// 校验界限：必须为正，且保留的开头轮数必须小于窗口
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        match *self {
            EvictionPolicy::Unbounded => Ok(()),
            EvictionPolicy::Rounds {
                max_rounds,
                keep_head_rounds,
            } => {
                if max_rounds == 0 {
                    return Err(ConfigurationError::NonPositiveBound { name: "max_rounds" });
                }
                if keep_head_rounds >= max_rounds {
                    return Err(ConfigurationError::HeadExceedsWindow {
                        keep_head_rounds,
                        max_rounds,
                    });
                }
                Ok(())
            }
            EvictionPolicy::Tokens { max_tokens } => {
                if max_tokens == 0 {
                    return Err(ConfigurationError::NonPositiveBound { name: "max_tokens" });
                }
                Ok(())
            }
        }
    }

    /// 插入前检查：单条消息本身超出 token 预算时无法满足界限
    pub fn admit(&self, incoming: &Message) -> Result<(), ConfigurationError> {
        match *self {
            EvictionPolicy::Tokens { max_tokens } if incoming.tokens > max_tokens => {
                Err(ConfigurationError::MessageExceedsBudget {
                    cost: incoming.tokens,
                    limit: max_tokens,
                })
            }
            _ => Ok(()),
        }
    }

    /// 对已追加新消息的日志计算剪枝区间（纯函数，不修改日志）
    ///
    /// 最后一条消息（刚追加的那条）永远不会被淘汰。
    pub fn plan(&self, log: &[Message]) -> Result<Eviction, MemoryError> {
        match *self {
            EvictionPolicy::Unbounded => Ok(Eviction::none()),
            EvictionPolicy::Rounds {
                max_rounds,
                keep_head_rounds,
            } => plan_rounds(log, max_rounds, keep_head_rounds),
            EvictionPolicy::Tokens { max_tokens } => plan_tokens(log, max_tokens),
        }
    }
}

/// 把日志切分为轮（每个区间是一轮在日志中的下标范围）
pub fn segment_rounds(log: &[Message]) -> Vec<Range<usize>> {
    let mut rounds: Vec<Range<usize>> = Vec::new();
    let mut start = 0;
    for (i, msg) in log.iter().enumerate() {
        if msg.role == Role::User && i > start {
            rounds.push(start..i);
            start = i;
        }
    }
    if start < log.len() {
        rounds.push(start..log.len());
    }
    rounds
}

fn plan_rounds(
    log: &[Message],
    max_rounds: usize,
    keep_head_rounds: usize,
) -> Result<Eviction, MemoryError> {
    let rounds = segment_rounds(log);
    if rounds.len() <= max_rounds {
        return Ok(Eviction::none());
    }

    let excess = rounds.len() - max_rounds;
    // 最近一轮不可淘汰
    let evictable = rounds.len().saturating_sub(keep_head_rounds + 1);
    let evict = excess.min(evictable);
    if evict == 0 {
        return Ok(Eviction::none());
    }

    // 按轮切分，range.end 总是下一轮开头的 user 消息
    let first = keep_head_rounds;
    let last = first + evict - 1;
    let range = rounds[first].start..rounds[last].end;

    let freed_tokens = log[range.clone()].iter().map(|m| m.tokens).sum();
    Ok(Eviction {
        range,
        freed_tokens,
    })
}

fn plan_tokens(log: &[Message], max_tokens: usize) -> Result<Eviction, MemoryError> {
    let mut total: usize = log.iter().map(|m| m.tokens).sum();
    if total <= max_tokens {
        return Ok(Eviction::none());
    }

    let newest = log.len().saturating_sub(1);
    let mut end = 0;
    let mut freed = 0;
    while total > max_tokens && end < newest {
        total -= log[end].tokens;
        freed += log[end].tokens;
        end += 1;
    }

    if total > max_tokens {
        let cost = log.last().map(|m| m.tokens).unwrap_or(total);
        return Err(ConfigurationError::MessageExceedsBudget {
            cost,
            limit: max_tokens,
        }
        .into());
    }

    // 调用消息已被淘汰的函数结果不能留在开头
    while end < newest && log[end].role == Role::Function {
        freed += log[end].tokens;
        end += 1;
    }
    if log[end].role == Role::Function {
        return Err(MemoryError::InvariantViolation(format!(
            "function result '{}' would be kept without its call",
            log[end].name.as_deref().unwrap_or_default()
        )));
    }

    Ok(Eviction {
        range: 0..end,
        freed_tokens: freed,
    })
}
