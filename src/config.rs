//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `COLLOQUY__*` 覆盖（双下划线表示嵌套，如 `COLLOQUY__MEMORY__MAX_ROUNDS=4`）。

use std::path::PathBuf;

use serde::Deserialize;

use crate::llm::RetryConfig;
use crate::memory::{EvictionPolicy, MemoryError};
use crate::team::TeamConfig;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub memory: MemorySection,
    pub llm: LlmSection,
    pub agent: AgentSection,
    pub team: TeamSection,
}

/// [app] 段：应用名与默认日志过滤
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSection {
    pub name: String,
    /// RUST_LOG 未设置时使用
    pub log_filter: String,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: "colloquy".to_string(),
            log_filter: "info".to_string(),
        }
    }
}

/// 剪枝策略种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    Unbounded,
    /// 按轮数
    #[default]
    Count,
    /// 按 token
    Tokens,
}

/// [memory] 段：对话记忆剪枝策略与界限
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MemorySection {
    pub policy: PolicyKind,
    pub max_rounds: usize,
    pub keep_head_rounds: usize,
    pub max_tokens: usize,
}

impl Default for MemorySection {
    fn default() -> Self {
        Self {
            policy: PolicyKind::Count,
            max_rounds: 20,
            keep_head_rounds: 0,
            max_tokens: 4000,
        }
    }
}

impl MemorySection {
    /// 转为已校验的剪枝策略；界限非法时返回 ConfigurationError
    pub fn to_policy(&self) -> Result<EvictionPolicy, MemoryError> {
        let policy = match self.policy {
            PolicyKind::Unbounded => EvictionPolicy::Unbounded,
            PolicyKind::Count => EvictionPolicy::Rounds {
                max_rounds: self.max_rounds,
                keep_head_rounds: self.keep_head_rounds,
            },
            PolicyKind::Tokens => EvictionPolicy::Tokens {
                max_tokens: self.max_tokens,
            },
        };
        policy.validate()?;
        Ok(policy)
    }
}

/// [llm] 段
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LlmSection {
    pub retry: RetrySection,
}

/// [llm.retry] 段：网络类错误的重试次数与退避
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrySection {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        let d = RetryConfig::default();
        Self {
            max_retries: d.max_retries,
            initial_backoff_ms: d.initial_backoff_ms,
            max_backoff_ms: d.max_backoff_ms,
        }
    }
}

impl RetrySection {
    pub fn to_retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.max_retries,
            initial_backoff_ms: self.initial_backoff_ms,
            max_backoff_ms: self.max_backoff_ms,
        }
    }
}

/// [agent] 段：ReAct 步数上限、工具超时、基础 system prompt
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentSection {
    pub max_steps: usize,
    /// 单次工具调用超时（秒）
    pub tool_timeout_secs: u64,
    pub system_prompt: String,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            max_steps: crate::react::DEFAULT_MAX_STEPS,
            tool_timeout_secs: 30,
            system_prompt: "You are a helpful research assistant.".to_string(),
        }
    }
}

/// [team] 段：研究小组的草稿数与修订轮数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TeamSection {
    pub drafts: usize,
    pub revision_rounds: usize,
}

impl Default for TeamSection {
    fn default() -> Self {
        let d = TeamConfig::default();
        Self {
            drafts: d.drafts,
            revision_rounds: d.revision_rounds,
        }
    }
}

impl AppConfig {
    /// 研究小组配置：writer 记忆沿用 [memory] 段的策略
    pub fn team_config(&self) -> Result<TeamConfig, MemoryError> {
        Ok(TeamConfig {
            drafts: self.team.drafts,
            revision_rounds: self.team.revision_rounds,
            writer_memory: self.memory.to_policy()?,
        })
    }
}

/// 从 config 目录加载配置，环境变量 COLLOQUY__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 COLLOQUY__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("COLLOQUY")
            .separator("__")
            .try_parsing(true),
    );

    builder.build()?.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::ConfigurationError;
    use std::io::Write;

    #[test]
    fn test_default_memory_policy() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.memory.to_policy().unwrap(), EvictionPolicy::rounds(20));
    }

    #[test]
    fn test_tokens_policy_rejects_zero() {
        let section = MemorySection {
            policy: PolicyKind::Tokens,
            max_tokens: 0,
            ..MemorySection::default()
        };
        assert_eq!(
            section.to_policy(),
            Err(MemoryError::Configuration(
                ConfigurationError::NonPositiveBound { name: "max_tokens" }
            ))
        );
    }

    #[test]
    fn test_load_from_explicit_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[memory]\npolicy = \"tokens\"\nmax_tokens = 512\n\n[team]\ndrafts = 5\n\n[llm.retry]\nmax_retries = 7"
        )
        .unwrap();

        let cfg = load_config(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(cfg.memory.to_policy().unwrap(), EvictionPolicy::tokens(512));
        assert_eq!(cfg.team.drafts, 5);
        assert_eq!(cfg.team.revision_rounds, TeamConfig::default().revision_rounds);
        assert_eq!(cfg.llm.retry.to_retry_config().max_retries, 7);
        assert_eq!(cfg.team_config().unwrap().writer_memory, EvictionPolicy::tokens(512));
    }
}
