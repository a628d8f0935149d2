//! 对话快照持久化
//!
//! 将 system 消息与保留的对话写入单个 JSON 文件；加载时逐条经 append 回放，目标记忆的界限照常生效，
//! 回放成功才整体替换目标。

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::memory::{ConversationMemory, ConversationStore, Message};

/// 文件中的快照格式
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSnapshot {
    pub saved_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<Message>,
    #[serde(default)]
    pub messages: Vec<Message>,
}

/// 单文件 JSON 持久化
#[derive(Debug)]
pub struct ConversationPersistence {
    path: PathBuf,
}

impl ConversationPersistence {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 读取快照；文件不存在时返回 None
    pub fn load(&self) -> anyhow::Result<Option<ConversationSnapshot>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let data = std::fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&data)?))
    }

    /// 用快照替换 memory 的对话；返回回放的消息条数（剪枝前）
    ///
    /// 在一份同策略的新记忆里回放，全部成功后才替换目标，失败时目标保持原样。
    /// 快照没有 system 消息时沿用目标当前固定的那条。
    pub fn load_into(&self, memory: &mut ConversationMemory) -> anyhow::Result<usize> {
        let Some(snapshot) = self.load()? else {
            return Ok(0);
        };

        let mut restored = ConversationMemory::new(memory.policy())?;
        let system = snapshot
            .system
            .or_else(|| memory.system_message().cloned());
        if let Some(system) = system {
            restored.set_system_message(system);
        }
        let count = snapshot.messages.len();
        for msg in snapshot.messages {
            restored.append(msg)?;
        }

        *memory = restored;
        Ok(count)
    }

    /// 写入快照；父目录不存在时自动创建
    pub fn save(&self, memory: &ConversationMemory) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let snapshot = ConversationSnapshot {
            saved_at: Utc::now(),
            system: memory.system_message().cloned(),
            messages: memory.history().to_vec(),
        };
        std::fs::write(&self.path, serde_json::to_string_pretty(&snapshot)?)?;
        Ok(())
    }
}
