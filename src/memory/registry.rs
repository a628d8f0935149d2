//! 具名对话注册表
//!
//! 显式构造并向下传递（不使用进程级单例），多个智能体共享同一组对话时由它串行化访问：
//! 注册表本身用 RwLock 保护映射，每个对话再用各自的 Mutex 保护。

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::memory::{ConversationMemory, EvictionPolicy, MemoryError};

/// 共享的单个对话
pub type SharedConversation = Arc<Mutex<ConversationMemory>>;

/// 具名对话注册表：新建的对话都使用同一剪枝策略
pub struct ConversationRegistry {
    conversations: RwLock<HashMap<String, SharedConversation>>,
    /// 已校验策略的空对话，新对话由它克隆
    template: ConversationMemory,
}

impl ConversationRegistry {
    pub fn new(policy: EvictionPolicy) -> Result<Self, MemoryError> {
        Ok(Self {
            conversations: RwLock::new(HashMap::new()),
            template: ConversationMemory::new(policy)?,
        })
    }

    pub fn policy(&self) -> EvictionPolicy {
        self.template.policy()
    }

    /// 获取或创建指定名称的对话
    pub async fn get_or_create(&self, name: &str) -> SharedConversation {
        if let Some(conv) = self.conversations.read().await.get(name) {
            return conv.clone();
        }

        let mut conversations = self.conversations.write().await;
        conversations
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(self.fresh())))
            .clone()
    }

    pub async fn get(&self, name: &str) -> Option<SharedConversation> {
        self.conversations.read().await.get(name).cloned()
    }

    /// 以随机会话 ID 新建对话并返回 ID
    pub async fn create_session(&self) -> String {
        let id = format!("session_{}", uuid::Uuid::new_v4());
        self.conversations
            .write()
            .await
            .insert(id.clone(), Arc::new(Mutex::new(self.fresh())));
        id
    }

    pub async fn remove(&self, name: &str) -> Option<SharedConversation> {
        self.conversations.write().await.remove(name)
    }

    pub async fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.conversations.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn len(&self) -> usize {
        self.conversations.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.conversations.read().await.is_empty()
    }

    fn fresh(&self) -> ConversationMemory {
        self.template.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{ConversationStore, Message};

    #[tokio::test]
    async fn test_get_or_create_returns_same_conversation() {
        let registry = ConversationRegistry::new(EvictionPolicy::rounds(2)).unwrap();
        let a = registry.get_or_create("research").await;
        a.lock().await.append(Message::user("hi")).unwrap();

        let b = registry.get_or_create("research").await;
        assert_eq!(b.lock().await.len(), 1);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_registries_are_isolated() {
        let first = ConversationRegistry::new(EvictionPolicy::Unbounded).unwrap();
        let second = ConversationRegistry::new(EvictionPolicy::Unbounded).unwrap();
        first.get_or_create("shared").await;
        assert!(second.get("shared").await.is_none());
        assert!(second.is_empty().await);
    }

    #[tokio::test]
    async fn test_create_session_and_remove() {
        let registry = ConversationRegistry::new(EvictionPolicy::tokens(100)).unwrap();
        let id = registry.create_session().await;
        assert!(id.starts_with("session_"));
        assert_eq!(registry.names().await, vec![id.clone()]);

        let conv = registry.get(&id).await.unwrap();
        assert_eq!(conv.lock().await.policy(), EvictionPolicy::tokens(100));

        assert!(registry.remove(&id).await.is_some());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_new_conversations_start_empty() {
        let registry = ConversationRegistry::new(EvictionPolicy::rounds(2)).unwrap();
        let first = registry.get_or_create("a").await;
        first.lock().await.append(Message::user("hi")).unwrap();

        let second = registry.get_or_create("b").await;
        let guard = second.lock().await;
        assert!(guard.is_empty());
        assert_eq!(guard.policy(), EvictionPolicy::rounds(2));
    }

    #[test]
    fn test_new_rejects_invalid_policy() {
        assert!(ConversationRegistry::new(EvictionPolicy::rounds(0)).is_err());
    }

    #[tokio::test]
    async fn test_concurrent_appends_are_serialized() {
        let registry = Arc::new(ConversationRegistry::new(EvictionPolicy::Unbounded).unwrap());
        let mut handles = Vec::new();
        for i in 0..8 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                let conv = registry.get_or_create("team").await;
                let mut guard = conv.lock().await;
                guard.append(Message::user(format!("q{i}"))).unwrap();
                guard.append(Message::assistant(format!("a{i}"))).unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        let conv = registry.get("team").await.unwrap();
        let guard = conv.lock().await;
        assert_eq!(guard.len(), 16);
        assert_eq!(guard.round_count(), 8);
    }
}
