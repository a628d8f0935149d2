//! 记忆层：有界对话记忆（按轮数 / 按 token 剪枝）、具名对话注册表、快照持久化

pub mod conversation;
pub mod error;
pub mod message;
pub mod persistence;
pub mod policy;
pub mod registry;
pub mod tokens;

pub use conversation::{ConversationMemory, ConversationStore};
pub use error::{ConfigurationError, MemoryError};
pub use message::{FunctionCall, Message, Role};
pub use persistence::{ConversationPersistence, ConversationSnapshot};
pub use policy::{segment_rounds, Eviction, EvictionPolicy};
pub use registry::{ConversationRegistry, SharedConversation};
pub use tokens::{TokenEstimator, MESSAGE_OVERHEAD_TOKENS};
