//! Colloquy - Rust 智能体对话框架
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 统一错误类型与错误恢复
//! - **llm**: LLM 客户端抽象、重试包装、结构化输出与 Mock
//! - **memory**: 有界对话记忆（按轮 / 按 token 剪枝）、会话注册表与快照持久化
//! - **observability**: tracing 初始化
//! - **react**: Planner、ReAct 主循环与过程事件
//! - **team**: 研究小组流水线（起草 / 排序 / 编辑修订）
//! - **tools**: 工具注册表与带超时的执行器

pub mod config;
pub mod core;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod react;
pub mod team;
pub mod tools;
