//! ReAct 过程事件：用于流式展示思考、函数调用、观察与回复

use serde::Serialize;

/// 单步过程事件（可序列化为 JSON 供前端展示）
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReactEvent {
    /// ReAct 步数更新（当前第几步）
    StepUpdate { step: usize, max_steps: usize },
    /// 正在调用 LLM
    Thinking,
    /// 调用函数
    FunctionCall {
        name: String,
        arguments: serde_json::Value,
    },
    /// 函数返回（预览，避免过长）
    Observation { name: String, preview: String },
    /// 函数执行失败
    ToolFailure { name: String, reason: String },
    /// 错误恢复动作
    Recovery { action: String, detail: String },
    /// 剪枝淘汰了消息
    MemoryPruned { evicted: usize, retained: usize },
    /// 最终回复
    Reply { text: String },
    Error { text: String },
}
