//! LLM 层：客户端抽象、重试包装、结构化输出契约、Mock / Scripted 实现

pub mod mock;
pub mod structured;
pub mod traits;

pub use mock::{MockLlmClient, ScriptedLlmClient};
pub use structured::{looks_structured, parse_structured, schema_json, strip_code_fence};
pub use traits::{LlmClient, LlmError, RetryConfig, RetryingLlmClient, TokenStream};
