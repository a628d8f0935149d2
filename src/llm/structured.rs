//! 结构化输出契约
//!
//! LLM 回复必须整体是一个 JSON 文档（允许包在唯一一个 ```json 代码块里），按目标类型反序列化校验；
//! 不在自由文本里搜索第一个 `{` 与最后一个 `}`。Schema 由 schemars 生成，拼入 prompt。

use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;

use crate::core::AgentError;

/// 去掉首尾空白与唯一的 Markdown 代码块围栏；围栏不完整时原样返回
pub fn strip_code_fence(output: &str) -> &str {
    let trimmed = output.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // 去掉语言标记（```json）
    match body.split_once('\n') {
        Some((lang, code)) if !lang.trim().contains(char::is_whitespace) => code.trim(),
        _ => body.trim(),
    }
}

/// 回复看起来是否意在输出 JSON（以 `{` 或代码块开头）
pub fn looks_structured(output: &str) -> bool {
    let trimmed = output.trim_start();
    trimmed.starts_with('{') || trimmed.starts_with("```")
}

/// 将整段回复解析为 T
pub fn parse_structured<T: DeserializeOwned>(output: &str) -> Result<T, AgentError> {
    let body = strip_code_fence(output);
    serde_json::from_str(body).map_err(|e| AgentError::JsonParseError(format!("{e}: {body}")))
}

/// 返回 T 的 JSON Schema 字符串，可拼入 prompt
pub fn schema_json<T: JsonSchema>() -> String {
    let schema = schema_for!(T);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, JsonSchema, PartialEq)]
    struct Verdict {
        approved: bool,
        feedback: String,
    }

    #[test]
    fn test_parse_plain_json() {
        let v: Verdict = parse_structured(r#" {"approved": true, "feedback": "ok"} "#).unwrap();
        assert!(v.approved);
    }

    #[test]
    fn test_parse_fenced_json() {
        let out = "```json\n{\"approved\": false, \"feedback\": \"tighten intro\"}\n```";
        let v: Verdict = parse_structured(out).unwrap();
        assert_eq!(v.feedback, "tighten intro");
    }

    #[test]
    fn test_rejects_json_embedded_in_prose() {
        let out = r#"Sure! Here it is: {"approved": true, "feedback": "ok"} hope it helps"#;
        let err = parse_structured::<Verdict>(out).unwrap_err();
        assert!(matches!(err, AgentError::JsonParseError(_)));
    }

    #[test]
    fn test_rejects_wrong_shape() {
        let err = parse_structured::<Verdict>(r#"{"approved": "yes"}"#).unwrap_err();
        assert!(matches!(err, AgentError::JsonParseError(_)));
    }

    #[test]
    fn test_looks_structured() {
        assert!(looks_structured("  {\"a\": 1}"));
        assert!(looks_structured("```json\n{}\n```"));
        assert!(!looks_structured("Plain answer"));
    }

    #[test]
    fn test_schema_mentions_fields() {
        let schema = schema_json::<Verdict>();
        assert!(schema.contains("approved"));
        assert!(schema.contains("feedback"));
    }
}
