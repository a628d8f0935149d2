//! 研究小组流水线：起草 -> 排序 -> 编辑 / 修订循环
//!
//! 三个角色（writer / ranker / editor）各自持有 LLM，可以是不同模型。严格顺序执行：
//! writer 依次写出若干草稿，ranker 用结构化输出给出排名，最佳草稿进入至多 revision_rounds 轮
//! 编辑评审（结构化 Critique）与修订，评审通过即提前结束。writer 的对话历史用有界记忆保存。

use std::collections::HashSet;
use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::AgentError;
use crate::llm::{parse_structured, schema_json, LlmClient};
use crate::memory::{ConversationMemory, ConversationStore, EvictionPolicy, Message};

/// 排名结果：order 为草稿下标，按质量从高到低
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Ranking {
    pub order: Vec<usize>,
    #[serde(default)]
    pub rationale: String,
}

impl Ranking {
    /// 校验：非空、下标在范围内、不重复
    pub fn validate(&self, draft_count: usize) -> Result<(), AgentError> {
        if self.order.is_empty() {
            return Err(AgentError::JsonParseError("ranking order is empty".into()));
        }
        let mut seen = HashSet::new();
        for &idx in &self.order {
            if idx >= draft_count {
                return Err(AgentError::JsonParseError(format!(
                    "ranking refers to draft {idx}, only {draft_count} drafts exist"
                )));
            }
            if !seen.insert(idx) {
                return Err(AgentError::JsonParseError(format!(
                    "ranking lists draft {idx} twice"
                )));
            }
        }
        Ok(())
    }

    pub fn best(&self) -> Option<usize> {
        self.order.first().copied()
    }
}

/// 编辑评审结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Critique {
    pub approved: bool,
    #[serde(default)]
    pub feedback: String,
}

/// 一轮修订记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevisionRecord {
    pub round: usize,
    pub feedback: String,
    pub document: String,
}

/// 流水线产出
#[derive(Debug, Clone, Serialize)]
pub struct TeamReport {
    pub topic: String,
    pub drafts: Vec<String>,
    pub ranking: Ranking,
    pub revisions: Vec<RevisionRecord>,
    pub approved: bool,
    pub final_document: String,
}

/// 流水线参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamConfig {
    pub drafts: usize,
    pub revision_rounds: usize,
    /// writer 对话记忆的剪枝策略
    pub writer_memory: EvictionPolicy,
}

impl Default for TeamConfig {
    fn default() -> Self {
        Self {
            drafts: 3,
            revision_rounds: 2,
            writer_memory: EvictionPolicy::rounds(4),
        }
    }
}

const WRITER_SYSTEM: &str =
    "You are the writer of a research team. Write clear, well-structured documents.";

/// 研究小组：writer / ranker / editor 三个角色
pub struct ResearchTeam {
    writer: Arc<dyn LlmClient>,
    ranker: Arc<dyn LlmClient>,
    editor: Arc<dyn LlmClient>,
    config: TeamConfig,
}

impl ResearchTeam {
    pub fn new(
        writer: Arc<dyn LlmClient>,
        ranker: Arc<dyn LlmClient>,
        editor: Arc<dyn LlmClient>,
        config: TeamConfig,
    ) -> Self {
        Self {
            writer,
            ranker,
            editor,
            config,
        }
    }

    /// 三个角色共用一个 LLM
    pub fn with_single_llm(llm: Arc<dyn LlmClient>, config: TeamConfig) -> Self {
        Self::new(llm.clone(), llm.clone(), llm, config)
    }

    pub async fn run(&self, topic: &str) -> Result<TeamReport, AgentError> {
        if self.config.drafts == 0 {
            return Err(AgentError::ConfigError("team.drafts must be positive".into()));
        }

        let mut writer_memory = ConversationMemory::new(self.config.writer_memory)?;
        writer_memory.set_system_message(Message::system(WRITER_SYSTEM));

        let mut drafts = Vec::with_capacity(self.config.drafts);
        for i in 0..self.config.drafts {
            let prompt = format!(
                "Write draft #{} of a short research document on: {topic}",
                i + 1
            );
            let draft = self.ask_writer(&mut writer_memory, prompt).await?;
            debug!(draft = i, chars = draft.len(), "draft written");
            drafts.push(draft);
        }

        let ranking = self.rank(topic, &drafts).await?;
        let best = ranking.best().unwrap_or(0);
        info!(best, order = ?ranking.order, "drafts ranked");

        let mut document = drafts[best].clone();
        let mut revisions = Vec::new();
        let mut approved = false;
        for round in 1..=self.config.revision_rounds {
            let critique = self.review(topic, &document).await?;
            if critique.approved {
                approved = true;
                break;
            }
            let prompt = format!(
                "Revise the document below using the editor's feedback.\n\nFeedback: {}\n\nDocument:\n{}",
                critique.feedback, document
            );
            document = self.ask_writer(&mut writer_memory, prompt).await?;
            info!(round, "document revised");
            revisions.push(RevisionRecord {
                round,
                feedback: critique.feedback,
                document: document.clone(),
            });
        }

        Ok(TeamReport {
            topic: topic.to_string(),
            drafts,
            ranking,
            revisions,
            approved,
            final_document: document,
        })
    }

    async fn ask_writer(
        &self,
        memory: &mut ConversationMemory,
        prompt: String,
    ) -> Result<String, AgentError> {
        memory.append(Message::user(prompt))?;
        let reply = self.writer.complete(&memory.get_messages()).await?;
        let reply = reply.trim().to_string();
        memory.append(Message::assistant(reply.clone()))?;
        Ok(reply)
    }

    async fn rank(&self, topic: &str, drafts: &[String]) -> Result<Ranking, AgentError> {
        let mut prompt = format!(
            "Rank the following drafts on \"{topic}\" from best to worst.\n\
             Reply with one JSON object matching this schema:\n{}\n",
            schema_json::<Ranking>()
        );
        for (i, d) in drafts.iter().enumerate() {
            prompt.push_str(&format!("\n### Draft {i}\n{d}\n"));
        }
        let output = self.ranker.complete(&[Message::user(prompt)]).await?;
        let ranking: Ranking = parse_structured(&output)?;
        ranking.validate(drafts.len())?;
        Ok(ranking)
    }

    async fn review(&self, topic: &str, document: &str) -> Result<Critique, AgentError> {
        let prompt = format!(
            "You are the editor. Review this document on \"{topic}\".\n\
             Reply with one JSON object matching this schema:\n{}\n\nDocument:\n{document}",
            schema_json::<Critique>()
        );
        let output = self.editor.complete(&[Message::user(prompt)]).await?;
        parse_structured(&output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranking_validate() {
        let ok = Ranking {
            order: vec![1, 0],
            rationale: String::new(),
        };
        assert!(ok.validate(2).is_ok());
        assert_eq!(ok.best(), Some(1));

        let out_of_range = Ranking {
            order: vec![2],
            rationale: String::new(),
        };
        assert!(out_of_range.validate(2).is_err());

        let duplicate = Ranking {
            order: vec![0, 0],
            rationale: String::new(),
        };
        assert!(duplicate.validate(2).is_err());

        let empty = Ranking {
            order: vec![],
            rationale: String::new(),
        };
        assert!(empty.validate(2).is_err());
    }

    #[test]
    fn test_default_config() {
        let config = TeamConfig::default();
        assert_eq!(config.drafts, 3);
        assert!(config.writer_memory.validate().is_ok());
    }
}
