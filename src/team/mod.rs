//! 多智能体流水线

pub mod research;

pub use research::{Critique, Ranking, ResearchTeam, RevisionRecord, TeamConfig, TeamReport};
