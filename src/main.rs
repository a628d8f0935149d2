//! Colloquy - Rust 智能体对话框架
//!
//! 入口：初始化日志、加载配置、构建有界对话记忆与 Agent，然后在 stdin 上运行 REPL。

use std::sync::Arc;

use anyhow::Context;
use colloquy::config::load_config;
use colloquy::core::RecoveryEngine;
use colloquy::llm::{LlmClient, MockLlmClient, RetryingLlmClient};
use colloquy::memory::{ConversationMemory, ConversationPersistence, ConversationStore};
use colloquy::observability;
use colloquy::react::{react_loop, Planner, ReactSession};
use colloquy::team::ResearchTeam;
use colloquy::tools::{EchoTool, ToolExecutor, ToolRegistry};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

const HELP: &str = "commands: /history  /clear  /save <path>  /load <path>  /team <topic>  /quit";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config(None).context("Failed to load config")?;
    observability::init(&config.app.log_filter);

    // 界限非法时对话无法开始
    let policy = config
        .memory
        .to_policy()
        .context("Invalid [memory] configuration")?;
    let mut memory = ConversationMemory::new(policy)?;
    let team_config = config.team_config()?;

    let mut registry = ToolRegistry::new();
    registry.register(EchoTool);
    Planner::install_system_prompt(&mut memory, &config.agent.system_prompt, &registry);

    let llm: Arc<dyn LlmClient> = Arc::new(RetryingLlmClient::new(
        Arc::new(MockLlmClient),
        config.llm.retry.to_retry_config(),
    ));
    let planner = Planner::new(llm.clone());
    let executor = ToolExecutor::new(registry, config.agent.tool_timeout_secs);
    let recovery = RecoveryEngine::new();
    let team = ResearchTeam::with_single_llm(llm, team_config);

    tracing::info!(app = %config.app.name, policy = ?policy, "ready");
    println!("{} ({HELP})", config.app.name);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match input.split_once(' ').unwrap_or((input, "")) {
            ("/quit", _) => break,
            ("/history", _) => {
                for msg in memory.get_messages() {
                    println!("[{}] {}", msg.role.as_str(), msg.content);
                }
                println!(
                    "-- {} messages, {} rounds, ~{} tokens, {} evicted",
                    memory.len(),
                    memory.round_count(),
                    memory.token_total(),
                    memory.evicted_total()
                );
                let (prompt, completion, total) = planner.token_usage();
                println!("-- llm usage: {prompt} prompt + {completion} completion = {total}");
            }
            ("/clear", _) => {
                memory.clear();
                println!("history cleared");
            }
            ("/save", path) if !path.trim().is_empty() => {
                match ConversationPersistence::new(path.trim()).save(&memory) {
                    Ok(()) => println!("saved to {}", path.trim()),
                    Err(e) => eprintln!("save failed: {e:#}"),
                }
            }
            ("/load", path) if !path.trim().is_empty() => {
                match ConversationPersistence::new(path.trim()).load_into(&mut memory) {
                    Ok(n) => println!("restored {n} messages from {}", path.trim()),
                    Err(e) => eprintln!("load failed: {e:#}"),
                }
            }
            ("/team", topic) if !topic.trim().is_empty() => match team.run(topic.trim()).await {
                Ok(report) => {
                    println!("{}", report.final_document);
                    println!(
                        "-- best draft {:?}, {} revisions, approved: {}",
                        report.ranking.best(),
                        report.revisions.len(),
                        report.approved
                    );
                }
                Err(e) => eprintln!("team failed: {e}"),
            },
            (cmd, _) if cmd.starts_with('/') => println!("{HELP}"),
            _ => {
                let cancel = CancellationToken::new();
                let watcher = {
                    let cancel = cancel.clone();
                    tokio::spawn(async move {
                        if tokio::signal::ctrl_c().await.is_ok() {
                            cancel.cancel();
                        }
                    })
                };

                let session = ReactSession::new(&planner, &executor, &recovery)
                    .with_cancel_token(cancel)
                    .with_max_steps(config.agent.max_steps);
                match react_loop(&session, &mut memory, input).await {
                    Ok(result) => println!("{}", result.response),
                    Err(e) => eprintln!("error: {e}"),
                }
                watcher.abort();
            }
        }
    }

    Ok(())
}
