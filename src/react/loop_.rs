//! ReAct 主循环
//!
//! 用户输入 -> Plan（LLM）-> 回复则结束；函数调用则执行并把结果写回对话 -> 下一轮 Plan。
//! 每条消息都经 ConversationMemory::append 写入，剪枝随之发生；记忆错误直接终止本轮，本轮写入全部回滚。
//! 可选 event_tx：向前端推送 StepUpdate / FunctionCall / Observation / Reply 等事件。

use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::core::{AgentError, RecoveryAction, RecoveryEngine};
use crate::memory::{ConversationMemory, ConversationStore, Message};
use crate::react::{parse_llm_output, AgentReply, Planner, ReactEvent};
use crate::tools::ToolExecutor;

/// 单次对话内默认最大 ReAct 步数，防止死循环
pub const DEFAULT_MAX_STEPS: usize = 8;
/// Observation 预览最大字符数
const OBSERVATION_PREVIEW_CHARS: usize = 200;

/// ReAct 循环执行结果：最终回复、所用步数与当前对话
#[derive(Debug)]
pub struct ReactResult {
    pub response: String,
    pub steps: usize,
    pub messages: Vec<Message>,
}

/// ReAct 会话配置
pub struct ReactSession<'a> {
    pub planner: &'a Planner,
    pub executor: &'a ToolExecutor,
    pub recovery: &'a RecoveryEngine,
    pub cancel_token: CancellationToken,
    pub event_tx: Option<&'a UnboundedSender<ReactEvent>>,
    pub max_steps: usize,
}

impl<'a> ReactSession<'a> {
    pub fn new(
        planner: &'a Planner,
        executor: &'a ToolExecutor,
        recovery: &'a RecoveryEngine,
    ) -> Self {
        Self {
            planner,
            executor,
            recovery,
            cancel_token: CancellationToken::new(),
            event_tx: None,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = token;
        self
    }

    pub fn with_event_tx(mut self, tx: &'a UnboundedSender<ReactEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    fn emit(&self, ev: ReactEvent) {
        if let Some(tx) = self.event_tx {
            let _ = tx.send(ev);
        }
    }

    /// 追加一条消息；发生剪枝时推送事件
    fn remember(&self, memory: &mut ConversationMemory, msg: Message) -> Result<(), AgentError> {
        memory.append(msg)?;
        if memory.last_evicted() > 0 {
            self.emit(ReactEvent::MemoryPruned {
                evicted: memory.last_evicted(),
                retained: memory.len(),
            });
        }
        Ok(())
    }

    fn retry_with_prompt(
        &self,
        memory: &mut ConversationMemory,
        raw_output: String,
        err: AgentError,
    ) -> Result<(), AgentError> {
        match self.recovery.handle(&err, &self.executor.tool_names()) {
            RecoveryAction::RetryWithPrompt(prompt) => {
                self.emit(ReactEvent::Recovery {
                    action: "RetryWithPrompt".to_string(),
                    detail: prompt.clone(),
                });
                // 先记下原始输出，再追加纠正提示，保持 user / assistant 交替
                self.remember(memory, Message::assistant(raw_output))?;
                self.remember(memory, Message::user(prompt))?;
                Ok(())
            }
            RecoveryAction::Abort => Err(err),
        }
    }
}

fn preview(text: &str) -> String {
    if text.chars().count() > OBSERVATION_PREVIEW_CHARS {
        let head: String = text.chars().take(OBSERVATION_PREVIEW_CHARS).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

/// 执行 ReAct 循环
///
/// 一轮对话是原子的：任何错误返回前都把记忆恢复到本轮开始时的状态，
/// 不会留下没有回复的 user 消息。
pub async fn react_loop(
    session: &ReactSession<'_>,
    memory: &mut ConversationMemory,
    user_input: &str,
) -> Result<ReactResult, AgentError> {
    let checkpoint = memory.clone();
    let result = run_turn(session, memory, user_input).await;
    if let Err(e) = &result {
        debug!(error = %e, "turn aborted, restoring memory");
        *memory = checkpoint;
    }
    result
}

async fn run_turn(
    session: &ReactSession<'_>,
    memory: &mut ConversationMemory,
    user_input: &str,
) -> Result<ReactResult, AgentError> {
    session.remember(memory, Message::user(user_input))?;

    let mut step = 0;
    loop {
        if session.cancel_token.is_cancelled() {
            session.emit(ReactEvent::Error {
                text: "Cancelled".to_string(),
            });
            return Err(AgentError::Cancelled);
        }
        if step >= session.max_steps {
            session.emit(ReactEvent::Error {
                text: format!("Step limit reached ({})", session.max_steps),
            });
            return Err(AgentError::StepLimitExceeded(session.max_steps));
        }
        step += 1;
        session.emit(ReactEvent::StepUpdate {
            step,
            max_steps: session.max_steps,
        });
        session.emit(ReactEvent::Thinking);

        let request = memory.get_messages();
        let output = tokio::select! {
            _ = session.cancel_token.cancelled() => {
                return Err(AgentError::Cancelled);
            }
            res = session.planner.plan(&request) => match res {
                Ok(o) => o,
                Err(e) => {
                    let action = session.recovery.handle(&e, &session.executor.tool_names());
                    session.emit(ReactEvent::Recovery {
                        action: format!("{action:?}"),
                        detail: e.to_string(),
                    });
                    session.emit(ReactEvent::Error { text: e.to_string() });
                    return Err(e);
                }
            }
        };

        let reply = match parse_llm_output(&output) {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "unparseable LLM output");
                session.retry_with_prompt(memory, output, e)?;
                continue;
            }
        };

        match reply {
            AgentReply::Reply { content } => {
                session.remember(memory, Message::assistant(content.clone()))?;
                session.emit(ReactEvent::Reply {
                    text: content.clone(),
                });
                return Ok(ReactResult {
                    response: content,
                    steps: step,
                    messages: memory.get_messages(),
                });
            }
            AgentReply::FunctionCall { name, arguments } => {
                session.emit(ReactEvent::FunctionCall {
                    name: name.clone(),
                    arguments: arguments.clone(),
                });
                session.remember(
                    memory,
                    Message::assistant_function_call(name.clone(), arguments.clone()),
                )?;

                if !session.executor.has_tool(&name) {
                    let err = AgentError::HallucinatedTool(name.clone());
                    let detail = match session
                        .recovery
                        .handle(&err, &session.executor.tool_names())
                    {
                        RecoveryAction::RetryWithPrompt(p) => p,
                        RecoveryAction::Abort => return Err(err),
                    };
                    session.emit(ReactEvent::Recovery {
                        action: "RetryWithPrompt".to_string(),
                        detail: detail.clone(),
                    });
                    session.remember(
                        memory,
                        Message::function_result(name, format!("Error: {detail}")),
                    )?;
                    continue;
                }

                let observation = match session.executor.execute(&name, arguments).await {
                    Ok(r) => r,
                    Err(e) => {
                        session.emit(ReactEvent::ToolFailure {
                            name: name.clone(),
                            reason: e.to_string(),
                        });
                        format!("Error: {e}")
                    }
                };
                debug!(function = %name, step, "observation recorded");
                session.emit(ReactEvent::Observation {
                    name: name.clone(),
                    preview: preview(&observation),
                });
                session.remember(memory, Message::function_result(name, observation))?;
            }
        }
    }
}
