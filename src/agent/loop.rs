use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::events::EventSink;
use super::prompt::system_prompt;
use super::state::DocumentState;
use super::tool::{self, ToolExecutionResult, ToolExecutor};
use super::types::{Message, Tool};
use crate::error::{ToolError, TurnError};
use crate::types::{CandidatureConfig, ResumeDocument};

/// Tool rounds allowed in one turn before the loop gives up
pub const DEFAULT_MAX_ROUNDS: usize = 25;

const NO_CONTENT: &str = "No content returned";

pub trait LLMProvider {
    /// One chat completion. `Ok(None)` means the provider returned no choices.
    async fn call(&mut self, messages: &[Message], tools: &[Tool]) -> anyhow::Result<Option<Message>>;
}

/// Final answer of a turn plus the documents it changed
#[derive(Debug)]
pub struct TurnOutcome {
    pub content: String,
    pub updated_resume: Option<ResumeDocument>,
    pub updated_config: Option<CandidatureConfig>,
    /// Full transcript sent to the provider, system prompt included
    pub messages: Vec<Message>,
    pub rounds: usize,
}

pub struct AgentLoop<P: LLMProvider> {
    provider: P,
    executor: ToolExecutor,
    tools: Vec<Tool>,
    max_rounds: usize,
}

impl<P: LLMProvider> AgentLoop<P> {
    pub fn new(provider: P, executor: ToolExecutor) -> Self {
        Self {
            provider,
            executor,
            tools: tool::definitions(),
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }

    pub fn max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }

    /// Run one conversational turn.
    ///
    /// `history` is the user-visible conversation ending with the new user
    /// message. Tool calls run one at a time in the order the model sent
    /// them, and every call is answered with a tool message before the next
    /// completion.
    pub async fn handle_turn(
        &mut self,
        history: &[Message],
        resume: Option<ResumeDocument>,
        config: Option<CandidatureConfig>,
        events: EventSink,
        cancel: &CancellationToken,
    ) -> Result<TurnOutcome, TurnError> {
        let mut state = DocumentState::new(resume, config);
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(Message::system(system_prompt(state.resume(), state.config())));
        messages.extend_from_slice(history);

        info!("Starting turn with {} history messages", history.len());
        let mut rounds = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(TurnError::Cancelled);
            }

            trace!(
                "Calling LLM with {} messages and {} tools",
                messages.len(),
                self.tools.len()
            );
            let response = tokio::select! {
                _ = cancel.cancelled() => return Err(TurnError::Cancelled),
                response = self.provider.call(&messages, &self.tools) => response?,
            };
            let message = response.ok_or(TurnError::NoResponseFromAgent)?;

            let tool_calls = message.requested_tool_calls().to_vec();
            if tool_calls.is_empty() {
                let content = message
                    .content
                    .clone()
                    .filter(|c| !c.is_empty())
                    .unwrap_or_else(|| NO_CONTENT.to_string());
                messages.push(message);
                let (updated_resume, updated_config) = state.into_updates();
                info!(
                    "Turn completed after {} tool rounds (resume updated: {}, config updated: {})",
                    rounds,
                    updated_resume.is_some(),
                    updated_config.is_some()
                );
                return Ok(TurnOutcome {
                    content,
                    updated_resume,
                    updated_config,
                    messages,
                    rounds,
                });
            }

            if rounds >= self.max_rounds {
                warn!("Model still requesting tools after {} rounds", rounds);
                return Err(TurnError::RoundLimitExceeded(self.max_rounds));
            }
            rounds += 1;

            if let Some(content) = message.content.as_deref().filter(|c| !c.is_empty()) {
                debug!("LLM response content: {}", content);
                events.assistant_partial(content);
            }
            messages.push(message);

            debug!("LLM requested {} tool calls", tool_calls.len());
            for call in &tool_calls {
                if cancel.is_cancelled() {
                    return Err(TurnError::Cancelled);
                }

                let name = call.function.name.as_str();
                let execution = match call.parsed_arguments() {
                    Ok(args) => {
                        events.tool_start(name, &args);
                        self.executor.execute(name, args, state.context()).await
                    }
                    Err(e) => {
                        warn!("Tool {} called with malformed arguments: {}", name, e);
                        events.tool_start(name, &serde_json::Value::Null);
                        ToolExecutionResult::error(&ToolError::InvalidArguments(e))
                    }
                };

                if let Some(mutation) = execution.mutation {
                    debug!("Tool {} updated the turn documents", name);
                    state.apply(mutation);
                }
                events.tool_end(name, &execution.result);
                trace!("Tool {} result: {}", name, execution.result);
                messages.push(Message::tool(&call.id, execution.result.to_string()));
            }
        }
    }
}
