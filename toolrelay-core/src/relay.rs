// toolrelay-core/src/relay.rs
use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::api::{ChatCompletions, ChatRequest, ChatRequestBuilder, Turn};
use crate::config::RelayConfig;
use crate::errors::{RelayError, QueryPhase};
use crate::extract::{extract_tool_calls, Extraction};
use crate::models::chat::{ChatMessage, ChatResponse, ConversationState};
use crate::tools::WeatherTool;
use crate::transport::select_transport;
use crate::{RelayOutcome, ToolExecutionResult, ToolExecutor};

/// Progress of one user query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryState {
    Idle,
    RequestSent,
    NoToolCall,
    ToolCallDetected,
    ToolsExecuted,
    FollowupSent,
    Done,
    Failed,
}

impl fmt::Display for QueryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

struct QueryRun {
    path: Vec<QueryState>,
}

impl QueryRun {
    fn new() -> Self {
        Self {
            path: vec![QueryState::Idle],
        }
    }

    fn advance(&mut self, next: QueryState) {
        debug!(from = %self.current(), to = %next, "Query state transition.");
        self.path.push(next);
    }

    fn current(&self) -> QueryState {
        self.path.last().copied().unwrap_or(QueryState::Idle)
    }
}

/// The conversation orchestrator.
///
/// Holds only read-only collaborators, so one `Relay` can serve several
/// queries; each query owns its own [`ConversationState`].
pub struct Relay {
    config: RelayConfig,
    chat: Arc<dyn ChatCompletions>,
    tools: Arc<dyn ToolExecutor>,
}

impl Relay {
    pub fn new(
        config: RelayConfig,
        chat: Arc<dyn ChatCompletions>,
        tools: Arc<dyn ToolExecutor>,
    ) -> Self {
        Self {
            config,
            chat,
            tools,
        }
    }

    /// Selects the transport and the weather tool from `config`.
    pub fn from_config(config: RelayConfig) -> Result<Self, RelayError> {
        let chat = select_transport(&config)?;
        let tools = WeatherTool::from_config(&config)?;
        Ok(Self::new(config, Arc::new(chat), Arc::new(tools)))
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Runs one question through at most two chat calls.
    pub async fn run(
        &self,
        question: &str,
        cancel: &CancellationToken,
    ) -> Result<RelayOutcome, RelayError> {
        info!(model = %self.config.model_name, "Starting relay query.");
        let mut run = QueryRun::new();
        match self.run_query(question, cancel, &mut run).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                run.advance(QueryState::Failed);
                error!(error = %e, path = ?run.path, "Relay query failed.");
                Err(e)
            }
        }
    }

    async fn run_query(
        &self,
        question: &str,
        cancel: &CancellationToken,
        run: &mut QueryRun,
    ) -> Result<RelayOutcome, RelayError> {
        let builder = ChatRequestBuilder::new(&self.config);
        let mut state = ConversationState::new(self.tools.definitions());
        state.push_user(question);

        let request = builder.build(&state, Turn::Initial);
        run.advance(QueryState::RequestSent);
        let response = self.send(&request, QueryPhase::Initial, cancel).await?;

        let (assistant, calls) = match extract_tool_calls(&response) {
            Extraction::Final(answer) | Extraction::Unresolved(answer) => {
                run.advance(QueryState::NoToolCall);
                if let Some(message) = response.first_message() {
                    state.push_assistant(message.clone())?;
                }
                return Ok(finish(answer, Vec::new(), state, run));
            }
            Extraction::ToolCalls { assistant, calls } => (assistant, calls),
        };

        run.advance(QueryState::ToolCallDetected);
        info!(count = calls.len(), "Tool call detected. Executing tools.");
        state.push_assistant(assistant)?;

        let mut tool_results = Vec::with_capacity(calls.len());
        for call in calls {
            let tool_name = call.invocation.name();
            debug!(tool_call_id = %call.id, tool_name = %tool_name, "Executing tool.");
            let output = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(RelayError::Cancelled { phase: QueryPhase::ToolExecution });
                }
                output = self.tools.execute(&call.invocation) => output,
            };
            trace!(tool_call_id = %call.id, output = %output.content, "Tool output.");
            state.push_tool_result(&call.id, output.content.clone())?;
            tool_results.push(ToolExecutionResult {
                tool_call_id: call.id,
                tool_name: tool_name.to_string(),
                input: call.invocation.arguments_json(),
                output: output.content,
                status: output.status,
            });
        }
        run.advance(QueryState::ToolsExecuted);

        let follow_up = builder.build(&state, Turn::FollowUp);
        run.advance(QueryState::FollowupSent);
        let final_response = self.send(&follow_up, QueryPhase::FollowUp, cancel).await?;

        let final_message = final_response
            .first_message()
            .cloned()
            .unwrap_or_else(|| ChatMessage::assistant(None, Vec::new()));
        if !final_message.tool_calls().is_empty() {
            warn!(
                count = final_message.tool_calls().len(),
                "Follow-up response requested more tool calls; ignoring them."
            );
        }
        let answer = final_message.text().to_string();
        state.push_assistant(final_message)?;
        Ok(finish(answer, tool_results, state, run))
    }

    async fn send(
        &self,
        request: &ChatRequest,
        phase: QueryPhase,
        cancel: &CancellationToken,
    ) -> Result<ChatResponse, RelayError> {
        info!(phase = %phase, num_messages = request.messages.len(), "Sending chat request.");
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(RelayError::Cancelled { phase }),
            result = self.chat.send(request) => result.map_err(|e| RelayError::request(phase, e)),
        }
    }
}

fn finish(
    final_answer: String,
    tool_results: Vec<ToolExecutionResult>,
    state: ConversationState,
    run: &mut QueryRun,
) -> RelayOutcome {
    run.advance(QueryState::Done);
    info!(answer_len = final_answer.len(), tools_run = tool_results.len(), "Relay query done.");
    RelayOutcome {
        final_answer,
        tool_results,
        messages: state.into_messages(),
        path: run.path.clone(),
    }
}
