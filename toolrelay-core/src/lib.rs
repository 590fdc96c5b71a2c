// toolrelay-core/src/lib.rs

//! Tool-calling conversation relay.
//!
//! A [`Relay`] sends one user question to a chat-completion endpoint with a
//! tool schema attached, runs the tool calls the model asks for, feeds the
//! results back and returns the model's final answer. The backend (gateway
//! or direct provider) is chosen once by [`transport::select_transport`].

pub mod api;
pub mod config;
pub mod errors;
pub mod extract;
pub mod relay;
pub mod tools;
pub mod transport;

pub mod models {
    pub mod chat;
    pub mod tools;
}


pub use api::{ChatClient, ChatCompletions, ChatRequest, ChatRequestBuilder, Turn};
pub use async_trait::async_trait;
pub use config::{BackendMode, Credentials, RelayConfig, ToolSchemaPolicy, ToolServiceConfig};
pub use errors::{ApiError, RelayError, QueryPhase};
pub use models::chat::{ChatMessage, ChatResponse, Choice, ConversationState};
pub use models::tools::{ToolCall, ToolDefinition, ToolFunction};
pub use relay::{QueryState, Relay};
pub use tokio_util::sync::CancellationToken;
pub use tools::{ToolInvocation, WeatherArgs, WeatherTool};

use serde::{Deserialize, Serialize};

/// Trait defining the interface for executing tools requested by the model.
///
/// Execution cannot fail from the caller's point of view: implementations
/// turn their own failures into a degraded textual result.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Returns the definitions of all tools available.
    fn definitions(&self) -> Vec<ToolDefinition>;
    /// Executes one decoded tool call.
    async fn execute(&self, invocation: &ToolInvocation) -> ToolOutput;
}

/// Text produced by a tool plus how it was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub content: String,
    pub status: ToolExecutionStatus,
}

/// Indicates whether a tool produced real data.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ToolExecutionStatus {
    /// The tool produced its normal result.
    Success,
    /// The tool failed and a fallback text was used instead.
    Degraded,
}

/// Details the execution result of a single tool call within a [`RelayOutcome`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolExecutionResult {
    /// The unique ID associated with the AI's request to call this tool.
    pub tool_call_id: String,
    /// The name of the tool that was executed.
    pub tool_name: String,
    /// The decoded input arguments.
    pub input: serde_json::Value,
    /// The text sent back to the model.
    pub output: String,
    pub status: ToolExecutionStatus,
}

/// Represents the final output of a [`Relay::run`] execution.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayOutcome {
    /// Content of the last assistant message.
    pub final_answer: String,
    pub tool_results: Vec<ToolExecutionResult>,
    /// Full history of the query, in turn order.
    pub messages: Vec<ChatMessage>,
    /// States visited, from `Idle` to `Done`.
    pub path: Vec<QueryState>,
}
