// toolrelay-core/src/extract.rs

//! Picks the usable tool calls out of a chat response.

use tracing::{debug, warn};

use crate::models::chat::{ChatMessage, ChatResponse};
use crate::models::tools::ToolCall;
use crate::tools::ToolInvocation;

/// A tool call that named a known tool and carried valid arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedToolCall {
    pub id: String,
    pub invocation: ToolInvocation,
}

/// What the first choice of a response asks the orchestrator to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    /// No tool calls: the content is the final answer.
    Final(String),
    /// Tool calls were requested but none could be used; the content is the final answer.
    Unresolved(String),
    /// At least one usable call.
    ///
    /// `assistant` is the assistant turn to record, restricted to the accepted
    /// calls in the order the model listed them.
    ToolCalls {
        assistant: ChatMessage,
        calls: Vec<ResolvedToolCall>,
    },
}

/// Inspects the first choice of `response`.
///
/// Calls to unknown tools and calls whose arguments do not decode are logged
/// and skipped; they never fail the turn.
pub fn extract_tool_calls(response: &ChatResponse) -> Extraction {
    let Some(message) = response.first_message() else {
        return Extraction::Final(String::new());
    };
    let content = message.text().to_string();
    let tool_calls = message.tool_calls();

    if tool_calls.is_empty() {
        debug!("No tool call detected.");
        return Extraction::Final(content);
    }

    let mut accepted: Vec<ToolCall> = Vec::new();
    let mut calls: Vec<ResolvedToolCall> = Vec::new();
    for tool_call in tool_calls {
        if calls.iter().any(|c| c.id == tool_call.id) {
            warn!(tool_call_id = %tool_call.id, "Duplicate tool call id in response, skipping.");
            continue;
        }
        match ToolInvocation::decode(&tool_call.function.name, &tool_call.function.arguments) {
            Ok(invocation) => {
                debug!(tool_call_id = %tool_call.id, tool_name = %tool_call.function.name, "Accepted tool call.");
                accepted.push(tool_call.clone());
                calls.push(ResolvedToolCall {
                    id: tool_call.id.clone(),
                    invocation,
                });
            }
            Err(e) => {
                warn!(
                    tool_call_id = %tool_call.id,
                    arguments = %tool_call.function.arguments,
                    error = %e,
                    "Skipping tool call."
                );
            }
        }
    }

    if calls.is_empty() {
        warn!(requested = tool_calls.len(), "No usable tool call, using assistant message as final answer.");
        return Extraction::Unresolved(content);
    }

    let assistant_content = match message {
        ChatMessage::Assistant { content, .. } => content.clone(),
        _ => None,
    };
    Extraction::ToolCalls {
        assistant: ChatMessage::assistant(assistant_content, accepted),
        calls,
    }
}
