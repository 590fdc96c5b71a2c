// toolrelay-core/src/models/chat.rs
use super::tools::{ToolCall, ToolDefinition};
use crate::errors::RelayError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One turn of the conversation as it travels over the wire.
///
/// The `role` field selects the variant.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum ChatMessage {
    User {
        content: String,
    },
    Assistant {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        #[serde(
            default,
            deserialize_with = "null_as_empty",
            skip_serializing_if = "Vec::is_empty"
        )]
        tool_calls: Vec<ToolCall>,
    },
    Tool {
        content: String,
        tool_call_id: String,
    },
}

/// Providers send `"tool_calls": null` when nothing was requested.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage::User {
            content: content.into(),
        }
    }

    pub fn assistant(content: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        ChatMessage::Assistant {
            content,
            tool_calls,
        }
    }

    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        ChatMessage::Tool {
            content: content.into(),
            tool_call_id: tool_call_id.into(),
        }
    }

    pub fn role(&self) -> &'static str {
        match self {
            ChatMessage::User { .. } => "user",
            ChatMessage::Assistant { .. } => "assistant",
            ChatMessage::Tool { .. } => "tool",
        }
    }

    /// Text of the message; empty for an assistant turn that only calls tools.
    pub fn text(&self) -> &str {
        match self {
            ChatMessage::User { content } | ChatMessage::Tool { content, .. } => content,
            ChatMessage::Assistant { content, .. } => content.as_deref().unwrap_or(""),
        }
    }

    pub fn tool_calls(&self) -> &[ToolCall] {
        match self {
            ChatMessage::Assistant { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }
}

/// Represents one of the choices returned by the AI API.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Choice {
    #[serde(default)]
    pub index: u32,
    pub message: ChatMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Decoded chat-completion response. The undecoded body is kept in `raw`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChatResponse {
    pub id: String,
    pub choices: Vec<Choice>,
    #[serde(skip)]
    pub raw: Value,
}

impl ChatResponse {
    pub fn first_message(&self) -> Option<&ChatMessage> {
        self.choices.first().map(|choice| &choice.message)
    }
}

/// Message history plus the tools declared for one user query.
///
/// Append-only. Tool results are only accepted for calls requested by the
/// latest assistant turn, and at most once per call id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationState {
    messages: Vec<ChatMessage>,
    tools: Vec<ToolDefinition>,
}

impl ConversationState {
    pub fn new(tools: Vec<ToolDefinition>) -> Self {
        Self {
            messages: Vec::new(),
            tools,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn tools(&self) -> &[ToolDefinition] {
        &self.tools
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn into_messages(self) -> Vec<ChatMessage> {
        self.messages
    }

    pub fn push_user(&mut self, content: impl Into<String>) -> &mut Self {
        self.messages.push(ChatMessage::user(content));
        self
    }

    pub fn push_assistant(&mut self, message: ChatMessage) -> Result<(), RelayError> {
        if !matches!(message, ChatMessage::Assistant { .. }) {
            return Err(RelayError::History(format!(
                "expected an assistant message, got role '{}'",
                message.role()
            )));
        }
        self.messages.push(message);
        Ok(())
    }

    /// Appends a tool result answering `tool_call_id`.
    pub fn push_tool_result(
        &mut self,
        tool_call_id: &str,
        content: impl Into<String>,
    ) -> Result<(), RelayError> {
        let pending = self.pending_tool_call_ids();
        if !pending.contains(&tool_call_id) {
            return Err(RelayError::History(format!(
                "tool call id '{}' is not pending in the preceding assistant message",
                tool_call_id
            )));
        }
        self.messages.push(ChatMessage::tool(tool_call_id, content));
        Ok(())
    }

    /// Call ids of the latest assistant turn that have no tool message yet.
    pub fn pending_tool_call_ids(&self) -> Vec<&str> {
        let mut answered: Vec<&str> = Vec::new();
        for message in self.messages.iter().rev() {
            match message {
                ChatMessage::Tool { tool_call_id, .. } => answered.push(tool_call_id),
                ChatMessage::Assistant { tool_calls, .. } => {
                    return tool_calls
                        .iter()
                        .map(|call| call.id.as_str())
                        .filter(|id| !answered.contains(id))
                        .collect();
                }
                ChatMessage::User { .. } => break,
            }
        }
        Vec::new()
    }
}
