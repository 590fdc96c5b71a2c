// toolrelay-core/src/api.rs

//! Chat-completion request building and the HTTP client that sends it.

use async_trait::async_trait;
use reqwest::header::{self, HeaderMap};
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, trace};
use uuid::Uuid;

use crate::config::{BackendMode, RelayConfig, ToolSchemaPolicy};
use crate::errors::ApiError;
use crate::models::chat::{ChatMessage, ChatResponse, ConversationState};
use crate::models::tools::ToolSpec;
use crate::transport::Backend;

/// Which request of a query is being built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Turn {
    Initial,
    FollowUp,
}

/// Body of `POST /v1/chat/completions`.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolSpec>,
    pub stream: bool,
}

impl ChatRequest {
    pub fn to_json_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

/// Pure transformation from conversation state to a request payload.
pub struct ChatRequestBuilder<'a> {
    config: &'a RelayConfig,
}

impl<'a> ChatRequestBuilder<'a> {
    pub fn new(config: &'a RelayConfig) -> Self {
        Self { config }
    }

    pub fn build(&self, state: &ConversationState, turn: Turn) -> ChatRequest {
        let attach_tools = match (turn, self.config.tool_schema) {
            (Turn::Initial, _) | (Turn::FollowUp, ToolSchemaPolicy::Always) => true,
            (Turn::FollowUp, ToolSchemaPolicy::InitialOnly) => false,
        };
        let tools = if attach_tools {
            state.tools().iter().map(ToolSpec::from).collect()
        } else {
            Vec::new()
        };
        ChatRequest {
            model: self.config.model_name.clone(),
            messages: state.messages().to_vec(),
            tools,
            stream: false,
        }
    }
}

/// Anything that can answer a chat-completion request.
#[async_trait]
pub trait ChatCompletions: Send + Sync {
    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, ApiError>;
}

/// Client bound to one backend, produced by [`crate::transport::select_transport`].
pub struct ChatClient {
    http_client: Client,
    backend: Box<dyn Backend>,
    headers: HeaderMap,
}

impl ChatClient {
    pub(crate) fn new(http_client: Client, backend: Box<dyn Backend>, headers: HeaderMap) -> Self {
        Self {
            http_client,
            backend,
            headers,
        }
    }

    pub fn mode(&self) -> BackendMode {
        self.backend.mode()
    }

    pub fn endpoint(&self) -> &str {
        self.backend.endpoint()
    }
}

/// Helper function to format headers for logging, excluding Authorization.
fn format_headers_for_log(headers: &HeaderMap) -> String {
    headers
        .iter()
        .filter(|(name, _)| *name != header::AUTHORIZATION)
        .map(|(name, value)| {
            format!(
                "\"{}\": \"{}\"",
                name.as_str(),
                value.to_str().unwrap_or("<invalid header value>")
            )
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[async_trait]
impl ChatCompletions for ChatClient {
    /// Exactly one POST, no retries.
    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, ApiError> {
        let url = self.backend.endpoint();
        debug!(
            url = %url,
            headers = %format_headers_for_log(&self.headers),
            model = %request.model,
            num_messages = request.messages.len(),
            num_tools = request.tools.len(),
            "Sending chat completion request."
        );
        trace!(payload = %serde_json::to_string_pretty(request).unwrap_or_default(), "Request JSON");

        let response = self
            .http_client
            .post(url)
            .headers(self.headers.clone())
            .json(request)
            .send()
            .await
            .map_err(ApiError::Transport)?;

        let status = response.status();
        let body = response.text().await.map_err(ApiError::Transport)?;

        if !status.is_success() {
            debug!(status = %status, body = %body, "API request failed.");
            return Err(ApiError::Status { status, body });
        }

        parse_response(&body)
    }
}

/// Decodes a chat-completion body, keeping the raw JSON.
pub fn parse_response(body: &str) -> Result<ChatResponse, ApiError> {
    let raw: Value = serde_json::from_str(body)
        .map_err(|e| ApiError::decode(format!("Failed to read API response body as JSON: {}", e)))?;

    let mut object = match raw.clone() {
        Value::Object(map) => map,
        other => {
            return Err(ApiError::decode(format!(
                "API response was not a JSON object: {}",
                other
            )));
        }
    };

    if !object.contains_key("id") {
        let new_id = format!("chatcmpl-{}", Uuid::new_v4());
        debug!(id = %new_id, "Added missing 'id' field to API response.");
        object.insert("id".to_string(), json!(new_id));
    }

    let mut response: ChatResponse = serde_json::from_value(Value::Object(object))
        .map_err(|e| ApiError::decode(format!("Failed to deserialize API response: {}", e)))?;

    if response.choices.is_empty() {
        return Err(ApiError::decode("API response contained no choices"));
    }
    response.raw = raw;

    match response.first_message() {
        Some(message) if !message.tool_calls().is_empty() => {
            debug!(count = message.tool_calls().len(), "Response carries tool calls.");
        }
        _ => debug!("No tool calls in response."),
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credentials;
    use crate::models::tools::ToolCall;
    use crate::tools::weather_tool_definition;
    use crate::transport::select_transport;
    use httpmock::prelude::*;
    use std::time::Duration;

    fn direct_config(base_url: &str) -> RelayConfig {
        RelayConfig {
            base_url: Some(base_url.to_string()),
            model_name: "test-model-name".into(),
            credentials: Credentials {
                access_key_id: Some("test-api-key".into()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn weather_state() -> ConversationState {
        let mut state = ConversationState::new(vec![weather_tool_definition()]);
        state.push_user("What is the weather in New York City?");
        state
    }

    // --- Tests for ChatRequestBuilder ---
    #[test]
    fn test_build_request_shape() {
        let config = direct_config("http://fake.endpoint");
        let request = ChatRequestBuilder::new(&config).build(&weather_state(), Turn::Initial);
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "model": "test-model-name",
                "messages": [{ "role": "user", "content": "What is the weather in New York City?" }],
                "tools": [{
                    "type": "function",
                    "function": {
                        "name": "get_weather",
                        "description": "Get weather at the given location",
                        "parameters": {
                            "type": "object",
                            "properties": { "location": { "type": "string" } },
                            "required": ["location"]
                        }
                    }
                }],
                "stream": false
            })
        );
    }

    #[test]
    fn test_build_request_is_idempotent() {
        let config = direct_config("http://fake.endpoint");
        let mut state = weather_state();
        state
            .push_assistant(ChatMessage::assistant(
                None,
                vec![ToolCall::function("call_1", "get_weather", r#"{"location":"Paris"}"#)],
            ))
            .unwrap();
        state.push_tool_result("call_1", "Cloudy").unwrap();

        for turn in [Turn::Initial, Turn::FollowUp] {
            let first = ChatRequestBuilder::new(&config).build(&state, turn).to_json_bytes().unwrap();
            let second = ChatRequestBuilder::new(&config).build(&state, turn).to_json_bytes().unwrap();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_tool_schema_policy() {
        let mut config = direct_config("http://fake.endpoint");
        let state = weather_state();
        assert_eq!(ChatRequestBuilder::new(&config).build(&state, Turn::FollowUp).tools.len(), 1);

        config.tool_schema = ToolSchemaPolicy::InitialOnly;
        let builder = ChatRequestBuilder::new(&config);
        assert_eq!(builder.build(&state, Turn::Initial).tools.len(), 1);
        let follow_up = serde_json::to_value(builder.build(&state, Turn::FollowUp)).unwrap();
        assert!(follow_up.get("tools").is_none());
    }

    // --- Tests for parse_response ---
    #[test]
    fn test_parse_response_fills_missing_id() {
        let response = parse_response(
            r#"{"choices": [{"message": {"role": "assistant", "content": "Hi"}}]}"#,
        )
        .unwrap();
        assert!(response.id.starts_with("chatcmpl-"));
        assert_eq!(response.first_message().unwrap().text(), "Hi");
        assert_eq!(response.raw["choices"][0]["message"]["content"], "Hi");
    }

    #[test]
    fn test_parse_response_rejects_bad_bodies() {
        assert!(matches!(parse_response("not json"), Err(ApiError::Decode(_))));
        assert!(matches!(parse_response("[1, 2]"), Err(ApiError::Decode(_))));
        assert!(matches!(parse_response(r#"{"id": "x", "choices": []}"#), Err(ApiError::Decode(_))));
        assert!(matches!(
            parse_response(r#"{"error": {"message": "Invalid API key"}}"#),
            Err(ApiError::Decode(_))
        ));
    }

    // --- Tests for ChatClient::send ---
    #[tokio::test]
    async fn test_send_success() {
        let server = MockServer::start_async().await;
        let config = direct_config(&server.base_url());
        let request = ChatRequestBuilder::new(&config).build(&weather_state(), Turn::Initial);

        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/chat/completions")
                    .header("authorization", "Bearer test-api-key")
                    .json_body(serde_json::to_value(&request).unwrap());
                then.status(200).json_body(json!({
                    "id": "chatcmpl-123",
                    "choices": [{"index": 0, "message": {"role": "assistant", "content": "Pong"}, "finish_reason": "stop"}]
                }));
            })
            .await;

        let client = select_transport(&config).unwrap();
        let response = client.send(&request).await;
        mock.assert_async().await;
        let response = response.unwrap();
        assert_eq!(response.id, "chatcmpl-123");
        assert_eq!(response.choices[0].finish_reason.as_deref(), Some("stop"));
    }

    #[tokio::test]
    async fn test_send_reports_status_without_retry() {
        let server = MockServer::start_async().await;
        let config = direct_config(&server.base_url());
        let request = ChatRequestBuilder::new(&config).build(&weather_state(), Turn::Initial);

        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(500).body("Server error");
            })
            .await;

        let client = select_transport(&config).unwrap();
        let result = client.send(&request).await;
        assert_eq!(mock.hits_async().await, 1);
        match result {
            Err(ApiError::Status { status, body }) => {
                assert_eq!(status.as_u16(), 500);
                assert_eq!(body, "Server error");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_send_malformed_body_is_decode_error() {
        let server = MockServer::start_async().await;
        let config = direct_config(&server.base_url());
        let request = ChatRequestBuilder::new(&config).build(&weather_state(), Turn::Initial);

        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(200).body("{ definitely not json");
            })
            .await;

        let client = select_transport(&config).unwrap();
        assert!(matches!(client.send(&request).await, Err(ApiError::Decode(_))));
    }

    #[tokio::test]
    async fn test_send_connection_refused_is_transport_error() {
        // Nothing listens on port 9 (discard) in the test environment.
        let mut config = direct_config("http://127.0.0.1:9");
        config.timeout_secs = 2;
        let request = ChatRequestBuilder::new(&config).build(&weather_state(), Turn::Initial);
        let client = select_transport(&config).unwrap();
        assert_eq!(config.request_timeout(), Duration::from_secs(2));
        assert!(matches!(client.send(&request).await, Err(ApiError::Transport(_))));
    }
}
