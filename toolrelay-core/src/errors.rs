// toolrelay-core/src/errors.rs
use std::fmt;
use thiserror::Error;

/// Step of a query an error belongs to: one of the two chat calls, or the tool run between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryPhase {
    /// The first request, carrying the user question.
    Initial,
    /// The second request, carrying the tool results.
    FollowUp,
    /// Tool execution between the two requests.
    ToolExecution,
}

impl fmt::Display for QueryPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryPhase::Initial => write!(f, "initial request"),
            QueryPhase::FollowUp => write!(f, "follow-up request"),
            QueryPhase::ToolExecution => write!(f, "tool execution"),
        }
    }
}

/// Failures of a single chat-completion call.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Connection refused, DNS failure, timeout and friends.
    #[error("Transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("API error: {status} - {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    /// The body was not the chat-completion shape we expect.
    #[error("Decode error: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn decode(msg: impl Into<String>) -> Self {
        ApiError::Decode(msg.into())
    }
}

/// Errors that end a query in the `Failed` state.
#[derive(Error, Debug)]
pub enum RelayError {
    /// Missing or invalid configuration for the selected backend.
    #[error("Configuration Error: {0}")]
    Config(String),

    /// A chat call failed.
    #[error("Request Error during {phase}: {source}")]
    Request {
        phase: QueryPhase,
        #[source]
        source: ApiError,
    },

    /// A tool message did not answer a pending tool call.
    #[error("History Error: {0}")]
    History(String),

    /// The caller cancelled the query.
    #[error("Cancelled during {phase}")]
    Cancelled { phase: QueryPhase },
}

impl RelayError {
    pub fn config(msg: impl Into<String>) -> Self {
        RelayError::Config(msg.into())
    }

    pub fn request(phase: QueryPhase, source: ApiError) -> Self {
        RelayError::Request { phase, source }
    }

    /// Phase of the failing chat call, if the error came from one.
    pub fn phase(&self) -> Option<QueryPhase> {
        match self {
            RelayError::Request { phase, .. } | RelayError::Cancelled { phase } => Some(*phase),
            _ => None,
        }
    }
}

/// Failures of the tool side effect. Never leaves the tool executor.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("tool service unreachable: {0}")]
    Unreachable(#[source] reqwest::Error),

    #[error("tool service body unreadable: {0}")]
    Unreadable(#[source] reqwest::Error),
}

/// A tool call the extractor had to skip.
#[derive(Error, Debug)]
pub enum ArgumentDecodeError {
    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    #[error("malformed arguments for tool '{name}': {source}")]
    Malformed {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("argument '{field}' for tool '{name}' is blank")]
    Blank { name: String, field: &'static str },
}
