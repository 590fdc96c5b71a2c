use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// toolrelay: asks a chat model one question and answers its weather tool calls.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase message verbosity.
    ///
    /// Specify multiple times for more verbose output:
    ///  -v:  INFO level
    ///  -vv: DEBUG level
    ///  -vvv: TRACE level (most verbose)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// The question sent to the model.
    #[arg(short, long, default_value = "What is the weather in New York City?")]
    pub question: String,

    /// TOML configuration file. Defaults to `Toolrelay.toml` in the working directory if present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Route chat requests through the AI gateway.
    #[arg(long)]
    pub use_ai_gateway: bool,

    /// Base address of the AI gateway.
    #[arg(long)]
    pub ai_gateway_url: Option<String>,

    /// Gateway bearer token.
    #[arg(long, env = "TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    #[arg(long)]
    pub aws_access_key_id: Option<String>,

    #[arg(long)]
    pub aws_secret_key: Option<String>,

    #[arg(long)]
    pub aws_session_token: Option<String>,

    /// Model identifier sent with every request.
    #[arg(long)]
    pub model_name: Option<String>,

    /// Address of the weather service. A mock report is used when unset.
    #[arg(long)]
    pub tool_url: Option<String>,

    /// Call the weather service without the `location` query parameter.
    #[arg(long)]
    pub no_forward_location: bool,

    /// Attach the tool schema to the first request only.
    #[arg(long)]
    pub tools_initial_only: bool,

    /// Per-request timeout in seconds.
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Write the AWS credentials file to the temp directory before running.
    #[arg(long)]
    pub write_credentials: bool,
}
