// toolrelay-cli/src/settings.rs

//! Resolves the [`RelayConfig`] from the optional TOML file and the command line.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use toolrelay_core::{BackendMode, RelayConfig, ToolSchemaPolicy, ToolServiceConfig};

use crate::models::cli::Cli;

pub const CONFIG_FILENAME: &str = "Toolrelay.toml";

/// Picks the explicit `--config` path, or `Toolrelay.toml` in `cwd` if it exists.
fn config_path(cli: &Cli, cwd: &Path) -> Option<PathBuf> {
    if let Some(path) = &cli.config {
        return Some(path.clone());
    }
    let candidate = cwd.join(CONFIG_FILENAME);
    candidate.is_file().then_some(candidate)
}

pub fn load_relay_config(cli: &Cli, cwd: &Path) -> Result<RelayConfig> {
    let base = match config_path(cli, cwd) {
        Some(path) => {
            info!("Found configuration file at: {:?}", path);
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            RelayConfig::from_toml_str(&content)
                .with_context(|| format!("Failed to parse or validate {:?}", path))?
        }
        None => {
            debug!("No configuration file, starting from defaults.");
            RelayConfig::default()
        }
    };
    let config = apply_cli_overrides(base, cli);
    config.validate()?;
    Ok(config)
}

/// Flags win over file values; absent flags leave the file values alone.
pub fn apply_cli_overrides(mut config: RelayConfig, cli: &Cli) -> RelayConfig {
    if cli.use_ai_gateway {
        config.mode = BackendMode::Gateway;
    }
    if let Some(url) = &cli.ai_gateway_url {
        config.base_url = Some(url.clone());
    }
    if let Some(token) = &cli.token {
        config.credentials.bearer_token = Some(token.clone());
    }
    if let Some(key) = &cli.aws_access_key_id {
        config.credentials.access_key_id = Some(key.clone());
    }
    if let Some(secret) = &cli.aws_secret_key {
        config.credentials.secret_access_key = Some(secret.clone());
    }
    if let Some(session) = &cli.aws_session_token {
        config.credentials.session_token = Some(session.clone());
    }
    if let Some(model) = &cli.model_name {
        config.model_name = model.clone();
    }
    if let Some(url) = &cli.tool_url {
        match config.tool_service.as_mut() {
            Some(service) => service.url = url.clone(),
            None => {
                config.tool_service = Some(ToolServiceConfig {
                    url: url.clone(),
                    forward_location: true,
                })
            }
        }
    }
    if cli.no_forward_location {
        if let Some(service) = config.tool_service.as_mut() {
            service.forward_location = false;
        }
    }
    if cli.tools_initial_only {
        config.tool_schema = ToolSchemaPolicy::InitialOnly;
    }
    if let Some(secs) = cli.timeout_secs {
        config.timeout_secs = secs;
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::tempdir;
    use toolrelay_core::config::DEFAULT_MODEL_NAME;

    fn cli(args: &[&str]) -> Cli {
        let mut full = vec!["toolrelay"];
        full.extend_from_slice(args);
        Cli::parse_from(full)
    }

    #[test]
    fn defaults_without_file_or_flags() -> Result<()> {
        let dir = tempdir()?;
        let config = load_relay_config(&cli(&[]), dir.path())?;
        assert_eq!(config.mode, BackendMode::Direct);
        assert_eq!(config.model_name, DEFAULT_MODEL_NAME);
        assert!(config.tool_service.is_none());
        assert_eq!(config.tool_schema, ToolSchemaPolicy::Always);
        Ok(())
    }

    #[test]
    fn question_has_weather_default() {
        assert_eq!(cli(&[]).question, "What is the weather in New York City?");
    }

    #[test]
    fn flags_override_file_values() -> Result<()> {
        let dir = tempdir()?;
        fs::write(
            dir.path().join(CONFIG_FILENAME),
            r#"
                mode = "direct"
                model_name = "from-file"
                timeout_secs = 10

                [tool_service]
                url = "http://weather.internal/now"
            "#,
        )?;
        let args = cli(&[
            "--use-ai-gateway",
            "--ai-gateway-url",
            "https://gateway.example.com",
            "--token",
            "tok",
            "--model-name",
            "from-flag",
            "--no-forward-location",
            "--tools-initial-only",
        ]);
        let config = load_relay_config(&args, dir.path())?;

        assert_eq!(config.mode, BackendMode::Gateway);
        assert_eq!(config.base_url.as_deref(), Some("https://gateway.example.com"));
        assert_eq!(config.credentials.bearer_token(), Some("tok"));
        assert_eq!(config.model_name, "from-flag");
        assert_eq!(config.timeout_secs, 10);
        let service = config.tool_service.expect("tool service from file");
        assert_eq!(service.url, "http://weather.internal/now");
        assert!(!service.forward_location);
        assert_eq!(config.tool_schema, ToolSchemaPolicy::InitialOnly);
        Ok(())
    }

    #[test]
    fn tool_url_flag_keeps_file_forwarding_setting() -> Result<()> {
        let dir = tempdir()?;
        fs::write(
            dir.path().join(CONFIG_FILENAME),
            r#"
                [tool_service]
                url = "http://weather.internal/now"
                forward_location = false
            "#,
        )?;
        let config = load_relay_config(&cli(&["--tool-url", "http://localhost:8080/w"]), dir.path())?;
        let service = config.tool_service.expect("tool service");
        assert_eq!(service.url, "http://localhost:8080/w");
        assert!(!service.forward_location);
        Ok(())
    }

    #[test]
    fn tool_url_flag_alone_forwards_location() -> Result<()> {
        let dir = tempdir()?;
        let config = load_relay_config(&cli(&["--tool-url", "http://localhost:8080/w"]), dir.path())?;
        assert!(config.tool_service.expect("tool service").forward_location);
        Ok(())
    }

    #[test]
    fn explicit_config_path_is_used() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("custom.toml");
        fs::write(&path, "model_name = \"custom\"\n")?;
        let config = load_relay_config(&cli(&["--config", path.to_str().unwrap()]), Path::new("/"))?;
        assert_eq!(config.model_name, "custom");
        Ok(())
    }

    #[test]
    fn invalid_tool_url_is_rejected() {
        let dir = tempdir().unwrap();
        let result = load_relay_config(&cli(&["--tool-url", "not a url"]), dir.path());
        assert!(result.is_err());
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        let result = load_relay_config(&cli(&["--config", missing.to_str().unwrap()]), dir.path());
        assert!(result.is_err());
    }
}
