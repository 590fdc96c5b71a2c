// toolrelay-cli/src/credentials.rs

//! Writes the AWS shared-credentials file consumed by the gateway sidecar.

use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use toolrelay_core::Credentials;

pub const CREDENTIALS_FILE_NAME: &str = "aws-credential-file";

fn render(credentials: &Credentials) -> Result<String> {
    let key_id = credentials
        .access_key_id
        .as_deref()
        .ok_or_else(|| anyhow!("--aws-access-key-id is required to write credentials"))?;
    let secret = credentials
        .secret_access_key
        .as_deref()
        .ok_or_else(|| anyhow!("--aws-secret-key is required to write credentials"))?;

    let mut body = format!(
        "[default]\nAWS_ACCESS_KEY_ID={}\nAWS_SECRET_ACCESS_KEY={}\n",
        key_id, secret
    );
    if let Some(session) = credentials.session_token.as_deref().filter(|s| !s.is_empty()) {
        body.push_str(&format!("AWS_SESSION_TOKEN={}\n", session));
    }
    Ok(body)
}

/// Writes `[default]` credentials into `dir`, replacing any previous file.
pub fn write_credentials(dir: &Path, credentials: &Credentials) -> Result<PathBuf> {
    let body = render(credentials)?;
    let path = dir.join(CREDENTIALS_FILE_NAME);
    fs::write(&path, body)
        .with_context(|| format!("Failed to write credentials file: {:?}", path))?;
    info!(path = %path.display(), "Wrote AWS credentials file.");
    Ok(path)
}
