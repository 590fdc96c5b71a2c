// toolrelay-core/src/transport.rs

//! Backend selection: gateway or direct provider.

use crate::api::ChatClient;
use crate::config::{BackendMode, RelayConfig};
use crate::errors::RelayError;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::Client;
use tracing::{debug, info};

pub const DEFAULT_DIRECT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// An address plus the headers that authorize requests to it.
pub trait Backend: Send + Sync {
    fn mode(&self) -> BackendMode;

    /// Full URL the chat-completion request is posted to.
    fn endpoint(&self) -> &str;

    /// Builds the headers for the API request.
    fn build_headers(&self) -> Result<HeaderMap, RelayError>;
}

pub struct GatewayBackend {
    endpoint: String,
    token: String,
}

impl GatewayBackend {
    pub fn new(base_url: &str, token: impl Into<String>) -> Self {
        Self {
            endpoint: chat_endpoint(base_url),
            token: token.into(),
        }
    }
}

impl Backend for GatewayBackend {
    fn mode(&self) -> BackendMode {
        BackendMode::Gateway
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn build_headers(&self) -> Result<HeaderMap, RelayError> {
        json_headers_with_bearer(&self.token)
    }
}

pub struct DirectBackend {
    endpoint: String,
    api_key: String,
}

impl DirectBackend {
    pub fn new(base_url: Option<&str>, api_key: impl Into<String>) -> Self {
        let endpoint = base_url
            .map(chat_endpoint)
            .unwrap_or_else(|| DEFAULT_DIRECT_ENDPOINT.to_string());
        Self {
            endpoint,
            api_key: api_key.into(),
        }
    }
}

impl Backend for DirectBackend {
    fn mode(&self) -> BackendMode {
        BackendMode::Direct
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn build_headers(&self) -> Result<HeaderMap, RelayError> {
        json_headers_with_bearer(&self.api_key)
    }
}

fn chat_endpoint(base_url: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), CHAT_COMPLETIONS_PATH)
}

fn json_headers_with_bearer(secret: &str) -> Result<HeaderMap, RelayError> {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    let mut auth = HeaderValue::from_str(&format!("Bearer {}", secret))
        .map_err(|_| RelayError::config("credential contains characters not allowed in a header"))?;
    auth.set_sensitive(true);
    headers.insert(header::AUTHORIZATION, auth);
    Ok(headers)
}

/// Chooses the backend once and returns a ready client.
///
/// Fails with [`RelayError::Config`] before any network activity when the
/// selected mode lacks its credential or address. Gateway mode never falls
/// back to direct mode.
pub fn select_transport(config: &RelayConfig) -> Result<ChatClient, RelayError> {
    config.validate()?;

    let backend: Box<dyn Backend> = match config.mode {
        BackendMode::Gateway => {
            let base_url = config.base_url.as_deref().ok_or_else(|| {
                RelayError::config("gateway mode requires a gateway base URL")
            })?;
            let token = config.credentials.bearer_token().ok_or_else(|| {
                RelayError::config("TOKEN environment variable is required for the gateway")
            })?;
            Box::new(GatewayBackend::new(base_url, token))
        }
        BackendMode::Direct => {
            let api_key = config.credentials.api_key().ok_or_else(|| {
                RelayError::config("direct mode requires an access key id")
            })?;
            Box::new(DirectBackend::new(config.base_url.as_deref(), api_key))
        }
    };

    // Header problems surface now rather than on the first request.
    let headers = backend.build_headers()?;
    debug!(header_count = headers.len(), "Built request headers.");

    let http_client = Client::builder()
        .timeout(config.request_timeout())
        .build()
        .map_err(|e| RelayError::config(format!("Failed to build HTTP client: {}", e)))?;

    info!(mode = %backend.mode(), endpoint = %backend.endpoint(), "Selected chat transport.");
    Ok(ChatClient::new(http_client, backend, headers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credentials;

    fn gateway_config(token: Option<&str>) -> RelayConfig {
        RelayConfig {
            mode: BackendMode::Gateway,
            base_url: Some("https://gateway.example.com/".into()),
            credentials: Credentials {
                bearer_token: token.map(String::from),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_gateway_endpoint_and_headers() {
        let backend = GatewayBackend::new("https://gateway.example.com/", "tok");
        assert_eq!(backend.endpoint(), "https://gateway.example.com/v1/chat/completions");
        let headers = backend.build_headers().unwrap();
        assert_eq!(headers[header::AUTHORIZATION], "Bearer tok");
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
    }

    #[test]
    fn test_direct_endpoint_defaults() {
        let backend = DirectBackend::new(None, "key");
        assert_eq!(backend.endpoint(), DEFAULT_DIRECT_ENDPOINT);
        let backend = DirectBackend::new(Some("http://localhost:8080"), "key");
        assert_eq!(backend.endpoint(), "http://localhost:8080/v1/chat/completions");
        assert_eq!(backend.build_headers().unwrap()[header::AUTHORIZATION], "Bearer key");
    }

    #[test]
    fn test_gateway_without_token_is_config_error() {
        for token in [None, Some(""), Some("  ")] {
            let result = select_transport(&gateway_config(token));
            assert!(matches!(result, Err(RelayError::Config(_))), "token {:?}", token);
        }
    }

    #[test]
    fn test_gateway_without_base_url_is_config_error() {
        let config = RelayConfig {
            base_url: None,
            ..gateway_config(Some("tok"))
        };
        assert!(matches!(select_transport(&config), Err(RelayError::Config(_))));
    }

    #[test]
    fn test_gateway_does_not_fall_back_to_direct() {
        let mut config = gateway_config(None);
        config.credentials.access_key_id = Some("AKIA".into());
        assert!(matches!(select_transport(&config), Err(RelayError::Config(_))));
    }

    #[test]
    fn test_direct_requires_key() {
        let config = RelayConfig::default();
        assert!(matches!(select_transport(&config), Err(RelayError::Config(_))));

        let config = RelayConfig {
            credentials: Credentials {
                access_key_id: Some("AKIA".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let client = select_transport(&config).unwrap();
        assert_eq!(client.mode(), BackendMode::Direct);
        assert_eq!(client.endpoint(), DEFAULT_DIRECT_ENDPOINT);
    }

    #[test]
    fn test_header_injection_rejected() {
        let result = select_transport(&gateway_config(Some("tok\nX-Evil: 1")));
        assert!(matches!(result, Err(RelayError::Config(_))));
    }
}
