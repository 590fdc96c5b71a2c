// toolrelay-core/src/tools/weather.rs

//! The `get_weather` side effect.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, info, warn};

use super::{weather_tool_definition, ToolInvocation};
use crate::config::{RelayConfig, ToolServiceConfig};
use crate::errors::{RelayError, ToolError};
use crate::models::tools::ToolDefinition;
use crate::{ToolExecutionStatus, ToolExecutor, ToolOutput};

/// Result text used whenever the tool service cannot be used.
pub const WEATHER_UNAVAILABLE: &str = "Weather data unavailable.";

/// Stand-in report used when no tool service is configured.
pub fn mock_weather_report(location: &str) -> String {
    format!("The weather in {} is 22°C with scattered clouds.", location)
}

/// Looks the weather up on an external HTTP service, or returns a mock.
pub struct WeatherTool {
    http_client: Client,
    service: Option<ToolServiceConfig>,
}

impl WeatherTool {
    pub fn new(http_client: Client, service: Option<ToolServiceConfig>) -> Self {
        Self {
            http_client,
            service,
        }
    }

    pub fn from_config(config: &RelayConfig) -> Result<Self, RelayError> {
        let http_client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| RelayError::config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self::new(http_client, config.tool_service.clone()))
    }

    /// Single GET against the service. Not retried.
    ///
    /// The body is returned whatever the status; only I/O failures are errors.
    async fn fetch(
        &self,
        service: &ToolServiceConfig,
        location: &str,
    ) -> Result<(StatusCode, String), ToolError> {
        let mut request = self.http_client.get(&service.url);
        if service.forward_location {
            request = request.query(&[("location", location)]);
        }
        let response = request.send().await.map_err(ToolError::Unreachable)?;
        let status = response.status();
        let body = response.text().await.map_err(ToolError::Unreadable)?;
        Ok((status, body))
    }

    async fn weather_for(&self, location: &str) -> ToolOutput {
        let Some(service) = &self.service else {
            info!(location = %location, "No tool service configured, using mock weather response.");
            return ToolOutput::success(mock_weather_report(location));
        };

        debug!(url = %service.url, forward_location = service.forward_location, "Fetching weather data.");
        match self.fetch(service, location).await {
            Ok((status, body)) if status.is_success() => {
                info!(location = %location, bytes = body.len(), "Received weather data.");
                ToolOutput::success(body)
            }
            Ok((status, body)) => {
                warn!(url = %service.url, status = %status, "Tool service answered with an error status, passing its body through.");
                ToolOutput::degraded(body)
            }
            Err(e) => {
                warn!(url = %service.url, error = %e, "Weather lookup failed, returning sentinel.");
                ToolOutput::degraded(WEATHER_UNAVAILABLE)
            }
        }
    }
}

#[async_trait]
impl ToolExecutor for WeatherTool {
    fn definitions(&self) -> Vec<ToolDefinition> {
        vec![weather_tool_definition()]
    }

    async fn execute(&self, invocation: &ToolInvocation) -> ToolOutput {
        match invocation {
            ToolInvocation::GetWeather(args) => self.weather_for(&args.location).await,
        }
    }
}

impl ToolOutput {
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            status: ToolExecutionStatus::Success,
        }
    }

    pub fn degraded(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            status: ToolExecutionStatus::Degraded,
        }
    }
}
