// toolrelay-core/src/tools/mod.rs

//! Tools the model may call, with their schemas and typed arguments.
//!
//! Only `get_weather` is registered. Adding a tool means adding a
//! [`ToolInvocation`] variant, its definition, and a branch in the executor.

pub mod weather;

use crate::errors::ArgumentDecodeError;
use crate::models::tools::{
    ToolDefinition, ToolParameter, ToolParameterType, ToolParametersDefinition,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use weather::{mock_weather_report, WeatherTool, WEATHER_UNAVAILABLE};

pub const GET_WEATHER: &str = "get_weather";

/// Arguments of `get_weather`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct WeatherArgs {
    pub location: String,
}

/// A decoded, known tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolInvocation {
    GetWeather(WeatherArgs),
}

impl ToolInvocation {
    /// Decodes the raw JSON arguments of a call to `name`.
    pub fn decode(name: &str, arguments: &str) -> Result<Self, ArgumentDecodeError> {
        match name {
            GET_WEATHER => {
                let args: WeatherArgs = serde_json::from_str(arguments).map_err(|source| {
                    ArgumentDecodeError::Malformed {
                        name: name.to_string(),
                        source,
                    }
                })?;
                if args.location.trim().is_empty() {
                    return Err(ArgumentDecodeError::Blank {
                        name: name.to_string(),
                        field: "location",
                    });
                }
                Ok(ToolInvocation::GetWeather(args))
            }
            other => Err(ArgumentDecodeError::UnknownTool(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ToolInvocation::GetWeather(_) => GET_WEATHER,
        }
    }

    /// Arguments as JSON, for reporting.
    pub fn arguments_json(&self) -> serde_json::Value {
        match self {
            ToolInvocation::GetWeather(args) => {
                serde_json::to_value(args).unwrap_or(serde_json::Value::Null)
            }
        }
    }
}

/// Schema of `get_weather`: one required string `location`.
pub fn weather_tool_definition() -> ToolDefinition {
    let mut properties = BTreeMap::new();
    properties.insert(
        "location".to_string(),
        ToolParameter {
            param_type: ToolParameterType::String,
            description: String::new(),
        },
    );
    ToolDefinition {
        name: GET_WEATHER.to_string(),
        description: "Get weather at the given location".to_string(),
        parameters: ToolParametersDefinition {
            param_type: "object".to_string(),
            properties,
            required: vec!["location".to_string()],
        },
    }
}
