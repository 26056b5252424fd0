use std::str::FromStr;

use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value, json};

use crate::{
    core::advisor::ChargingAdvisor,
    error::AdvisorError,
    mcp::protocol::CallToolResult,
    prelude::*,
};

/// Tools exposed by the gateway.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Tool {
    BestChargingHours,
    CurrentPvpcPrices,
}

impl Tool {
    pub const ALL: [Self; 2] = [Self::BestChargingHours, Self::CurrentPvpcPrices];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::BestChargingHours => "get_best_charging_hours",
            Self::CurrentPvpcPrices => "get_current_pvpc_prices",
        }
    }

    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::BestChargingHours => {
                "Get best hours to charge electric car based on Spanish PVPC electricity prices"
            }
            Self::CurrentPvpcPrices => {
                "Get current Spanish PVPC electricity prices for a specific date"
            }
        }
    }

    /// JSON schema of the tool arguments.
    #[must_use]
    pub fn input_schema(self) -> Value {
        let date = json!({
            "type": "string",
            "description": "Date in YYYY-MM-DD format (default: today)",
            "pattern": r"^\d{4}-\d{2}-\d{2}$",
        });
        match self {
            Self::BestChargingHours => json!({
                "type": "object",
                "properties": {
                    "date": date,
                    "start_hour": {
                        "type": "integer",
                        "description": "Start hour for charging window (0-23, default: 22)",
                        "minimum": 0,
                        "maximum": 23,
                    },
                    "end_hour": {
                        "type": "integer",
                        "description": "End hour for charging window (0-23, can be < start_hour for midnight crossing, default: 7)",
                        "minimum": 0,
                        "maximum": 23,
                    },
                    "kwh": {
                        "type": "number",
                        "description": "Estimated consumption in kWh (default: 10.0)",
                        "minimum": 0.1,
                        "maximum": 100.0,
                    },
                },
                "required": [],
            }),
            Self::CurrentPvpcPrices => json!({
                "type": "object",
                "properties": {"date": date},
                "required": [],
            }),
        }
    }

    /// Entry of the `tools/list` response.
    #[must_use]
    pub fn definition(self) -> Value {
        json!({
            "name": self.name(),
            "description": self.description(),
            "inputSchema": self.input_schema(),
        })
    }
}

impl FromStr for Tool {
    type Err = AdvisorError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|tool| tool.name() == name)
            .ok_or_else(|| AdvisorError::UnknownTool(name.to_string()))
    }
}

/// Run the tool and render the outcome as text, errors included.
#[instrument(skip_all, fields(name = name))]
pub async fn call(advisor: &ChargingAdvisor, name: &str, arguments: Value) -> CallToolResult {
    match dispatch(advisor, name, arguments).await {
        Ok(text) => {
            info!("succeeded");
            CallToolResult::text(text)
        }
        Err(error) => {
            if error.is_no_data() {
                warn!("{error:#}");
            } else {
                error!("{error:#}");
            }
            CallToolResult::error(format!("Error in charging advisor: {error}"))
        }
    }
}

async fn dispatch(
    advisor: &ChargingAdvisor,
    name: &str,
    arguments: Value,
) -> Result<String, AdvisorError> {
    let tool = name.parse::<Tool>()?;
    let arguments = if arguments.is_null() { Value::Object(Map::new()) } else { arguments };
    match tool {
        Tool::BestChargingHours => to_text(&advisor.best_window(&decode(arguments)?).await?),
        Tool::CurrentPvpcPrices => to_text(&advisor.daily_summary(&decode(arguments)?).await?),
    }
}

fn decode<T: DeserializeOwned>(arguments: Value) -> Result<T, AdvisorError> {
    serde_json::from_value(arguments)
        .map_err(|error| AdvisorError::InvalidArgument(error.to_string()))
}

/// Pretty-printed JSON, non-ASCII characters kept as is.
fn to_text(value: &impl Serialize) -> Result<String, AdvisorError> {
    serde_json::to_string_pretty(value)
        .map_err(|error| AdvisorError::InvalidPayload(error.to_string()))
}
