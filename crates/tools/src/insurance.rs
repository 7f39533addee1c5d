//! Insurance-call tools
//!
//! Demo catalog for the outbound insurance conversation: quote updates,
//! coverage lookups, and hand-off to a live agent.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::catalog::{Tool, ToolError};

/// Base monthly premium before dental riders
const BASE_MONTHLY_PREMIUM: f64 = 354.0;
/// Monthly premium for basic dental coverage
const BASIC_DENTAL_PREMIUM: f64 = 20.0;
/// Monthly premium for comprehensive dental coverage
const COMPREHENSIVE_DENTAL_PREMIUM: f64 = 40.0;

/// Updates the caller's insurance quote with a dental rider
#[derive(Default)]
pub struct UpdateInsuranceQuoteTool;

#[derive(Debug, Deserialize)]
struct UpdateQuoteArgs {
    #[serde(rename = "dentalCoverageType")]
    dental_coverage_type: String,
}

impl UpdateInsuranceQuoteTool {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Tool for UpdateInsuranceQuoteTool {
    fn name(&self) -> &str {
        "update_insurance_quote"
    }

    fn description(&self) -> &str {
        "Updates the customer's insurance quote by adding either basic or \
         comprehensive dental coverage and calculating the updated monthly premium."
    }

    fn announcement(&self) -> &str {
        "Let me update your insurance quote based on your selected dental coverage."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "dentalCoverageType": {
                    "type": "string",
                    "enum": ["basic", "comprehensive"],
                    "description": "The type of dental coverage to add to the insurance quote."
                }
            },
            "required": ["dentalCoverageType"]
        })
    }

    fn returns(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "updatedMonthlyPremium": {
                    "type": "number",
                    "description": "The updated monthly premium including the selected dental coverage."
                }
            }
        })
    }

    async fn execute(&self, arguments: Value) -> Result<Value, ToolError> {
        let args: UpdateQuoteArgs = serde_json::from_value(arguments).map_err(|e| {
            ToolError::InvalidArguments {
                tool: self.name().to_string(),
                message: e.to_string(),
            }
        })?;

        let rider = match args.dental_coverage_type.as_str() {
            "basic" => BASIC_DENTAL_PREMIUM,
            "comprehensive" => COMPREHENSIVE_DENTAL_PREMIUM,
            _ => 0.0,
        };

        let updated = (BASE_MONTHLY_PREMIUM + rider).floor();

        tracing::info!(
            coverage = %args.dental_coverage_type,
            premium = updated,
            "updated insurance quote"
        );

        Ok(json!({ "updatedMonthlyPremium": updated }))
    }
}

/// Lists dental coverage options available to the caller
#[derive(Default)]
pub struct FindDentalCoverageOptionsTool;

impl FindDentalCoverageOptionsTool {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Tool for FindDentalCoverageOptionsTool {
    fn name(&self) -> &str {
        "find_dental_coverage_options"
    }

    fn description(&self) -> &str {
        "Finds available dental coverage options based on the customer's current coverage."
    }

    fn announcement(&self) -> &str {
        "Let me look up the dental coverage options available to you."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "currentCoverageOptions": {
                    "type": "object",
                    "properties": {
                        "dentalCoverage": {
                            "type": "string",
                            "enum": ["Yes", "No"],
                            "description": "Whether the customer already has dental coverage."
                        }
                    },
                    "required": ["dentalCoverage"]
                }
            },
            "required": ["currentCoverageOptions"]
        })
    }

    fn returns(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "dentalOptions": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "optionName": {"type": "string"},
                            "benefits": {"type": "string"},
                            "priceIncrease": {"type": "number"}
                        }
                    }
                }
            }
        })
    }

    async fn execute(&self, arguments: Value) -> Result<Value, ToolError> {
        let has_dental = arguments["currentCoverageOptions"]["dentalCoverage"] == "Yes";

        let options = [
            json!({
                "optionName": "Basic Dental Coverage",
                "benefits": "Covers preventive care, basic procedures such as fillings and simple extractions.",
                "priceIncrease": BASIC_DENTAL_PREMIUM
            }),
            json!({
                "optionName": "Comprehensive Dental Coverage",
                "benefits": "Includes basic coverage plus major procedures like crowns, bridges, and orthodontics.",
                "priceIncrease": COMPREHENSIVE_DENTAL_PREMIUM
            }),
            json!({
                "optionName": "Enhanced Dental & Vision Coverage",
                "benefits": "Covers comprehensive dental care and adds vision benefits including exams, glasses, and contact lenses.",
                "priceIncrease": 55.0
            }),
        ];

        // Existing dental coverage limits the list to upgrades
        let available: Vec<Value> = options
            .into_iter()
            .filter(|option| {
                !(has_dental && option["optionName"] == "Basic Dental Coverage")
            })
            .collect();

        Ok(json!({ "dentalOptions": available }))
    }
}

/// Transfers the caller to a live agent
///
/// The hand-off itself happens on the telephony provider's side; this tool
/// records the request and reports status back to the model.
#[derive(Default)]
pub struct TransferCallTool;

impl TransferCallTool {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Tool for TransferCallTool {
    fn name(&self) -> &str {
        "transfer_call"
    }

    fn description(&self) -> &str {
        "Transfers the customer to a live agent in case they request help from a real person."
    }

    fn announcement(&self) -> &str {
        "One moment while I transfer your call."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "callSid": {
                    "type": "string",
                    "description": "The unique identifier for the active phone call."
                }
            },
            "required": ["callSid"]
        })
    }

    fn returns(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "status": {
                    "type": "string",
                    "description": "Whether or not the customer call was successfully transferred."
                }
            }
        })
    }

    async fn execute(&self, arguments: Value) -> Result<Value, ToolError> {
        let call_sid = arguments["callSid"].as_str().unwrap_or_default();

        tracing::info!(call_sid = %call_sid, "transfer requested");

        Ok(json!({ "status": "transfer requested" }))
    }
}
