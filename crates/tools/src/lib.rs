//! Tool catalog and registry for the call agent
//!
//! Tools are side-effecting functions the model may invoke mid-conversation.
//! Each carries a spoken announcement, a parameter schema (validated before
//! execution), a result schema, and an execution deadline.

pub mod catalog;
pub mod insurance;
pub mod registry;

pub use catalog::{Tool, ToolError, ToolSchema};
pub use insurance::{FindDentalCoverageOptionsTool, TransferCallTool, UpdateInsuranceQuoteTool};
pub use registry::{ToolExecutor, ToolRegistry};

impl From<ToolError> for call_agent_core::Error {
    fn from(err: ToolError) -> Self {
        call_agent_core::Error::Tool(err.to_string())
    }
}

/// Build the registry of insurance-call tools
///
/// Fails fast when any catalog entry carries an uncompilable parameter
/// schema, so a broken catalog is caught at process start rather than
/// mid-call.
pub fn create_insurance_registry() -> Result<ToolRegistry, ToolError> {
    let mut registry = ToolRegistry::new();
    registry.register(UpdateInsuranceQuoteTool::new())?;
    registry.register(FindDentalCoverageOptionsTool::new())?;
    registry.register(TransferCallTool::new())?;

    tracing::info!(tools = registry.len(), "created insurance tool registry");

    Ok(registry)
}
