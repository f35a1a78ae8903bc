use super::{TeamMembersTool, ToolDefinition, ToolHandler, ToolName};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, warn};

/// A tool call that could not produce a result.
///
/// These are recovered locally and sent back to the model as the call's
/// output, so the model can react to them in conversation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ToolCallError {
    #[error("Invalid arguments")]
    InvalidArguments { tool: String },
    #[error("Unknown tool: {tool}")]
    UnknownTool { tool: String },
    #[error("Tool execution failed")]
    ExecutionFailed { tool: String, details: String },
}

impl ToolCallError {
    pub fn kind(&self) -> &'static str {
        match self {
            ToolCallError::InvalidArguments { .. } => "invalid_arguments",
            ToolCallError::UnknownTool { .. } => "unknown_tool",
            ToolCallError::ExecutionFailed { .. } => "tool_execution_failed",
        }
    }

    pub fn tool(&self) -> &str {
        match self {
            ToolCallError::InvalidArguments { tool }
            | ToolCallError::UnknownTool { tool }
            | ToolCallError::ExecutionFailed { tool, .. } => tool,
        }
    }

    /// The structured `{"error": {...}}` document delivered to the model.
    pub fn to_payload(&self) -> Value {
        let mut error = json!({
            "type": self.kind(),
            "message": self.to_string(),
            "tool": self.tool(),
        });
        if let ToolCallError::ExecutionFailed { details, .. } = self {
            error["details"] = Value::String(details.clone());
        }
        json!({ "error": error })
    }
}

/// Executes tool calls by name. One handler slot per `ToolName` variant.
#[derive(Clone)]
pub struct ToolDispatcher {
    team_members: Arc<dyn ToolHandler>,
}

impl Default for ToolDispatcher {
    fn default() -> Self {
        Self::new(Arc::new(TeamMembersTool::default()))
    }
}

impl ToolDispatcher {
    pub fn new(team_members: Arc<dyn ToolHandler>) -> Self {
        Self { team_members }
    }

    fn handler(&self, tool: ToolName) -> &dyn ToolHandler {
        match tool {
            ToolName::GetAiTeamMembers => self.team_members.as_ref(),
        }
    }

    /// Definitions of every registered tool, in a stable order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        ToolName::ALL.iter().map(ToolName::definition).collect()
    }

    /// Runs a tool. `arguments` is the JSON-encoded argument string from the
    /// model; an empty string counts as `{}`, whitespace does not. Arguments
    /// are validated before the name is looked up.
    pub async fn dispatch(&self, name: &str, arguments: &str) -> Result<Value, ToolCallError> {
        let arguments = if arguments.is_empty() {
            "{}"
        } else {
            arguments
        };
        let parsed: Value =
            serde_json::from_str(arguments).map_err(|_| ToolCallError::InvalidArguments {
                tool: name.to_string(),
            })?;

        let tool = ToolName::from_name(name).ok_or_else(|| ToolCallError::UnknownTool {
            tool: name.to_string(),
        })?;

        self.handler(tool)
            .execute(parsed)
            .await
            .map_err(|e| ToolCallError::ExecutionFailed {
                tool: name.to_string(),
                details: format!("{e:#}"),
            })
    }

    /// Runs a tool and serializes either its result or the error payload.
    pub async fn execute(&self, name: &str, arguments: &str) -> String {
        match self.dispatch(name, arguments).await {
            Ok(result) => {
                debug!(tool = name, "Tool call succeeded");
                result.to_string()
            }
            Err(e) => {
                warn!(tool = name, kind = e.kind(), "Tool call failed");
                e.to_payload().to_string()
            }
        }
    }
}
