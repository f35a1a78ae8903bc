//! Locally executed tools the realtime model may call.
//!
//! The set of tools is fixed: every tool has a `ToolName` variant, a static
//! `ToolDefinition` advertised in `session.update`, and exactly one handler
//! slot in the `ToolDispatcher`. Names coming from the upstream are parsed into
//! `ToolName` before any handler is looked up.

mod dispatcher;
mod team;

pub use dispatcher::{ToolCallError, ToolDispatcher};
pub use team::{AI_TEAM_MEMBERS, TeamMembersTool};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Value, json};

/// A tool the relay knows how to execute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ToolName {
    GetAiTeamMembers,
}

impl ToolName {
    pub const ALL: [ToolName; 1] = [ToolName::GetAiTeamMembers];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::GetAiTeamMembers => "get_ai_team_members",
        }
    }

    /// Matches an untrusted name against the known tools.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.as_str() == name)
    }

    pub fn definition(&self) -> ToolDefinition {
        match self {
            ToolName::GetAiTeamMembers => ToolDefinition::function(
                self.as_str(),
                "Returns the list of AI team members at Miquido. Use this when the user asks \
                 about the AI team composition, members, or who is in the Miquido AI team.",
                json!({
                    "type": "object",
                    "properties": {},
                    "required": [],
                }),
            ),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    Function,
}

/// The static descriptor advertised to the upstream model.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub kind: ToolKind,
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolDefinition {
    pub fn function(name: &str, description: &str, parameters: Value) -> Self {
        Self {
            kind: ToolKind::Function,
            name: name.to_string(),
            description: description.to_string(),
            parameters,
        }
    }
}

/// A local tool implementation.
///
/// Handlers receive the already-parsed call arguments and return any
/// JSON-serializable result. Errors are reported back to the model as a
/// `tool_execution_failed` payload and never end the session.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn execute(&self, arguments: Value) -> anyhow::Result<Value>;
}
