use super::ToolHandler;
use async_trait::async_trait;
use serde_json::{Value, json};

pub const AI_TEAM_MEMBERS: [&str; 8] = [
    "Darek", "Marcin", "Dawid", "Łukasz", "Jerzy", "Kacper", "Oskar", "Maciek",
];

/// Handler for `get_ai_team_members`. Ignores its arguments.
#[derive(Debug, Clone)]
pub struct TeamMembersTool {
    members: Vec<String>,
}

impl TeamMembersTool {
    pub fn new(members: Vec<String>) -> Self {
        Self { members }
    }
}

impl Default for TeamMembersTool {
    fn default() -> Self {
        Self::new(AI_TEAM_MEMBERS.iter().map(|m| m.to_string()).collect())
    }
}

#[async_trait]
impl ToolHandler for TeamMembersTool {
    async fn execute(&self, _arguments: Value) -> anyhow::Result<Value> {
        Ok(json!({ "members": self.members }))
    }
}
