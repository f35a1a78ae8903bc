//! The slice of the realtime wire protocol the relay interprets.
//!
//! Every upstream message is forwarded to the client untouched. Only
//! `response.done` events are inspected, for `function_call` output items,
//! and the relay answers each call with `conversation.item.create` followed by
//! `response.create`.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

pub const RESPONSE_DONE: &str = "response.done";

/// A model-initiated tool call extracted from `response.done`.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub call_id: String,
    #[serde(default = "empty_arguments", deserialize_with = "arguments_or_empty")]
    pub arguments: String,
}

fn empty_arguments() -> String {
    "{}".to_string()
}

// `"arguments": null` counts as no arguments.
fn arguments_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(empty_arguments))
}

/// Collects the function calls in a `response.done` event, in output order.
///
/// Returns nothing for any other event type. A `function_call` item without a
/// usable `name` or `call_id` cannot be answered and is skipped.
pub fn function_calls(event: &Value) -> Vec<FunctionCall> {
    if event.get("type").and_then(Value::as_str) != Some(RESPONSE_DONE) {
        return Vec::new();
    }

    let Some(output) = event
        .get("response")
        .and_then(|r| r.get("output"))
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };

    output
        .iter()
        .filter(|item| item.get("type").and_then(Value::as_str) == Some("function_call"))
        .filter_map(|item| match FunctionCall::deserialize(item) {
            Ok(call) => Some(call),
            Err(e) => {
                warn!(error = %e, "Skipping malformed function_call item");
                None
            }
        })
        .collect()
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConversationItem {
    FunctionCallOutput { call_id: String, output: String },
}

/// Events the relay itself sends to the upstream.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum ClientEvent {
    #[serde(rename = "conversation.item.create")]
    ConversationItemCreate { item: ConversationItem },
    #[serde(rename = "response.create")]
    ResponseCreate,
}

impl ClientEvent {
    /// The pair of events that hands a tool result back to the model.
    pub fn tool_result(call_id: &str, output: String) -> [ClientEvent; 2] {
        [
            ClientEvent::ConversationItemCreate {
                item: ConversationItem::FunctionCallOutput {
                    call_id: call_id.to_string(),
                    output,
                },
            },
            ClientEvent::ResponseCreate,
        ]
    }
}
