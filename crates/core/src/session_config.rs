//! Builds the `session.update` message sent upstream right after connecting.

use crate::{
    provider::{Provider, ProviderConnectionConfig},
    settings::RealtimeSettings,
    tools::ToolDefinition,
};
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Audio,
    Text,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct InputAudioTranscription {
    pub model: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnDetection {
    ServerVad {
        threshold: f32,
        prefix_padding_ms: u32,
        silence_duration_ms: u32,
    },
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoice {
    Auto,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub modalities: Vec<Modality>,
    pub instructions: String,
    pub input_audio_transcription: InputAudioTranscription,
    pub turn_detection: TurnDetection,
    pub tools: Vec<ToolDefinition>,
    pub tool_choice: ToolChoice,
}

/// The complete `session.update` client event.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename = "session.update")]
pub struct SessionUpdate {
    pub session: SessionConfig,
}

/// Produces a fresh `SessionUpdate` for each session.
#[derive(Clone, Debug)]
pub struct SessionConfigBuilder {
    settings: Arc<RealtimeSettings>,
    tools: Vec<ToolDefinition>,
}

impl SessionConfigBuilder {
    pub fn new(settings: Arc<RealtimeSettings>, tools: Vec<ToolDefinition>) -> Self {
        Self { settings, tools }
    }

    fn transcription_model(&self, provider: Provider) -> &str {
        match provider {
            Provider::OpenAi => &self.settings.openai.transcription_model,
            Provider::Azure => &self.settings.azure.transcription_model,
        }
    }

    pub fn build(&self, connection: &ProviderConnectionConfig) -> SessionUpdate {
        let vad = &self.settings.turn_detection;
        SessionUpdate {
            session: SessionConfig {
                modalities: vec![Modality::Audio, Modality::Text],
                instructions: self.settings.system_prompt.clone(),
                input_audio_transcription: InputAudioTranscription {
                    model: self.transcription_model(connection.provider).to_string(),
                },
                turn_detection: TurnDetection::ServerVad {
                    threshold: vad.threshold,
                    prefix_padding_ms: vad.prefix_padding_ms,
                    silence_duration_ms: vad.silence_duration_ms,
                },
                tools: self.tools.clone(),
                tool_choice: ToolChoice::Auto,
            },
        }
    }
}
