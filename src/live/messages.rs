use serde::{Deserialize, Serialize};

/// Session configuration sent to the service when a connection opens.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSetup {
    pub response_modality: ResponseModality,
    /// Prebuilt voice name used for synthesized speech.
    pub voice: String,
    /// Conversation framing, parameterized by the practice language.
    pub system_instruction: String,
    pub transcription: TranscriptionConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseModality {
    Audio,
}

/// Which directions of speech the service should transcribe.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    pub input: bool,
    pub output: bool,
}

/// One transport-encoded PCM payload, either direction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaFrame {
    /// e.g. `audio/pcm;rate=16000`
    pub mime_type: String,
    /// Base64 PCM16 LE bytes.
    pub data: String,
}

impl MediaFrame {
    pub fn pcm(sample_rate: u32, data: String) -> Self {
        Self {
            mime_type: format!("audio/pcm;rate={sample_rate}"),
            data,
        }
    }

    /// Sample rate parsed out of the mime type, if present.
    pub fn sample_rate(&self) -> Option<u32> {
        self.mime_type
            .split(';')
            .find_map(|part| part.trim().strip_prefix("rate="))
            .and_then(|rate| rate.parse().ok())
    }
}

/// Messages sent to the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClientMessage {
    Setup(SessionSetup),
    Media(MediaFrame),
}

/// Messages received from the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ServerMessage {
    /// Transcription fragment of the user's speech.
    InputTranscription { text: String },
    /// Transcription fragment of the model's speech.
    OutputTranscription { text: String },
    /// Synthesized speech audio.
    Audio(MediaFrame),
    /// The model finished its response turn.
    TurnComplete,
    /// The user started speaking over the model.
    Interrupted,
    /// Service-reported failure; terminal for the session.
    Error { message: String },
}
