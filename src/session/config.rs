use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for a conversation session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Unique session identifier
    pub session_id: String,

    /// Capture sample rate in Hz (the service expects 16 kHz input)
    pub input_sample_rate: u32,

    /// Playback sample rate in Hz (the service synthesizes at 24 kHz)
    pub output_sample_rate: u32,

    /// Samples per captured frame
    pub frame_samples: usize,

    /// Bound on the outbound frame queue; frames are dropped when full
    pub outbound_queue: usize,

    /// How long to wait for the close handshake before force-releasing
    pub close_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("practice-{}", uuid::Uuid::new_v4()),
            input_sample_rate: 16000,
            output_sample_rate: 24000,
            frame_samples: 4096,
            outbound_queue: 32,
            close_timeout: Duration::from_secs(5),
        }
    }
}

/// Practice languages offered to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    English,
    Spanish,
    French,
    German,
    Italian,
    Portuguese,
    Japanese,
    Korean,
}

impl Language {
    pub const ALL: [Language; 8] = [
        Language::English,
        Language::Spanish,
        Language::French,
        Language::German,
        Language::Italian,
        Language::Portuguese,
        Language::Japanese,
        Language::Korean,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Spanish => "Spanish",
            Language::French => "French",
            Language::German => "German",
            Language::Italian => "Italian",
            Language::Portuguese => "Portuguese",
            Language::Japanese => "Japanese",
            Language::Korean => "Korean",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Language::ALL
            .iter()
            .find(|l| l.display_name().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| format!("unknown language '{s}'"))
    }
}

/// Prebuilt voices offered by the speech service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Voice {
    Puck,
    Charon,
    Kore,
    Fenrir,
    Aoede,
    Leda,
    Orus,
    Zephyr,
}

impl Voice {
    pub const ALL: [Voice; 8] = [
        Voice::Puck,
        Voice::Charon,
        Voice::Kore,
        Voice::Fenrir,
        Voice::Aoede,
        Voice::Leda,
        Voice::Orus,
        Voice::Zephyr,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Voice::Puck => "Puck",
            Voice::Charon => "Charon",
            Voice::Kore => "Kore",
            Voice::Fenrir => "Fenrir",
            Voice::Aoede => "Aoede",
            Voice::Leda => "Leda",
            Voice::Orus => "Orus",
            Voice::Zephyr => "Zephyr",
        }
    }
}

impl fmt::Display for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Voice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Voice::ALL
            .iter()
            .find(|v| v.name().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| format!("unknown voice '{s}'"))
    }
}

/// Conversation framing sent to the service for the selected language.
pub fn system_instruction(language: Language) -> String {
    format!(
        "You are a friendly, patient conversation partner helping the user \
         practice {lang}. Speak only {lang}. Keep replies short and \
         conversational, ask follow-up questions, and gently point out \
         significant mistakes before continuing.",
        lang = language.display_name()
    )
}
