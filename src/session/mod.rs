//! Conversation session management
//!
//! This module provides the `SessionController` abstraction that manages:
//! - Session lifecycle against the live speech service
//! - Microphone capture and outbound frame encoding
//! - Inbound audio decoding and gapless playback scheduling
//! - Turn-by-turn transcript accumulation
//! - User-visible status transitions

mod config;
mod controller;
mod status;
mod transcript;

pub use config::{system_instruction, Language, SessionConfig, Voice};
pub use controller::{SessionController, SessionIo};
pub use status::{Status, StatusCell};
pub use transcript::{ConversationTurn, Transcript};
