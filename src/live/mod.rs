pub mod client;
pub mod messages;

pub use client::{LiveClient, LiveConnection, LiveHandle, ServerEvent, WsLiveClient};
pub use messages::{
    ClientMessage, MediaFrame, ResponseModality, ServerMessage, SessionSetup, TranscriptionConfig,
};
