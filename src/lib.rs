pub mod audio;
pub mod config;
pub mod error;
pub mod live;
pub mod session;

pub use audio::{
    decode_chunk, encode_frame, AudioChunk, AudioFrame, CaptureSource, CpalCapture, CpalPlayback,
    PlaybackClock, PlaybackScheduler, PlaybackSink, PlaybackUnit,
};
pub use config::Config;
pub use error::SessionError;
pub use live::{
    LiveClient, LiveConnection, LiveHandle, MediaFrame, ServerEvent, SessionSetup, WsLiveClient,
};
pub use session::{
    ConversationTurn, Language, SessionConfig, SessionController, SessionIo, Status, Transcript,
    Voice,
};
