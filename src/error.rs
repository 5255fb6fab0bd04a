use thiserror::Error;

/// Errors produced by the voice session stack.
///
/// The kinds are deliberately coarse: each one maps to a distinct
/// user-facing outcome. Decode failures are contained where they occur
/// (the offending chunk is dropped); the other kinds are surfaced to the
/// caller and, once a session is open, trigger a full teardown.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The live service client could not be constructed. Fatal, no retry.
    #[error("failed to initialize live client: {0}")]
    Initialization(String),

    /// Microphone access was denied or no input device is available.
    /// Surfaced with its own remediation message, distinct from other
    /// start-up failures.
    #[error("microphone unavailable: {0}")]
    Permission(String),

    /// The transport failed while connecting or during an open session.
    #[error("connection to the speech service failed: {0}")]
    Connection(String),

    /// An inbound audio payload could not be decoded.
    #[error("malformed audio payload: {0}")]
    Decode(String),

    /// `start()` was called while a session is already open or connecting.
    #[error("a conversation session is already active")]
    AlreadyActive,
}
