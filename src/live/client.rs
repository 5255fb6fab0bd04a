// WebSocket client for the live conversation service
//
// One connection per session. The socket is split into a writer task that
// drains the bounded outbound frame queue and a reader task that maps wire
// messages onto typed events. Both ends are reached only through channels,
// so the session controller never touches the socket directly and tests can
// substitute a scripted client.

use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use super::messages::{ClientMessage, MediaFrame, ServerMessage, SessionSetup};
use crate::error::SessionError;

/// Inbound events for one session, in strict arrival order.
#[derive(Debug, Clone)]
pub enum ServerEvent {
    /// Transcription fragment of the user's speech.
    InputTranscript { text: String },
    /// Transcription fragment of the model's speech.
    OutputTranscript { text: String },
    /// Synthesized speech audio, transport-encoded.
    Audio(MediaFrame),
    /// The model finished its response turn.
    TurnComplete,
    /// The user started speaking over the model (barge-in).
    Interrupted,
    /// Terminal failure reported by the service or the transport.
    Error { message: String },
    /// The connection is gone; no further events will arrive.
    Closed,
}

impl From<ServerMessage> for ServerEvent {
    fn from(message: ServerMessage) -> Self {
        match message {
            ServerMessage::InputTranscription { text } => Self::InputTranscript { text },
            ServerMessage::OutputTranscription { text } => Self::OutputTranscript { text },
            ServerMessage::Audio(frame) => Self::Audio(frame),
            ServerMessage::TurnComplete => Self::TurnComplete,
            ServerMessage::Interrupted => Self::Interrupted,
            ServerMessage::Error { message } => Self::Error { message },
        }
    }
}

/// Close-side handle for an open connection.
///
/// `close` signals the connection's writer to perform the close handshake
/// and waits for its acknowledgement, bounded by `timeout`. Resources are
/// released either way.
pub struct LiveHandle {
    close_tx: Option<oneshot::Sender<()>>,
    closed_rx: Option<oneshot::Receiver<()>>,
}

impl LiveHandle {
    pub fn new(close_tx: oneshot::Sender<()>, closed_rx: oneshot::Receiver<()>) -> Self {
        Self {
            close_tx: Some(close_tx),
            closed_rx: Some(closed_rx),
        }
    }

    pub async fn close(mut self, timeout: Duration) -> Result<(), SessionError> {
        if let Some(tx) = self.close_tx.take() {
            let _ = tx.send(());
        }
        let Some(rx) = self.closed_rx.take() else {
            return Ok(());
        };
        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(SessionError::Connection(
                "connection ended before close completed".to_string(),
            )),
            Err(_) => Err(SessionError::Connection(
                "timed out waiting for session close".to_string(),
            )),
        }
    }
}

/// An open bidirectional session.
pub struct LiveConnection {
    /// Outbound audio frames, bounded; send is fire-and-forget.
    pub frames: mpsc::Sender<MediaFrame>,
    /// Inbound events, strictly ordered.
    pub events: mpsc::Receiver<ServerEvent>,
    pub handle: LiveHandle,
}

/// Connection factory for the live conversation service.
#[async_trait]
pub trait LiveClient: Send + Sync {
    /// Open a session configured by `setup`. `outbound_capacity` bounds the
    /// outbound frame queue.
    async fn connect(
        &self,
        setup: SessionSetup,
        outbound_capacity: usize,
    ) -> Result<LiveConnection, SessionError>;
}

/// Production [`LiveClient`] over a WebSocket.
pub struct WsLiveClient {
    url: String,
    api_key: String,
}

impl WsLiveClient {
    pub fn new(url: String, api_key: String) -> Self {
        Self { url, api_key }
    }
}

#[async_trait]
impl LiveClient for WsLiveClient {
    async fn connect(
        &self,
        setup: SessionSetup,
        outbound_capacity: usize,
    ) -> Result<LiveConnection, SessionError> {
        let url = format!("{}?key={}", self.url, self.api_key);

        info!("Connecting to live service at {}", self.url);
        let (socket, _) = connect_async(url.as_str())
            .await
            .map_err(|e| SessionError::Connection(format!("websocket connect failed: {e}")))?;
        let (mut writer, mut reader) = socket.split();

        let setup_json = serde_json::to_string(&ClientMessage::Setup(setup))
            .map_err(|e| SessionError::Initialization(format!("cannot encode setup: {e}")))?;
        writer
            .send(Message::Text(setup_json.into()))
            .await
            .map_err(|e| SessionError::Connection(format!("failed to send setup: {e}")))?;

        info!("Live session established");

        let (frame_tx, mut frame_rx) = mpsc::channel::<MediaFrame>(outbound_capacity);
        let (event_tx, event_rx) = mpsc::channel::<ServerEvent>(64);
        let (close_tx, mut close_rx) = oneshot::channel::<()>();
        let (closed_tx, closed_rx) = oneshot::channel::<()>();

        // Writer: drain outbound frames until told to stop or the frame
        // channel closes, then run the close handshake either way.
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    frame = frame_rx.recv() => {
                        let Some(frame) = frame else { break };
                        let json = match serde_json::to_string(&ClientMessage::Media(frame)) {
                            Ok(json) => json,
                            Err(e) => {
                                warn!("Cannot encode outbound frame: {e}");
                                continue;
                            }
                        };
                        if let Err(e) = writer.send(Message::Text(json.into())).await {
                            warn!("Outbound send failed: {e}");
                            break;
                        }
                    }
                    _ = &mut close_rx => break,
                }
            }
            if let Err(e) = writer.send(Message::Close(None)).await {
                debug!("Close frame send failed: {e}");
            }
            let _ = writer.flush().await;
            let _ = closed_tx.send(());
            debug!("Writer task finished");
        });

        // Reader: decode wire messages into ordered events.
        tokio::spawn(async move {
            while let Some(message) = reader.next().await {
                match message {
                    Ok(Message::Text(text)) => {
                        match serde_json::from_str::<ServerMessage>(text.as_str()) {
                            Ok(msg) => {
                                if event_tx.send(ServerEvent::from(msg)).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => debug!("Ignoring unrecognized server message: {e}"),
                        }
                    }
                    Ok(Message::Close(frame)) => {
                        debug!("Server closed the connection: {frame:?}");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        let _ = event_tx
                            .send(ServerEvent::Error {
                                message: format!("transport error: {e}"),
                            })
                            .await;
                        break;
                    }
                }
            }
            let _ = event_tx.send(ServerEvent::Closed).await;
            debug!("Reader task finished");
        });

        Ok(LiveConnection {
            frames: frame_tx,
            events: event_rx,
            handle: LiveHandle::new(close_tx, closed_rx),
        })
    }
}
