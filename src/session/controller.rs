use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, watch, Mutex as TokioMutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::config::{system_instruction, Language, SessionConfig, Voice};
use super::status::{Status, StatusCell};
use super::transcript::{ConversationTurn, Transcript};
use crate::audio::device::AudioFrame;
use crate::audio::{
    decode_chunk, encode_frame, CaptureSource, CpalCapture, CpalPlayback, PlaybackClock,
    PlaybackScheduler, PlaybackSink,
};
use crate::error::SessionError;
use crate::live::client::{LiveClient, LiveConnection, LiveHandle, ServerEvent};
use crate::live::messages::{MediaFrame, ResponseModality, SessionSetup, TranscriptionConfig};

/// Audio endpoints one session runs against.
///
/// Bundled so the production path (cpal devices) and tests (scripted
/// capture, manual clock, recording sink) construct sessions the same way.
pub struct SessionIo {
    pub capture: Box<dyn CaptureSource>,
    pub sink: Arc<dyn PlaybackSink>,
    pub clock: Arc<dyn PlaybackClock>,
    /// Natural-completion notifications for scheduled playback units.
    pub completions: mpsc::UnboundedReceiver<u64>,
    /// Hardware playback stream handle; held until teardown releases it.
    pub playback_device: Option<CpalPlayback>,
}

/// Teardown shared between `stop()` and the event loop's fatal paths.
///
/// Whichever caller flips the flag first runs the cleanup; everyone else
/// returns immediately, so concurrent teardown attempts (user stop racing a
/// connection error) cannot double-close the devices or the session.
struct Teardown {
    done: AtomicBool,
    capture: TokioMutex<Option<Box<dyn CaptureSource>>>,
    scheduler: Arc<Mutex<PlaybackScheduler>>,
    playback: TokioMutex<Option<CpalPlayback>>,
    handle: TokioMutex<Option<LiveHandle>>,
    close_timeout: Duration,
    shutdown_tx: watch::Sender<bool>,
}

impl Teardown {
    async fn run(&self) {
        if self.done.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.shutdown_tx.send(true);

        if let Some(mut capture) = self.capture.lock().await.take() {
            if let Err(e) = capture.stop().await {
                warn!("Failed to stop capture: {e}");
            }
        }

        self.scheduler.lock().unwrap().shutdown();

        // Dropping the playback handle stops its stream and worker thread.
        self.playback.lock().await.take();

        // Best-effort close, bounded; resources are released regardless.
        if let Some(handle) = self.handle.lock().await.take() {
            if let Err(e) = handle.close(self.close_timeout).await {
                warn!("Session close incomplete: {e}");
            }
        }
    }
}

struct ActiveSession {
    teardown: Arc<Teardown>,
    capture_task: JoinHandle<()>,
    event_task: JoinHandle<()>,
}

/// Owns the lifecycle of one conversation session: connect, stream frames
/// out, apply inbound events, and tear everything down on stop or failure.
///
/// At most one session is active at a time; every device handle and
/// playback unit belongs to it and is released by `stop()`.
pub struct SessionController {
    live: Arc<dyn LiveClient>,
    config: SessionConfig,
    status: StatusCell,
    transcript: Arc<Mutex<Transcript>>,
    last_error: Arc<Mutex<Option<String>>>,
    active: Option<ActiveSession>,
}

impl SessionController {
    pub fn new(live: Arc<dyn LiveClient>, config: SessionConfig) -> Self {
        let (status, _rx) = StatusCell::new();
        Self {
            live,
            config,
            status,
            transcript: Arc::new(Mutex::new(Transcript::new())),
            last_error: Arc::new(Mutex::new(None)),
            active: None,
        }
    }

    pub fn status(&self) -> Status {
        self.status.current()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<Status> {
        self.status.subscribe()
    }

    /// Snapshot of the conversation so far.
    pub fn transcript(&self) -> Vec<ConversationTurn> {
        self.transcript.lock().unwrap().snapshot()
    }

    /// The most recent fatal error message, if any.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().unwrap().clone()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Playback units currently scheduled but not yet finished.
    pub fn pending_playback(&self) -> usize {
        self.active
            .as_ref()
            .map(|a| a.teardown.scheduler.lock().unwrap().tracked())
            .unwrap_or(0)
    }

    /// Start a session against the default microphone and speaker.
    pub async fn start(&mut self, language: Language, voice: Voice) -> Result<(), SessionError> {
        if self.active.is_some() {
            return Err(SessionError::AlreadyActive);
        }

        let capture = Box::new(CpalCapture::new(
            self.config.input_sample_rate,
            self.config.frame_samples,
        ));
        let (playback, completions) = match CpalPlayback::new(self.config.output_sample_rate) {
            Ok(playback) => playback,
            Err(e) => {
                self.fail_start(&e);
                return Err(e);
            }
        };

        let io = SessionIo {
            sink: playback.sink(),
            clock: playback.clock(),
            capture,
            completions,
            playback_device: Some(playback),
        };
        self.start_with_io(language, voice, io).await
    }

    /// Start a session with explicitly provided audio endpoints.
    ///
    /// This is the primary lifecycle entry point; [`start`] is the
    /// hardware-backed convenience wrapper. Separating construction from
    /// injection keeps the controller testable without devices or network.
    pub async fn start_with_io(
        &mut self,
        language: Language,
        voice: Voice,
        io: SessionIo,
    ) -> Result<(), SessionError> {
        if self.active.is_some() {
            return Err(SessionError::AlreadyActive);
        }

        info!(
            session = %self.config.session_id,
            language = language.display_name(),
            voice = voice.name(),
            "Starting conversation session"
        );

        // A previous session may have ended in Error; stop() is the normal
        // way out, but a fresh start implies the same recovery.
        if self.status.current() == Status::Error {
            self.status.transition(Status::Idle);
        }
        self.status.transition(Status::Connecting);
        *self.last_error.lock().unwrap() = None;
        *self.transcript.lock().unwrap() = Transcript::new();

        let SessionIo {
            mut capture,
            sink,
            clock,
            completions,
            playback_device,
        } = io;

        // Microphone first, so a permission failure surfaces before any
        // network work happens.
        let frames = match capture.start().await {
            Ok(frames) => frames,
            Err(e) => {
                self.fail_start(&e);
                return Err(e);
            }
        };

        let setup = SessionSetup {
            response_modality: ResponseModality::Audio,
            voice: voice.name().to_string(),
            system_instruction: system_instruction(language),
            transcription: TranscriptionConfig {
                input: true,
                output: true,
            },
        };

        let connection = match self.live.connect(setup, self.config.outbound_queue).await {
            Ok(connection) => connection,
            Err(e) => {
                if let Err(stop_err) = capture.stop().await {
                    warn!("Failed to stop capture: {stop_err}");
                }
                self.fail_start(&e);
                return Err(e);
            }
        };
        let LiveConnection {
            frames: outbound,
            events,
            handle,
        } = connection;

        let scheduler = Arc::new(Mutex::new(PlaybackScheduler::new(clock, sink)));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let teardown = Arc::new(Teardown {
            done: AtomicBool::new(false),
            capture: TokioMutex::new(Some(capture)),
            scheduler: Arc::clone(&scheduler),
            playback: TokioMutex::new(playback_device),
            handle: TokioMutex::new(Some(handle)),
            close_timeout: self.config.close_timeout,
            shutdown_tx,
        });

        self.status.transition(Status::Listening);
        self.transcript.lock().unwrap().begin_turn();

        let capture_task = tokio::spawn(forward_frames(frames, outbound));
        let event_task = tokio::spawn(run_event_loop(EventLoop {
            events,
            completions,
            shutdown: shutdown_rx,
            scheduler,
            transcript: Arc::clone(&self.transcript),
            status: self.status.clone(),
            last_error: Arc::clone(&self.last_error),
            teardown: Arc::clone(&teardown),
            output_sample_rate: self.config.output_sample_rate,
        }));

        self.active = Some(ActiveSession {
            teardown,
            capture_task,
            event_task,
        });

        info!("Conversation session started");
        Ok(())
    }

    /// Stop the active session, releasing every device handle and playback
    /// unit. Idempotent; safe to call from any state.
    pub async fn stop(&mut self) {
        if let Some(active) = self.active.take() {
            info!(session = %self.config.session_id, "Stopping conversation session");

            active.teardown.run().await;

            if let Err(e) = active.capture_task.await {
                warn!("Capture task panicked: {e}");
            }
            if let Err(e) = active.event_task.await {
                warn!("Event task panicked: {e}");
            }

            info!("Conversation session stopped");
        }
        self.status.transition(Status::Idle);
    }

    fn fail_start(&self, err: &SessionError) {
        error!("Session start failed: {err}");
        *self.last_error.lock().unwrap() = Some(err.to_string());
        self.status.transition(Status::Error);
    }
}

/// Forward captured frames to the outbound stream, one frame at a time.
///
/// Fire-and-forget: when the transport is saturated the frame is dropped
/// with a warning rather than blocking the capture path.
async fn forward_frames(mut frames: mpsc::Receiver<AudioFrame>, outbound: mpsc::Sender<MediaFrame>) {
    info!("Capture forwarding started");
    while let Some(frame) = frames.recv().await {
        let payload = encode_frame(&frame.samples);
        match outbound.try_send(MediaFrame::pcm(frame.sample_rate, payload)) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Outbound audio queue full, dropping frame");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => break,
        }
    }
    info!("Capture forwarding stopped");
}

struct EventLoop {
    events: mpsc::Receiver<ServerEvent>,
    completions: mpsc::UnboundedReceiver<u64>,
    shutdown: watch::Receiver<bool>,
    scheduler: Arc<Mutex<PlaybackScheduler>>,
    transcript: Arc<Mutex<Transcript>>,
    status: StatusCell,
    last_error: Arc<Mutex<Option<String>>>,
    teardown: Arc<Teardown>,
    output_sample_rate: u32,
}

/// Consume inbound events and playback completions in one ordered loop.
///
/// Handlers run to completion one event at a time, so no further locking
/// discipline is needed beyond the shared-state mutexes.
async fn run_event_loop(mut ctx: EventLoop) {
    info!("Session event loop started");
    loop {
        tokio::select! {
            changed = ctx.shutdown.changed() => {
                if changed.is_err() || *ctx.shutdown.borrow() {
                    break;
                }
            }
            Some(unit_id) = ctx.completions.recv() => {
                let drained = ctx.scheduler.lock().unwrap().complete(unit_id);
                if drained {
                    ctx.status.transition(Status::Listening);
                }
            }
            event = ctx.events.recv() => {
                let Some(event) = event else {
                    info!("Event stream ended");
                    break;
                };
                match event {
                    ServerEvent::InputTranscript { text } => {
                        ctx.transcript.lock().unwrap().append_user(&text);
                    }
                    ServerEvent::OutputTranscript { text } => {
                        ctx.status.transition(Status::Speaking);
                        ctx.transcript.lock().unwrap().append_model(&text);
                    }
                    ServerEvent::Audio(frame) => {
                        let rate = frame.sample_rate().unwrap_or(ctx.output_sample_rate);
                        match decode_chunk(&frame.data, rate, 1) {
                            Ok(chunk) => {
                                ctx.scheduler.lock().unwrap().enqueue(chunk);
                            }
                            // One corrupt chunk must not end an otherwise
                            // healthy conversation.
                            Err(e) => warn!("Dropping malformed audio chunk: {e}"),
                        }
                    }
                    ServerEvent::TurnComplete => {
                        ctx.transcript.lock().unwrap().complete_turn();
                    }
                    ServerEvent::Interrupted => {
                        ctx.scheduler.lock().unwrap().interrupt();
                    }
                    ServerEvent::Error { message } => {
                        error!("Live session error: {message}");
                        *ctx.last_error.lock().unwrap() = Some(message);
                        ctx.status.transition(Status::Error);
                        ctx.teardown.run().await;
                        break;
                    }
                    ServerEvent::Closed => {
                        info!("Live session closed");
                        ctx.teardown.run().await;
                        break;
                    }
                }
            }
        }
    }
    info!("Session event loop stopped");
}
