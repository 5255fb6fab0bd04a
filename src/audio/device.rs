// cpal-backed audio devices
//
// cpal streams are not `Send`, so each stream lives on a dedicated worker
// thread that parks until the owning handle signals stop. The handles
// themselves are plain `Send` structs safe to keep inside async tasks.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleFormat;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

use super::playback::{PlaybackClock, PlaybackSink};
use crate::error::SessionError;

/// A fixed-size buffer of captured mono samples.
///
/// Ephemeral: produced by a [`CaptureSource`], encoded and forwarded
/// immediately, never retained.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Mono f32 samples in [-1, 1].
    pub samples: Vec<f32>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
}

/// Audio capture source trait
///
/// Implementations:
/// - `CpalCapture`: default microphone via cpal
/// - test doubles that feed scripted frames
#[async_trait::async_trait]
pub trait CaptureSource: Send + Sync {
    /// Start capturing audio.
    ///
    /// Returns a channel receiver that will receive fixed-size frames.
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, SessionError>;

    /// Stop capturing and release the device.
    async fn stop(&mut self) -> Result<(), SessionError>;

    /// Check if the source is currently capturing.
    fn is_capturing(&self) -> bool;

    /// Get source name for logging.
    fn name(&self) -> &str;
}

struct Worker {
    stop_tx: std::sync::mpsc::Sender<()>,
    handle: Option<std::thread::JoinHandle<()>>,
}

impl Worker {
    fn shut_down(&mut self) {
        let _ = self.stop_tx.send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

// ── Microphone capture ─────────────────────────────────────────────

/// Microphone capture at a fixed target rate, in fixed-size frames.
pub struct CpalCapture {
    target_sample_rate: u32,
    frame_samples: usize,
    worker: Option<Worker>,
}

impl CpalCapture {
    pub fn new(target_sample_rate: u32, frame_samples: usize) -> Self {
        Self {
            target_sample_rate,
            frame_samples,
            worker: None,
        }
    }
}

#[async_trait::async_trait]
impl CaptureSource for CpalCapture {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, SessionError> {
        if self.worker.is_some() {
            return Err(SessionError::Initialization(
                "capture already started".to_string(),
            ));
        }

        let (frame_tx, frame_rx) = mpsc::channel(16);
        let (ready_tx, ready_rx) = oneshot::channel();
        let (stop_tx, stop_rx) = std::sync::mpsc::channel();

        let target_rate = self.target_sample_rate;
        let frame_samples = self.frame_samples;

        let handle = std::thread::spawn(move || {
            match build_input_stream(target_rate, frame_samples, frame_tx) {
                Ok(stream) => {
                    let _ = ready_tx.send(Ok(()));
                    // Park until the handle signals stop (or is dropped).
                    let _ = stop_rx.recv();
                    drop(stream);
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                }
            }
        });

        match ready_rx.await {
            Ok(Ok(())) => {
                info!(
                    rate = self.target_sample_rate,
                    frame = self.frame_samples,
                    "Microphone capture started"
                );
                self.worker = Some(Worker {
                    stop_tx,
                    handle: Some(handle),
                });
                Ok(frame_rx)
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => Err(SessionError::Initialization(
                "capture thread exited during startup".to_string(),
            )),
        }
    }

    async fn stop(&mut self) -> Result<(), SessionError> {
        if let Some(mut worker) = self.worker.take() {
            worker.shut_down();
            info!("Microphone capture stopped");
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.worker.is_some()
    }

    fn name(&self) -> &str {
        "cpal microphone"
    }
}

impl Drop for CpalCapture {
    fn drop(&mut self) {
        if let Some(mut worker) = self.worker.take() {
            worker.shut_down();
        }
    }
}

/// Streaming linear-interpolation resampler from the device rate to the
/// capture target rate.
///
/// Keeps a fractional read position that carries across callback buffers,
/// so non-integer ratios (44.1 kHz hosts included) come out at exactly the
/// target rate. Each output sample is interpolated between the two source
/// samples straddling the read position.
struct LinearResampler {
    step: f64,
    pos: f64,
    prev: f32,
    primed: bool,
}

impl LinearResampler {
    fn new(source_rate: u32, target_rate: u32) -> Self {
        Self {
            step: source_rate as f64 / target_rate as f64,
            pos: 0.0,
            prev: 0.0,
            primed: false,
        }
    }

    /// Feed one source sample; `emit` is called once per output sample due
    /// within the segment between the previous sample and this one.
    fn push(&mut self, sample: f32, mut emit: impl FnMut(f32)) {
        if !self.primed {
            self.prev = sample;
            self.primed = true;
            return;
        }
        // `pos` is the fractional position within [prev, sample].
        while self.pos < 1.0 {
            emit(self.prev + (sample - self.prev) * self.pos as f32);
            self.pos += self.step;
        }
        self.pos -= 1.0;
        self.prev = sample;
    }
}

fn build_input_stream(
    target_rate: u32,
    frame_samples: usize,
    frames: mpsc::Sender<AudioFrame>,
) -> Result<cpal::Stream, SessionError> {
    let host = cpal::default_host();
    let device = host.default_input_device().ok_or_else(|| {
        SessionError::Permission(
            "no input device available - check that a microphone is connected \
             and that this application has permission to use it"
                .to_string(),
        )
    })?;

    let supported = device
        .default_input_config()
        .map_err(|e| SessionError::Permission(format!("cannot open input device: {e}")))?;

    if supported.sample_format() != SampleFormat::F32 {
        return Err(SessionError::Initialization(format!(
            "unsupported input sample format: {:?}",
            supported.sample_format()
        )));
    }

    let device_rate = supported.sample_rate().0;
    let channels = supported.channels().max(1) as usize;

    let mut resampler = LinearResampler::new(device_rate, target_rate);
    let mut pending: Vec<f32> = Vec::with_capacity(frame_samples);

    let stream = device
        .build_input_stream(
            &supported.config(),
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                for interleaved in data.chunks(channels) {
                    let sample = interleaved.iter().sum::<f32>() / channels as f32;
                    resampler.push(sample, |resampled| {
                        pending.push(resampled);
                        if pending.len() == frame_samples {
                            let samples =
                                std::mem::replace(&mut pending, Vec::with_capacity(frame_samples));
                            // Consumer gone or saturated: the frame is dropped.
                            let _ = frames.try_send(AudioFrame {
                                samples,
                                sample_rate: target_rate,
                            });
                        }
                    });
                }
            },
            |err| error!("Input stream error: {err}"),
            None,
        )
        .map_err(|e| SessionError::Permission(format!("failed to open input stream: {e}")))?;

    stream
        .play()
        .map_err(|e| SessionError::Initialization(format!("failed to start input stream: {e}")))?;

    Ok(stream)
}

// ── Speaker playback ───────────────────────────────────────────────

struct QueuedUnit {
    id: u64,
    start_sample: u64,
    samples: Vec<f32>,
    cursor: usize,
}

/// State shared between the output callback and the scheduler-facing
/// `PlaybackSink`/`PlaybackClock` implementations.
struct OutputShared {
    sample_rate: u32,
    queue: Mutex<VecDeque<QueuedUnit>>,
    /// Samples written to the device since the stream started.
    position: AtomicU64,
    completions: mpsc::UnboundedSender<u64>,
}

impl OutputShared {
    fn fill(&self, data: &mut [f32]) {
        let mut queue = self.queue.lock().unwrap();
        let mut position = self.position.load(Ordering::Relaxed);

        for slot in data.iter_mut() {
            *slot = 0.0;
            // Retire finished units, then take one sample from whichever
            // unit is due. Units not yet due come out as silence.
            loop {
                match queue.front_mut() {
                    Some(front) if front.cursor >= front.samples.len() => {}
                    Some(front) if front.start_sample <= position => {
                        *slot = front.samples[front.cursor];
                        front.cursor += 1;
                        break;
                    }
                    _ => break,
                }
                if let Some(finished) = queue.pop_front() {
                    let _ = self.completions.send(finished.id);
                }
            }
            position += 1;
        }

        // Retire units that ended exactly on the buffer boundary.
        loop {
            match queue.front() {
                Some(front) if front.cursor >= front.samples.len() => {}
                _ => break,
            }
            if let Some(finished) = queue.pop_front() {
                let _ = self.completions.send(finished.id);
            }
        }

        self.position.store(position, Ordering::Relaxed);
    }
}

impl PlaybackSink for OutputShared {
    fn schedule(&self, unit_id: u64, samples: Vec<f32>, start: Duration) {
        let start_sample = (start.as_secs_f64() * self.sample_rate as f64).round() as u64;
        self.queue.lock().unwrap().push_back(QueuedUnit {
            id: unit_id,
            start_sample,
            samples,
            cursor: 0,
        });
    }

    fn cancel_all(&self) {
        let dropped = {
            let mut queue = self.queue.lock().unwrap();
            let n = queue.len();
            queue.clear();
            n
        };
        if dropped > 0 {
            info!(units = dropped, "Cancelled queued playback");
        }
    }
}

impl PlaybackClock for OutputShared {
    fn now(&self) -> Duration {
        let samples = self.position.load(Ordering::Relaxed);
        Duration::from_secs_f64(samples as f64 / self.sample_rate as f64)
    }
}

/// Speaker output at a fixed sample rate, mono.
///
/// Scheduled units play sample-accurately against the stream's own sample
/// counter; gaps between units come out as silence. Completion of each unit
/// is reported on the channel returned by [`CpalPlayback::new`].
pub struct CpalPlayback {
    shared: Arc<OutputShared>,
    worker: Option<Worker>,
}

impl CpalPlayback {
    pub fn new(
        sample_rate: u32,
    ) -> Result<(Self, mpsc::UnboundedReceiver<u64>), SessionError> {
        let (done_tx, done_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(OutputShared {
            sample_rate,
            queue: Mutex::new(VecDeque::new()),
            position: AtomicU64::new(0),
            completions: done_tx,
        });

        let (ready_tx, ready_rx) = std::sync::mpsc::channel();
        let (stop_tx, stop_rx) = std::sync::mpsc::channel();

        let shared_for_stream = Arc::clone(&shared);
        let handle = std::thread::spawn(move || {
            match build_output_stream(sample_rate, shared_for_stream) {
                Ok(stream) => {
                    let _ = ready_tx.send(Ok(()));
                    let _ = stop_rx.recv();
                    drop(stream);
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                }
            }
        });

        match ready_rx.recv() {
            Ok(Ok(())) => {
                info!(rate = sample_rate, "Speaker playback started");
                Ok((
                    Self {
                        shared,
                        worker: Some(Worker {
                            stop_tx,
                            handle: Some(handle),
                        }),
                    },
                    done_rx,
                ))
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => Err(SessionError::Initialization(
                "playback thread exited during startup".to_string(),
            )),
        }
    }

    pub fn sink(&self) -> Arc<dyn PlaybackSink> {
        Arc::clone(&self.shared) as Arc<dyn PlaybackSink>
    }

    pub fn clock(&self) -> Arc<dyn PlaybackClock> {
        Arc::clone(&self.shared) as Arc<dyn PlaybackClock>
    }
}

impl Drop for CpalPlayback {
    fn drop(&mut self) {
        if let Some(mut worker) = self.worker.take() {
            worker.shut_down();
        }
    }
}

fn build_output_stream(
    sample_rate: u32,
    shared: Arc<OutputShared>,
) -> Result<cpal::Stream, SessionError> {
    let host = cpal::default_host();
    let device = host.default_output_device().ok_or_else(|| {
        SessionError::Initialization("no output device available".to_string())
    })?;

    let config = cpal::StreamConfig {
        channels: 1,
        sample_rate: cpal::SampleRate(sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                shared.fill(data);
            },
            |err| error!("Output stream error: {err}"),
            None,
        )
        .map_err(|e| {
            warn!("Failed to open {}Hz mono output stream: {e}", sample_rate);
            SessionError::Initialization(format!("failed to open output stream: {e}"))
        })?;

    stream.play().map_err(|e| {
        SessionError::Initialization(format!("failed to start output stream: {e}"))
    })?;

    Ok(stream)
}
