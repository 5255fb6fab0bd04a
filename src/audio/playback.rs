// Gapless playback scheduling for decoded audio chunks
//
// The scheduler keeps a monotonically non-decreasing start-time cursor and
// a set of in-flight units so that an interruption can stop and forget all
// of them at once. It does no audio I/O itself: chunks are handed to a
// `PlaybackSink` with an absolute start time on a `PlaybackClock` time base,
// and the owner reports natural completions back via `complete()`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::codec::AudioChunk;

/// Time source for playback scheduling.
///
/// `now()` is the current position on the output device's own clock
/// (time since the stream started). Injected so the scheduler is
/// deterministic under test.
pub trait PlaybackClock: Send + Sync {
    fn now(&self) -> Duration;
}

/// Output half of the playback path.
///
/// Implementations queue samples to begin at an absolute clock position and
/// must be able to discard everything queued on demand. All methods take
/// `&self`; implementors use interior mutability.
pub trait PlaybackSink: Send + Sync {
    /// Queue `samples` to start playing at `start` on the sink's clock.
    fn schedule(&self, unit_id: u64, samples: Vec<f32>, start: Duration);

    /// Stop and discard every queued unit immediately. No completion
    /// notifications may be delivered for cancelled units.
    fn cancel_all(&self);
}

/// One scheduled, in-flight playback of a single chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackUnit {
    pub id: u64,
    pub start: Duration,
    pub duration: Duration,
}

/// Schedules decoded chunks back-to-back with no gaps and tracks every
/// in-flight unit so they can be cancelled together.
pub struct PlaybackScheduler {
    clock: Arc<dyn PlaybackClock>,
    sink: Arc<dyn PlaybackSink>,
    next_start: Duration,
    units: HashMap<u64, PlaybackUnit>,
    next_unit_id: u64,
}

impl PlaybackScheduler {
    pub fn new(clock: Arc<dyn PlaybackClock>, sink: Arc<dyn PlaybackSink>) -> Self {
        let next_start = clock.now();
        Self {
            clock,
            sink,
            next_start,
            units: HashMap::new(),
            next_unit_id: 0,
        }
    }

    /// Schedule `chunk` immediately after everything already queued, or at
    /// the current clock position if the queue has drained past the cursor.
    ///
    /// Returns the unit's scheduled start time.
    pub fn enqueue(&mut self, chunk: AudioChunk) -> PlaybackUnit {
        let now = self.clock.now();
        if self.next_start < now {
            self.next_start = now;
        }

        let unit = PlaybackUnit {
            id: self.next_unit_id,
            start: self.next_start,
            duration: chunk.duration(),
        };
        self.next_unit_id += 1;
        self.next_start += unit.duration;

        debug!(
            unit = unit.id,
            start_ms = unit.start.as_millis() as u64,
            duration_ms = unit.duration.as_millis() as u64,
            "Scheduled playback unit"
        );

        self.sink.schedule(unit.id, chunk.samples, unit.start);
        self.units.insert(unit.id, unit);
        unit
    }

    /// Record the natural completion of a unit.
    ///
    /// Returns `true` when this completion drained the tracked set.
    /// Unknown ids (e.g. a completion racing an interrupt) are ignored.
    pub fn complete(&mut self, unit_id: u64) -> bool {
        if self.units.remove(&unit_id).is_none() {
            warn!(unit = unit_id, "Completion for untracked playback unit");
            return false;
        }
        self.units.is_empty()
    }

    /// Stop every tracked unit, forget them all, and reset the cursor so
    /// the next enqueue re-anchors to the live clock.
    pub fn interrupt(&mut self) {
        let dropped = self.units.len();
        self.sink.cancel_all();
        self.units.clear();
        self.next_start = Duration::ZERO;
        if dropped > 0 {
            info!(units = dropped, "Playback interrupted");
        }
    }

    /// Stop playback as part of session teardown.
    pub fn shutdown(&mut self) {
        self.interrupt();
    }

    /// Number of units currently tracked.
    pub fn tracked(&self) -> usize {
        self.units.len()
    }
}
