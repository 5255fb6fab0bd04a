pub mod codec;
pub mod device;
pub mod playback;

pub use codec::{decode_chunk, encode_frame, AudioChunk};
pub use device::{AudioFrame, CaptureSource, CpalCapture, CpalPlayback};
pub use playback::{PlaybackClock, PlaybackScheduler, PlaybackSink, PlaybackUnit};
