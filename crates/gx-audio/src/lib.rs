//! Audio output for genplus-host
//!
//! The pacing loop drains the core's left/right buffers into an
//! [`AudioSink`] once per step. Sinks buffer interleaved stereo in a
//! [`SampleQueue`] that the device callback pulls from.

pub mod backend;
pub mod queue;
pub mod sink;

pub use backend::{NullAudioSink, NullSinkStats};
#[cfg(feature = "cpal")]
pub use backend::CpalAudioSink;
pub use queue::SampleQueue;
pub use sink::{create_sink, AudioSink};
