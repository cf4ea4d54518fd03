//! Null audio sink
//!
//! Discards samples but keeps counters, used headless and in tests.

use crate::sink::AudioSink;
use parking_lot::Mutex;
use std::sync::Arc;

/// Counters shared between a [`NullAudioSink`] and its clones
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NullSinkStats {
    /// Steps pushed while playing
    pub pushes: u64,
    /// Stereo frames accepted while playing
    pub frames: u64,
    /// Pushes that arrived while paused
    pub pushes_while_paused: u64,
    pub pauses: u64,
    pub resumes: u64,
    pub paused: bool,
}

/// Sink that only counts. Clones share state, so a test can keep one
/// while the loop owns another.
#[derive(Debug, Clone)]
pub struct NullAudioSink {
    sample_rate: u32,
    stats: Arc<Mutex<NullSinkStats>>,
}

impl NullAudioSink {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            stats: Arc::new(Mutex::new(NullSinkStats::default())),
        }
    }

    pub fn stats(&self) -> NullSinkStats {
        self.stats.lock().clone()
    }
}

impl AudioSink for NullAudioSink {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn push(&mut self, left: &[f32], right: &[f32]) {
        let mut stats = self.stats.lock();
        if stats.paused {
            stats.pushes_while_paused += 1;
            return;
        }
        stats.pushes += 1;
        stats.frames += left.len().min(right.len()) as u64;
    }

    fn pause(&mut self) {
        let mut stats = self.stats.lock();
        if !stats.paused {
            stats.paused = true;
            stats.pauses += 1;
        }
    }

    fn resume(&mut self) {
        let mut stats = self.stats.lock();
        if stats.paused {
            stats.paused = false;
            stats.resumes += 1;
        }
    }

    fn is_paused(&self) -> bool {
        self.stats.lock().paused
    }
}
