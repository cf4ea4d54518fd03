//! Interleaved stereo sample queue

use std::collections::VecDeque;

/// Bounded FIFO of interleaved stereo samples.
///
/// When full, the oldest samples are dropped so latency never grows
/// past `capacity` frames.
#[derive(Debug, Clone)]
pub struct SampleQueue {
    samples: VecDeque<f32>,
    capacity_frames: usize,
    volume: f32,
    dropped_frames: u64,
}

impl SampleQueue {
    pub fn new(capacity_frames: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity_frames * 2),
            capacity_frames,
            volume: 1.0,
            dropped_frames: 0,
        }
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Queued stereo frames
    pub fn len(&self) -> usize {
        self.samples.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames
    }

    /// Queue one step of output. Extra samples in the longer channel are ignored.
    pub fn push(&mut self, left: &[f32], right: &[f32]) {
        for (l, r) in left.iter().zip(right) {
            self.samples.push_back(l * self.volume);
            self.samples.push_back(r * self.volume);
        }

        let overflow = self.len().saturating_sub(self.capacity_frames);
        if overflow > 0 {
            self.samples.drain(..overflow * 2);
            self.dropped_frames += overflow as u64;
        }
    }

    /// Fill a device buffer with `channels` interleaved channels, padding with silence
    pub fn fill(&mut self, out: &mut [f32], channels: usize) {
        if channels == 0 {
            out.fill(0.0);
            return;
        }

        for frame in out.chunks_mut(channels) {
            let (l, r) = if self.samples.len() >= 2 {
                (
                    self.samples.pop_front().unwrap_or(0.0),
                    self.samples.pop_front().unwrap_or(0.0),
                )
            } else {
                (0.0, 0.0)
            };

            match frame.len() {
                1 => frame[0] = (l + r) * 0.5,
                _ => {
                    frame[0] = l;
                    frame[1] = r;
                    frame[2..].fill(0.0);
                }
            }
        }
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_fill() {
        let mut queue = SampleQueue::new(16);
        queue.push(&[0.1, 0.2], &[-0.1, -0.2]);
        assert_eq!(queue.len(), 2);

        let mut out = [1.0f32; 6];
        queue.fill(&mut out, 2);
        assert_eq!(out, [0.1, -0.1, 0.2, -0.2, 0.0, 0.0]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_overflow_drops_oldest() {
        let mut queue = SampleQueue::new(2);
        queue.push(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.dropped_frames(), 1);

        let mut out = [0.0f32; 2];
        queue.fill(&mut out, 2);
        assert_eq!(out, [2.0, 2.0]);
    }

    #[test]
    fn test_mono_and_volume() {
        let mut queue = SampleQueue::new(8);
        queue.set_volume(0.5);
        queue.push(&[1.0], &[0.0]);

        let mut out = [0.0f32; 1];
        queue.fill(&mut out, 1);
        assert_eq!(out, [0.25]);
    }
}
