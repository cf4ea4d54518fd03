//! cpal audio sink
//!
//! Plays the core's output on the default device through cpal. The
//! stream callback drains a shared [`SampleQueue`].

use crate::queue::SampleQueue;
use crate::sink::AudioSink;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, Stream, StreamConfig};
use gx_core::config::AudioConfig;
use parking_lot::Mutex;
use std::sync::Arc;

/// Roughly 100ms of buffered output at 48kHz
const QUEUE_FRAMES: usize = 4800;

pub struct CpalAudioSink {
    stream: Stream,
    queue: Arc<Mutex<SampleQueue>>,
    sample_rate: u32,
    paused: bool,
}

impl CpalAudioSink {
    /// Open the default output device at the configured sample rate
    pub fn open(config: &AudioConfig) -> Result<Self, String> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or("No output device available")?;

        tracing::info!("Audio device: {}", device.name().unwrap_or_else(|_| "Unknown".to_string()));

        let supported = device
            .default_output_config()
            .map_err(|e| format!("Failed to get output config: {}", e))?;
        let channels = supported.channels();

        let stream_config = StreamConfig {
            channels,
            sample_rate: SampleRate(config.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };
        tracing::info!("Audio config: {:?}", stream_config);

        let mut queue = SampleQueue::new(QUEUE_FRAMES);
        queue.set_volume(config.volume);
        let queue = Arc::new(Mutex::new(queue));

        let callback_queue = Arc::clone(&queue);
        let stream = device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    callback_queue.lock().fill(data, channels as usize);
                },
                |err| {
                    tracing::error!("Audio stream error: {}", err);
                },
                None,
            )
            .map_err(|e| format!("Failed to build output stream: {}", e))?;

        stream
            .play()
            .map_err(|e| format!("Failed to play stream: {}", e))?;
        tracing::info!("Audio stream started");

        Ok(Self {
            stream,
            queue,
            sample_rate: config.sample_rate,
            paused: false,
        })
    }
}

impl AudioSink for CpalAudioSink {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn push(&mut self, left: &[f32], right: &[f32]) {
        if !self.paused {
            self.queue.lock().push(left, right);
        }
    }

    fn pause(&mut self) {
        if self.paused {
            return;
        }
        self.paused = true;
        self.queue.lock().clear();
        if let Err(e) = self.stream.pause() {
            tracing::warn!("Failed to pause stream: {}", e);
        }
    }

    fn resume(&mut self) {
        if !self.paused {
            return;
        }
        self.paused = false;
        if let Err(e) = self.stream.play() {
            tracing::warn!("Failed to resume stream: {}", e);
        }
    }

    fn is_paused(&self) -> bool {
        self.paused
    }
}

impl Drop for CpalAudioSink {
    fn drop(&mut self) {
        let _ = self.stream.pause();
        tracing::info!("Audio stream stopped");
    }
}
