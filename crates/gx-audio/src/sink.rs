//! Audio sink abstraction

use crate::backend::NullAudioSink;
use gx_core::config::{AudioBackend, AudioConfig};

/// Destination for the samples the core produces each step
pub trait AudioSink {
    /// Output sample rate the core should be configured for
    fn sample_rate(&self) -> u32;

    /// Queue one step worth of left/right samples
    fn push(&mut self, left: &[f32], right: &[f32]);

    /// Silence output and drop anything queued
    fn pause(&mut self);

    fn resume(&mut self);

    fn is_paused(&self) -> bool;
}

/// Create the sink selected by the configuration.
///
/// `Auto` picks the device backend when it is compiled in and falls back
/// to the null sink if the device cannot be opened.
pub fn create_sink(config: &AudioConfig) -> Box<dyn AudioSink> {
    if !config.enable {
        tracing::info!("Audio disabled, using null sink");
        return Box::new(NullAudioSink::new(config.sample_rate));
    }

    match config.backend {
        AudioBackend::Null => Box::new(NullAudioSink::new(config.sample_rate)),
        AudioBackend::Auto => auto_sink(config),
    }
}

#[cfg(feature = "cpal")]
fn auto_sink(config: &AudioConfig) -> Box<dyn AudioSink> {
    match crate::backend::CpalAudioSink::open(config) {
        Ok(sink) => Box::new(sink),
        Err(e) => {
            tracing::warn!("Audio device unavailable ({}), falling back to null sink", e);
            Box::new(NullAudioSink::new(config.sample_rate))
        }
    }
}

#[cfg(not(feature = "cpal"))]
fn auto_sink(config: &AudioConfig) -> Box<dyn AudioSink> {
    tracing::debug!("No audio device backend compiled in");
    Box::new(NullAudioSink::new(config.sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_audio_uses_null_sink() {
        let config = AudioConfig {
            enable: false,
            sample_rate: 44_100,
            ..AudioConfig::default()
        };
        let sink = create_sink(&config);
        assert_eq!(sink.sample_rate(), 44_100);
        assert!(!sink.is_paused());
    }

    #[test]
    fn test_null_backend() {
        let config = AudioConfig {
            backend: AudioBackend::Null,
            ..AudioConfig::default()
        };
        let mut sink = create_sink(&config);
        sink.pause();
        assert!(sink.is_paused());
        sink.resume();
        assert!(!sink.is_paused());
    }
}
