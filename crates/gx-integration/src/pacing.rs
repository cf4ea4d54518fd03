//! Pacing loop
//!
//! One [`PacingLoop::tick`] per display field. Each tick, in order:
//! 1. drain engine signals (abort, resize, stale views)
//! 2. present the previous frame
//! 3. advance the engine one step
//! 4. refresh the input registers for the next step
//! 5. drain the audio buffers into the sink
//!
//! Scheduling lives in the session driver; this type only decides what a
//! tick does. Pause and resume flip the loop and the audio sink together.

use crate::display::DisplaySurface;
use gx_audio::AudioSink;
use gx_core::HostError;
use gx_engine::{Engine, EngineHandle, MemoryBridge, VideoMode};
use gx_input::{ControllerSource, InputTranslator, PollOutcome};
use std::time::Duration;
use tokio::time::Instant;

/// Loop state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Paused,
    Stopped,
}

/// What a single tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Loop not running; the tick was discarded
    Dropped,
    Stepped,
    /// Stepped, and the pause chord was pressed on `port`
    PauseRequested { port: usize },
}

/// Frames-per-second measured over one-second windows
#[derive(Debug, Clone)]
pub struct FpsCounter {
    window_start: Instant,
    window_frames: u32,
    fps: f64,
}

impl FpsCounter {
    const WINDOW: Duration = Duration::from_secs(1);

    pub fn new() -> Self {
        Self {
            window_start: Instant::now(),
            window_frames: 0,
            fps: 0.0,
        }
    }

    /// Count one frame. Returns `true` when a new measurement is available.
    pub fn frame(&mut self) -> bool {
        self.window_frames += 1;
        let elapsed = self.window_start.elapsed();
        if elapsed < Self::WINDOW {
            return false;
        }
        self.fps = self.window_frames as f64 / elapsed.as_secs_f64();
        self.restart();
        true
    }

    /// Start a fresh window, e.g. after a pause
    pub fn restart(&mut self) {
        self.window_start = Instant::now();
        self.window_frames = 0;
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self::new()
    }
}

pub struct PacingLoop<E: Engine> {
    handle: EngineHandle<E>,
    bridge: MemoryBridge,
    translator: InputTranslator,
    controllers: Box<dyn ControllerSource>,
    audio: Box<dyn AudioSink>,
    surface: Box<dyn DisplaySurface>,
    state: LoopState,
    frames: u64,
    fps: FpsCounter,
    show_fps: bool,
    resized: Option<(u32, u32)>,
}

impl<E: Engine> PacingLoop<E> {
    /// Create a running loop over a booted engine
    pub fn new(
        handle: EngineHandle<E>,
        bridge: MemoryBridge,
        translator: InputTranslator,
        controllers: Box<dyn ControllerSource>,
        audio: Box<dyn AudioSink>,
        surface: Box<dyn DisplaySurface>,
    ) -> Self {
        Self {
            handle,
            bridge,
            translator,
            controllers,
            audio,
            surface,
            state: LoopState::Running,
            frames: 0,
            fps: FpsCounter::new(),
            show_fps: false,
            resized: None,
        }
    }

    pub fn set_show_fps(&mut self, show: bool) {
        self.show_fps = show;
        if !show {
            self.surface.set_overlay(None);
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == LoopState::Running
    }

    pub fn video(&self) -> VideoMode {
        self.bridge.video()
    }

    /// Tick period for the engine's field rate
    pub fn period(&self) -> Duration {
        Duration::from_secs(1) / self.bridge.video().frame_rate.max(1)
    }

    /// Engine steps since boot (or since the restored snapshot was taken)
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn set_frames(&mut self, frames: u64) {
        self.frames = frames;
    }

    pub fn fps(&self) -> f64 {
        self.fps.fps()
    }

    pub fn handle(&self) -> &EngineHandle<E> {
        &self.handle
    }

    pub fn bridge(&self) -> &MemoryBridge {
        &self.bridge
    }

    pub fn audio(&self) -> &dyn AudioSink {
        self.audio.as_ref()
    }

    pub fn surface(&self) -> &dyn DisplaySurface {
        self.surface.as_ref()
    }

    /// Engine access for save/load primitives. Only valid between ticks.
    pub fn engine_mut(&mut self) -> &mut E {
        self.handle.engine_mut()
    }

    pub fn translator(&self) -> &InputTranslator {
        &self.translator
    }

    /// Poll for release of the pause chord, see [`InputTranslator::poll_release`]
    pub fn poll_pause_release(&mut self) -> bool {
        self.translator.poll_release(self.controllers.as_mut())
    }

    pub fn rearm_pause(&mut self) -> bool {
        self.translator.rearm()
    }

    /// Dimensions reported by the engine's resize callback since the last call
    pub fn take_resized(&mut self) -> Option<(u32, u32)> {
        self.resized.take()
    }

    /// Suspend ticks and silence audio
    pub fn pause(&mut self) -> bool {
        if self.state != LoopState::Running {
            return false;
        }
        self.state = LoopState::Paused;
        self.audio.pause();
        tracing::info!("Loop paused at frame {}", self.frames);
        true
    }

    /// Resume ticks and audio
    pub fn resume(&mut self) -> bool {
        if self.state != LoopState::Paused {
            return false;
        }
        self.state = LoopState::Running;
        self.audio.resume();
        self.fps.restart();
        tracing::info!("Loop resumed at frame {}", self.frames);
        true
    }

    pub fn stop(&mut self) {
        if self.state == LoopState::Stopped {
            return;
        }
        self.state = LoopState::Stopped;
        self.audio.pause();
        tracing::info!("Loop stopped after {} frames", self.frames);
    }

    fn drain_signals(&mut self) -> Result<(), HostError> {
        self.handle.check_abort()?;

        if let Some((width, height)) = self.handle.signals().take_resize() {
            tracing::info!("Engine output resized to {}x{}", width, height);
            self.surface.resize(width, height);
            self.resized = Some((width, height));
        }

        if self.bridge.ensure_fresh(&self.handle)? {
            tracing::debug!("Memory views rebuilt ({} total)", self.bridge.rebuilds());
        }
        Ok(())
    }

    /// Run one tick. Errors are fatal to the session.
    pub fn tick(&mut self) -> Result<TickOutcome, HostError> {
        if self.state != LoopState::Running {
            return Ok(TickOutcome::Dropped);
        }

        self.drain_signals()?;

        let video = self.bridge.video();
        let frame = self.bridge.frame(self.handle.memory())?;
        self.surface.present(frame, video.width, video.height);

        self.handle.engine_mut().step();
        self.frames += 1;

        // The step may have aborted or replaced memory
        self.drain_signals()?;

        let registers = self.bridge.input_mut(self.handle.engine_mut().memory_mut())?;
        let poll = self.translator.poll(self.controllers.as_mut(), registers);

        let samples = self.handle.engine_mut().sound();
        let (left, right) = self.bridge.audio(self.handle.memory())?;
        let samples = samples.min(left.len());
        self.audio.push(&left[..samples], &right[..samples]);

        if self.fps.frame() && self.show_fps {
            self.surface.set_overlay(Some(format!("{:.0}", self.fps.fps())));
        }

        Ok(match poll {
            PollOutcome::Continue => TickOutcome::Stepped,
            PollOutcome::PauseRequested { port } => TickOutcome::PauseRequested { port },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::BufferSurface;
    use gx_audio::NullAudioSink;
    use gx_engine::stub::{StubEngine, StubSource, STUB_SAMPLE_RATE};
    use gx_engine::{ConfigureParams, CoreLoader, HardwareProfile, RomImage};
    use gx_input::{Control, ControllerFeed, VirtualControllers};

    struct Rig {
        pacing: PacingLoop<StubEngine>,
        probe: gx_engine::stub::StubProbe,
        feed: ControllerFeed,
        surface: BufferSurface,
        audio: NullAudioSink,
    }

    async fn rig() -> Rig {
        let engine = StubEngine::new();
        let probe = engine.probe();
        let mut handle = CoreLoader::load(&StubSource::new(engine)).await.unwrap();
        let rom = RomImage::new(vec![0x11u8; 64], "rom").unwrap();
        let bridge = MemoryBridge::boot(
            &mut handle,
            &rom,
            &ConfigureParams::new(HardwareProfile::MegaDrive),
            STUB_SAMPLE_RATE,
        )
        .unwrap();

        let controllers = VirtualControllers::new(2);
        let feed = controllers.feed();
        let surface = BufferSurface::new();
        let audio = NullAudioSink::new(STUB_SAMPLE_RATE);

        let pacing = PacingLoop::new(
            handle,
            bridge,
            InputTranslator::default(),
            Box::new(controllers),
            Box::new(audio.clone()),
            Box::new(surface.clone()),
        );
        Rig {
            pacing,
            probe,
            feed,
            surface,
            audio,
        }
    }

    #[tokio::test]
    async fn test_tick_steps_presents_and_drains_audio() {
        let mut rig = rig().await;
        assert_eq!(rig.pacing.tick().unwrap(), TickOutcome::Stepped);
        assert_eq!(rig.pacing.tick().unwrap(), TickOutcome::Stepped);

        assert_eq!(rig.probe.state().steps, 2);
        assert_eq!(rig.pacing.frames(), 2);
        assert_eq!(rig.surface.presents(), 2);
        assert_eq!(rig.surface.pixels().len(), 320 * 224 * 4);

        let stats = rig.audio.stats();
        assert_eq!(stats.pushes, 2);
        assert_eq!(stats.frames, 1600);
    }

    #[tokio::test]
    async fn test_previous_frame_is_presented() {
        let mut rig = rig().await;
        rig.pacing.tick().unwrap();
        let first = rig.pacing.bridge().frame(rig.pacing.handle().memory()).unwrap().to_vec();

        rig.pacing.tick().unwrap();
        assert_eq!(rig.surface.pixels(), first);
    }

    #[tokio::test]
    async fn test_input_reaches_next_step() {
        let mut rig = rig().await;
        rig.feed.press(0, Control::Down);
        rig.pacing.tick().unwrap();
        assert_eq!(rig.pacing.handle().engine().input_word(0), 0x0002);
        assert_eq!(rig.probe.state().last_input, [0, 0]);

        rig.pacing.tick().unwrap();
        assert_eq!(rig.probe.state().last_input, [0x0002, 0]);
    }

    #[tokio::test]
    async fn test_paused_ticks_are_dropped() {
        let mut rig = rig().await;
        assert!(rig.pacing.pause());
        assert!(!rig.pacing.pause());
        assert!(rig.audio.is_paused());

        for _ in 0..5 {
            assert_eq!(rig.pacing.tick().unwrap(), TickOutcome::Dropped);
        }
        assert_eq!(rig.probe.state().steps, 0);

        assert!(rig.pacing.resume());
        assert!(!rig.audio.is_paused());
        assert_eq!(rig.pacing.tick().unwrap(), TickOutcome::Stepped);
    }

    #[tokio::test]
    async fn test_pause_chord_reported_once() {
        let mut rig = rig().await;
        rig.feed.press(1, Control::Escape);
        assert_eq!(rig.pacing.tick().unwrap(), TickOutcome::PauseRequested { port: 1 });
        assert_eq!(rig.pacing.tick().unwrap(), TickOutcome::Stepped);
    }

    #[tokio::test]
    async fn test_engine_abort_is_fatal() {
        let mut rig = rig().await;
        rig.probe.update(|s| s.pending_abort = Some("bad opcode".into()));
        let err = rig.pacing.tick().unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("bad opcode"));
    }

    #[tokio::test]
    async fn test_resize_and_regrow_rebuild_views() {
        let mut rig = rig().await;
        rig.probe.update(|s| {
            s.pending_resize = Some((256, 192));
            s.pending_grow = true;
        });
        assert_eq!(rig.pacing.tick().unwrap(), TickOutcome::Stepped);
        assert_eq!(rig.pacing.take_resized(), Some((256, 192)));
        assert_eq!(rig.pacing.take_resized(), None);
        assert_eq!(rig.surface.state().size, (256, 192));
        assert!(rig.pacing.bridge().rebuilds() >= 1);

        assert_eq!(rig.pacing.tick().unwrap(), TickOutcome::Stepped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fps_overlay_after_one_second() {
        let mut rig = rig().await;
        rig.pacing.set_show_fps(true);
        let period = rig.pacing.period();

        for _ in 0..60 {
            tokio::time::advance(period).await;
            rig.pacing.tick().unwrap();
        }
        assert_eq!(rig.surface.state().overlay, None);

        tokio::time::advance(period).await;
        rig.pacing.tick().unwrap();
        assert_eq!(rig.surface.state().overlay.as_deref(), Some("60"));
        assert!((rig.pacing.fps() - 60.0).abs() < 0.5);

        rig.pacing.set_show_fps(false);
        assert_eq!(rig.surface.state().overlay, None);
    }

    #[tokio::test]
    async fn test_stop_is_final() {
        let mut rig = rig().await;
        rig.pacing.stop();
        assert!(!rig.pacing.resume());
        assert_eq!(rig.pacing.tick().unwrap(), TickOutcome::Dropped);
        assert_eq!(rig.pacing.state(), LoopState::Stopped);
    }
}
