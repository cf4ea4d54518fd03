//! Session facade
//!
//! [`Emulator`] is what the surrounding application talks to: it takes
//! the ROM, boots the engine and hands back a [`Session`]. The session's
//! [`Session::run`] is the single task that drives the engine; every UI
//! request reaches it through a [`SessionHandle`], so engine steps, slot
//! transfers and pause transitions never overlap.

use crate::display::DisplaySurface;
use crate::loader::RomRequest;
use crate::pacing::{PacingLoop, TickOutcome};
use crate::pause::{PauseCoordinator, PauseReason, Resume};
use gx_audio::AudioSink;
use gx_core::{Config, HostError};
use gx_engine::{CoreLoader, Engine, EngineSource, HardwareProfile, MemoryBridge};
use gx_input::{ControllerSource, InputTranslator};
use gx_save::{create_store, BlobStore, KeyLayout, SaveStateManager, SaveStats, SlotCapture, SlotInfo};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;

const COMMAND_QUEUE: usize = 16;

/// Requests from the UI to the session task
#[derive(Debug)]
pub enum SessionCommand {
    Pause { reply: oneshot::Sender<bool> },
    Resume { reply: oneshot::Sender<bool> },
    SetHidden { hidden: bool, reply: oneshot::Sender<bool> },
    /// Persist battery RAM now
    SaveState { reply: oneshot::Sender<bool> },
    ListSlots { reply: oneshot::Sender<Vec<SlotInfo>> },
    SaveSlot { slot: u32, reply: oneshot::Sender<bool> },
    LoadSlot { slot: u32, reply: oneshot::Sender<bool> },
    DeleteSlot { slot: u32, reply: oneshot::Sender<bool> },
    Stop { reply: oneshot::Sender<SessionReport> },
}

/// Notifications from the session task to the UI
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The pause chord was pressed; the session is paused and the menu should open
    PauseRequested { port: usize },
    /// The engine reported new output dimensions
    Resized { width: u32, height: u32 },
    /// The session aborted; show the message and leave
    Fatal(String),
}

/// Summary returned when a session ends
#[derive(Debug, Clone, PartialEq)]
pub struct SessionReport {
    pub frames: u64,
    pub battery_saved: bool,
    pub saves: SaveStats,
}

/// Cloneable sender side of a session's command channel
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    /// Create a handle and the receiver to pass to [`Session::run`]
    pub fn channel() -> (Self, mpsc::Receiver<SessionCommand>) {
        let (tx, rx) = mpsc::channel(COMMAND_QUEUE);
        (Self { tx }, rx)
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> SessionCommand,
    ) -> Result<T, HostError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(command(reply))
            .await
            .map_err(|_| HostError::Session("session has ended".to_string()))?;
        response
            .await
            .map_err(|_| HostError::Session("session ended before replying".to_string()))
    }

    /// Open the pause menu
    pub async fn pause(&self) -> Result<bool, HostError> {
        self.request(|reply| SessionCommand::Pause { reply }).await
    }

    /// Close the pause menu. The reply waits for the pause chord to be
    /// released and is `false` if the session stops or pauses again first.
    pub async fn resume(&self) -> Result<bool, HostError> {
        self.request(|reply| SessionCommand::Resume { reply }).await
    }

    pub async fn set_hidden(&self, hidden: bool) -> Result<bool, HostError> {
        self.request(|reply| SessionCommand::SetHidden { hidden, reply }).await
    }

    pub async fn save_state(&self) -> Result<bool, HostError> {
        self.request(|reply| SessionCommand::SaveState { reply }).await
    }

    pub async fn list_slots(&self) -> Result<Vec<SlotInfo>, HostError> {
        self.request(|reply| SessionCommand::ListSlots { reply }).await
    }

    pub async fn save_slot(&self, slot: u32) -> Result<bool, HostError> {
        self.request(|reply| SessionCommand::SaveSlot { slot, reply }).await
    }

    pub async fn load_slot(&self, slot: u32) -> Result<bool, HostError> {
        self.request(|reply| SessionCommand::LoadSlot { slot, reply }).await
    }

    pub async fn delete_slot(&self, slot: u32) -> Result<bool, HostError> {
        self.request(|reply| SessionCommand::DeleteSlot { slot, reply }).await
    }

    pub async fn stop(&self) -> Result<SessionReport, HostError> {
        self.request(|reply| SessionCommand::Stop { reply }).await
    }
}

/// Entry point for the surrounding application
pub struct Emulator {
    config: Config,
    store: Arc<dyn BlobStore>,
    request: Option<RomRequest>,
    started: bool,
}

impl Emulator {
    pub fn new(config: Config) -> Self {
        let store = create_store(&config);
        Self::with_store(config, store)
    }

    pub fn with_store(config: Config, store: Arc<dyn BlobStore>) -> Self {
        Self {
            config,
            store,
            request: None,
            started: false,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn rom(&self) -> Option<&RomRequest> {
        self.request.as_ref()
    }

    /// Validate and remember the ROM to run, see [`RomRequest::new`]
    #[allow(clippy::too_many_arguments)]
    pub fn set_rom(
        &mut self,
        app_type: &str,
        hash: &str,
        bytes: impl Into<Arc<[u8]>>,
        pal: Option<bool>,
        fm_chip: Option<bool>,
        hw_variant: u32,
        pad3: bool,
    ) -> Result<(), HostError> {
        self.request = Some(RomRequest::new(
            app_type, hash, bytes, pal, fm_chip, hw_variant, pad3,
        )?);
        Ok(())
    }

    /// Load the engine, boot the ROM and restore battery RAM.
    ///
    /// Any error here is fatal; nothing of the engine survives it.
    pub async fn start<S: EngineSource>(
        &mut self,
        source: &S,
        mut surface: Box<dyn DisplaySurface>,
        controllers: Box<dyn ControllerSource>,
        audio: Box<dyn AudioSink>,
    ) -> Result<Session<S::Engine>, HostError> {
        if self.started {
            return Err(HostError::Session("emulator already started".to_string()));
        }
        let request = self
            .request
            .clone()
            .ok_or_else(|| HostError::Session("no ROM set".to_string()))?;
        let translator = InputTranslator::from_config(&self.config.input)?;

        let mut handle = CoreLoader::load(source).await?;
        let bridge = MemoryBridge::boot(&mut handle, &request.rom, &request.params, audio.sample_rate())?;

        let video = bridge.video();
        surface.resize(video.width, video.height);

        let mut saves = SaveStateManager::new(
            Arc::clone(&self.store),
            KeyLayout::new(self.config.storage.namespace.clone()),
            request.rom.hash(),
        );
        saves.load_battery_ram(handle.engine_mut()).await;

        handle.engine_mut().reset();
        handle.check_abort()?;

        let mut pacing = PacingLoop::new(handle, bridge, translator, controllers, audio, surface);
        pacing.set_show_fps(self.config.debug.show_fps);

        self.started = true;
        tracing::info!("Session started for {}", request.app_type.as_str());

        Ok(Session {
            pacing,
            saves,
            pause: PauseCoordinator::new(&self.config.general, &self.config.input),
            profile: request.params.profile,
            save_on_exit: self.config.general.save_battery_on_exit,
            pending_resume: Vec::new(),
        })
    }
}

enum Flow {
    Continue,
    /// The loop went from paused to running
    Resumed,
    /// A menu resume is waiting for the pause chord to be released
    AwaitRelease,
    Stop(oneshot::Sender<SessionReport>),
}

/// A booted session, driven by [`Session::run`]
pub struct Session<E: Engine> {
    pacing: PacingLoop<E>,
    saves: SaveStateManager,
    pause: PauseCoordinator,
    profile: HardwareProfile,
    save_on_exit: bool,
    /// Replies owed to resume requests waiting on chord release
    pending_resume: Vec<oneshot::Sender<bool>>,
}

impl<E: Engine> Session<E> {
    pub fn pacing(&self) -> &PacingLoop<E> {
        &self.pacing
    }

    pub fn saves(&self) -> &SaveStateManager {
        &self.saves
    }

    pub fn is_paused(&self) -> bool {
        self.pause.is_paused()
    }

    /// Drive the engine until stopped, the command channel closes, or a fatal error.
    ///
    /// Ticks that come due while paused are skipped, and resuming starts a
    /// fresh cadence instead of catching up.
    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<SessionCommand>,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Result<SessionReport, HostError> {
        let mut interval = tokio::time::interval(self.pacing.period());
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut release_poll = tokio::time::interval(self.pause.release_poll());
        release_poll.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                command = commands.recv() => {
                    let Some(command) = command else {
                        tracing::info!("Command channel closed, stopping session");
                        return Ok(self.shutdown().await);
                    };
                    match self.handle_command(command).await {
                        Flow::Continue => {}
                        Flow::Resumed => interval.reset(),
                        Flow::AwaitRelease => release_poll.reset(),
                        Flow::Stop(reply) => {
                            let report = self.shutdown().await;
                            let _ = reply.send(report.clone());
                            return Ok(report);
                        }
                    }
                }

                _ = release_poll.tick(), if !self.pending_resume.is_empty() => {
                    if self.finish_resume() {
                        interval.reset();
                    }
                }

                _ = interval.tick(), if self.pacing.is_running() => {
                    let outcome = self.pacing.tick();

                    if let Some((width, height)) = self.pacing.take_resized() {
                        let _ = events.send(SessionEvent::Resized { width, height });
                    }

                    match outcome {
                        Ok(TickOutcome::PauseRequested { port }) => {
                            self.pause.pause(PauseReason::Menu, &mut self.pacing, &mut self.saves).await;
                            let _ = events.send(SessionEvent::PauseRequested { port });
                        }
                        Ok(TickOutcome::Stepped | TickOutcome::Dropped) => {}
                        Err(e) => {
                            tracing::error!("Session aborted: {}", e);
                            self.pacing.stop();
                            let _ = events.send(SessionEvent::Fatal(e.to_string()));
                            return Err(e);
                        }
                    }
                }
            }
        }
    }

    async fn handle_command(&mut self, command: SessionCommand) -> Flow {
        match command {
            SessionCommand::Pause { reply } => {
                self.cancel_pending_resume();
                let paused = self.pause.pause(PauseReason::Menu, &mut self.pacing, &mut self.saves).await;
                let _ = reply.send(paused || self.pause.is_paused());
            }
            SessionCommand::Resume { reply } => {
                let waiting = !self.pending_resume.is_empty();
                self.pending_resume.push(reply);
                if waiting {
                    return Flow::Continue;
                }
                if self.finish_resume() {
                    return Flow::Resumed;
                }
                if !self.pending_resume.is_empty() {
                    tracing::debug!("Resume waiting for pause chord release");
                    return Flow::AwaitRelease;
                }
            }
            SessionCommand::SetHidden { hidden, reply } => {
                let was_running = self.pacing.is_running();
                if hidden {
                    self.pause.pause(PauseReason::Hidden, &mut self.pacing, &mut self.saves).await;
                } else {
                    self.pause.resume(PauseReason::Hidden, &mut self.pacing);
                }
                let running = self.pacing.is_running();
                let _ = reply.send(running);
                if running && !was_running {
                    return Flow::Resumed;
                }
            }
            SessionCommand::SaveState { reply } => {
                let saved = self.saves.save_battery_ram(self.pacing.engine_mut()).await;
                let _ = reply.send(saved);
            }
            SessionCommand::ListSlots { reply } => {
                let _ = reply.send(self.saves.list_slots().await);
            }
            SessionCommand::SaveSlot { slot, reply } => {
                let saved = self.paused_for("save", slot) && self.save_slot(slot).await;
                let _ = reply.send(saved);
            }
            SessionCommand::LoadSlot { slot, reply } => {
                let loaded = self.paused_for("load", slot) && self.load_slot(slot).await;
                let _ = reply.send(loaded);
            }
            SessionCommand::DeleteSlot { slot, reply } => {
                let _ = reply.send(self.saves.delete_slot(slot).await);
            }
            SessionCommand::Stop { reply } => return Flow::Stop(reply),
        }
        Flow::Continue
    }

    /// Retry the pending menu resume and answer its waiters once it completes.
    /// Returns `true` if the loop went from paused to running.
    fn finish_resume(&mut self) -> bool {
        let was_running = self.pacing.is_running();
        match self.pause.resume(PauseReason::Menu, &mut self.pacing) {
            Resume::Pending => false,
            Resume::Done { running } => {
                for reply in self.pending_resume.drain(..) {
                    let _ = reply.send(running);
                }
                running && !was_running
            }
        }
    }

    fn cancel_pending_resume(&mut self) {
        if !self.pending_resume.is_empty() {
            tracing::debug!("Pending resume cancelled");
        }
        for reply in self.pending_resume.drain(..) {
            let _ = reply.send(false);
        }
    }

    fn paused_for(&self, what: &str, slot: u32) -> bool {
        if self.pause.is_paused() {
            true
        } else {
            tracing::warn!("Refusing to {} slot {} while running", what, slot);
            false
        }
    }

    async fn save_slot(&mut self, slot: u32) -> bool {
        let snapshot = self.pacing.surface().snapshot();
        let capture = SlotCapture {
            profile: self.profile,
            frame: self.pacing.frames(),
            surface: snapshot.as_ref().map(|s| s.as_frame()),
        };
        self.saves.save_slot(self.pacing.engine_mut(), slot, capture).await
    }

    async fn load_slot(&mut self, slot: u32) -> bool {
        match self.saves.load_slot(self.pacing.engine_mut(), slot).await {
            Some(meta) => {
                self.pacing.set_frames(meta.frame);
                true
            }
            None => false,
        }
    }

    async fn shutdown(&mut self) -> SessionReport {
        self.cancel_pending_resume();
        let battery_saved = if self.save_on_exit {
            self.saves.save_battery_ram(self.pacing.engine_mut()).await
        } else {
            false
        };
        self.pacing.stop();

        let report = SessionReport {
            frames: self.pacing.frames(),
            battery_saved,
            saves: self.saves.stats(),
        };
        tracing::info!("Session stopped after {} frames", report.frames);
        report
    }
}
