//! Pause coordination
//!
//! The loop runs only while no pause reason is active. Loop and audio
//! are always switched together through [`PacingLoop::pause`] and
//! [`PacingLoop::resume`].
//!
//! ```text
//! RUNNING --pause(Menu), save battery RAM--> PAUSED
//! PAUSED  --resume(Menu), chord released, rearm--> RUNNING
//! ```
//!
//! Resuming from the menu never waits: while the chord is still held it
//! reports [`Resume::Pending`] and the caller polls again later.

use crate::pacing::PacingLoop;
use bitflags::bitflags;
use gx_core::config::{GeneralConfig, InputConfig};
use gx_engine::Engine;
use gx_save::SaveStateManager;
use std::time::Duration;

bitflags! {
    /// Active pause reasons
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PauseReasons: u8 {
        const MENU   = 0x01;
        const HIDDEN = 0x02;
    }
}

/// Why the loop is being paused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseReason {
    /// Pause menu opened (chord or UI request)
    Menu,
    /// Display surface hidden
    Hidden,
}

impl PauseReason {
    fn flag(self) -> PauseReasons {
        match self {
            Self::Menu => PauseReasons::MENU,
            Self::Hidden => PauseReasons::HIDDEN,
        }
    }
}

/// Result of a resume request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resume {
    /// The pause chord is still held; ask again after [`PauseCoordinator::release_poll`]
    Pending,
    /// The reason was cleared; `running` tells whether the loop runs again
    Done { running: bool },
}

#[derive(Debug, Clone)]
pub struct PauseCoordinator {
    reasons: PauseReasons,
    save_battery_on_pause: bool,
    pause_when_hidden: bool,
    release_poll: Duration,
}

impl PauseCoordinator {
    pub fn new(general: &GeneralConfig, input: &InputConfig) -> Self {
        Self {
            reasons: PauseReasons::empty(),
            save_battery_on_pause: general.save_battery_on_pause,
            pause_when_hidden: general.pause_when_hidden,
            release_poll: Duration::from_millis(input.release_poll_ms.max(1)),
        }
    }

    pub fn reasons(&self) -> PauseReasons {
        self.reasons
    }

    pub fn is_paused(&self) -> bool {
        !self.reasons.is_empty()
    }

    pub fn is_menu_open(&self) -> bool {
        self.reasons.contains(PauseReasons::MENU)
    }

    /// Interval at which a pending menu resume should be retried
    pub fn release_poll(&self) -> Duration {
        self.release_poll
    }

    /// Add a pause reason. Returns `true` if the loop was running before.
    pub async fn pause<E: Engine>(
        &mut self,
        reason: PauseReason,
        pacing: &mut PacingLoop<E>,
        saves: &mut SaveStateManager,
    ) -> bool {
        if reason == PauseReason::Hidden && !self.pause_when_hidden {
            return false;
        }
        if self.reasons.contains(reason.flag()) {
            return false;
        }

        let was_running = self.reasons.is_empty();
        self.reasons.insert(reason.flag());
        if was_running {
            pacing.pause();
        }
        tracing::debug!("Pause reasons now {:?}", self.reasons);

        if reason == PauseReason::Menu && self.save_battery_on_pause {
            saves.save_battery_ram(pacing.engine_mut()).await;
        }
        was_running
    }

    /// Clear a pause reason.
    ///
    /// Leaving the menu requires the pause chord to be released and the
    /// translator re-armed, so the held chord cannot pause again at once.
    pub fn resume<E: Engine>(&mut self, reason: PauseReason, pacing: &mut PacingLoop<E>) -> Resume {
        if !self.reasons.contains(reason.flag()) {
            return Resume::Done {
                running: pacing.is_running(),
            };
        }

        if reason == PauseReason::Menu {
            if !pacing.poll_pause_release() {
                return Resume::Pending;
            }
            pacing.rearm_pause();
        }

        self.reasons.remove(reason.flag());
        tracing::debug!("Pause reasons now {:?}", self.reasons);

        let running = self.reasons.is_empty() && pacing.resume();
        Resume::Done { running }
    }
}
