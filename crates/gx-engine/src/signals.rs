//! Signals raised by the core's callbacks
//!
//! The core may call back into the host in the middle of an entry
//! point (resize, fatal abort). Callbacks only record what happened;
//! the pacing loop drains the cell before every tick.

use crate::engine::HostCallbacks;
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Default)]
struct SignalState {
    resize: Option<(u32, u32)>,
    views_stale: bool,
    abort: Option<String>,
}

/// Shared cell written by engine callbacks
#[derive(Debug, Default)]
pub struct HostSignals {
    state: Mutex<SignalState>,
}

impl HostSignals {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Native output dimensions changed; views must be rebuilt
    pub fn notify_resize(&self, width: u32, height: u32) {
        tracing::debug!("Engine resize callback: {}x{}", width, height);
        let mut state = self.state.lock();
        state.resize = Some((width, height));
        state.views_stale = true;
    }

    pub fn notify_abort(&self, reason: &str) {
        tracing::error!("Engine aborted: {}", reason);
        let mut state = self.state.lock();
        if state.abort.is_none() {
            state.abort = Some(reason.to_string());
        }
    }

    pub fn take_resize(&self) -> Option<(u32, u32)> {
        self.state.lock().resize.take()
    }

    pub fn take_views_stale(&self) -> bool {
        std::mem::take(&mut self.state.lock().views_stale)
    }

    /// Abort reason, sticky once set
    pub fn abort_reason(&self) -> Option<String> {
        self.state.lock().abort.clone()
    }

    /// Callbacks to register on the engine, writing into this cell
    pub fn callbacks(self: &Arc<Self>) -> HostCallbacks {
        let resize = Arc::clone(self);
        let abort = Arc::clone(self);
        HostCallbacks {
            on_resize: Box::new(move |w, h| resize.notify_resize(w, h)),
            on_abort: Box::new(move |reason| abort.notify_abort(reason)),
        }
    }
}
