//! Core loader
//!
//! Obtains an engine instance, wires its callbacks to the host and
//! allocates its memory. A failure anywhere in this sequence drops the
//! instance, so no partially initialized core outlives the error.

use crate::engine::Engine;
use crate::memory::LinearMemory;
use crate::signals::HostSignals;
use async_trait::async_trait;
use gx_core::EngineError;
use std::sync::Arc;
use tracing::{error, info};

/// Asynchronous provider of engine instances (module fetch + instantiate)
#[async_trait(?Send)]
pub trait EngineSource {
    type Engine: Engine;

    async fn fetch(&self) -> Result<Self::Engine, EngineError>;
}

/// A loaded and initialized engine. One per session.
pub struct EngineHandle<E: Engine> {
    engine: E,
    signals: Arc<HostSignals>,
}

impl<E: Engine> EngineHandle<E> {
    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn memory(&self) -> &LinearMemory {
        self.engine.memory()
    }

    pub fn signals(&self) -> &Arc<HostSignals> {
        &self.signals
    }

    /// Abort reason reported by the engine, if any
    pub fn check_abort(&self) -> Result<(), EngineError> {
        match self.signals.abort_reason() {
            Some(reason) => Err(EngineError::Aborted(reason)),
            None => Ok(()),
        }
    }
}

/// Loads and boots the engine
pub struct CoreLoader;

impl CoreLoader {
    /// Fetch an engine, register host callbacks and initialize its memory
    pub async fn load<S: EngineSource>(source: &S) -> Result<EngineHandle<S::Engine>, EngineError> {
        info!("Loading emulation core");

        let mut engine = source.fetch().await.map_err(|e| {
            error!("Core fetch failed: {}", e);
            match e {
                EngineError::LoadFailed(_) => e,
                other => EngineError::LoadFailed(other.to_string()),
            }
        })?;

        let signals = HostSignals::new();
        engine.set_host_callbacks(signals.callbacks());

        engine.init().map_err(|e| {
            error!("Core initialization failed: {}", e);
            match e {
                EngineError::InitFailed(_) => e,
                other => EngineError::InitFailed(other.to_string()),
            }
        })?;

        if let Some(reason) = signals.abort_reason() {
            return Err(EngineError::InitFailed(reason));
        }

        info!(
            "Core loaded, linear memory 0x{:x} bytes",
            engine.memory().len()
        );

        Ok(EngineHandle { engine, signals })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub::{StubEngine, StubSource};

    #[tokio::test]
    async fn test_load_initializes_engine() {
        let engine = StubEngine::new();
        let probe = engine.probe();
        let handle = CoreLoader::load(&StubSource::new(engine)).await.unwrap();

        assert_eq!(probe.state().init_calls, 1);
        assert!(!handle.memory().is_empty());
        assert!(handle.check_abort().is_ok());
    }

    #[tokio::test]
    async fn test_fetch_failure_is_load_failure() {
        let result = CoreLoader::load(&StubSource::failing("network error")).await;
        assert!(matches!(result, Err(EngineError::LoadFailed(_))));
    }

    #[tokio::test]
    async fn test_init_failure_is_reported() {
        let engine = StubEngine::new();
        engine.probe().update(|s| s.fail_init = true);
        let result = CoreLoader::load(&StubSource::new(engine)).await;
        assert!(matches!(result, Err(EngineError::InitFailed(_))));
    }
}
