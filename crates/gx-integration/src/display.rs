//! Display surfaces

use gx_save::FrameRef;
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;

/// Where presented frames end up (a canvas, a window, a test buffer)
pub trait DisplaySurface {
    /// Native output dimensions changed
    fn resize(&mut self, width: u32, height: u32);

    /// Show one RGBA frame
    fn present(&mut self, rgba: &[u8], width: u32, height: u32);

    /// Status text drawn over the frame, e.g. the FPS counter
    fn set_overlay(&mut self, _text: Option<String>) {}

    /// Copy of the currently shown frame, if any
    fn snapshot(&self) -> Option<SurfaceSnapshot>;
}

/// Owned copy of a presented frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceSnapshot {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl SurfaceSnapshot {
    pub fn as_frame(&self) -> FrameRef<'_> {
        FrameRef {
            rgba: &self.rgba,
            width: self.width,
            height: self.height,
        }
    }
}

#[derive(Debug, Default)]
pub struct SurfaceState {
    pub pixels: Vec<u8>,
    pub frame_width: u32,
    pub frame_height: u32,
    /// Size requested through [`DisplaySurface::resize`]
    pub size: (u32, u32),
    pub presents: u64,
    pub overlay: Option<String>,
}

/// In-memory surface; clones observe the same state
#[derive(Debug, Clone, Default)]
pub struct BufferSurface {
    state: Arc<Mutex<SurfaceState>>,
}

impl BufferSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, SurfaceState> {
        self.state.lock()
    }

    pub fn pixels(&self) -> Vec<u8> {
        self.state.lock().pixels.clone()
    }

    pub fn presents(&self) -> u64 {
        self.state.lock().presents
    }
}

impl DisplaySurface for BufferSurface {
    fn resize(&mut self, width: u32, height: u32) {
        tracing::debug!("Surface resized to {}x{}", width, height);
        self.state.lock().size = (width, height);
    }

    fn present(&mut self, rgba: &[u8], width: u32, height: u32) {
        let mut state = self.state.lock();
        state.pixels.clear();
        state.pixels.extend_from_slice(rgba);
        state.frame_width = width;
        state.frame_height = height;
        state.presents += 1;
    }

    fn set_overlay(&mut self, text: Option<String>) {
        self.state.lock().overlay = text;
    }

    fn snapshot(&self) -> Option<SurfaceSnapshot> {
        let state = self.state.lock();
        (state.presents > 0).then(|| SurfaceSnapshot {
            rgba: state.pixels.clone(),
            width: state.frame_width,
            height: state.frame_height,
        })
    }
}
