//! Deterministic substitute for the emulation core
//!
//! Lets host logic (pacing, input, persistence) be exercised without the
//! compiled core. The frame buffer is a function of the frame counter
//! and port 0 input, so snapshot round trips can be compared byte for
//! byte. A [`StubProbe`] shared with the engine records every entry point
//! call and injects faults.

use crate::engine::{ConfigureParams, Engine, HostCallbacks, Region};
use crate::loader::EngineSource;
use crate::memory::LinearMemory;
use async_trait::async_trait;
use gx_core::EngineError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

const FRAME_OFFSET: usize = 0x100;
const MAX_FRAME_BYTES: usize = 320 * 240 * 4;
const AUDIO_CAPACITY: usize = 2048;
const AUDIO_LEFT_OFFSET: usize = FRAME_OFFSET + MAX_FRAME_BYTES;
const AUDIO_RIGHT_OFFSET: usize = AUDIO_LEFT_OFFSET + AUDIO_CAPACITY * 4;
const INPUT_OFFSET: usize = AUDIO_RIGHT_OFFSET + AUDIO_CAPACITY * 4;
const ROM_OFFSET: usize = INPUT_OFFSET + 0x100;
const INITIAL_ROM_AREA: usize = 0x1000;
const STATE_MAGIC: &[u8; 4] = b"STUB";

/// Output sample rate of the stub's audio
pub const STUB_SAMPLE_RATE: u32 = 48_000;

/// Everything the stub observed, plus fault injection switches
#[derive(Debug, Clone)]
pub struct ProbeState {
    pub init_calls: u32,
    pub configure_calls: Vec<ConfigureParams>,
    pub resets: u32,
    pub steps: u64,
    pub battery_saves: u32,
    pub battery_loads: u32,
    pub serializes: u32,
    pub deserializes: u32,
    /// Input registers of ports 0 and 1 seen by the most recent step
    pub last_input: [u16; 2],
    /// Battery RAM contents; empty means the cartridge has none
    pub sram: Vec<u8>,
    /// Region reported when configured with `Region::Auto`
    pub auto_pal: bool,
    pub fail_init: bool,
    pub fail_serialize: bool,
    /// Delivered through the abort callback on the next step
    pub pending_abort: Option<String>,
    /// Delivered through the resize callback on the next step
    pub pending_resize: Option<(u32, u32)>,
    /// Reallocate linear memory on the next step
    pub pending_grow: bool,
}

impl Default for ProbeState {
    fn default() -> Self {
        Self {
            init_calls: 0,
            configure_calls: Vec::new(),
            resets: 0,
            steps: 0,
            battery_saves: 0,
            battery_loads: 0,
            serializes: 0,
            deserializes: 0,
            last_input: [0; 2],
            sram: vec![0; 0x2000],
            auto_pal: false,
            fail_init: false,
            fail_serialize: false,
            pending_abort: None,
            pending_resize: None,
            pending_grow: false,
        }
    }
}

/// Shared handle onto a stub engine's [`ProbeState`]
#[derive(Debug, Clone, Default)]
pub struct StubProbe(Arc<Mutex<ProbeState>>);

impl StubProbe {
    /// Snapshot of the current probe state
    pub fn state(&self) -> ProbeState {
        self.0.lock().clone()
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut ProbeState) -> R) -> R {
        f(&mut self.0.lock())
    }
}

/// Substitute engine with a fixed memory layout
pub struct StubEngine {
    memory: LinearMemory,
    files: HashMap<String, Vec<u8>>,
    callbacks: Option<HostCallbacks>,
    pal: bool,
    frame: u32,
    last_samples: usize,
    probe: StubProbe,
}

impl StubEngine {
    pub fn new() -> Self {
        Self {
            memory: LinearMemory::new(0),
            files: HashMap::new(),
            callbacks: None,
            pal: false,
            frame: 0,
            last_samples: 0,
            probe: StubProbe::default(),
        }
    }

    pub fn probe(&self) -> StubProbe {
        self.probe.clone()
    }

    /// Frames rendered since the last reset or restored snapshot
    pub fn frame_counter(&self) -> u32 {
        self.frame
    }

    pub fn rom_offset(&self) -> usize {
        ROM_OFFSET
    }

    pub fn input_word(&self, index: usize) -> u16 {
        self.memory
            .region(INPUT_OFFSET + index * 2, 2)
            .map(|b| u16::from_ne_bytes([b[0], b[1]]))
            .unwrap_or(0)
    }

    fn render(&mut self, pad: u16) {
        let height = if self.pal { 240 } else { 224 };
        let frame = self.frame;
        if let Some(pixels) = self.memory.region_mut(FRAME_OFFSET, 320 * height * 4) {
            for (i, px) in pixels.chunks_exact_mut(4).enumerate() {
                px[0] = (frame as u8).wrapping_add(i as u8);
                px[1] = (pad & 0xFF) as u8;
                px[2] = (i >> 8) as u8;
                px[3] = 0xFF;
            }
        }
    }

    fn mix(&mut self) {
        let rate = if self.pal { 50 } else { 60 };
        let samples = (STUB_SAMPLE_RATE / rate) as usize;
        let level = (self.frame % 100) as f32 / 100.0;

        for (offset, value) in [(AUDIO_LEFT_OFFSET, level), (AUDIO_RIGHT_OFFSET, -level)] {
            if let Some(bytes) = self.memory.region_mut(offset, samples * 4) {
                if let Ok(channel) = bytemuck::try_cast_slice_mut::<u8, f32>(bytes) {
                    channel.fill(value);
                }
            }
        }
        self.last_samples = samples;
    }
}

impl Default for StubEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for StubEngine {
    fn set_host_callbacks(&mut self, callbacks: HostCallbacks) {
        self.callbacks = Some(callbacks);
    }

    fn init(&mut self) -> Result<(), EngineError> {
        let fail = self.probe.update(|s| {
            s.init_calls += 1;
            s.fail_init
        });
        if fail {
            return Err(EngineError::InitFailed("stub init failure".to_string()));
        }
        self.memory = LinearMemory::new(ROM_OFFSET + INITIAL_ROM_AREA);
        Ok(())
    }

    fn configure(&mut self, params: &ConfigureParams) -> Result<(), EngineError> {
        let auto_pal = self.probe.update(|s| {
            s.configure_calls.push(*params);
            s.auto_pal
        });
        self.pal = match params.region {
            Region::Auto => auto_pal,
            Region::Ntsc => false,
            Region::Pal => true,
        };
        Ok(())
    }

    fn reset(&mut self) {
        self.probe.update(|s| s.resets += 1);
        self.frame = 0;
    }

    fn step(&mut self) {
        let (abort, grow, resize) = self.probe.update(|s| {
            s.steps += 1;
            (
                s.pending_abort.take(),
                std::mem::take(&mut s.pending_grow),
                s.pending_resize.take(),
            )
        });

        if let Some(reason) = abort {
            if let Some(callbacks) = self.callbacks.as_mut() {
                (callbacks.on_abort)(&reason);
            }
            return;
        }
        if grow {
            let len = self.memory.len() + 0x10000;
            self.memory.grow(len);
        }
        if let Some((w, h)) = resize {
            if let Some(callbacks) = self.callbacks.as_mut() {
                (callbacks.on_resize)(w, h);
            }
        }

        let input = [self.input_word(0), self.input_word(1)];
        self.probe.update(|s| s.last_input = input);

        self.frame = self.frame.wrapping_add(1);
        self.render(input[0]);
        self.mix();
    }

    fn sound(&mut self) -> usize {
        self.last_samples
    }

    fn is_pal(&self) -> bool {
        self.pal
    }

    fn rom_buffer_ref(&mut self, len: usize) -> Result<usize, EngineError> {
        if self.memory.is_empty() {
            return Err(EngineError::RomBufferUnavailable(len));
        }
        self.memory.grow(ROM_OFFSET + len);
        Ok(ROM_OFFSET)
    }

    fn frame_buffer_ref(&self) -> usize {
        FRAME_OFFSET
    }

    fn audio_left_ref(&self) -> usize {
        AUDIO_LEFT_OFFSET
    }

    fn audio_right_ref(&self) -> usize {
        AUDIO_RIGHT_OFFSET
    }

    fn input_buffer_ref(&self) -> usize {
        INPUT_OFFSET
    }

    fn save_battery_ram(&mut self) -> bool {
        let sram = self.probe.update(|s| {
            s.battery_saves += 1;
            s.sram.clone()
        });
        if sram.is_empty() {
            return false;
        }
        self.files.insert(Self::BATTERY_RAM_FILE.to_string(), sram);
        true
    }

    fn load_battery_ram(&mut self) -> bool {
        self.probe.update(|s| s.battery_loads += 1);
        match self.files.get(Self::BATTERY_RAM_FILE) {
            Some(data) => {
                let data = data.clone();
                self.probe.update(|s| s.sram = data);
                true
            }
            None => false,
        }
    }

    fn serialize_state(&mut self) -> bool {
        let (fail, sram) = self.probe.update(|s| {
            s.serializes += 1;
            (s.fail_serialize, s.sram.clone())
        });
        if fail {
            return false;
        }

        let mut data = Vec::with_capacity(8 + sram.len());
        data.extend_from_slice(STATE_MAGIC);
        data.extend_from_slice(&self.frame.to_le_bytes());
        data.extend_from_slice(&sram);
        self.files.insert(Self::STATE_FILE.to_string(), data);
        true
    }

    fn deserialize_state(&mut self) -> bool {
        self.probe.update(|s| s.deserializes += 1);
        let Some(data) = self.files.get(Self::STATE_FILE) else {
            return false;
        };
        if data.len() < 8 || &data[..4] != STATE_MAGIC {
            return false;
        }

        self.frame = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
        let sram = data[8..].to_vec();
        self.probe.update(|s| s.sram = sram);
        true
    }

    fn memory(&self) -> &LinearMemory {
        &self.memory
    }

    fn memory_mut(&mut self) -> &mut LinearMemory {
        &mut self.memory
    }

    fn write_file(&mut self, path: &str, data: &[u8]) {
        self.files.insert(path.to_string(), data.to_vec());
    }

    fn read_file(&self, path: &str) -> Option<Vec<u8>> {
        self.files.get(path).cloned()
    }

    fn remove_file(&mut self, path: &str) {
        self.files.remove(path);
    }
}

/// Hands out one prepared [`StubEngine`], or fails like an unreachable module
pub struct StubSource {
    engine: Mutex<Option<StubEngine>>,
    failure: Option<String>,
}

impl StubSource {
    pub fn new(engine: StubEngine) -> Self {
        Self {
            engine: Mutex::new(Some(engine)),
            failure: None,
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            engine: Mutex::new(None),
            failure: Some(reason.to_string()),
        }
    }
}

#[async_trait(?Send)]
impl EngineSource for StubSource {
    type Engine = StubEngine;

    async fn fetch(&self) -> Result<StubEngine, EngineError> {
        if let Some(reason) = &self.failure {
            return Err(EngineError::LoadFailed(reason.clone()));
        }
        self.engine
            .lock()
            .take()
            .ok_or_else(|| EngineError::LoadFailed("stub engine already fetched".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_roundtrip_restores_frame_counter() {
        let mut engine = StubEngine::new();
        engine.init().unwrap();
        engine.step();
        engine.step();
        assert!(engine.serialize_state());

        engine.step();
        assert_eq!(engine.frame_counter(), 3);
        assert!(engine.deserialize_state());
        assert_eq!(engine.frame_counter(), 2);
    }

    #[test]
    fn test_battery_ram_goes_through_scratch_file() {
        let mut engine = StubEngine::new();
        engine.probe().update(|s| s.sram = vec![7; 4]);
        assert!(engine.save_battery_ram());
        assert_eq!(
            engine.read_file(StubEngine::BATTERY_RAM_FILE),
            Some(vec![7; 4])
        );

        engine.write_file(StubEngine::BATTERY_RAM_FILE, &[1, 2]);
        assert!(engine.load_battery_ram());
        assert_eq!(engine.probe().state().sram, vec![1, 2]);
    }
}
