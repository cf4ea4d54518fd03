//! Memory bridge
//!
//! Copies the ROM into engine memory, configures the hardware and maps
//! zero-copy views (frame buffer, audio channels, input registers) onto
//! the offsets the engine reports. Views carry the memory generation
//! they were built for and refuse access once memory is replaced.

use crate::engine::{ConfigureParams, Engine};
use crate::loader::EngineHandle;
use crate::memory::LinearMemory;
use crate::rom::RomImage;
use gx_core::{BridgeError, HostError};
use tracing::{debug, info};

/// Frame buffer width, identical for every region
pub const FRAME_WIDTH: u32 = 320;

pub const FRAME_HEIGHT_NTSC: u32 = 224;

pub const FRAME_HEIGHT_PAL: u32 = 240;

/// Number of 16-bit input registers exposed by the engine
pub const INPUT_REGISTER_WORDS: usize = 32;

/// Extra samples per audio channel beyond one frame's worth
pub const AUDIO_HEADROOM_SAMPLES: usize = 100;

/// Video timing chosen after the engine reports its region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoMode {
    pub width: u32,
    pub height: u32,
    /// Display fields per second
    pub frame_rate: u32,
    pub pal: bool,
}

impl VideoMode {
    pub fn for_region(pal: bool) -> Self {
        if pal {
            Self {
                width: FRAME_WIDTH,
                height: FRAME_HEIGHT_PAL,
                frame_rate: 50,
                pal,
            }
        } else {
            Self {
                width: FRAME_WIDTH,
                height: FRAME_HEIGHT_NTSC,
                frame_rate: 60,
                pal,
            }
        }
    }

    /// RGBA bytes in one frame
    pub fn frame_bytes(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

/// Samples per channel the audio views hold
pub fn audio_buffer_len(sample_rate: u32, frame_rate: u32) -> usize {
    (sample_rate as usize).div_ceil(frame_rate.max(1) as usize) + AUDIO_HEADROOM_SAMPLES
}

#[derive(Debug, Clone, Copy)]
struct View {
    what: &'static str,
    offset: usize,
    len: usize,
    generation: u64,
}

impl View {
    fn build(
        mem: &LinearMemory,
        what: &'static str,
        offset: usize,
        len: usize,
        align: usize,
    ) -> Result<Self, BridgeError> {
        mem.check_region(what, offset, len, align)?;
        Ok(Self {
            what,
            offset,
            len,
            generation: mem.generation(),
        })
    }

    fn check(&self, mem: &LinearMemory) -> Result<(), BridgeError> {
        if self.generation != mem.generation() {
            return Err(BridgeError::StaleView {
                what: self.what,
                built: self.generation,
                current: mem.generation(),
            });
        }
        Ok(())
    }

    fn bytes<'a>(&self, mem: &'a LinearMemory) -> Result<&'a [u8], BridgeError> {
        self.check(mem)?;
        mem.region(self.offset, self.len).ok_or(BridgeError::OutOfBounds {
            what: self.what,
            offset: self.offset,
            len: self.len,
            memory_len: mem.len(),
        })
    }

    fn bytes_mut<'a>(&self, mem: &'a mut LinearMemory) -> Result<&'a mut [u8], BridgeError> {
        self.check(mem)?;
        let memory_len = mem.len();
        mem.region_mut(self.offset, self.len).ok_or(BridgeError::OutOfBounds {
            what: self.what,
            offset: self.offset,
            len: self.len,
            memory_len,
        })
    }
}

/// Typed views onto engine memory
#[derive(Debug)]
pub struct MemoryBridge {
    video: VideoMode,
    audio_len: usize,
    frame: View,
    audio_left: View,
    audio_right: View,
    input: View,
    rebuilds: u64,
}

impl MemoryBridge {
    /// Copy the ROM in, configure the hardware and build the initial views
    pub fn boot<E: Engine>(
        handle: &mut EngineHandle<E>,
        rom: &RomImage,
        params: &ConfigureParams,
        sample_rate: u32,
    ) -> Result<Self, HostError> {
        if rom.is_empty() {
            return Err(HostError::InvalidRom("ROM buffer is empty".to_string()));
        }

        let engine = handle.engine_mut();
        let rom_offset = engine.rom_buffer_ref(rom.len())?;
        engine.memory_mut().write("rom", rom_offset, rom.bytes())?;
        debug!("Copied {} ROM bytes to 0x{:08x}", rom.len(), rom_offset);

        info!(
            "Configuring {} (profile {}, region {}, fm {}, 3-button {})",
            params.profile.name(),
            params.profile.code(),
            params.region.code(),
            params.fm_chip_code(),
            params.force_three_button
        );
        engine.configure(params)?;
        handle.check_abort()?;

        let video = VideoMode::for_region(handle.engine().is_pal());
        let audio_len = audio_buffer_len(sample_rate, video.frame_rate);
        info!(
            "Video mode {}x{} @ {}Hz ({}), {} audio samples per channel",
            video.width,
            video.height,
            video.frame_rate,
            if video.pal { "PAL" } else { "NTSC" },
            audio_len
        );

        let bridge = Self::build(handle.engine(), video, audio_len, 0)?;
        handle.signals().take_views_stale();
        Ok(bridge)
    }

    fn build<E: Engine>(
        engine: &E,
        video: VideoMode,
        audio_len: usize,
        rebuilds: u64,
    ) -> Result<Self, BridgeError> {
        let mem = engine.memory();
        let audio_bytes = audio_len * std::mem::size_of::<f32>();

        Ok(Self {
            video,
            audio_len,
            frame: View::build(mem, "frame", engine.frame_buffer_ref(), video.frame_bytes(), 4)?,
            audio_left: View::build(mem, "audio left", engine.audio_left_ref(), audio_bytes, 4)?,
            audio_right: View::build(mem, "audio right", engine.audio_right_ref(), audio_bytes, 4)?,
            input: View::build(
                mem,
                "input",
                engine.input_buffer_ref(),
                INPUT_REGISTER_WORDS * std::mem::size_of::<u16>(),
                2,
            )?,
            rebuilds,
        })
    }

    /// Rebuild views if memory was replaced or the engine flagged them stale.
    ///
    /// Returns `true` when a rebuild happened.
    pub fn ensure_fresh<E: Engine>(&mut self, handle: &EngineHandle<E>) -> Result<bool, BridgeError> {
        let flagged = handle.signals().take_views_stale();
        let moved = self.frame.generation != handle.memory().generation();
        if !flagged && !moved {
            return Ok(false);
        }

        debug!(
            "Rebuilding memory views (flagged: {}, generation {} -> {})",
            flagged,
            self.frame.generation,
            handle.memory().generation()
        );
        *self = Self::build(handle.engine(), self.video, self.audio_len, self.rebuilds + 1)?;
        Ok(true)
    }

    pub fn video(&self) -> VideoMode {
        self.video
    }

    pub fn audio_len(&self) -> usize {
        self.audio_len
    }

    /// Number of times the views were rebuilt after boot
    pub fn rebuilds(&self) -> u64 {
        self.rebuilds
    }

    /// RGBA frame written by the engine on each step
    pub fn frame<'a>(&self, mem: &'a LinearMemory) -> Result<&'a [u8], BridgeError> {
        self.frame.bytes(mem)
    }

    /// Left and right channel samples
    pub fn audio<'a>(&self, mem: &'a LinearMemory) -> Result<(&'a [f32], &'a [f32]), BridgeError> {
        let left = cast_f32(self.audio_left.bytes(mem)?, self.audio_left)?;
        let right = cast_f32(self.audio_right.bytes(mem)?, self.audio_right)?;
        Ok((left, right))
    }

    pub fn input_mut<'a>(&self, mem: &'a mut LinearMemory) -> Result<&'a mut [u16], BridgeError> {
        let view = self.input;
        bytemuck::try_cast_slice_mut(view.bytes_mut(mem)?).map_err(|_| BridgeError::Misaligned {
            what: view.what,
            offset: view.offset,
            align: 2,
        })
    }

    pub fn input<'a>(&self, mem: &'a LinearMemory) -> Result<&'a [u16], BridgeError> {
        let view = self.input;
        bytemuck::try_cast_slice(view.bytes(mem)?).map_err(|_| BridgeError::Misaligned {
            what: view.what,
            offset: view.offset,
            align: 2,
        })
    }
}

fn cast_f32(bytes: &[u8], view: View) -> Result<&[f32], BridgeError> {
    bytemuck::try_cast_slice(bytes).map_err(|_| BridgeError::Misaligned {
        what: view.what,
        offset: view.offset,
        align: 4,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{HardwareProfile, Region};
    use crate::loader::CoreLoader;
    use crate::stub::{StubEngine, StubSource};

    async fn boot(params: ConfigureParams) -> (EngineHandle<StubEngine>, MemoryBridge) {
        let mut handle = CoreLoader::load(&StubSource::new(StubEngine::new()))
            .await
            .unwrap();
        let rom = RomImage::new(vec![0xAAu8; 4096], "hash").unwrap();
        let bridge = MemoryBridge::boot(&mut handle, &rom, &params, 48_000).unwrap();
        (handle, bridge)
    }

    #[test]
    fn test_audio_buffer_len() {
        assert_eq!(audio_buffer_len(48_000, 60), 900);
        assert_eq!(audio_buffer_len(48_000, 50), 1060);
        assert_eq!(audio_buffer_len(44_100, 60), 835);
    }

    #[test]
    fn test_video_mode_dimensions() {
        let ntsc = VideoMode::for_region(false);
        assert_eq!((ntsc.width, ntsc.height, ntsc.frame_rate), (320, 224, 60));
        let pal = VideoMode::for_region(true);
        assert_eq!((pal.width, pal.height, pal.frame_rate), (320, 240, 50));
        assert_eq!(pal.frame_bytes(), 320 * 240 * 4);
    }

    #[tokio::test]
    async fn test_boot_copies_rom_and_configures() {
        let mut params = ConfigureParams::new(HardwareProfile::GameGear);
        params.region = Region::Pal;
        let (handle, bridge) = boot(params).await;

        let probe = handle.engine().probe();
        assert_eq!(probe.state().configure_calls, vec![params]);
        assert!(bridge.video().pal);
        assert_eq!(bridge.video().height, FRAME_HEIGHT_PAL);
        assert_eq!(bridge.audio_len(), 1060);

        let rom_offset = handle.engine().rom_offset();
        assert_eq!(handle.memory().region(rom_offset, 4096).unwrap(), &[0xAA; 4096][..]);
    }

    #[tokio::test]
    async fn test_every_profile_selects_dimensions_by_region() {
        for profile in HardwareProfile::ALL {
            for (region, height) in [(Region::Ntsc, 224), (Region::Pal, 240)] {
                let mut params = ConfigureParams::new(profile);
                params.region = region;
                let (handle, bridge) = boot(params).await;

                let calls = handle.engine().probe().state().configure_calls;
                assert_eq!(calls.len(), 1);
                assert_eq!(calls[0].profile.code(), profile.code());
                assert_eq!(bridge.video().width, 320);
                assert_eq!(bridge.video().height, height);
            }
        }
    }

    #[tokio::test]
    async fn test_views_cover_engine_regions() {
        let (mut handle, bridge) = boot(ConfigureParams::new(HardwareProfile::MegaDrive)).await;

        assert_eq!(bridge.frame(handle.memory()).unwrap().len(), 320 * 224 * 4);
        let (left, right) = bridge.audio(handle.memory()).unwrap();
        assert_eq!(left.len(), 900);
        assert_eq!(right.len(), 900);

        let input = bridge.input_mut(handle.engine_mut().memory_mut()).unwrap();
        assert_eq!(input.len(), INPUT_REGISTER_WORDS);
        input[0] = 0x0002;
        assert_eq!(handle.engine().input_word(0), 0x0002);
    }

    #[tokio::test]
    async fn test_stale_views_are_rejected_and_rebuilt() {
        let (mut handle, mut bridge) = boot(ConfigureParams::new(HardwareProfile::MegaDrive)).await;

        let grown = handle.memory().len() + 0x10000;
        handle.engine_mut().memory_mut().grow(grown);
        assert!(matches!(
            bridge.frame(handle.memory()),
            Err(BridgeError::StaleView { what: "frame", .. })
        ));

        assert!(bridge.ensure_fresh(&handle).unwrap());
        assert_eq!(bridge.rebuilds(), 1);
        assert!(bridge.frame(handle.memory()).is_ok());
        assert!(!bridge.ensure_fresh(&handle).unwrap());
    }

    #[tokio::test]
    async fn test_resize_callback_forces_rebuild() {
        let (handle, mut bridge) = boot(ConfigureParams::new(HardwareProfile::MegaDrive)).await;

        handle.signals().notify_resize(256, 224);
        assert!(bridge.ensure_fresh(&handle).unwrap());
        assert_eq!(bridge.rebuilds(), 1);
    }
}
