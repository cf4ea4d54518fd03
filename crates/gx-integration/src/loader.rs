//! ROM requests
//!
//! Turns what the surrounding application hands over (application type
//! string, content hash, raw bytes and a few flags) into a validated
//! [`RomImage`] plus the hardware parameters the core is configured with.

use gx_core::HostError;
use gx_engine::{ConfigureParams, HardwareProfile, Region, RomImage};
use std::sync::Arc;

/// Application type, one per supported console family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppType {
    MegaDrive,
    MasterSystem,
    GameGear,
    Sg1000,
}

impl AppType {
    pub fn parse(app_type: &str) -> Result<Self, HostError> {
        match app_type {
            "genplusgx-md" => Ok(Self::MegaDrive),
            "genplusgx-sms" => Ok(Self::MasterSystem),
            "genplusgx-gg" => Ok(Self::GameGear),
            "genplusgx-sg" => Ok(Self::Sg1000),
            other => Err(HostError::Config(format!("unsupported application type '{}'", other))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::MegaDrive => "genplusgx-md",
            Self::MasterSystem => "genplusgx-sms",
            Self::GameGear => "genplusgx-gg",
            Self::Sg1000 => "genplusgx-sg",
        }
    }

    /// Hardware profile; `hw_variant` 1 selects the first Master System revision
    pub fn profile(self, hw_variant: u32) -> HardwareProfile {
        match self {
            Self::MegaDrive => HardwareProfile::MegaDrive,
            Self::MasterSystem if hw_variant == 1 => HardwareProfile::MasterSystem,
            Self::MasterSystem => HardwareProfile::MasterSystem2,
            Self::GameGear => HardwareProfile::GameGear,
            Self::Sg1000 => HardwareProfile::Sg1000,
        }
    }
}

/// A validated ROM plus how to configure the core for it
#[derive(Debug, Clone)]
pub struct RomRequest {
    pub app_type: AppType,
    pub rom: RomImage,
    pub params: ConfigureParams,
}

impl RomRequest {
    /// Validate a ROM handed over by the surrounding application.
    ///
    /// `pal` forces a region (`None` lets the core decide), `fm_chip`
    /// toggles the Master System FM unit and `pad3` forces 3-button pads.
    pub fn new(
        app_type: &str,
        hash: &str,
        bytes: impl Into<Arc<[u8]>>,
        pal: Option<bool>,
        fm_chip: Option<bool>,
        hw_variant: u32,
        pad3: bool,
    ) -> Result<Self, HostError> {
        let app_type = AppType::parse(app_type)?;
        let rom = RomImage::new(bytes, hash)?;

        let mut params = ConfigureParams::new(app_type.profile(hw_variant));
        params.region = Region::from_pal_flag(pal);
        params.fm_chip = fm_chip;
        params.force_three_button = pad3;

        tracing::info!(
            "ROM {} ({} bytes) for {} [{:?}]",
            rom.hash(),
            rom.len(),
            params.profile.name(),
            params.region
        );

        Ok(Self {
            app_type,
            rom,
            params,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_types() {
        for app in [AppType::MegaDrive, AppType::MasterSystem, AppType::GameGear, AppType::Sg1000] {
            assert_eq!(AppType::parse(app.as_str()).unwrap(), app);
        }
        assert!(matches!(AppType::parse("genplusgx-32x"), Err(HostError::Config(_))));
    }

    #[test]
    fn test_master_system_variants() {
        assert_eq!(AppType::MasterSystem.profile(0), HardwareProfile::MasterSystem2);
        assert_eq!(AppType::MasterSystem.profile(1), HardwareProfile::MasterSystem);
        assert_eq!(AppType::MegaDrive.profile(1), HardwareProfile::MegaDrive);
    }

    #[test]
    fn test_request_params() {
        let request = RomRequest::new(
            "genplusgx-sms",
            "abc",
            vec![0u8; 16],
            Some(true),
            Some(false),
            0,
            true,
        )
        .unwrap();
        assert_eq!(request.params.profile, HardwareProfile::MasterSystem2);
        assert_eq!(request.params.region, Region::Pal);
        assert_eq!(request.params.fm_chip_code(), 0);
        assert!(request.params.force_three_button);
    }

    #[test]
    fn test_empty_rom_rejected() {
        let result = RomRequest::new("genplusgx-md", "abc", Vec::new(), None, None, 0, false);
        assert!(matches!(result, Err(HostError::InvalidRom(_))));
    }
}
