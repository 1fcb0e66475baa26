use std::fs;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::apa102::{mode_from_number, Format};
use crate::color::ColorOrder;
use crate::display::{DEFAULT_LENGTH, MAX_LENGTH, MIN_LENGTH};

/// Board settings, usually read from a YAML file.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub spi: SpiConfig,
    pub strip: StripConfig,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SpiConfig {
    pub bus: u8,
    pub slave: u8,
    /// SPI clock speed in hz
    pub clock_hz: u32,
    pub bits: u8,
    /// SPI mode number, 0 to 3
    pub mode: u8,
}

impl Default for SpiConfig {
    fn default() -> Self {
        Self {
            bus: 0,
            slave: 0,
            clock_hz: 4_000_000,
            bits: 8,
            mode: 3,
        }
    }
}

impl SpiConfig {
    pub fn format(&self) -> Result<Format> {
        let mode = mode_from_number(self.mode)
            .ok_or_else(|| anyhow!("invalid spi mode {}, expected 0 to 3", self.mode))?;
        Ok(Format::new(self.bits, mode))
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct StripConfig {
    pub length: usize,
    pub brightness: u8,
    pub order: ColorOrder,
}

impl Default for StripConfig {
    fn default() -> Self {
        Self {
            length: DEFAULT_LENGTH,
            brightness: u8::MAX,
            order: ColorOrder::Rgb,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.spi.format()?;
        if self.spi.bits == 0 {
            bail!("spi bits per word must be positive");
        }
        if self.spi.clock_hz == 0 {
            bail!("spi clock must be positive");
        }
        if !(MIN_LENGTH..=MAX_LENGTH).contains(&self.strip.length) {
            bail!(
                "strip length {} out of range {}..={}",
                self.strip.length,
                MIN_LENGTH,
                MAX_LENGTH
            );
        }
        Ok(())
    }
}
