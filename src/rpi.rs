//! SPI peripheral of a Raspberry Pi, through rppal.

use std::io;

use embedded_hal::spi::{Mode, Phase, Polarity};
use log::debug;
use rppal::spi::{self, Bus, SlaveSelect, Spi};

use crate::apa102::{Format, Peripheral};
use crate::config::SpiConfig;

fn invalid_input(msg: String) -> spi::Error {
    spi::Error::Io(io::Error::new(io::ErrorKind::InvalidInput, msg))
}

fn bus_from_number(bus: u8) -> Result<Bus, spi::Error> {
    match bus {
        0 => Ok(Bus::Spi0),
        1 => Ok(Bus::Spi1),
        2 => Ok(Bus::Spi2),
        3 => Ok(Bus::Spi3),
        4 => Ok(Bus::Spi4),
        5 => Ok(Bus::Spi5),
        6 => Ok(Bus::Spi6),
        _ => Err(invalid_input(format!("unknown spi bus {}", bus))),
    }
}

fn slave_from_number(slave: u8) -> Result<SlaveSelect, spi::Error> {
    match slave {
        0 => Ok(SlaveSelect::Ss0),
        1 => Ok(SlaveSelect::Ss1),
        2 => Ok(SlaveSelect::Ss2),
        _ => Err(invalid_input(format!("unknown slave select {}", slave))),
    }
}

fn rppal_mode(mode: Mode) -> spi::Mode {
    match (mode.polarity, mode.phase) {
        (Polarity::IdleLow, Phase::CaptureOnFirstTransition) => spi::Mode::Mode0,
        (Polarity::IdleLow, Phase::CaptureOnSecondTransition) => spi::Mode::Mode1,
        (Polarity::IdleHigh, Phase::CaptureOnFirstTransition) => spi::Mode::Mode2,
        (Polarity::IdleHigh, Phase::CaptureOnSecondTransition) => spi::Mode::Mode3,
    }
}

/// Opens the bus anew for every transfer with the last format set.
pub struct RppalHost {
    bus: Bus,
    slave: SlaveSelect,
    clock_hz: u32,
    format: Format,
}

impl RppalHost {
    pub fn new(bus: u8, slave: u8, clock_hz: u32) -> Result<Self, spi::Error> {
        Ok(Self {
            bus: bus_from_number(bus)?,
            slave: slave_from_number(slave)?,
            clock_hz,
            format: Format::default(),
        })
    }

    pub fn from_config(config: &SpiConfig) -> Result<Self, spi::Error> {
        Self::new(config.bus, config.slave, config.clock_hz)
    }
}

impl Peripheral for RppalHost {
    type Handle = Spi;

    fn set_format(&mut self, format: Format) -> Result<(), spi::Error> {
        self.format = format;
        Ok(())
    }

    fn alloc(&mut self) -> Result<Spi, spi::Error> {
        debug!(
            "opening {:?}/{:?} at {} hz",
            self.bus, self.slave, self.clock_hz
        );
        let spi = Spi::new(
            self.bus,
            self.slave,
            self.clock_hz,
            rppal_mode(self.format.mode),
        )?;
        spi.set_bits_per_word(self.format.bits)?;
        Ok(spi)
    }
}
