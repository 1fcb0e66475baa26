//! Driver for the APA102 (DotStar) LEDs of the Bright Board.
//!
//! [`apa102::DotStar`] turns a flat RGB buffer into the APA102 bitstream and
//! writes it one byte at a time over a transfer handle obtained from a
//! [`apa102::Peripheral`]. [`display::Display`] keeps the pixel buffer and the
//! color operations on top of it.

pub mod apa102;
pub mod color;
pub mod config;
pub mod display;
pub mod pattern;
pub mod rpi;
pub mod transform;

#[cfg(test)]
mod testutil;
