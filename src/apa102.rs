use embedded_hal::spi::{ErrorType, Mode, SpiBus, MODE_0, MODE_1, MODE_2, MODE_3};
use log::{debug, trace};

/// Four zero bytes open every transmission.
pub const START_FRAME: [u8; 4] = [0x00; 4];
/// Four 0xff bytes close every transmission.
pub const END_FRAME: [u8; 4] = [0xff; 4];
/// Global brightness byte sent in front of each pixel. Colors are already
/// scaled in the buffer, so the LED driver always runs at full brightness.
pub const FULL_BRIGHTNESS: u8 = 0xff;
/// Byte sent after the color bytes of every pixel.
pub const PIXEL_PAD: u8 = 0x00;
/// Bytes on the wire per pixel.
pub const PIXEL_FRAME_LEN: usize = 5;
/// Bytes per pixel in the caller's buffer.
pub const STRIDE: usize = 3;
/// Pixels lit by [`DotStar::clear`].
pub const CLEAR_LENGTH: usize = 12;
/// Color lit by [`DotStar::clear`], as (R, G, B).
pub const CLEAR_COLOR: [u8; 3] = [0xff, 0x00, 0x00];

/// Word width and clock mode of the transfers.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Format {
    pub bits: u8,
    pub mode: Mode,
}

impl Format {
    pub fn new(bits: u8, mode: Mode) -> Self {
        Self { bits, mode }
    }
}

impl Default for Format {
    fn default() -> Self {
        Self {
            bits: 8,
            mode: MODE_3,
        }
    }
}

/// Maps the usual 0-3 SPI mode number to its polarity and phase.
pub fn mode_from_number(mode: u8) -> Option<Mode> {
    match mode {
        0 => Some(MODE_0),
        1 => Some(MODE_1),
        2 => Some(MODE_2),
        3 => Some(MODE_3),
        _ => None,
    }
}

/// Host side of the SPI bus: owns the peripheral and hands out a transfer
/// handle for each transmission.
pub trait Peripheral {
    type Handle: SpiBus<u8>;

    /// Sets the word width and clock mode used by handles allocated from now on.
    fn set_format(&mut self, format: Format) -> core::result::Result<(), SpiError<Self>>;

    /// Returns a handle to the configured bus.
    fn alloc(&mut self) -> core::result::Result<Self::Handle, SpiError<Self>>;
}

/// Error type of the handles of peripheral `P`.
pub type SpiError<P> = <<P as Peripheral>::Handle as ErrorType>::Error;

#[derive(Debug, thiserror::Error)]
pub enum Error<E> {
    #[error("spi transfer failed: {0:?}")]
    Spi(E),
    #[error("buffer of {len} bytes cannot hold {pixels} pixels ({needed} bytes needed)")]
    ShortBuffer {
        pixels: usize,
        needed: usize,
        len: usize,
    },
}

impl<E> From<E> for Error<E>
where
    E: embedded_hal::spi::Error,
{
    fn from(e: E) -> Self {
        Error::Spi(e)
    }
}

pub type Result<T, P> = core::result::Result<T, Error<SpiError<P>>>;

/// The five wire bytes of one pixel given as (R, G, B).
pub fn pixel_frame(rgb: &[u8]) -> [u8; PIXEL_FRAME_LEN] {
    [FULL_BRIGHTNESS, rgb[2], rgb[1], rgb[0], PIXEL_PAD]
}

/// Wire bytes of a full transmission of the first `pixels` pixels of `buf`.
///
/// Panics if `buf` holds fewer than `3 * pixels` bytes; [`DotStar::send_buffer`]
/// checks the length first.
pub fn frame(buf: &[u8], pixels: usize) -> impl Iterator<Item = u8> + '_ {
    START_FRAME
        .into_iter()
        .chain(buf[..pixels * STRIDE].chunks_exact(STRIDE).flat_map(pixel_frame))
        .chain(END_FRAME)
}

/// Wire bytes of the fixed clear pattern.
pub fn clear_frame() -> impl Iterator<Item = u8> {
    START_FRAME
        .into_iter()
        .chain((0..CLEAR_LENGTH).flat_map(|_| pixel_frame(&CLEAR_COLOR)))
        .chain(END_FRAME)
}

/// Number of bytes a transmission of `pixels` pixels puts on the wire, or
/// `None` if that does not fit in a `usize`.
pub fn frame_len(pixels: usize) -> Option<usize> {
    PIXEL_FRAME_LEN
        .checked_mul(pixels)?
        .checked_add(START_FRAME.len() + END_FRAME.len())
}

/// APA102 strip behind an SPI peripheral.
pub struct DotStar<P> {
    host: P,
}

impl<P: Peripheral> DotStar<P> {
    pub fn new(host: P) -> Self {
        Self { host }
    }

    /// Sets the transfer format of the underlying peripheral.
    pub fn configure(&mut self, format: Format) -> Result<(), P> {
        debug!("spi format: {} bits, {:?}", format.bits, format.mode);
        self.host.set_format(format)?;
        Ok(())
    }

    /// Sends the first `pixels` RGB triplets of `buf` to the strip.
    pub fn send_buffer(&mut self, buf: &[u8], pixels: usize) -> Result<(), P> {
        let needed = pixels.checked_mul(STRIDE);
        match needed {
            Some(needed) if buf.len() >= needed => (),
            _ => {
                return Err(Error::ShortBuffer {
                    pixels,
                    needed: needed.unwrap_or(usize::MAX),
                    len: buf.len(),
                })
            }
        }
        trace!("sending {} pixels", pixels);
        self.write_all(frame(buf, pixels))
    }

    /// Lights the fixed 12 pixel test pattern, ignoring any display buffer.
    pub fn clear(&mut self) -> Result<(), P> {
        trace!("sending clear pattern");
        self.write_all(clear_frame())
    }

    fn write_all(&mut self, bytes: impl Iterator<Item = u8>) -> Result<(), P> {
        let mut spi = self.host.alloc()?;
        for byte in bytes {
            spi.write(&[byte])?;
        }
        spi.flush()?;
        Ok(())
    }
}
