use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// An 8 bit per channel color.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(0xff, 0xff, 0xff);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Unpacks `0xRRGGBB`. The top byte is ignored.
    pub const fn from_packed(rgb: u32) -> Self {
        Self {
            r: (rgb >> 16) as u8,
            g: (rgb >> 8) as u8,
            b: rgb as u8,
        }
    }

    pub const fn packed(self) -> u32 {
        (self.r as u32) << 16 | (self.g as u32) << 8 | self.b as u32
    }

    fn map(self, f: impl Fn(u8) -> u8) -> Self {
        Self::new(f(self.r), f(self.g), f(self.b))
    }

    /// Dims the color by `brightness` out of 255.
    pub fn fade(self, brightness: u8) -> Self {
        if brightness == u8::MAX {
            return self;
        }
        self.map(|c| scale(c, brightness))
    }

    /// Undoes [`Rgb::fade`] as far as the lost precision allows.
    pub fn restore_brightness(self, brightness: u8) -> Self {
        match brightness {
            u8::MAX => self,
            0 => self.map(|c| if c == 0 { 0 } else { u8::MAX }),
            br => self.map(|c| (((c as u32) << 8) / br as u32).min(255) as u8),
        }
    }

    /// Mixes in `alpha`/255 of `other`.
    pub fn blend(self, alpha: i32, other: Rgb) -> Self {
        let alpha = alpha.clamp(0, 0xff) as u32;
        let malpha = 0xff - alpha;
        let mix = |a: u8, b: u8| ((a as u32 * malpha + b as u32 * alpha) >> 8) as u8;
        Self::new(
            mix(self.r, other.r),
            mix(self.g, other.g),
            mix(self.b, other.b),
        )
    }
}

/// Byte order of a pixel in the display buffer. Blue always comes last.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorOrder {
    #[default]
    Rgb,
    Grb,
}

impl ColorOrder {
    /// Writes `color` into the three bytes of `pixel`.
    pub fn store(self, pixel: &mut [u8], color: Rgb) {
        let (first, second) = match self {
            ColorOrder::Rgb => (color.r, color.g),
            ColorOrder::Grb => (color.g, color.r),
        };
        pixel[0] = first;
        pixel[1] = second;
        pixel[2] = color.b;
    }

    /// Reads back a color written with [`ColorOrder::store`].
    pub fn load(self, pixel: &[u8]) -> Rgb {
        match self {
            ColorOrder::Rgb => Rgb::new(pixel[0], pixel[1], pixel[2]),
            ColorOrder::Grb => Rgb::new(pixel[1], pixel[0], pixel[2]),
        }
    }
}

/// `(c * brightness) >> 8`, the dimming applied to every stored channel.
pub fn scale(c: u8, brightness: u8) -> u8 {
    ((c as u16 * brightness as u16) >> 8) as u8
}

/// Converts hue, saturation and luminosity to a color.
///
/// The hue wheel has 42 units per sextant, so 0-251 covers it once and larger
/// values wrap. Saturation and luminosity are percentages.
pub fn hsl(h: i32, s: i32, l: i32) -> Rgb {
    let mut h = h as f32 / 42.0;
    if h < 0.0 {
        h = 6.0 - (-h % 6.0);
    }
    h %= 6.0;
    let s = (s as f32 / 100.0).clamp(0.0, 1.0);
    let l = (l as f32 / 100.0).clamp(0.0, 1.0);

    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let (r, g, b) = if h < 1.0 {
        (c, x, 0.0)
    } else if h < 2.0 {
        (x, c, 0.0)
    } else if h < 3.0 {
        (0.0, c, x)
    } else if h < 4.0 {
        (0.0, x, c)
    } else if h < 5.0 {
        (x, 0.0, c)
    } else {
        (c, 0.0, x)
    };

    let m = l - c / 2.0;
    let channel = |v: f32| ((v + m) * 255.0).round() as u8;
    Rgb::new(channel(r), channel(g), channel(b))
}

/// A saturated color with a hue drawn from `rng`.
pub fn random<R: Rng>(rng: &mut R) -> Rgb {
    hsl(rng.gen_range(0..360), 99, 50)
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid color {0:?}: expected 6 hex digits such as #ff0000")]
pub struct ParseColorError(String);

impl FromStr for Rgb {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix('#')
            .or_else(|| s.strip_prefix("0x"))
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ParseColorError(s.to_owned()));
        }
        u32::from_str_radix(digits, 16)
            .map(Rgb::from_packed)
            .map_err(|_| ParseColorError(s.to_owned()))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06x}", self.packed())
    }
}
