use crate::apa102::STRIDE;
use crate::color::{ColorOrder, Rgb};

/// A list of colors repeated along the strip.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ColorPattern {
    colors: Vec<Rgb>,
}

impl ColorPattern {
    pub fn new(colors: Vec<Rgb>) -> Self {
        Self { colors }
    }

    pub fn colors(&self) -> &[Rgb] {
        &self.colors
    }

    /// The pattern repeated, or cut, to exactly `len` colors.
    pub fn expand(&self, len: usize) -> Vec<Rgb> {
        self.colors.iter().copied().cycle().take(len).collect()
    }

    /// Writes the pattern over every pixel of `buf`, dimmed by `brightness`.
    pub fn fill(&self, buf: &mut [u8], order: ColorOrder, brightness: u8) {
        for (pixel, color) in buf.chunks_exact_mut(STRIDE).zip(self.colors.iter().cycle()) {
            order.store(pixel, color.fade(brightness));
        }
    }
}

impl From<Vec<Rgb>> for ColorPattern {
    fn from(colors: Vec<Rgb>) -> Self {
        Self::new(colors)
    }
}

impl FromIterator<Rgb> for ColorPattern {
    fn from_iter<I: IntoIterator<Item = Rgb>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
