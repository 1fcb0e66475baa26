use std::sync::mpsc::{channel, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, error};

use crate::apa102::{self, DotStar, Peripheral, SpiError, STRIDE};
use crate::color::{scale, ColorOrder, Rgb};
use crate::pattern::ColorPattern;
use crate::transform;

/// Pixels on a Bright Board.
pub const DEFAULT_LENGTH: usize = 15;
pub const MIN_LENGTH: usize = 2;
pub const MAX_LENGTH: usize = 64;
/// Frames shown by [`Display::fade_to`].
pub const FADE_STEPS: u32 = 30;

/// Destination of a finished pixel buffer.
pub trait Sink {
    type Error;

    fn show(&mut self, buf: &[u8], pixels: usize) -> Result<(), Self::Error>;
}

impl<P: Peripheral> Sink for DotStar<P> {
    type Error = apa102::Error<SpiError<P>>;

    fn show(&mut self, buf: &[u8], pixels: usize) -> Result<(), Self::Error> {
        self.send_buffer(buf, pixels)
    }
}

/// A pixel buffer on its way to the writer thread.
pub struct Frame {
    pub bytes: Vec<u8>,
    pub pixels: usize,
}

#[derive(Debug, thiserror::Error)]
#[error("frame writer has stopped")]
pub struct FrameError;

/// Sink that hands frames to the thread started by [`spawn_writer`].
pub struct Frames {
    sender: Sender<Frame>,
}

impl Sink for Frames {
    type Error = FrameError;

    fn show(&mut self, buf: &[u8], pixels: usize) -> Result<(), FrameError> {
        self.sender
            .send(Frame {
                bytes: buf.to_vec(),
                pixels,
            })
            .map_err(|_| FrameError)
    }
}

/// Moves `leds` to a thread that writes every frame sent through the returned
/// [`Frames`]. The thread exits, handing back `leds`, once `Frames` is dropped.
pub fn spawn_writer<P>(mut leds: DotStar<P>) -> (Frames, JoinHandle<DotStar<P>>)
where
    P: Peripheral + Send + 'static,
{
    let (sender, receiver) = channel::<Frame>();
    let handle = thread::spawn(move || {
        while let Ok(frame) = receiver.recv() {
            if let Err(e) = leds.send_buffer(&frame.bytes, frame.pixels) {
                error!("failed to write to spi bus: {}", e);
            }
        }
        leds
    });
    (Frames { sender }, handle)
}

/// Pixel buffer of the board plus the brightness and color order used to
/// fill it.
pub struct Display {
    buf: Vec<u8>,
    brightness: u8,
    order: ColorOrder,
}

impl Default for Display {
    fn default() -> Self {
        Self::new()
    }
}

impl Display {
    pub fn new() -> Self {
        Self::with_length(DEFAULT_LENGTH)
    }

    pub fn with_length(length: usize) -> Self {
        let length = length.clamp(MIN_LENGTH, MAX_LENGTH);
        Self {
            buf: vec![0; length * STRIDE],
            brightness: u8::MAX,
            order: ColorOrder::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len() / STRIDE
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Resizes the strip. All pixels are turned off.
    pub fn set_length(&mut self, length: usize) {
        let length = length.clamp(MIN_LENGTH, MAX_LENGTH);
        debug!("display length {}", length);
        self.buf = vec![0; length * STRIDE];
    }

    pub fn buffer(&self) -> &[u8] {
        &self.buf
    }

    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    /// Brightness applied to colors set from now on.
    pub fn set_brightness(&mut self, brightness: u8) {
        self.brightness = brightness;
    }

    pub fn color_order(&self) -> ColorOrder {
        self.order
    }

    pub fn set_color_order(&mut self, order: ColorOrder) {
        self.order = order;
    }

    fn pixel_mut(&mut self, index: usize) -> Option<&mut [u8]> {
        self.buf.chunks_exact_mut(STRIDE).nth(index)
    }

    /// Sets one pixel. Indices past the end of the strip are ignored.
    pub fn set_pixel(&mut self, index: usize, color: Rgb) {
        let (order, color) = (self.order, color.fade(self.brightness));
        if let Some(pixel) = self.pixel_mut(index) {
            order.store(pixel, color);
        }
    }

    /// Color stored for pixel `index`, black past the end of the strip.
    /// With `restore` set, the brightness dimming is undone.
    pub fn pixel(&self, index: usize, restore: bool) -> Rgb {
        match self.buf.chunks_exact(STRIDE).nth(index) {
            None => Rgb::BLACK,
            Some(pixel) => {
                let color = self.order.load(pixel);
                if restore {
                    color.restore_brightness(self.brightness)
                } else {
                    color
                }
            }
        }
    }

    pub fn set_all(&mut self, color: Rgb) {
        let color = color.fade(self.brightness);
        for pixel in self.buf.chunks_exact_mut(STRIDE) {
            self.order.store(pixel, color);
        }
    }

    /// Turns every pixel off. Takes effect on the next [`Display::show`].
    pub fn clear(&mut self) {
        self.set_all(Rgb::BLACK);
    }

    /// Dims what is already in the buffer by `brightness` out of 255.
    pub fn fade_all(&mut self, brightness: u8) {
        if brightness < u8::MAX {
            self.buf.iter_mut().for_each(|c| *c = scale(*c, brightness));
        }
    }

    pub fn rotate(&mut self, offset: isize) {
        transform::rotate(&mut self.buf, offset);
    }

    pub fn shift(&mut self, offset: isize) {
        transform::shift(&mut self.buf, offset);
    }

    /// Blends from `from` to `to` over `n` pixels starting at `start`,
    /// wrapping around the end of the strip.
    pub fn gradient(&mut self, start: usize, n: usize, from: Rgb, to: Rgb) {
        self.set_pixel(start, from);
        if n == 0 {
            return;
        }
        let len = self.len();
        let at = |i: usize| (start % len + i % len) % len;
        self.set_pixel(at(n - 1), to);
        for i in 1..n {
            let alpha = (0xff * (i as u128) / n as u128) as i32;
            self.set_pixel(at(i), from.blend(alpha, to));
        }
    }

    pub fn set_pattern(&mut self, pattern: &ColorPattern) {
        pattern.fill(&mut self.buf, self.order, self.brightness);
    }

    /// Cross-fades from the current buffer to `pattern`, showing every step.
    /// `speed` runs from 1 (slowest) to 10 (no pause between steps).
    pub fn fade_to<S: Sink>(
        &mut self,
        pattern: &ColorPattern,
        speed: u8,
        sink: &mut S,
    ) -> Result<(), S::Error> {
        let speed = speed.clamp(1, 10);
        let pause = Duration::from_millis(u64::from(10 - speed) * 10);

        let mut target = vec![0; self.buf.len()];
        for (pixel, color) in target
            .chunks_exact_mut(STRIDE)
            .zip(pattern.expand(self.len()))
        {
            self.order.store(pixel, color.fade(self.brightness));
        }
        let initial = self.buf.clone();

        for step in 0..FADE_STEPS {
            let alpha = 0xff * step / FADE_STEPS;
            let malpha = 0xff - alpha;
            for ((c, &a), &b) in self.buf.iter_mut().zip(&initial).zip(&target) {
                *c = ((a as u32 * malpha + b as u32 * alpha) >> 8) as u8;
            }
            self.show(sink)?;
            if !pause.is_zero() {
                thread::sleep(pause);
            }
        }
        Ok(())
    }

    /// Sends the buffer to `sink`.
    pub fn show<S: Sink>(&self, sink: &mut S) -> Result<(), S::Error> {
        sink.show(&self.buf, self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::Recorder;

    const RED: Rgb = Rgb::new(0xff, 0, 0);
    const BLUE: Rgb = Rgb::new(0, 0, 0xff);

    #[test]
    fn defaults() {
        let display = Display::new();
        assert_eq!(display.len(), 15);
        assert_eq!(display.buffer(), &[0; 45][..]);
        assert_eq!(display.brightness(), 255);
        assert_eq!(display.color_order(), ColorOrder::Rgb);
    }

    #[test]
    fn set_length_clamps_and_blanks() {
        let mut display = Display::new();
        display.set_all(RED);
        display.set_length(20);
        assert_eq!(display.len(), 20);
        assert!(display.buffer().iter().all(|&c| c == 0));
        display.set_length(0);
        assert_eq!(display.len(), MIN_LENGTH);
        display.set_length(1000);
        assert_eq!(display.len(), MAX_LENGTH);
    }

    #[test]
    fn set_pixel() {
        let mut display = Display::with_length(3);
        display.set_pixel(1, Rgb::new(1, 2, 3));
        display.set_pixel(3, Rgb::WHITE);
        assert_eq!(display.buffer(), &[0, 0, 0, 1, 2, 3, 0, 0, 0]);
        assert_eq!(display.pixel(1, false), Rgb::new(1, 2, 3));
        assert_eq!(display.pixel(3, false), Rgb::BLACK);
    }

    #[test]
    fn set_pixel_grb() {
        let mut display = Display::with_length(2);
        display.set_color_order(ColorOrder::Grb);
        display.set_pixel(0, Rgb::new(1, 2, 3));
        assert_eq!(&display.buffer()[..3], &[2, 1, 3]);
        assert_eq!(display.pixel(0, true), Rgb::new(1, 2, 3));
    }

    #[test]
    fn brightness_applies_to_new_colors() {
        let mut display = Display::with_length(2);
        display.set_brightness(128);
        display.set_all(Rgb::new(200, 100, 50));
        assert_eq!(display.buffer(), &[100, 50, 25, 100, 50, 25]);
        assert_eq!(display.pixel(0, false), Rgb::new(100, 50, 25));
        assert_eq!(display.pixel(0, true), Rgb::new(200, 100, 50));
    }

    #[test]
    fn clear_and_fade_all() {
        let mut display = Display::with_length(2);
        display.set_all(Rgb::new(200, 100, 50));
        display.fade_all(255);
        assert_eq!(display.pixel(1, false), Rgb::new(200, 100, 50));
        display.fade_all(128);
        assert_eq!(display.pixel(1, false), Rgb::new(100, 50, 25));
        display.clear();
        assert_eq!(display.buffer(), &[0; 6]);
    }

    #[test]
    fn rotate_and_shift() {
        let mut display = Display::with_length(3);
        display.set_pixel(0, RED);
        display.rotate(-1);
        assert_eq!(display.pixel(2, false), RED);
        display.shift(-2);
        assert_eq!(display.pixel(0, false), RED);
        display.shift(1);
        assert_eq!(display.pixel(0, false), Rgb::BLACK);
        assert_eq!(display.pixel(1, false), RED);
    }

    #[test]
    fn gradient() {
        let mut display = Display::new();
        display.gradient(0, 5, RED, BLUE);
        assert_eq!(display.pixel(0, false), RED);
        assert_eq!(display.pixel(1, false), Rgb::new(203, 0, 50));
        assert_eq!(display.pixel(4, false), Rgb::new(50, 0, 203));
        assert_eq!(display.pixel(5, false), Rgb::BLACK);
    }

    #[test]
    fn gradient_wraps() {
        let mut display = Display::new();
        display.gradient(13, 4, RED, BLUE);
        for i in [13, 14, 0, 1] {
            assert_ne!(display.pixel(i, false), Rgb::BLACK, "pixel {}", i);
        }
        assert_eq!(display.pixel(2, false), Rgb::BLACK);
        assert_eq!(display.pixel(12, false), Rgb::BLACK);
    }

    #[test]
    fn gradient_of_nothing_sets_start() {
        let mut display = Display::new();
        display.gradient(3, 0, RED, BLUE);
        assert_eq!(display.pixel(3, false), RED);
        assert_eq!(display.pixel(2, false), Rgb::BLACK);
        assert_eq!(display.pixel(4, false), Rgb::BLACK);
    }

    #[test]
    fn gradient_far_start_wraps() {
        let mut display = Display::new();
        display.gradient(usize::MAX, 2, RED, BLUE);
        // usize::MAX is a multiple of 15, so the blend lands on pixel 1.
        assert_eq!(display.pixel(0, false), Rgb::BLACK);
        assert_eq!(display.pixel(1, false), RED.blend(127, BLUE));
    }

    #[test]
    fn set_pattern() {
        let mut display = Display::with_length(3);
        display.set_pattern(&ColorPattern::new(vec![RED, BLUE]));
        assert_eq!(display.pixel(0, false), RED);
        assert_eq!(display.pixel(1, false), BLUE);
        assert_eq!(display.pixel(2, false), RED);
    }

    #[test]
    fn show_sends_whole_buffer() {
        let recorder = Recorder::default();
        let mut leds = DotStar::new(recorder.clone());
        let mut display = Display::with_length(2);
        display.set_pixel(0, Rgb::new(0x10, 0x20, 0x30));
        display.show(&mut leds).unwrap();
        assert_eq!(
            recorder.bytes(),
            vec![
                0, 0, 0, 0, 0xff, 0x30, 0x20, 0x10, 0, 0xff, 0, 0, 0, 0, 0xff, 0xff, 0xff, 0xff
            ]
        );
    }

    #[test]
    fn fade_to_shows_every_step() {
        let recorder = Recorder::default();
        let mut leds = DotStar::new(recorder.clone());
        let mut display = Display::with_length(2);
        display
            .fade_to(&ColorPattern::new(vec![Rgb::WHITE]), 10, &mut leds)
            .unwrap();

        let transfers = recorder.transfers();
        assert_eq!(transfers.len(), FADE_STEPS as usize);
        let reds: Vec<u8> = transfers.iter().map(|t| t[7]).collect();
        assert_eq!(reds[0], 0);
        assert!(reds.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(display.pixel(1, false), Rgb::new(245, 245, 245));
    }

    #[test]
    fn writer_thread() {
        let recorder = Recorder::default();
        let (mut frames, handle) = spawn_writer(DotStar::new(recorder.clone()));
        let mut display = Display::with_length(2);
        display.show(&mut frames).unwrap();
        display.set_all(RED);
        display.show(&mut frames).unwrap();
        drop(frames);
        handle.join().unwrap();

        let transfers = recorder.transfers();
        assert_eq!(transfers.len(), 2);
        assert_eq!(&transfers[1][4..9], &[0xff, 0, 0, 0xff, 0]);
    }
}
