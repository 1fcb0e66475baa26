use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use log::{debug, info, LevelFilter};
use rand::rngs::SmallRng;
use rand::SeedableRng;

use brightboard::apa102::DotStar;
use brightboard::color::{self, Rgb};
use brightboard::config::Config;
use brightboard::display::{self, Display};
use brightboard::pattern::ColorPattern;
use brightboard::rpi::RppalHost;

/// Bright Board LED controller
#[derive(Parser)]
#[command(version = "0.1", author = "Steven Cohen <peragwin@gmail.com>")]
struct Opts {
    /// Verbosity, can be used multiple times
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// YAML file with spi and strip settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of LEDs in the strip
    #[arg(short, long)]
    length: Option<usize>,

    /// SPI clock speed in hz
    #[arg(long)]
    spi_clock: Option<u32>,

    /// Brightness applied to every color, 0-255
    #[arg(short, long)]
    brightness: Option<u8>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Set all LEDs a single color
    Set {
        /// Color as #rrggbb
        color: Rgb,
    },
    /// Light a single LED, all others off
    Pixel { index: usize, color: Rgb },
    /// Repeat a list of colors along the strip
    Pattern(PatternOpts),
    /// Blend between two colors
    Gradient {
        start: usize,
        count: usize,
        from: Rgb,
        to: Rgb,
    },
    /// Set all LEDs from hue, saturation and luminosity
    Hsl {
        /// Hue, 42 per sextant of the color wheel
        hue: i32,
        /// Saturation in percent
        #[arg(default_value = "99")]
        saturation: i32,
        /// Luminosity in percent
        #[arg(default_value = "50")]
        luminosity: i32,
    },
    /// Set all LEDs to a random color
    Random,
    /// Animate a pattern moving along the strip
    Spin(SpinOpts),
    /// Turn all LEDs off
    Off,
    /// Send the fixed 12 LED test pattern
    Clear,
    /// Measure raw frames per second of the spi bus
    Bench {
        #[arg(long, default_value = "4")]
        seconds: u64,
    },
}

#[derive(Args)]
struct PatternOpts {
    #[arg(required = true)]
    colors: Vec<Rgb>,
    /// Fade in at this speed, 1 (slow) to 10
    #[arg(long)]
    fade: Option<u8>,
}

#[derive(Args)]
struct SpinOpts {
    #[arg(required = true)]
    colors: Vec<Rgb>,
    /// Number of frames to show
    #[arg(long, default_value = "60")]
    steps: usize,
    /// Delay between frames in milliseconds
    #[arg(long, default_value = "50")]
    delay: u64,
    /// Shift the pattern off the strip instead of rotating it
    #[arg(long)]
    shift: bool,
}

struct App {
    leds: DotStar<RppalHost>,
    display: Display,
}

fn setup(opts: &Opts) -> Result<App> {
    let mut config = match &opts.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(length) = opts.length {
        config.strip.length = length;
    }
    if let Some(clock) = opts.spi_clock {
        config.spi.clock_hz = clock;
    }
    if let Some(brightness) = opts.brightness {
        config.strip.brightness = brightness;
    }
    config.validate()?;
    debug!("{:?}", config);

    let mut leds = DotStar::new(RppalHost::from_config(&config.spi)?);
    leds.configure(config.spi.format()?)?;

    let mut display = Display::with_length(config.strip.length);
    display.set_brightness(config.strip.brightness);
    display.set_color_order(config.strip.order);

    Ok(App { leds, display })
}

fn spin(app: App, opts: SpinOpts) -> Result<()> {
    let App { leds, mut display } = app;
    display.set_pattern(&ColorPattern::new(opts.colors));

    let (mut frames, writer) = display::spawn_writer(leds);
    for _ in 0..opts.steps {
        display.show(&mut frames)?;
        if opts.shift {
            display.shift(1);
        } else {
            display.rotate(1);
        }
        thread::sleep(Duration::from_millis(opts.delay));
    }
    drop(frames);
    writer
        .join()
        .map_err(|_| anyhow!("spi writer thread panicked"))?;
    Ok(())
}

fn bench(app: &mut App, seconds: u64) -> Result<()> {
    let seconds = seconds.max(1);
    let until = Instant::now() + Duration::from_secs(seconds);
    let mut fps = 0;
    while Instant::now() < until {
        app.display.show(&mut app.leds)?;
        fps += 1;
    }
    info!("Raw fps test of SPI bus: {}", fps / seconds);
    Ok(())
}

fn log_level(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Logs at `info` unless RUST_LOG says otherwise. Each `-v` overrides both.
fn logger(verbose: u8) -> env_logger::Builder {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if verbose > 0 {
        builder.filter_level(log_level(verbose));
    }
    builder
}

fn main() -> Result<()> {
    let opts = Opts::parse();
    logger(opts.verbose).init();

    let mut app = setup(&opts)?;

    match opts.cmd {
        Command::Set { color } => {
            app.display.set_all(color);
            app.display.show(&mut app.leds)?;
        }
        Command::Pixel { index, color } => {
            if index >= app.display.len() {
                return Err(anyhow!(
                    "pixel {} out of range for {} leds",
                    index,
                    app.display.len()
                ));
            }
            app.display.set_pixel(index, color);
            app.display.show(&mut app.leds)?;
        }
        Command::Pattern(PatternOpts { colors, fade }) => {
            let pattern = ColorPattern::new(colors);
            match fade {
                Some(speed) => app.display.fade_to(&pattern, speed, &mut app.leds)?,
                None => {
                    app.display.set_pattern(&pattern);
                    app.display.show(&mut app.leds)?;
                }
            }
        }
        Command::Gradient {
            start,
            count,
            from,
            to,
        } => {
            app.display.gradient(start, count, from, to);
            app.display.show(&mut app.leds)?;
        }
        Command::Hsl {
            hue,
            saturation,
            luminosity,
        } => {
            let color = color::hsl(hue, saturation, luminosity);
            info!("hsl({}, {}, {}) is {}", hue, saturation, luminosity, color);
            app.display.set_all(color);
            app.display.show(&mut app.leds)?;
        }
        Command::Random => {
            let color = color::random(&mut SmallRng::from_entropy());
            info!("random color {}", color);
            app.display.set_all(color);
            app.display.show(&mut app.leds)?;
        }
        Command::Spin(spin_opts) => spin(app, spin_opts)?,
        Command::Off => {
            app.display.clear();
            app.display.show(&mut app.leds)?;
        }
        Command::Clear => app.leds.clear()?,
        Command::Bench { seconds } => bench(&mut app, seconds)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::{Level, Log, Metadata};

    fn enabled(verbose: u8, level: Level) -> bool {
        let logger = logger(verbose).build();
        let metadata = Metadata::builder()
            .level(level)
            .target("brightboard::apa102")
            .build();
        logger.enabled(&metadata)
    }

    #[test]
    fn verbosity_levels() {
        assert_eq!(log_level(0), LevelFilter::Info);
        assert_eq!(log_level(1), LevelFilter::Debug);
        assert_eq!(log_level(2), LevelFilter::Trace);
        assert_eq!(log_level(9), LevelFilter::Trace);
    }

    #[test]
    fn verbose_flag_reaches_logger() {
        assert!(enabled(1, Level::Debug));
        assert!(!enabled(1, Level::Trace));
        assert!(enabled(2, Level::Trace));
        assert_eq!(logger(2).build().filter(), LevelFilter::Trace);
    }
}
