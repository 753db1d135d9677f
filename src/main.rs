use clap::Parser;
use sonar_sweep::{Radar, RadarConfig};
use std::path::PathBuf;

/// Simulated ultrasonic radar scope
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Initial maximum range in cm (clamped to 50..=300)
    #[arg(long, default_value_t = 150.0)]
    max_range: f64,

    /// RNG seed for a reproducible run
    #[arg(long)]
    seed: Option<u64>,

    /// TrueType/OpenType font for labels
    #[arg(long)]
    font: Option<PathBuf>,

    /// Start with four pre-aged demo contacts
    #[arg(long)]
    demo: bool,

    /// Warm-up before the sweep starts, in milliseconds
    #[arg(long, default_value_t = 2000)]
    startup_delay_ms: u64,

    #[arg(long, default_value = "Ultrasonic Radar")]
    title: String,

    /// Window width in logical pixels
    #[arg(long, default_value_t = 940)]
    width: usize,

    /// Window height in logical pixels
    #[arg(long, default_value_t = 380)]
    height: usize,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = RadarConfig::builder()
        .title(args.title)
        .window_width(args.width)
        .window_height(args.height)
        .radar_width(args.width.saturating_sub(300).max(args.width * 2 / 3))
        .max_range(args.max_range)
        .startup_delay_ms(args.startup_delay_ms)
        .demo_contacts(args.demo)
        .maybe_seed(args.seed)
        .maybe_font_path(args.font)
        .build();

    let radar = Radar::new(config);
    radar.show()?;
    Ok(())
}
