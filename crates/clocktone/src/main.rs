//! clocktone: plays the time of day as a set of slowly gliding tones

mod config;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use clap::{Parser, Subcommand};
use clocktone_core::{ClockTime, EffectsPreset, Note, Scale, ScalePattern, nearest_note};
use clocktone_services::{AudioEngineController, OfflineGraph, RealtimeGraph};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use config::{AppConfig, MAX_UTC_OFFSET_HOURS, config_path, load_config};

const MIN_TICK_INTERVAL_MS: u64 = 10;

#[derive(Parser)]
#[command(name = "clocktone")]
#[command(about = "Turn the current time into a drifting chord", long_about = None)]
struct Cli {
    /// Config file (default: <config dir>/clocktone/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Effects preset: default, ambient, hypnagogic or clean
    #[arg(short, long, global = true)]
    preset: Option<EffectsPreset>,

    /// Scale pattern: chromatic, fourths or fifths
    #[arg(short, long, global = true)]
    scale: Option<ScalePattern>,

    /// First note of the scale
    #[arg(long, global = true)]
    root: Option<Note>,

    /// Use a random ordering of the twelve notes instead of a pattern
    #[arg(long, global = true)]
    shuffle: bool,

    /// Hours added to UTC before reading the clock
    #[arg(short, long, global = true, allow_negative_numbers = true)]
    utc_offset: Option<f64>,

    /// Milliseconds between clock ticks
    #[arg(long)]
    tick_interval: Option<u64>,

    /// Stop after this many seconds (default: run until Ctrl-C)
    #[arg(short, long)]
    duration: Option<f64>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Print the scale and each voice's current target without opening audio
    Notes,
}

fn apply_overrides(cli: &Cli, mut config: AppConfig) -> AppConfig {
    if let Some(preset) = cli.preset {
        config.engine.effects = preset.config();
    }
    if let Some(scale) = cli.scale {
        config.engine.scale = scale;
    }
    if let Some(root) = cli.root {
        config.engine.scale_root = root;
    }
    if let Some(offset) = cli.utc_offset {
        config.utc_offset_hours = offset;
    }
    if let Some(interval) = cli.tick_interval {
        config.tick_interval_ms = interval;
    }
    config.tick_interval_ms = config.tick_interval_ms.max(MIN_TICK_INTERVAL_MS);
    if !(-MAX_UTC_OFFSET_HOURS..=MAX_UTC_OFFSET_HOURS).contains(&config.utc_offset_hours) {
        warn!(
            utc_offset_hours = config.utc_offset_hours,
            "UTC offset out of range, using 0"
        );
        config.utc_offset_hours = 0.0;
    }
    config
}

/// `None` runs until interrupted
fn run_duration(seconds: Option<f64>) -> Option<Duration> {
    seconds
        .filter(|s| *s > 0.0)
        .and_then(|s| Duration::try_from_secs_f64(s).ok())
}

fn clock_now(utc_offset_hours: f64) -> ClockTime {
    let seconds = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);
    ClockTime::from_unix_seconds(seconds, utc_offset_hours)
}

fn print_notes(config: &AppConfig, scale: Option<Scale>) {
    let mut engine = AudioEngineController::new(OfflineGraph::default(), &config.engine);
    if let Some(scale) = scale {
        engine = engine.with_scale(scale);
    }
    let time = clock_now(config.utc_offset_hours);

    println!("time   {time}");
    println!("scale  {}", engine.scale().labels_with_octave(4).join(" "));
    for (voice, hz) in engine.target_frequencies(time) {
        println!(
            "{:<12} {:<6} {:>+3} st  {:>8.2} Hz  ~{}",
            voice.display_name,
            voice.tracking_mode,
            voice.harmonic_interval,
            hz,
            nearest_note(hz)
        );
    }
}

async fn run(config: AppConfig, scale: Option<Scale>, duration: Option<Duration>) -> ExitCode {
    let mut engine = AudioEngineController::new(RealtimeGraph::new(), &config.engine);
    if let Some(scale) = scale {
        engine = engine.with_scale(scale);
    }

    if !engine.start().await {
        error!("Could not start audio output");
        return ExitCode::FAILURE;
    }

    let mut ticker = tokio::time::interval(Duration::from_millis(config.tick_interval_ms));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let deadline = async {
        match duration {
            Some(d) => tokio::time::sleep(d).await,
            None => std::future::pending().await,
        }
    };
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(deadline, shutdown);

    info!(
        tick_interval_ms = config.tick_interval_ms,
        utc_offset_hours = config.utc_offset_hours,
        "Playing"
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => engine.tick(clock_now(config.utc_offset_hours)),
            _ = &mut deadline => break,
            _ = &mut shutdown => break,
        }
    }

    engine.dispose();
    info!("Stopped");
    ExitCode::SUCCESS
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("clocktone=info")))
        .init();

    let cli = Cli::parse();
    let path = cli.config.clone().unwrap_or_else(config_path);
    let config = apply_overrides(&cli, load_config(&path));

    let scale = cli.shuffle.then(|| Scale::shuffled(&mut fastrand::Rng::new()));
    let duration = run_duration(cli.duration);

    match cli.command {
        Some(Command::Notes) => {
            print_notes(&config, scale);
            ExitCode::SUCCESS
        }
        None => run(config, scale, duration).await,
    }
}
