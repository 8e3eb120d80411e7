//! Drift Player - headless ambient music for venues
//!
//! ## Commands
//!
//! - `drift-player run`: play the venue roster on an audio device, controlled
//!   from stdin
//! - `drift-player render`: render one venue offline to a WAV file
//! - `drift-player presets`: list the genre presets
//! - `drift-player devices`: list output devices

mod config;
mod control;
mod render;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossbeam::channel::RecvTimeoutError;

use config::PlayerConfig;
use control::{spawn_stdin_reader, ControlCommand, HELP};
use drift_core::audio::{get_output_devices, OutputTarget};
use drift_core::config::{default_config_path, default_render_dir, load_config, EngineConfig};
use drift_core::preset::PRESETS;
use drift_core::Engine;
use render::{render_to_wav, RenderJob};

/// Drift Player - procedural ambient music for venues
#[derive(Parser)]
#[command(name = "drift-player")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play venues on an audio device, controlled from stdin
    Run {
        /// Config file (default: ~/.config/drift-player/config.yaml)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Render one venue offline to a WAV file
    Render {
        /// Genre preset (unknown genres play ambient)
        #[arg(long, default_value = "ambient")]
        genre: String,
        /// Volume 0-100
        #[arg(long, default_value_t = 80.0)]
        volume: f32,
        #[arg(long, default_value_t = 60.0)]
        seconds: f64,
        #[arg(long, default_value_t = 48000)]
        sample_rate: u32,
        /// Seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,
        /// Output file (default: ~/Music/drift-renders/<genre>.wav)
        out: Option<PathBuf>,
    },

    /// List genre presets
    Presets,

    /// List audio output devices
    Devices,
}

fn main() -> Result<()> {
    // Set RUST_LOG=debug for layer-level output
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run { config } => run(config),
        Commands::Render {
            genre,
            volume,
            seconds,
            sample_rate,
            seed,
            out,
        } => {
            let path = out.unwrap_or_else(|| default_render_dir().join(format!("{}.wav", genre)));
            let engine = EngineConfig {
                seed,
                ..EngineConfig::default()
            };
            let frames = render_to_wav(
                RenderJob {
                    genre: &genre,
                    volume_percent: volume,
                    seconds,
                    sample_rate,
                    engine,
                },
                &path,
            )?;
            println!("{} ({:.1}s)", path.display(), frames as f64 / sample_rate.max(1) as f64);
            Ok(())
        }
        Commands::Presets => {
            println!("{:<12} {:>5} {:>8} {:>7}", "genre", "bpm", "cutoff", "reverb");
            for preset in PRESETS {
                println!(
                    "{:<12} {:>5} {:>6.0}Hz {:>6.1}s",
                    preset.name, preset.tempo_bpm, preset.filter_cutoff_hz, preset.reverb_decay_seconds
                );
            }
            Ok(())
        }
        Commands::Devices => {
            for device in get_output_devices()? {
                println!("{}", device);
            }
            Ok(())
        }
    }
}

fn run(config_path: Option<PathBuf>) -> Result<()> {
    let config_path = config_path.unwrap_or_else(|| default_config_path("config.yaml"));
    let config: PlayerConfig = load_config(&config_path);

    // Build the global pool up front so the audio callback never pays for
    // rayon's lazy initialization
    rayon::ThreadPoolBuilder::new()
        .thread_name(|i| format!("rayon-audio-{}", i))
        .build_global()
        .context("Failed to initialize Rayon thread pool")?;

    let tick = Duration::from_secs_f64(config.engine.timer_tick_secs.clamp(0.001, 0.25));
    let mut engine = Engine::new(config.engine.clone(), OutputTarget::Device(config.audio.clone()));
    engine.ensure_context().context("Audio output unavailable")?;
    if let Some(context) = engine.context() {
        let handle = context.handle();
        println!("{} ({:.1}ms buffer)", handle.description(), handle.latency_ms());
    }

    for venue in config.venues.iter().filter(|v| v.autostart) {
        engine.start_venue(&venue.id, venue.genre(), venue.volume_percent());
    }

    let (commands, _reader) = spawn_stdin_reader().context("Failed to spawn stdin reader")?;
    println!("{}", HELP);

    loop {
        engine.pump();
        match commands.recv_timeout(tick) {
            Ok(ControlCommand::Quit) | Err(RecvTimeoutError::Disconnected) => break,
            Ok(command) => handle_command(&mut engine, &config, command),
            Err(RecvTimeoutError::Timeout) => {}
        }
    }

    engine.dispose();
    log::info!("drift-player exiting");
    Ok(())
}

fn handle_command(engine: &mut Engine, config: &PlayerConfig, command: ControlCommand) {
    match command {
        ControlCommand::Start { venue, genre, volume } => {
            let roster = config.venue(&venue);
            let genre = genre
                .as_deref()
                .or_else(|| roster.map(|v| v.genre()))
                .unwrap_or(drift_core::preset::DEFAULT_GENRE);
            let volume = volume.or_else(|| roster.map(|v| v.volume_percent())).unwrap_or(50.0);
            engine.start_venue(&venue, genre, volume);
        }
        ControlCommand::Stop { venue } => engine.stop_venue(&venue),
        ControlCommand::Volume { venue, volume } => {
            if !engine.is_playing(&venue) {
                println!("{} is not playing", venue);
            }
            engine.set_venue_volume(&venue, volume);
        }
        ControlCommand::Status => print_status(engine),
        ControlCommand::StopAll => engine.stop_all(),
        ControlCommand::Quit => {}
    }
}

fn print_status(engine: &Engine) {
    let Some(context) = engine.context() else {
        println!("no audio context");
        return;
    };
    let atomics = context.atomics();
    println!(
        "t={:.1}s voices={} buses={} peak={:.3} dropped_events={}{}",
        engine.current_time(),
        atomics.live_voices(),
        atomics.live_buses(),
        atomics.master_peak(),
        atomics.dropped_events(),
        if context.is_closed() { " (closed)" } else { "" }
    );
    for session in engine.sessions() {
        println!(
            "  {:<16} {:<10} vol {:>3.0}%  {} live voices",
            session.venue_id(),
            session.preset().name,
            session.volume() * 100.0,
            session.live_voices().len()
        );
    }
}
