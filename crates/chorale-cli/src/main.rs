//! Chorale CLI - the `chorale` command.
//!
//! Plays a precomputed event timeline (JSON, as emitted by the composition
//! engine) against a console backend: every scheduled note is logged with
//! its absolute clock time, and the transport position is shown while the
//! piece runs. Useful for inspecting generator output and exercising the
//! playback path without a sound device.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossbeam_channel::RecvTimeoutError;

use chorale_core::pitch::midi_to_note_name;
use chorale_core::{
    BackendFactory, EventData, PlaybackContext, PlaybackError, Player, SoundBackend,
    TransportEvent,
};

/// Chorale - timeline playback
#[derive(Parser, Debug)]
#[command(name = "chorale")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Play precomputed musical event timelines", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play a timeline file
    Play {
        /// Path to the timeline JSON file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Instrument to play with (logical name or backend identifier)
        #[arg(short, long)]
        instrument: Option<String>,

        /// Tick to start playback from
        #[arg(long, default_value_t = 0)]
        from_tick: u64,
    },

    /// Show information about a timeline file
    Info {
        /// Path to the timeline JSON file
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    match args.command {
        Commands::Play {
            file,
            instrument,
            from_tick,
        } => run_play(&file, instrument.as_deref(), from_tick),
        Commands::Info { file } => run_info(&file),
    }
}

/// Backend that logs every scheduled note instead of making sound.
struct ConsoleBackend {
    instrument: String,
}

impl SoundBackend for ConsoleBackend {
    fn start(&self, pitch: u8, velocity: u8, when: f64, duration: f64) {
        log::info!(
            "[{}] {:<4} vel {:>3}  at {:>8.3}s  for {:.3}s",
            self.instrument,
            midi_to_note_name(pitch),
            velocity,
            when,
            duration
        );
    }

    fn stop(&self) -> anyhow::Result<()> {
        log::debug!("[{}] all notes off", self.instrument);
        Ok(())
    }
}

struct ConsoleBackendFactory;

impl BackendFactory for ConsoleBackendFactory {
    fn load(&self, instrument: &str) -> Result<Arc<dyn SoundBackend>, PlaybackError> {
        log::info!("loading instrument '{instrument}'");
        Ok(Arc::new(ConsoleBackend {
            instrument: instrument.to_string(),
        }))
    }
}

fn load_timeline(file: &Path) -> Result<EventData> {
    let raw = fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse {} as an event timeline", file.display()))
}

fn run_play(file: &Path, instrument: Option<&str>, from_tick: u64) -> Result<()> {
    let timeline = Arc::new(load_timeline(file)?);
    if !timeline.description.is_empty() {
        log::info!("{}", timeline.description);
    }
    log::info!(
        "{} notes, {} ticks ({:.1}s at {} BPM)",
        timeline.note_count(),
        timeline.total_ticks,
        timeline.duration_seconds(),
        timeline.effective_bpm()
    );

    let ctx = Arc::new(PlaybackContext::with_system_clock(Arc::new(
        ConsoleBackendFactory,
    )));
    let player = Player::new(ctx);
    let events = player.events();

    let interrupted = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGINT, interrupted.clone())
        .context("failed to register signal handler")?;

    // Bring the clock up before anything that blocks.
    player.ensure_audio()?;
    player.play(timeline.clone(), from_tick, instrument)?;

    let total = timeline.total_ticks.max(1);
    loop {
        if interrupted.swap(false, Ordering::SeqCst) {
            println!();
            log::info!("interrupted, stopping");
            player.stop();
        }
        match events.recv_timeout(Duration::from_millis(200)) {
            Ok(TransportEvent::Finished) => {
                println!();
                log::info!("finished");
                break;
            }
            Ok(TransportEvent::Stopped) => {
                println!();
                log::info!("stopped");
                break;
            }
            Ok(_) => {}
            Err(RecvTimeoutError::Timeout) => {
                let tick = player.current_tick().min(total);
                print!("\r  tick {tick:>8} / {total}");
                let _ = std::io::stdout().flush();
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    Ok(())
}

fn run_info(file: &Path) -> Result<()> {
    let timeline = load_timeline(file)?;

    if !timeline.description.is_empty() {
        println!("{}", timeline.description);
        println!();
    }
    println!("Tempo  : {} BPM", timeline.effective_bpm());
    println!(
        "Length : {} ticks ({:.1}s)",
        timeline.total_ticks,
        timeline.duration_seconds()
    );
    println!("Tracks :");
    for track in &timeline.tracks {
        let notes = if track.note_count > 0 {
            track.note_count as usize
        } else {
            track.notes.len()
        };
        println!(
            "  {:<24} channel {:<2} program {:<3} {:>6} notes",
            track.name, track.channel, track.program, notes
        );
    }
    Ok(())
}
