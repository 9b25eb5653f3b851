//! Command-line driver for duplex-capture.
//!
//! ```text
//! duplex-capture devices
//! duplex-capture record --outgoing 2 --incoming 5 --format mp3 --seconds 60
//! ```
//!
//! `record` runs until `--seconds` elapse or Enter is pressed, then waits for
//! the background export to report its result.

use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};

use duplex_capture_core::{
    default_output_path, encoder_available, status_channel, OutputFormat, RecordingConfig, RecordingSession,
    StatusReceiver,
};
use duplex_capture_cpal::{CpalBackend, DeviceCatalog};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Parser)]
#[command(name = "duplex-capture", version, about = "Record a microphone and system audio into one stereo file")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List audio devices as `[id] name (host; in:N, out:M)`.
    Devices,

    /// Record until --seconds elapse or Enter is pressed.
    Record(RecordArgs),
}

#[derive(clap::Args)]
struct RecordArgs {
    /// Outgoing (microphone) device id or name; right channel. Defaults to the default input.
    #[arg(long)]
    outgoing: Option<String>,

    /// Incoming (system audio) device id or name; left channel. Defaults to the default output.
    #[arg(long)]
    incoming: Option<String>,

    /// Sample rate in Hz.
    #[arg(long, default_value_t = 48_000)]
    rate: u32,

    /// Output format: wav, flac, ogg or mp3.
    #[arg(long, default_value = "flac")]
    format: OutputFormat,

    /// Output file; its extension is rewritten to match --format.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Stop automatically after this many seconds.
    #[arg(long)]
    seconds: Option<u64>,

    /// Frames per callback requested from the devices.
    #[arg(long, default_value_t = 1024)]
    block_size: u32,

    /// Encoder program used for MP3.
    #[arg(long, default_value = "ffmpeg")]
    encoder: String,

    /// Also write `<output>.metadata.json`.
    #[arg(long)]
    metadata: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Devices => list_devices(),
        Command::Record(args) => record(args),
    }
}

fn list_devices() -> Result<()> {
    let catalog = DeviceCatalog::new();
    let default_in = catalog.default_input_id();
    let default_out = catalog.default_output_id();

    for device in catalog.list()? {
        let mut marks = Vec::new();
        if default_in.as_deref() == Some(device.id.as_str()) {
            marks.push("default input");
        }
        if default_out.as_deref() == Some(device.id.as_str()) {
            marks.push("default output");
        }
        if marks.is_empty() {
            println!("{}", device.display());
        } else {
            println!("{}  <{}>", device.display(), marks.join(", "));
        }
    }
    Ok(())
}

fn record(args: RecordArgs) -> Result<()> {
    let backend = CpalBackend::new();
    let catalog = backend.catalog()?;
    let config = build_config(&args, &catalog)?;

    if config.output_format.needs_external_encoder() && !encoder_available(&config.encoder) {
        eprintln!(
            "warning: {} not found on PATH; the MP3 export will fail. Choose WAV/FLAC/OGG instead.",
            config.encoder.program
        );
    }

    let (status_tx, status_rx) = status_channel();
    let mut session = RecordingSession::new(backend, status_tx);
    let encoder_timeout = config.encoder.timeout;

    session.start(config).context("failed to start recording")?;
    match args.seconds {
        Some(secs) => println!("Recording for {}s (press Enter to stop early)...", secs),
        None => println!("Recording (press Enter to stop)..."),
    }

    let stop_requested = spawn_enter_watcher();
    let limit = args.seconds.map(Duration::from_secs);
    let started = Instant::now();
    loop {
        print_events(&status_rx);
        if stop_requested.load(Ordering::SeqCst) || limit.is_some_and(|l| started.elapsed() >= l) {
            break;
        }
        thread::sleep(POLL_INTERVAL);
    }

    let path = session.stop().context("failed to stop recording")?;
    println!("Saving {}...", path.display());

    let events = status_rx.wait_for(encoder_timeout + Duration::from_secs(60), |text| {
        text.starts_with("Saved") || text.starts_with("Error while saving")
    });
    for event in &events {
        println!("{}", event.log_line());
    }
    session.join_saves();

    match events.last() {
        Some(e) if e.text.starts_with("Saved") => Ok(()),
        Some(e) => Err(anyhow!("{}", e.text)),
        None => bail!("timed out waiting for the export to finish"),
    }
}

fn build_config(args: &RecordArgs, catalog: &DeviceCatalog) -> Result<RecordingConfig> {
    let outgoing = match &args.outgoing {
        Some(id) => id.clone(),
        None => catalog
            .default_input_id()
            .context("no default input device; pass --outgoing")?,
    };
    let incoming = match &args.incoming {
        Some(id) => id.clone(),
        None => catalog
            .default_output_id()
            .context("no default output device; pass --incoming")?,
    };

    let output = match &args.output {
        Some(path) => args.format.apply_extension(path),
        None => default_output_path(&std::env::current_dir()?, args.format),
    };

    let mut config = RecordingConfig {
        outgoing_device_id: outgoing,
        incoming_device_id: incoming,
        sample_rate: args.rate,
        block_size: args.block_size,
        output_path: absolute(&output)?,
        output_format: args.format,
        write_metadata: args.metadata,
        ..Default::default()
    };
    config.encoder.program = args.encoder.clone();
    Ok(config)
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

fn print_events(rx: &StatusReceiver) {
    for event in rx.drain() {
        println!("{}", event.log_line());
    }
}

/// Sets the returned flag once a line arrives on stdin.
fn spawn_enter_watcher() -> Arc<AtomicBool> {
    let flag = Arc::new(AtomicBool::new(false));
    let watcher = Arc::clone(&flag);
    thread::spawn(move || {
        let mut line = String::new();
        if let Ok(n) = std::io::stdin().lock().read_line(&mut line) {
            // EOF (non-interactive stdin) is not a stop request.
            if n > 0 {
                watcher.store(true, Ordering::SeqCst);
            }
        }
    });
    flag
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn record_flags_parse() {
        let cli = Cli::parse_from([
            "duplex-capture",
            "record",
            "--outgoing",
            "1",
            "--incoming",
            "4",
            "--format",
            "MP3",
            "--seconds",
            "5",
        ]);
        let Command::Record(args) = cli.command else {
            panic!("expected record");
        };
        assert_eq!(args.outgoing.as_deref(), Some("1"));
        assert_eq!(args.incoming.as_deref(), Some("4"));
        assert_eq!(args.format, OutputFormat::Mp3);
        assert_eq!(args.rate, 48_000);
        assert_eq!(args.seconds, Some(5));
    }

    #[test]
    fn unknown_format_is_rejected() {
        assert!(Cli::try_parse_from(["duplex-capture", "record", "--format", "aiff"]).is_err());
    }
}
