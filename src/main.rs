//! xtts-rs CLI entry point.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use xtts_rs::backend::create_backend;
use xtts_rs::cli::{Args, Device, Language};
use xtts_rs::engine::{SpeakOptions, SpeakOutcome, SpeechEngine};
use xtts_rs::mix::MixSettings;

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("XTTS error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: Args) -> Result<()> {
    let language = Language::parse(&args.language).context("Invalid --language")?;
    let device = args
        .device
        .as_deref()
        .map(Device::parse)
        .transpose()
        .context("Invalid --device")?;

    let options = SpeakOptions {
        text: args.text,
        speaker_wav: args.speaker_wav,
        language,
        model: args.model,
        out: args.out,
        device,
        ambient: args.ambient,
        mix_out: args.mix_out,
        ffmpeg: args.ffmpeg,
        mix: MixSettings::default(),
    };

    let backend = create_backend(&args.host, args.port);
    info!(backend = backend.base_url(), "Connecting to XTTS backend");
    let engine = SpeechEngine::new(backend);

    let outcome = engine
        .speak(&options)
        .context("Failed to generate speech")?;

    match outcome {
        SpeakOutcome::Voice(path) => println!("Voice audio written to {}", path.display()),
        SpeakOutcome::Mixed { mix, .. } => println!("Mixed audio written to {}", mix.display()),
    }

    Ok(())
}
