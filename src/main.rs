//! Audio Fingerprint - command-line front end.
//!
//! Fingerprints audio files the way `fpcalc` does, using the in-process
//! pipeline from the library crate. Results go to stdout, logs to stderr.

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use audio_fingerprint::cli;

fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive("audio_fingerprint=info".parse()?))
        .init();

    cli::run_command(&args)
}
