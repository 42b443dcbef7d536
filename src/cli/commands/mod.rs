//! CLI command definitions and dispatch.
//!
//! Each subcommand is implemented in its own submodule:
//! - `fingerprint`: fingerprint files and directories (fpcalc-style output)
//! - `compare`: similarity between two files or fingerprints
//! - `config`: inspect and initialise the config file

mod compare;
mod config;
mod fingerprint;

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tokio::runtime::Runtime;

pub use compare::cmd_compare;
pub use config::{cmd_config_init, cmd_config_path, cmd_config_show};
pub use fingerprint::{FingerprintOptions, cmd_fingerprint};

use crate::config::{self as app_config, Config};

/// Audio Fingerprint CLI
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file to use instead of the one in the OS config directory
    #[arg(long, global = true, env = "AUDIO_FINGERPRINT_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Fingerprint audio files
    Fingerprint {
        /// Files or directories to fingerprint
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Print the raw integer codes instead of the compact string
        #[arg(long)]
        raw: bool,
        /// Print JSON objects instead of KEY=VALUE lines
        #[arg(long)]
        json: bool,
        /// Only analyse the first SECS seconds (0 analyses everything)
        #[arg(long, value_name = "SECS")]
        length: Option<f64>,
        /// Analysis sample rate
        #[arg(long, value_name = "HZ")]
        rate: Option<u32>,
        /// Analysis channel count (1 or 2)
        #[arg(long, value_name = "N")]
        channels: Option<u16>,
        /// Descend into subdirectories
        #[arg(short, long)]
        recursive: bool,
        /// Decode on the extracting thread instead of a worker
        #[arg(long)]
        sequential: bool,
    },
    /// Compare two audio files or compact fingerprints
    Compare {
        /// First file or fingerprint string
        a: String,
        /// Second file or fingerprint string
        b: String,
        /// Largest alignment shift to try, in codes
        #[arg(long, default_value = "2")]
        max_offset: usize,
    },
    /// Inspect or create the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// `config` subcommands
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Print the config file location
    Path,
    /// Write the default configuration
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Run the specified CLI command.
pub fn run_command(cli: &Cli) -> anyhow::Result<()> {
    let rt = Runtime::new()?;
    let custom = cli.config.as_deref();

    match &cli.command {
        Commands::Fingerprint {
            paths,
            raw,
            json,
            length,
            rate,
            channels,
            recursive,
            sequential,
        } => {
            let mut config = load_config(custom)?;
            if let Some(secs) = *length {
                config.analysis.max_duration_secs = (secs > 0.0).then_some(secs);
            }
            if let Some(rate) = *rate {
                config.audio.sample_rate = rate;
            }
            if let Some(channels) = *channels {
                config.audio.channels = channels;
            }
            if *sequential {
                config.pipeline.pipelined = false;
            }

            let options = FingerprintOptions {
                raw: *raw,
                json: *json,
                recursive: *recursive,
            };
            cmd_fingerprint(&rt, paths, &config, &options)
        }
        Commands::Compare { a, b, max_offset } => {
            let config = load_config(custom)?;
            cmd_compare(&rt, a, b, &config, *max_offset)
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => cmd_config_show(&load_config(custom)?),
            ConfigAction::Path => cmd_config_path(custom),
            ConfigAction::Init { force } => cmd_config_init(custom, *force),
        },
    }
}

// ============================================================================
// Shared helper functions
// ============================================================================

/// Load the explicit config file strictly, or the default one leniently.
fn load_config(custom: Option<&Path>) -> anyhow::Result<Config> {
    match custom {
        Some(path) => Ok(app_config::load_from(path)?),
        None => Ok(app_config::load()),
    }
}

/// Collect audio files from a path (file or directory)
pub(crate) fn collect_audio_files(path: &Path, recursive: bool) -> anyhow::Result<Vec<PathBuf>> {
    if !path.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files: Vec<PathBuf> = if recursive {
        walkdir::WalkDir::new(path)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| is_audio_file(e.path()))
            .map(|e| e.path().to_path_buf())
            .collect()
    } else {
        std::fs::read_dir(path)?
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter(|e| is_audio_file(&e.path()))
            .map(|e| e.path())
            .collect()
    };
    files.sort();
    Ok(files)
}

/// Check if a path has an audio file extension
pub(crate) fn is_audio_file(path: &Path) -> bool {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase());
    matches!(
        ext.as_deref(),
        Some("mp3" | "flac" | "ogg" | "oga" | "m4a" | "mp4" | "aac" | "wav")
    )
}
