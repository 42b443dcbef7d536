//! Command-line interface for audio-fingerprint.
//!
//! This module provides CLI commands for fingerprinting files, comparing
//! fingerprints and managing the config file. Its text and JSON output
//! follows `fpcalc`, so scripts written against Chromaprint's tool keep
//! working.

mod commands;

pub use commands::{Cli, Commands, ConfigAction, run_command};
