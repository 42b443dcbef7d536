//! Fingerprint files and print the results in fpcalc's formats.

use std::path::{Path, PathBuf};
use tokio::runtime::Runtime;

use crate::config::Config;
use crate::pipeline::{CancelToken, FingerprintReport, fingerprint_batch};

use super::collect_audio_files;

/// Output options for [`cmd_fingerprint`].
#[derive(Debug, Clone, Default)]
pub struct FingerprintOptions {
    /// Integer codes instead of the compact string
    pub raw: bool,
    /// JSON instead of KEY=VALUE lines
    pub json: bool,
    /// Descend into subdirectories
    pub recursive: bool,
}

/// Fingerprint every audio file under `paths`.
///
/// Ctrl-C cancels the files still in flight. Fails if any file failed.
pub fn cmd_fingerprint(
    rt: &Runtime,
    paths: &[PathBuf],
    config: &Config,
    options: &FingerprintOptions,
) -> anyhow::Result<()> {
    config.validate()?;

    let mut files = Vec::new();
    for path in paths {
        files.extend(collect_audio_files(path, options.recursive)?);
    }
    if files.is_empty() {
        anyhow::bail!("No audio files found");
    }

    let total = files.len();
    let cancel = CancelToken::new();
    let results = rt.block_on(async {
        let interrupt = cancel.clone();
        let watcher = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, cancelling remaining files");
                interrupt.cancel();
            }
        });

        let config = config.clone();
        let cancel = cancel.clone();
        let results =
            tokio::task::spawn_blocking(move || fingerprint_batch(&files, &config, &cancel)).await;
        watcher.abort();
        results
    })?;

    let show_file = total > 1;
    let mut failed = 0;
    for (index, (path, result)) in results.iter().enumerate() {
        match result {
            Ok(report) => {
                if index > 0 && show_file && !options.json {
                    println!();
                }
                println!("{}", render(path, report, options, show_file)?);
            }
            Err(e) => {
                failed += 1;
                eprintln!("ERROR: {}: {}", path.display(), e);
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} files failed", failed, total);
    }
    Ok(())
}

/// Format one report.
///
/// Text mirrors `fpcalc` (`DURATION=`, `FINGERPRINT=`), JSON mirrors
/// `fpcalc -json` (`{"duration": .., "fingerprint": ..}`).
fn render(
    path: &Path,
    report: &FingerprintReport,
    options: &FingerprintOptions,
    show_file: bool,
) -> anyhow::Result<String> {
    let fingerprint = &report.fingerprint;

    if options.json {
        let encoded = if options.raw {
            serde_json::to_value(fingerprint)?
        } else {
            serde_json::Value::String(fingerprint.to_compact_string()?)
        };
        let mut value = serde_json::json!({
            "duration": (report.duration * 100.0).round() / 100.0,
            "fingerprint": encoded,
        });
        if show_file {
            value["file"] = serde_json::Value::String(path.display().to_string());
        }
        return Ok(serde_json::to_string(&value)?);
    }

    let encoded = if options.raw {
        fingerprint
            .codes()
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(",")
    } else {
        fingerprint.to_compact_string()?
    };

    let mut out = String::new();
    if show_file {
        out.push_str(&format!("FILE={}\n", path.display()));
    }
    out.push_str(&format!("DURATION={}\n", report.duration as u64));
    out.push_str(&format!("FINGERPRINT={}", encoded));
    Ok(out)
}
