//! Async and parallel entry points.

use std::path::PathBuf;

use rayon::prelude::*;

use super::{CancelToken, FingerprintReport, fingerprint_with_config};
use crate::audio::AudioSource;
use crate::config::Config;
use crate::error::{FingerprintError, Result};

/// Run the blocking pipeline on tokio's blocking pool.
pub async fn fingerprint_async(
    source: impl Into<AudioSource>,
    config: Config,
    cancel: CancelToken,
) -> Result<FingerprintReport> {
    let source = source.into();
    tokio::task::spawn_blocking(move || fingerprint_with_config(source, &config, &cancel))
        .await
        .map_err(|e| FingerprintError::TaskJoin(e.to_string()))?
}

/// Fingerprint every path in parallel.
///
/// Results come back in input order; one failure does not affect the others.
pub fn fingerprint_batch(
    paths: &[PathBuf],
    config: &Config,
    cancel: &CancelToken,
) -> Vec<(PathBuf, Result<FingerprintReport>)> {
    tracing::info!("Fingerprinting {} files", paths.len());

    paths
        .par_iter()
        .map(|path| {
            let result = fingerprint_with_config(path.as_path(), config, cancel);
            (path.clone(), result)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{melody, write_wav};

    #[tokio::test]
    async fn test_async_matches_blocking() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_wav(dir.path(), "m.wav", 11025, 1, 5.0, melody());

        let blocking =
            fingerprint_with_config(path.as_path(), &Config::default(), &CancelToken::new())
                .unwrap();
        let async_report = fingerprint_async(path, Config::default(), CancelToken::new())
            .await
            .unwrap();
        assert_eq!(blocking, async_report);
    }

    #[test]
    fn test_batch_keeps_failures_separate() {
        let dir = tempfile::tempdir().unwrap();
        let good = write_wav(dir.path(), "good.wav", 11025, 1, 5.0, melody());
        let missing = dir.path().join("missing.wav");

        let results = fingerprint_batch(
            &[good.clone(), missing.clone()],
            &Config::default(),
            &CancelToken::new(),
        );

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, good);
        assert!(results[0].1.is_ok());
        assert_eq!(results[1].0, missing);
        assert_eq!(results[1].1.as_ref().unwrap_err().kind(), "IOError");
    }

    #[test]
    fn test_cancelled_batch() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_wav(dir.path(), "m.wav", 11025, 1, 5.0, melody());
        let cancel = CancelToken::new();
        cancel.cancel();

        let results = fingerprint_batch(&[path], &Config::default(), &cancel);
        assert!(matches!(results[0].1, Err(FingerprintError::Cancelled)));
    }
}
