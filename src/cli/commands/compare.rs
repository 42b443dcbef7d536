//! Pairwise fingerprint comparison.

use anyhow::Context;
use std::path::Path;
use tokio::runtime::Runtime;

use crate::config::Config;
use crate::fingerprint::Fingerprint;
use crate::pipeline::{CancelToken, fingerprint_async};

/// Print the similarity of `a` and `b`.
///
/// Each argument is an audio file or a compact fingerprint string.
pub fn cmd_compare(
    rt: &Runtime,
    a: &str,
    b: &str,
    config: &Config,
    max_offset: usize,
) -> anyhow::Result<()> {
    let (fa, fb) = rt.block_on(async {
        tokio::try_join!(resolve(a, config), resolve(b, config))
    })?;

    let score = fa.similarity(&fb, max_offset);
    println!("CODES_A={}", fa.len());
    println!("CODES_B={}", fb.len());
    println!("SIMILARITY={:.4}", score);
    Ok(())
}

/// Fingerprint a file, or parse a compact string.
async fn resolve(arg: &str, config: &Config) -> anyhow::Result<Fingerprint> {
    let path = Path::new(arg);
    if path.exists() {
        let report = fingerprint_async(path, config.clone(), CancelToken::new())
            .await
            .with_context(|| format!("Failed to fingerprint {}", path.display()))?;
        return Ok(report.fingerprint);
    }

    arg.parse::<Fingerprint>()
        .with_context(|| format!("{arg:?} is neither a file nor a fingerprint"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{melody, write_wav};

    #[test]
    fn test_resolve_file_and_string() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_wav(dir.path(), "m.wav", 11025, 1, 5.0, melody());
        let rt = Runtime::new().unwrap();
        let config = Config::default();

        let from_file = rt
            .block_on(resolve(path.to_str().unwrap(), &config))
            .unwrap();
        let compact = from_file.to_compact_string().unwrap();
        let from_string = rt.block_on(resolve(&compact, &config)).unwrap();
        assert_eq!(from_file, from_string);

        assert!(rt.block_on(resolve("not-a-file-or-fp!", &config)).is_err());
    }
}
