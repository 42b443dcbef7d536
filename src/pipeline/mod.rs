//! Fingerprinting pipeline: decoder → chroma extractor → encoder.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Decoder (scoped worker)                      │
//! │    Probes the container, decodes, remixes and resamples        │
//! └────────────────────────────┬────────────────────────────────────┘
//!                              │ bounded crossbeam channel
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                  Chroma extractor (caller)                      │
//! │      Windowed FFT, pitch-class folding, normalisation          │
//! └────────────────────────────┬────────────────────────────────────┘
//!                              │ Vec<FeatureFrame>
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Encoder (rayon pool)                         │
//! │     Smoothing, integral image, classifier bank → Vec<u32>      │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! With `pipeline.pipelined = false` the decoder runs inline on the
//! caller's thread instead. Both modes produce identical output.

mod batch;
mod cancel;
mod state;

pub use batch::{fingerprint_async, fingerprint_batch};
pub use cancel::CancelToken;
pub use state::PipelineState;

use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, bounded};
use serde::{Deserialize, Serialize};

use crate::audio::{AudioSource, AudioStream};
use crate::chroma::{ChromaExtractor, FeatureSet};
use crate::config::Config;
use crate::encoder::FingerprintEncoder;
use crate::error::{FingerprintError, Result};
use crate::fingerprint::Fingerprint;

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FingerprintReport {
    pub fingerprint: Fingerprint,
    /// Seconds of audio analysed
    pub duration: f64,
    /// Sample rate the analysis ran at
    pub sample_rate: u32,
}

/// One fingerprinting request, driven through [`PipelineState`].
///
/// A pipeline runs once. After `Done` or `Failed` it must be [`reset`]
/// before it accepts another source.
///
/// [`reset`]: Pipeline::reset
#[derive(Debug)]
pub struct Pipeline {
    config: Config,
    cancel: CancelToken,
    state: PipelineState,
}

impl Pipeline {
    /// Create an idle pipeline after validating `config`.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            cancel: CancelToken::new(),
            state: PipelineState::Idle,
        })
    }

    /// Use `cancel` instead of a private token.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// A handle that cancels this pipeline's runs.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Return a finished or failed pipeline to `Idle`.
    ///
    /// A no-op on an idle pipeline.
    pub fn reset(&mut self) -> Result<()> {
        if self.state == PipelineState::Idle {
            return Ok(());
        }
        self.advance(PipelineState::Idle)
    }

    /// Fingerprint `source`.
    ///
    /// Only valid from `Idle`. On error the pipeline ends in `Failed` and
    /// every decoder resource has been dropped.
    pub fn run(&mut self, source: &AudioSource) -> Result<FingerprintReport> {
        if self.state != PipelineState::Idle {
            return Err(FingerprintError::InvalidState(format!(
                "run requires an idle pipeline, state is {}",
                self.state.name()
            )));
        }

        let start = Instant::now();
        match self.execute(source) {
            Ok(report) => {
                self.advance(PipelineState::Done)?;
                tracing::info!(
                    "Fingerprinted {} ({:.1}s) into {} codes in {:?}",
                    source.label(),
                    report.duration,
                    report.fingerprint.len(),
                    start.elapsed()
                );
                Ok(report)
            }
            Err(e) => {
                tracing::warn!(
                    "Fingerprinting {} failed while {}: {}",
                    source.label(),
                    self.state.name(),
                    e
                );
                let failed = PipelineState::Failed {
                    kind: e.kind(),
                    message: e.to_string(),
                };
                if self.state.can_transition_to(&failed) {
                    self.state = failed;
                }
                Err(e)
            }
        }
    }

    fn execute(&mut self, source: &AudioSource) -> Result<FingerprintReport> {
        let sample_rate = self.config.audio.sample_rate;
        let channels = self.config.audio.channels;
        let analysis = self.config.analysis.clone();
        let pipelined = self.config.pipeline.pipelined;
        let buffer_chunks = self.config.pipeline.buffer_chunks;

        self.advance(PipelineState::Decoding)?;
        self.cancel.check()?;
        let limit = analysis
            .max_duration_secs
            .map(Duration::try_from_secs_f64)
            .transpose()
            .map_err(|e| FingerprintError::config(format!("max_duration_secs: {e}")))?;
        let stream = AudioStream::open(source, sample_rate, channels)?.with_limit(limit);
        tracing::debug!(
            "Opened {}: {} Hz / {:?} ch, declared {:?}",
            source.label(),
            stream.source_sample_rate(),
            stream.source_channels(),
            stream.duration()
        );

        self.advance(PipelineState::Extracting)?;
        let encoder = FingerprintEncoder::new(analysis.hop_size as f64 / sample_rate as f64);
        // Span of audio one code needs
        let code_span = analysis.window_size + (encoder.frames_required() - 1) * analysis.hop_size;
        let extractor = ChromaExtractor::new(&analysis, sample_rate, channels)?
            .require_samples(code_span as u64);
        let features = if pipelined {
            extract_pipelined(stream, extractor, &self.cancel, buffer_chunks)?
        } else {
            extract_sequential(stream, extractor, &self.cancel)?
        };

        self.advance(PipelineState::Encoding)?;
        self.cancel.check()?;
        let fingerprint = encoder.encode(&features.frames)?;

        Ok(FingerprintReport {
            fingerprint,
            duration: features.duration_secs(),
            sample_rate,
        })
    }

    fn advance(&mut self, next: PipelineState) -> Result<()> {
        if !self.state.can_transition_to(&next) {
            return Err(FingerprintError::InvalidState(format!(
                "cannot move from {} to {}",
                self.state.name(),
                next.name()
            )));
        }
        tracing::trace!("Pipeline {} -> {}", self.state.name(), next.name());
        self.state = next;
        Ok(())
    }
}

/// Run one request with `config`, honouring `cancel`.
pub fn fingerprint_with_config(
    source: impl Into<AudioSource>,
    config: &Config,
    cancel: &CancelToken,
) -> Result<FingerprintReport> {
    let mut pipeline = Pipeline::new(config.clone())?.with_cancel(cancel.clone());
    pipeline.run(&source.into())
}

/// Decode and extract on the current thread.
fn extract_sequential(
    stream: AudioStream,
    mut extractor: ChromaExtractor,
    cancel: &CancelToken,
) -> Result<FeatureSet> {
    for chunk in stream {
        cancel.check()?;
        extractor.push(&chunk?)?;
        if extractor.is_full() {
            break;
        }
    }
    cancel.check()?;
    extractor.finish()
}

/// Decode on a scoped worker thread while extracting on this one.
///
/// The consumer owns the receiver: returning early drops it, which makes
/// the producer's next send fail so it stops and drops the decoder.
fn extract_pipelined(
    stream: AudioStream,
    mut extractor: ChromaExtractor,
    cancel: &CancelToken,
    capacity: usize,
) -> Result<FeatureSet> {
    let (tx, rx) = bounded::<Result<Vec<f32>>>(capacity);

    std::thread::scope(|scope| {
        let producer = scope.spawn(move || {
            for chunk in stream {
                let failed = chunk.is_err();
                if cancel.is_cancelled() || tx.send(chunk).is_err() || failed {
                    break;
                }
            }
        });

        let drained = drain(rx, &mut extractor, cancel);
        let joined = producer
            .join()
            .map_err(|_| FingerprintError::TaskJoin("decoder thread panicked".to_string()));
        drained.and(joined)
    })?;

    cancel.check()?;
    extractor.finish()
}

fn drain(
    rx: Receiver<Result<Vec<f32>>>,
    extractor: &mut ChromaExtractor,
    cancel: &CancelToken,
) -> Result<()> {
    for chunk in rx {
        cancel.check()?;
        extractor.push(&chunk?)?;
        if extractor.is_full() {
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{melody, pcm_wav_header, sine, wav_bytes, wav_bytes_as, write_wav};
    use std::time::{Duration, Instant};

    fn run(source: impl Into<AudioSource>, config: &Config) -> Result<FingerprintReport> {
        fingerprint_with_config(source, config, &CancelToken::new())
    }

    /// A ten-minute 44.1kHz stereo WAV of silence, written sparsely.
    fn ten_minute_wav(dir: &std::path::Path) -> std::path::PathBuf {
        let data_len = 600 * 44100 * 2 * 2;
        let path = dir.join("long.wav");
        let mut file = std::fs::File::create(&path).unwrap();
        std::io::Write::write_all(&mut file, &pcm_wav_header(44100, 2, data_len)).unwrap();
        file.set_len(44 + data_len as u64).unwrap();
        path
    }

    /// Cancel `pipeline` from another thread shortly after it starts.
    fn cancel_mid_run(mut pipeline: Pipeline, source: &AudioSource) -> (Result<()>, Duration) {
        let cancel = pipeline.cancel_token();
        let started = Instant::now();
        let result = std::thread::scope(|scope| {
            scope.spawn(move || {
                std::thread::sleep(Duration::from_millis(150));
                cancel.cancel();
            });
            pipeline.run(source).map(|_| ())
        });
        assert!(matches!(
            pipeline.state(),
            PipelineState::Failed { kind: "Cancelled", .. }
        ));
        (result, started.elapsed())
    }

    fn sequential() -> Config {
        let mut config = Config::default();
        config.pipeline.pipelined = false;
        config
    }

    #[test]
    fn test_thirty_second_sine() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_wav(dir.path(), "sine.wav", 11025, 1, 30.0, sine(440.0));

        let report = run(path.as_path(), &Config::default()).unwrap();

        // 330750 samples -> 241 frames -> 222 codes
        assert_eq!(report.fingerprint.len(), 222);
        let expected = 30.0 * 11025.0 / 1365.0;
        assert!((report.fingerprint.len() as f64 - expected).abs() <= expected * 0.1);
        assert!((report.duration - 30.0).abs() < 0.01);
        assert_eq!(report.sample_rate, 11025);
    }

    #[test]
    fn test_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_wav(dir.path(), "m.wav", 11025, 1, 8.0, melody());

        let a = run(path.as_path(), &Config::default()).unwrap();
        let b = run(path.as_path(), &Config::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_length_grows_with_duration() {
        let dir = tempfile::tempdir().unwrap();
        let lengths: Vec<usize> = [5.0, 10.0, 20.0]
            .into_iter()
            .map(|secs| {
                let path = write_wav(dir.path(), &format!("{secs}.wav"), 11025, 1, secs, melody());
                run(path.as_path(), &Config::default()).unwrap().fingerprint.len()
            })
            .collect();
        assert!(lengths[0] > 0);
        assert!(lengths[0] < lengths[1] && lengths[1] < lengths[2], "{lengths:?}");
    }

    #[test]
    fn test_empty_file_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.wav");
        std::fs::write(&path, b"").unwrap();

        let err = run(path.as_path(), &Config::default()).unwrap_err();
        assert!(matches!(err, FingerprintError::CorruptData(_)), "{err}");
    }

    #[test]
    fn test_garbage_is_rejected() {
        let garbage = b"definitely not an audio container ".repeat(200);
        let err = run(garbage, &Config::default()).unwrap_err();
        assert!(
            matches!(
                err,
                FingerprintError::UnsupportedFormat(_) | FingerprintError::CorruptData(_)
            ),
            "{err}"
        );
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = run(std::path::Path::new("/no/such/clip.wav"), &Config::default()).unwrap_err();
        assert_eq!(err.kind(), "IOError");
    }

    #[test]
    fn test_short_audio_is_insufficient() {
        // Both below the ~2.7s one code needs, even though 2s passes min_duration_secs
        for secs in [0.5, 2.0] {
            let bytes = wav_bytes(11025, 1, secs, melody());
            let err = run(bytes, &Config::default()).unwrap_err();
            assert!(
                matches!(err, FingerprintError::InsufficientAudio { .. }),
                "{secs}s: {err}"
            );
        }
    }

    #[test]
    fn test_pipelined_matches_sequential() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_wav(dir.path(), "m.wav", 22050, 2, 12.0, melody());

        let mut pipelined = Config::default();
        pipelined.pipeline.buffer_chunks = 1;
        let a = run(path.as_path(), &pipelined).unwrap();
        let b = run(path.as_path(), &sequential()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_bytes_match_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_wav(dir.path(), "m.wav", 11025, 1, 6.0, melody());
        let bytes = std::fs::read(&path).unwrap();

        let from_path = run(path.as_path(), &Config::default()).unwrap();
        let from_bytes = run(bytes, &Config::default()).unwrap();
        assert_eq!(from_path, from_bytes);
    }

    #[test]
    fn test_max_duration_truncates_analysis() {
        let dir = tempfile::tempdir().unwrap();
        let long = write_wav(dir.path(), "long.wav", 11025, 1, 30.0, melody());
        let short = write_wav(dir.path(), "short.wav", 11025, 1, 10.0, melody());

        let mut config = Config::default();
        config.analysis.max_duration_secs = Some(10.0);
        let limited = run(long.as_path(), &config).unwrap();
        let full = run(short.as_path(), &Config::default()).unwrap();

        assert!((limited.duration - 10.0).abs() < 0.01);
        assert_eq!(limited.fingerprint, full.fingerprint);
    }

    #[test]
    fn test_resampled_stereo_matches_mono() {
        let dir = tempfile::tempdir().unwrap();
        let hi = write_wav(dir.path(), "hi.wav", 44100, 2, 10.0, melody());
        let lo = write_wav(dir.path(), "lo.wav", 11025, 1, 10.0, melody());

        let a = run(hi.as_path(), &Config::default()).unwrap();
        let b = run(lo.as_path(), &Config::default()).unwrap();

        assert!((a.duration - b.duration).abs() < 0.01);
        let score = a.fingerprint.similarity(&b.fingerprint, 2);
        assert!(score > 0.7, "similarity {score}");
    }

    #[test]
    fn test_cancelled_before_start() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_wav(dir.path(), "m.wav", 11025, 1, 5.0, melody());

        let mut pipeline = Pipeline::new(Config::default()).unwrap();
        pipeline.cancel_token().cancel();

        let err = pipeline.run(&AudioSource::from(path.as_path())).unwrap_err();
        assert!(matches!(err, FingerprintError::Cancelled));
        assert!(matches!(
            pipeline.state(),
            PipelineState::Failed { kind: "Cancelled", .. }
        ));
    }

    #[test]
    fn test_cancelled_mid_run_pipelined() {
        let dir = tempfile::tempdir().unwrap();
        let source = AudioSource::from(ten_minute_wav(dir.path()).as_path());

        let pipeline = Pipeline::new(Config::default()).unwrap();
        let (result, elapsed) = cancel_mid_run(pipeline, &source);
        assert!(matches!(result, Err(FingerprintError::Cancelled)), "{result:?}");
        assert!(elapsed < Duration::from_secs(5), "took {elapsed:?}");
    }

    #[test]
    fn test_cancelled_mid_run_sequential() {
        let dir = tempfile::tempdir().unwrap();
        let source = AudioSource::from(ten_minute_wav(dir.path()).as_path());

        let pipeline = Pipeline::new(sequential()).unwrap();
        let (result, elapsed) = cancel_mid_run(pipeline, &source);
        assert!(matches!(result, Err(FingerprintError::Cancelled)), "{result:?}");
        assert!(elapsed < Duration::from_secs(5), "took {elapsed:?}");
    }

    #[test]
    fn test_sample_encoding_does_not_change_fingerprint() {
        let int16 = run(wav_bytes(22050, 2, 10.0, melody()), &Config::default()).unwrap();

        let encodings = [
            (32, hound::SampleFormat::Float, 0.9),
            (24, hound::SampleFormat::Int, 0.9),
            (8, hound::SampleFormat::Int, 0.7),
        ];
        for (bits, format, threshold) in encodings {
            let bytes = wav_bytes_as(22050, 2, 10.0, bits, format, melody());
            let other = run(bytes, &Config::default()).unwrap();

            assert_eq!(other.fingerprint.len(), int16.fingerprint.len());
            let score = int16.fingerprint.similarity(&other.fingerprint, 2);
            assert!(score > threshold, "{bits}-bit {format:?}: similarity {score}");
        }
    }

    #[test]
    fn test_malformed_headers_fail_cleanly() {
        let mut zero_rate = pcm_wav_header(0, 1, 100_000);
        zero_rate.resize(zero_rate.len() + 100_000, 0);
        let err = run(zero_rate, &Config::default()).unwrap_err();
        assert!(matches!(err, FingerprintError::CorruptData(_)), "{err}");

        let mut one_hz = pcm_wav_header(1, 1, 10_000);
        one_hz.resize(one_hz.len() + 10_000, 0);
        let err = run(one_hz, &sequential()).unwrap_err();
        assert!(matches!(err, FingerprintError::UnsupportedFormat(_)), "{err}");
    }

    #[test]
    fn test_run_requires_reset() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_wav(dir.path(), "m.wav", 11025, 1, 5.0, melody());
        let source = AudioSource::from(path.as_path());

        let mut pipeline = Pipeline::new(sequential()).unwrap();
        let first = pipeline.run(&source).unwrap();
        assert_eq!(pipeline.state(), &PipelineState::Done);

        let err = pipeline.run(&source).unwrap_err();
        assert!(matches!(err, FingerprintError::InvalidState(_)));
        assert_eq!(pipeline.state(), &PipelineState::Done);

        pipeline.reset().unwrap();
        assert_eq!(pipeline.run(&source).unwrap(), first);
    }

    #[test]
    fn test_retry_after_failure() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.wav");
        std::fs::write(&bad, b"").unwrap();
        let good = write_wav(dir.path(), "good.wav", 11025, 1, 5.0, melody());

        let mut pipeline = Pipeline::new(Config::default()).unwrap();
        assert!(pipeline.run(&AudioSource::from(bad.as_path())).is_err());
        assert!(pipeline.state().is_terminal());

        pipeline.reset().unwrap();
        assert!(pipeline.run(&AudioSource::from(good.as_path())).is_ok());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = Config::with_format(11025, 3);
        assert!(matches!(
            Pipeline::new(config),
            Err(FingerprintError::InvalidConfig(_))
        ));
    }
}
