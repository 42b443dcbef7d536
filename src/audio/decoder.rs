//! Audio decoder using symphonia for multi-format support.
//!
//! Supported formats:
//! - MP3
//! - FLAC
//! - OGG Vorbis
//! - WAV/PCM
//! - AAC (in MP4 container)

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, Decoder, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::meta::MetadataOptions;

use super::AudioSource;
use crate::error::{FingerprintError, Result};

/// Lowest native sample rate accepted.
///
/// Anything below this is not music, and upsampling it to the analysis
/// rate would turn a tiny file into millions of samples.
pub const MIN_SOURCE_RATE: u32 = 4000;

/// Audio decoder wrapper for symphonia.
///
/// Owns the open file (or buffer) for its whole lifetime; dropping the
/// decoder releases it.
pub struct AudioDecoder {
    reader: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    sample_rate: u32,
    channels: Option<u16>,
    duration: Duration,
    sample_buf: Option<SampleBuffer<f32>>,
    decoded_packets: u64,
    skipped_packets: u64,
}

impl AudioDecoder {
    /// Open a source for decoding.
    pub fn open(source: &AudioSource) -> Result<Self> {
        let (mss, hint) = source.open()?;

        let format_opts = FormatOptions {
            enable_gapless: true,
            ..Default::default()
        };
        let metadata_opts = MetadataOptions::default();

        // symphonia panics on some malformed headers (e.g. a zero sample rate)
        let probed = guard("container header", || {
            symphonia::default::get_probe()
                .format(&hint, mss, &format_opts, &metadata_opts)
                .map_err(map_probe_error)
        })?;

        let reader = probed.format;

        // Find the first audio track
        let track = reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| FingerprintError::unsupported("no audio track found"))?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let sample_rate = codec_params
            .sample_rate
            .ok_or_else(|| FingerprintError::unsupported("unknown sample rate"))?;
        if sample_rate == 0 {
            return Err(FingerprintError::corrupt("sample rate of 0 Hz"));
        }
        if sample_rate < MIN_SOURCE_RATE {
            return Err(FingerprintError::unsupported(format!(
                "sample rate {sample_rate}Hz is below {MIN_SOURCE_RATE}Hz"
            )));
        }
        // Some containers only reveal the layout once the first packet decodes
        let channels = codec_params.channels.map(|c| c.count() as u16);

        let duration = match (codec_params.n_frames, codec_params.time_base) {
            (Some(n_frames), Some(tb)) => {
                let time = tb.calc_time(n_frames);
                Duration::from_secs_f64(time.seconds as f64 + time.frac)
            }
            (Some(n_frames), None) => Duration::from_secs_f64(n_frames as f64 / sample_rate as f64),
            _ => Duration::ZERO,
        };

        let decoder = guard("codec parameters", || {
            symphonia::default::get_codecs()
                .make(&codec_params, &DecoderOptions::default())
                .map_err(|e| match e {
                    SymphoniaError::Unsupported(msg) => FingerprintError::unsupported(msg),
                    other => FingerprintError::corrupt(other.to_string()),
                })
        })?;

        tracing::debug!(
            "Opened {}: {}Hz, {:?} channels, {:.2}s",
            source.label(),
            sample_rate,
            channels,
            duration.as_secs_f64()
        );

        Ok(Self {
            reader,
            decoder,
            track_id,
            sample_rate,
            channels,
            duration,
            sample_buf: None,
            decoded_packets: 0,
            skipped_packets: 0,
        })
    }

    /// Native sample rate of the track.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Native channel count, if the container declared it.
    pub fn channels(&self) -> Option<u16> {
        self.channels
    }

    /// Container-declared duration (zero when unknown).
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Decode the next chunk of audio samples.
    ///
    /// Returns `Ok(None)` at end of stream. Packets that fail to decode are
    /// skipped, but a stream where nothing decodes is reported as corrupt.
    pub fn next_chunk(&mut self) -> Result<Option<DecodedChunk>> {
        loop {
            let packet = match self.reader.next_packet() {
                Ok(p) => p,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    return self.end_of_stream();
                }
                Err(SymphoniaError::ResetRequired) => {
                    self.decoder.reset();
                    continue;
                }
                Err(SymphoniaError::IoError(e)) => return Err(FingerprintError::Io(e)),
                Err(e) => return Err(FingerprintError::corrupt(e.to_string())),
            };

            // Skip packets from other tracks
            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(d) => d,
                Err(SymphoniaError::DecodeError(msg)) => {
                    self.skipped_packets += 1;
                    tracing::debug!("Skipping undecodable packet at ts {}: {}", packet.ts(), msg);
                    continue;
                }
                Err(SymphoniaError::IoError(e)) => return Err(FingerprintError::Io(e)),
                Err(e) => return Err(FingerprintError::corrupt(e.to_string())),
            };

            let spec = *decoded.spec();
            let channels = spec.channels.count() as u16;
            if channels == 0 {
                return Err(FingerprintError::corrupt("decoded packet has no channels"));
            }
            match self.channels {
                Some(known) if known != channels => {
                    return Err(FingerprintError::corrupt(format!(
                        "channel count changed mid-stream ({known} -> {channels})"
                    )));
                }
                Some(_) => {}
                None => self.channels = Some(channels),
            }

            let capacity = decoded.capacity() as u64;
            if self
                .sample_buf
                .as_ref()
                .is_some_and(|b| (b.capacity() as u64) < capacity * channels as u64)
            {
                self.sample_buf = None;
            }
            let buf = self
                .sample_buf
                .get_or_insert_with(|| SampleBuffer::<f32>::new(capacity, spec));
            buf.copy_interleaved_ref(decoded);
            self.decoded_packets += 1;

            return Ok(Some(DecodedChunk {
                samples: buf.samples().to_vec(),
                channels,
            }));
        }
    }

    fn end_of_stream(&self) -> Result<Option<DecodedChunk>> {
        if self.decoded_packets == 0 && self.skipped_packets > 0 {
            return Err(FingerprintError::corrupt(format!(
                "none of {} packets could be decoded",
                self.skipped_packets
            )));
        }
        if self.skipped_packets > 0 {
            tracing::warn!(
                "Skipped {} undecodable packets ({} decoded)",
                self.skipped_packets,
                self.decoded_packets
            );
        }
        Ok(None)
    }
}

/// Interleaved samples decoded from one packet.
#[derive(Debug, Clone)]
pub struct DecodedChunk {
    /// Interleaved f32 samples in [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Channel count of `samples`
    pub channels: u16,
}

impl DecodedChunk {
    /// Number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }
}

/// Run a symphonia call, reporting a panic inside it as corrupt data.
fn guard<T>(stage: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
    catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
        let detail = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "decoder panicked".to_string());
        tracing::debug!("Contained panic while reading {}: {}", stage, detail);
        Err(FingerprintError::corrupt(format!("invalid {stage}: {detail}")))
    })
}

fn map_probe_error(err: SymphoniaError) -> FingerprintError {
    match err {
        SymphoniaError::Unsupported(msg) => FingerprintError::unsupported(msg),
        SymphoniaError::IoError(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            FingerprintError::corrupt("stream ended while reading the container header")
        }
        SymphoniaError::IoError(e) => FingerprintError::Io(e),
        other => FingerprintError::corrupt(other.to_string()),
    }
}
