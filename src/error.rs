//! Error types for the collaborator layer.
//!
//! The real-time core never returns errors: out-of-range reads yield silence
//! and broken preconditions panic. Loading samples and applying configuration
//! can fail for reasons outside the host's control, and those failures are
//! reported through the types below.

use std::path::PathBuf;
use thiserror::Error;

/// Failure to turn a file or byte slice into a [`SampleBuffer`](crate::sample::SampleBuffer).
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not read {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unknown audio format")]
    UnknownFormat,

    #[error("unknown format (RIFF but not WAVE)")]
    NotWave,

    #[error("truncated {what} in RIFF WAVE")]
    Truncated { what: &'static str },

    #[error("'{0}' missing in RIFF WAVE")]
    MissingChunk(&'static str),

    #[error("unhandled WAVE audio format {0}")]
    UnsupportedFormat(u16),

    #[error("unhandled bits per sample in WAVE: {0}")]
    UnsupportedBitDepth(u16),

    #[error("WAVE fmt declares no channels")]
    NoChannels,

    #[error("invalid WAVE sample rate {0}")]
    SampleRate(u32),

    #[error("unexpected WAVE fmt byte rate {found}, expected {expected}")]
    ByteRate { expected: u64, found: u32 },

    #[error("unexpected WAVE fmt block align {found}, expected {expected}")]
    BlockAlign { expected: u32, found: u16 },

    #[error("data length {len} vs block alignment {block_align} mismatch in WAVE")]
    DataLength { len: usize, block_align: u16 },

    #[error("expected {expected} channel(s) but found {found}")]
    ChannelCount { expected: usize, found: u16 },

    #[error("WAVE file contains no frames")]
    Empty,
}

/// Failure to apply a [`BankConfig`](crate::config::BankConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration describes {found} oscillator(s) but the bank has {expected}")]
    OscillatorCount { expected: usize, found: usize },

    #[error("oscillator {index}: {stage} slope must be positive, got {slope}")]
    InvalidSlope {
        index: usize,
        stage: &'static str,
        slope: f32,
    },

    #[error("oscillator {index}: sync source {source_index} out of range")]
    SyncSource { index: usize, source_index: usize },

    #[error("oscillator {index}: wavetable has {len} entries, expected {expected}")]
    WavetableSize {
        index: usize,
        len: usize,
        expected: usize,
    },

    #[error("{what} out of range: {value}")]
    InvalidValue { what: &'static str, value: f32 },
}
