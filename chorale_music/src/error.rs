// Error type for configuration-level failures.
//
// Only invalid top-level input and file I/O surface as errors. Chord
// resolution failures degrade a single measure to rests and candidate
// exhaustion falls back to nearby pitches; neither is represented here.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChoraleError {
    #[error("unrecognized key '{0}'")]
    InvalidKey(String),

    #[error("meter '{0}' is not of the form beats/beat-value")]
    InvalidMeter(String),

    #[error("beat value {0} is unsupported (expected 2, 4, 8 or 16)")]
    UnsupportedBeatValue(u32),

    #[error("measure count must be positive")]
    NoMeasures,

    #[error("{name} must be in 0..=10, got {value}")]
    SettingOutOfRange { name: &'static str, value: u8 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to encode MIDI: {0}")]
    Midi(String),
}

pub type Result<T> = std::result::Result<T, ChoraleError>;
