// Request settings and engine configuration.
//
// `GenerationSettings` carries the three style sliders of a single request.
// `EngineConfig` carries the constraints that shape every request: voice
// ranges, adjacent-voice spacing limits, and the leap threshold used by the
// note selector. Both have defaults matching classical SATB practice;
// `EngineConfig` can also be loaded from a JSON file, where any field left
// out keeps its default.

use crate::error::{ChoraleError, Result};
use crate::voicing::Voice;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Highest value of each style slider.
pub const SLIDER_MAX: u8 = 10;

/// The three style sliders, each 0..=10.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationSettings {
    /// Widens the chord vocabulary (secondary chords at 3, V7 at 5,
    /// tertiary chords at 7).
    pub harmonic_complexity: u8,
    /// Weight of the motion penalty in note selection.
    pub melodic_smoothness: u8,
    /// Voice-leading checks run above 3.
    pub dissonance_strictness: u8,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        GenerationSettings {
            harmonic_complexity: 3,
            melodic_smoothness: 7,
            dissonance_strictness: 5,
        }
    }
}

impl GenerationSettings {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("harmonic_complexity", self.harmonic_complexity),
            ("melodic_smoothness", self.melodic_smoothness),
            ("dissonance_strictness", self.dissonance_strictness),
        ] {
            if value > SLIDER_MAX {
                return Err(ChoraleError::SettingOutOfRange { name, value });
            }
        }
        Ok(())
    }
}

/// Inclusive MIDI range of one voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceRange {
    pub low: u8,
    pub high: u8,
}

impl VoiceRange {
    pub const fn new(low: u8, high: u8) -> Self {
        VoiceRange { low, high }
    }

    pub fn contains(&self, pitch: u8) -> bool {
        (self.low..=self.high).contains(&pitch)
    }
}

/// Per-voice ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceRanges {
    pub soprano: VoiceRange,
    pub alto: VoiceRange,
    pub tenor: VoiceRange,
    pub bass: VoiceRange,
}

impl Default for VoiceRanges {
    fn default() -> Self {
        VoiceRanges {
            soprano: VoiceRange::new(60, 79), // C4–G5
            alto: VoiceRange::new(53, 72),    // F3–C5
            tenor: VoiceRange::new(48, 67),   // C3–G4
            bass: VoiceRange::new(40, 60),    // E2–C4
        }
    }
}

/// Maximum distance in semitones between adjacent voices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpacingLimits {
    pub soprano_alto: u8,
    pub alto_tenor: u8,
    pub tenor_bass: u8,
}

impl Default for SpacingLimits {
    fn default() -> Self {
        SpacingLimits {
            soprano_alto: 12,
            alto_tenor: 12,
            // Bass may sit up to a twelfth below the tenor.
            tenor_bass: 19,
        }
    }
}

/// Constraints shared by every generation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub ranges: VoiceRanges,
    pub spacing: SpacingLimits,
    /// Melodic intervals above this many semitones count as leaps.
    pub leap_threshold: u8,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            ranges: VoiceRanges::default(),
            spacing: SpacingLimits::default(),
            leap_threshold: crate::selector::DEFAULT_LEAP_THRESHOLD,
        }
    }
}

impl EngineConfig {
    /// Load from a JSON file. Missing fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&data)?;
        Ok(config)
    }

    pub fn range(&self, voice: Voice) -> VoiceRange {
        match voice {
            Voice::Soprano => self.ranges.soprano,
            Voice::Alto => self.ranges.alto,
            Voice::Tenor => self.ranges.tenor,
            Voice::Bass => self.ranges.bass,
        }
    }

    /// Spacing limit between `upper` and the voice directly below it, or
    /// `None` for the bass.
    pub fn spacing_below(&self, upper: Voice) -> Option<u8> {
        match upper {
            Voice::Soprano => Some(self.spacing.soprano_alto),
            Voice::Alto => Some(self.spacing.alto_tenor),
            Voice::Tenor => Some(self.spacing.tenor_bass),
            Voice::Bass => None,
        }
    }
}
