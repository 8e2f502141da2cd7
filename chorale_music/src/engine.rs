// The request pipeline: settings in, four-voice chorale out.
//
// `generate` validates the request up front, plans a progression, and then
// walks it one measure at a time: resolve the numeral, expand the note pool,
// assign the voices, check voice leading, append the measure. The voicing
// returned by each measure's assembly is the only state carried forward.
//
// Only malformed requests produce errors. A chord that fails to resolve
// becomes a measure of rests and resets the carried voicing; a voice that
// runs out of candidates falls back or rests inside voicing.rs.

use crate::assemble::{VoicesData, assemble_measure, rest_measure};
use crate::chord::{ResolvedChord, expand_pool, resolve_numeral, resolve_symbol};
use crate::config::{EngineConfig, GenerationSettings};
use crate::error::{ChoraleError, Result};
use crate::key::{Key, Meter};
use crate::progression::generate_progression;
use crate::theory::{DiatonicTheory, leading_tone_pc};
use crate::validate::{Finding, check_voice_leading};
use crate::voicing::{AssignmentContext, Voicing, assign_voicing};
use chorale_prng::RandomSource;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Everything a single generation needs besides the engine configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub key: Key,
    pub meter: Meter,
    pub measures: usize,
    pub settings: GenerationSettings,
}

impl GenerationRequest {
    /// A request with default style settings.
    pub fn new(key: Key, meter: Meter, measures: usize) -> Self {
        GenerationRequest {
            key,
            meter,
            measures,
            settings: GenerationSettings::default(),
        }
    }

    /// Build a request from textual key and meter, e.g. ("F# minor", "3/4").
    pub fn parse(key: &str, meter: &str, measures: usize) -> Result<Self> {
        Ok(GenerationRequest::new(
            Key::parse(key)?,
            Meter::parse(meter)?,
            measures,
        ))
    }

    pub fn with_settings(mut self, settings: GenerationSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Reject anything that would otherwise surface mid-generation: a key
    /// the theory cannot spell triads for, a bad meter, zero measures, or a
    /// slider out of range.
    pub fn validate(&self, theory: &impl DiatonicTheory) -> Result<()> {
        validate_key(&self.key, theory)?;
        if self.measures == 0 {
            return Err(ChoraleError::NoMeasures);
        }
        Meter::new(self.meter.beats, self.meter.beat_value)?;
        self.settings.validate()
    }
}

/// A key is usable when its tonic is a valid note name, its scale spells
/// without triple accidentals, and every diatonic triad the theory names for
/// it decodes back into a chord.
fn validate_key(key: &Key, theory: &impl DiatonicTheory) -> Result<()> {
    let invalid = || ChoraleError::InvalidKey(key.to_string());
    if !key.is_spellable() {
        return Err(invalid());
    }
    let triads = theory.diatonic_triads(key);
    if triads.len() != 7 || !triads.iter().all(|t| theory.chord(t).valid) {
        return Err(invalid());
    }
    Ok(())
}

/// A generated chorale: the payload handed to notation and playback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chorale {
    pub key: Key,
    pub meter: Meter,
    pub measures: usize,
    /// One Roman-numeral symbol per measure.
    pub progression: Vec<String>,
    pub voices: VoicesData,
    /// Advisory voice-leading findings; empty at low strictness.
    pub findings: Vec<Finding>,
}

/// Generate a chorale for `request`.
pub fn generate(
    request: &GenerationRequest,
    config: &EngineConfig,
    theory: &impl DiatonicTheory,
    rng: &mut impl RandomSource,
) -> Result<Chorale> {
    request.validate(theory)?;
    let progression = generate_progression(
        &request.key,
        request.settings.harmonic_complexity,
        request.measures,
        theory,
        rng,
    );
    let chords: Vec<ResolvedChord> = progression
        .numerals
        .iter()
        .map(|&n| resolve_numeral(n, &request.key, theory))
        .collect();
    let chorale = harmonize(request, progression.symbols(), &chords, config, theory, rng);
    info!(
        key = %request.key,
        meter = %request.meter,
        measures = request.measures,
        findings = chorale.findings.len(),
        "chorale generated"
    );
    Ok(chorale)
}

/// Voice an explicit progression of numeral symbols instead of planning one.
///
/// `request.measures` is ignored; there is one measure per symbol. Symbols
/// that do not resolve in the key become measures of rests.
pub fn generate_from_numerals(
    request: &GenerationRequest,
    numerals: &[&str],
    config: &EngineConfig,
    theory: &impl DiatonicTheory,
    rng: &mut impl RandomSource,
) -> Result<Chorale> {
    let request = GenerationRequest {
        measures: numerals.len(),
        ..*request
    };
    request.validate(theory)?;
    let chords: Vec<ResolvedChord> = numerals
        .iter()
        .map(|text| resolve_symbol(text, &request.key, theory))
        .collect();
    let symbols = numerals.iter().map(|s| s.to_string()).collect();
    let chorale = harmonize(&request, symbols, &chords, config, theory, rng);
    info!(
        key = %request.key,
        measures = request.measures,
        findings = chorale.findings.len(),
        "explicit progression voiced"
    );
    Ok(chorale)
}

fn harmonize(
    request: &GenerationRequest,
    progression: Vec<String>,
    chords: &[ResolvedChord],
    config: &EngineConfig,
    theory: &impl DiatonicTheory,
    rng: &mut impl RandomSource,
) -> Chorale {
    let ctx = AssignmentContext {
        config,
        smoothness: request.settings.melodic_smoothness,
        leading_tone_pc: leading_tone_pc(theory, &request.key),
    };
    let strictness = request.settings.dissonance_strictness;

    let mut voices = VoicesData::default();
    let mut findings = Vec::new();
    let mut previous = Voicing::silent();

    for (measure, chord) in chords.iter().enumerate() {
        if chord.is_empty() {
            warn!(measure, numeral = %chord.numeral, "chord did not resolve, resting");
            previous = rest_measure(&request.meter, &mut voices);
            continue;
        }

        let pool = expand_pool(&chord.pitches);
        let voicing = assign_voicing(chord, &pool, &previous, &ctx, rng);

        let prior = (!previous.is_silent()).then_some(&previous);
        for violation in check_voice_leading(prior, &voicing, config, strictness) {
            warn!(measure, %violation, "voice-leading finding");
            findings.push(Finding { measure, violation });
        }

        debug!(
            measure,
            numeral = %chord.numeral,
            symbol = %chord.symbol,
            voicing = ?voicing.as_array(),
            "measure voiced"
        );
        previous = assemble_measure(&voicing, &request.meter, &mut voices);
    }

    Chorale {
        key: request.key,
        meter: request.meter,
        measures: chords.len(),
        progression,
        voices,
        findings,
    }
}
