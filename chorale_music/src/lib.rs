// Chorale harmonization engine.
//
// Produces four-part (soprano, alto, tenor, bass) chorale settings in a
// major or minor key: a Roman-numeral progression is planned, each chord is
// resolved to pitches, and the four voices are placed one measure at a time
// under range, ordering, and spacing constraints, with a smoothness slider
// trading target accuracy against melodic motion.
//
// Architecture:
// - key.rs: Keys, note spelling, meters, beat durations
// - theory.rs: Diatonic theory trait + built-in tertian implementation
// - progression.rs: Roman numerals and progression planning with cadences
// - chord.rs: Numeral resolution to anchored pitches, note-pool expansion
// - selector.rs: Weighted closest-note selection (the smoothness model)
// - voicing.rs: SATB voice assignment with fallback chains
// - validate.rs: Advisory crossing/spacing/parallel-motion checks
// - assemble.rs: Per-beat note events and the four-voice output structure
// - engine.rs: Request validation and the measure-by-measure pipeline
// - midi.rs: Standard MIDI File output
// - config.rs: Style sliders and engine configuration (JSON-loadable)
// - error.rs: Error type for invalid requests and I/O
//
// Generation is deterministic given a seed: all randomness is drawn from the
// caller's `chorale_prng::RandomSource`.

pub mod assemble;
pub mod chord;
pub mod config;
pub mod engine;
pub mod error;
pub mod key;
pub mod midi;
pub mod progression;
pub mod selector;
pub mod theory;
pub mod validate;
pub mod voicing;

pub use engine::{Chorale, GenerationRequest, generate};
pub use error::{ChoraleError, Result};
