// Measure assembly: voicings -> per-beat note events.
//
// A chorale is stored as four parallel sequences of `NoteEvent`, one per
// voice, each indexed by beat. Every measure contributes exactly
// `meter.beats` events to every voice, so the sequences always stay the same
// length. A voice with no pitch rests for the whole measure.

use crate::key::{Duration, Meter};
use crate::voicing::{Voice, Voicing};
use serde::{Deserialize, Serialize};

/// One beat of one voice. `pitch` is `None` exactly when `is_rest` is set;
/// the constructors are the only way to build one outside this module, and
/// deserialization rejects events that break the rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawNoteEvent")]
pub struct NoteEvent {
    pitch: Option<u8>,
    duration: Duration,
    is_rest: bool,
}

#[derive(Deserialize)]
struct RawNoteEvent {
    pitch: Option<u8>,
    duration: Duration,
    is_rest: bool,
}

impl TryFrom<RawNoteEvent> for NoteEvent {
    type Error = String;

    fn try_from(raw: RawNoteEvent) -> Result<Self, Self::Error> {
        match (raw.pitch, raw.is_rest) {
            (Some(p), false) if p <= 127 => Ok(NoteEvent::note(p, raw.duration)),
            (None, true) => Ok(NoteEvent::rest(raw.duration)),
            (Some(p), false) => Err(format!("pitch {p} is outside the MIDI range")),
            (pitch, is_rest) => Err(format!(
                "note event with pitch {pitch:?} cannot have is_rest = {is_rest}"
            )),
        }
    }
}

impl NoteEvent {
    pub fn note(pitch: u8, duration: Duration) -> Self {
        NoteEvent {
            pitch: Some(pitch),
            duration,
            is_rest: false,
        }
    }

    pub fn rest(duration: Duration) -> Self {
        NoteEvent {
            pitch: None,
            duration,
            is_rest: true,
        }
    }

    /// A note if `pitch` is set, a rest otherwise.
    pub fn from_pitch(pitch: Option<u8>, duration: Duration) -> Self {
        match pitch {
            Some(p) => NoteEvent::note(p, duration),
            None => NoteEvent::rest(duration),
        }
    }

    pub fn pitch(&self) -> Option<u8> {
        self.pitch
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn is_rest(&self) -> bool {
        self.is_rest
    }
}

/// Four beat-indexed event sequences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoicesData {
    pub soprano: Vec<NoteEvent>,
    pub alto: Vec<NoteEvent>,
    pub tenor: Vec<NoteEvent>,
    pub bass: Vec<NoteEvent>,
}

impl VoicesData {
    pub fn voice(&self, voice: Voice) -> &[NoteEvent] {
        match voice {
            Voice::Soprano => &self.soprano,
            Voice::Alto => &self.alto,
            Voice::Tenor => &self.tenor,
            Voice::Bass => &self.bass,
        }
    }

    fn voice_mut(&mut self, voice: Voice) -> &mut Vec<NoteEvent> {
        match voice {
            Voice::Soprano => &mut self.soprano,
            Voice::Alto => &mut self.alto,
            Voice::Tenor => &mut self.tenor,
            Voice::Bass => &mut self.bass,
        }
    }

    /// Number of beats; the same for every voice.
    pub fn len(&self) -> usize {
        self.soprano.len()
    }

    pub fn is_empty(&self) -> bool {
        self.soprano.is_empty()
    }

    /// The pitches sounding at `beat`, in SATB order.
    pub fn beat(&self, beat: usize) -> Option<Voicing> {
        let mut voicing = Voicing::silent();
        for voice in Voice::ALL {
            let event = self.voice(voice).get(beat)?;
            voicing.set(voice, event.pitch());
        }
        Some(voicing)
    }
}

/// Append one measure of `voicing` to `voices`, repeating each pitch on every
/// beat. Returns the voicing carried into the next measure, which is the
/// input with every resting voice cleared.
pub fn assemble_measure(voicing: &Voicing, meter: &Meter, voices: &mut VoicesData) -> Voicing {
    let duration = meter.beat_duration();
    for voice in Voice::ALL {
        let event = NoteEvent::from_pitch(voicing.get(voice), duration);
        let events = voices.voice_mut(voice);
        for _ in 0..meter.beats {
            events.push(event);
        }
    }
    *voicing
}

/// Append a full measure of rests on every voice. Returns the reset state.
pub fn rest_measure(meter: &Meter, voices: &mut VoicesData) -> Voicing {
    assemble_measure(&Voicing::silent(), meter, voices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measure_repeats_pitch_each_beat() {
        let meter = Meter::new(3, 4).unwrap();
        let voicing = Voicing {
            soprano: Some(72),
            alto: Some(64),
            tenor: Some(55),
            bass: Some(48),
        };
        let mut voices = VoicesData::default();
        let carried = assemble_measure(&voicing, &meter, &mut voices);
        assert_eq!(carried, voicing);
        assert_eq!(voices.len(), 3);
        for voice in Voice::ALL {
            assert_eq!(voices.voice(voice).len(), 3);
            assert!(voices
                .voice(voice)
                .iter()
                .all(|e| e.pitch() == voicing.get(voice) && e.duration() == Duration::Quarter));
        }
    }

    #[test]
    fn test_resting_voice_fills_with_rests() {
        let meter = Meter::new(2, 2).unwrap();
        let voicing = Voicing {
            soprano: Some(72),
            alto: None,
            tenor: Some(55),
            bass: Some(48),
        };
        let mut voices = VoicesData::default();
        let carried = assemble_measure(&voicing, &meter, &mut voices);
        assert_eq!(carried.alto, None);
        assert!(voices.alto.iter().all(|e| e.is_rest() && e.pitch().is_none()));
        assert!(voices.alto.iter().all(|e| e.duration() == Duration::Half));
        assert_eq!(voices.alto.len(), voices.bass.len());
    }

    #[test]
    fn test_rest_measure_resets_state() {
        let meter = Meter::new(4, 4).unwrap();
        let mut voices = VoicesData::default();
        let carried = rest_measure(&meter, &mut voices);
        assert!(carried.is_silent());
        assert_eq!(voices.len(), 4);
        assert!(Voice::ALL
            .iter()
            .all(|&v| voices.voice(v).iter().all(NoteEvent::is_rest)));
    }

    #[test]
    fn test_event_invariant_and_json_shape() {
        let note = NoteEvent::note(60, Duration::Eighth);
        assert!(!note.is_rest());
        let rest = NoteEvent::rest(Duration::Sixteenth);
        assert!(rest.is_rest() && rest.pitch().is_none());

        let json = serde_json::to_string(&note).unwrap();
        assert_eq!(json, r#"{"pitch":60,"duration":"8","is_rest":false}"#);
        let json = serde_json::to_string(&rest).unwrap();
        assert_eq!(json, r#"{"pitch":null,"duration":"16","is_rest":true}"#);
    }

    #[test]
    fn test_deserialize_rejects_inconsistent_events() {
        let ok: NoteEvent =
            serde_json::from_str(r#"{"pitch":60,"duration":"q","is_rest":false}"#).unwrap();
        assert_eq!(ok, NoteEvent::note(60, Duration::Quarter));
        let ok: NoteEvent =
            serde_json::from_str(r#"{"pitch":null,"duration":"h","is_rest":true}"#).unwrap();
        assert_eq!(ok, NoteEvent::rest(Duration::Half));

        for bad in [
            r#"{"pitch":60,"duration":"q","is_rest":true}"#,
            r#"{"pitch":null,"duration":"q","is_rest":false}"#,
            r#"{"pitch":200,"duration":"q","is_rest":false}"#,
        ] {
            assert!(serde_json::from_str::<NoteEvent>(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn test_beat_lookup() {
        let meter = Meter::new(2, 4).unwrap();
        let mut voices = VoicesData::default();
        let v = Voicing {
            soprano: Some(67),
            alto: Some(64),
            tenor: Some(60),
            bass: Some(48),
        };
        assemble_measure(&v, &meter, &mut voices);
        assert_eq!(voices.beat(1), Some(v));
        assert_eq!(voices.beat(2), None);
    }
}
