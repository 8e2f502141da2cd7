// MIDI output for generated chorales.
//
// Converts a Chorale into a Standard MIDI File (SMF Format 1) for playback.
// Track 0 carries tempo and time signature; each voice gets its own track
// and channel with a choir patch. A pitch held across the beats of one
// measure sounds as one sustained note, re-attacked at each barline so
// repeated chords stay audible. Rests are silence.
//
// Uses the `midly` crate for MIDI writing.

use crate::assemble::NoteEvent;
use crate::engine::Chorale;
use crate::error::{ChoraleError, Result};
use crate::voicing::Voice;
use midly::{
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind,
    num::{u4, u7, u15, u24, u28},
};
use std::path::Path;

/// Ticks per quarter note in MIDI output.
const TICKS_PER_QUARTER: u32 = 480;

/// General MIDI program 53, "Choir Aahs" (zero-based 52).
const CHOIR_PROGRAM: u8 = 52;

const NOTE_VELOCITY: u8 = 80;

/// Convert a chorale to MIDI and write it to `path`.
pub fn write_midi(chorale: &Chorale, path: &Path, tempo_bpm: u16) -> Result<()> {
    let smf = chorale_to_smf(chorale, tempo_bpm);
    let mut buf = Vec::new();
    smf.write(&mut buf)
        .map_err(|e| ChoraleError::Midi(e.to_string()))?;
    std::fs::write(path, &buf)?;
    Ok(())
}

fn note_off(channel: u4, pitch: u8, delta: u32) -> TrackEvent<'static> {
    TrackEvent {
        delta: u28::new(delta),
        kind: TrackEventKind::Midi {
            channel,
            message: MidiMessage::NoteOff {
                key: u7::new(pitch),
                vel: u7::new(0),
            },
        },
    }
}

fn note_on(channel: u4, pitch: u8, delta: u32) -> TrackEvent<'static> {
    TrackEvent {
        delta: u28::new(delta),
        kind: TrackEventKind::Midi {
            channel,
            message: MidiMessage::NoteOn {
                key: u7::new(pitch),
                vel: u7::new(NOTE_VELOCITY),
            },
        },
    }
}

fn chorale_to_smf(chorale: &Chorale, tempo_bpm: u16) -> Smf<'static> {
    let mut smf = Smf::new(Header::new(
        Format::Parallel,
        Timing::Metrical(u15::new(TICKS_PER_QUARTER as u16)),
    ));

    let (num, den) = chorale.meter.beat_duration().quarters();
    let ticks_per_beat = TICKS_PER_QUARTER * num / den;
    let beats_per_measure = chorale.meter.beats.max(1) as usize;

    // Track 0: tempo and meter
    let tempo_microseconds = 60_000_000 / u32::from(tempo_bpm.max(1));
    let denominator_pow2 = chorale.meter.beat_value.trailing_zeros() as u8;
    smf.tracks.push(vec![
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(tempo_microseconds))),
        },
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::TimeSignature(
                chorale.meter.beats.min(255) as u8,
                denominator_pow2,
                24,
                8,
            )),
        },
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
        },
    ]);

    for voice in Voice::ALL {
        let channel = u4::new(voice.index() as u8);
        let mut track: Track<'static> = vec![
            TrackEvent {
                delta: u28::new(0),
                kind: TrackEventKind::Meta(MetaMessage::TrackName(
                    track_name(voice).as_bytes(),
                )),
            },
            TrackEvent {
                delta: u28::new(0),
                kind: TrackEventKind::Midi {
                    channel,
                    message: MidiMessage::ProgramChange {
                        program: u7::new(CHOIR_PROGRAM),
                    },
                },
            },
        ];

        let events: &[NoteEvent] = chorale.voices.voice(voice);
        let mut last_event_tick: u32 = 0;
        let mut sounding: Option<u8> = None;

        for (beat, event) in events.iter().enumerate() {
            let beat_tick = beat as u32 * ticks_per_beat;
            let barline = beat % beats_per_measure == 0;

            // Held pitch within a measure: nothing to do.
            if !barline && event.pitch() == sounding {
                continue;
            }
            if let Some(pitch) = sounding.take() {
                track.push(note_off(channel, pitch, beat_tick - last_event_tick));
                last_event_tick = beat_tick;
            }
            if let Some(pitch) = event.pitch() {
                track.push(note_on(channel, pitch, beat_tick - last_event_tick));
                last_event_tick = beat_tick;
                sounding = Some(pitch);
            }
        }

        if let Some(pitch) = sounding {
            let end_tick = events.len() as u32 * ticks_per_beat;
            track.push(note_off(channel, pitch, end_tick - last_event_tick));
        }

        track.push(TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
        });
        smf.tracks.push(track);
    }

    smf
}

fn track_name(voice: Voice) -> &'static str {
    match voice {
        Voice::Soprano => "Soprano",
        Voice::Alto => "Alto",
        Voice::Tenor => "Tenor",
        Voice::Bass => "Bass",
    }
}
