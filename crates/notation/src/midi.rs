//! MIDI parsing and rendering.
//!
//! Parsing flattens every track's note-on events into one tick-ordered
//! stream of elements; simultaneous onsets form a chord. Rendering turns a
//! token sequence back into a single-track SMF, one token every half
//! quarter note.
//!
//! Uses the `midly` crate for both directions.

use midly::{
    num::{u15, u24, u28, u4, u7},
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind,
};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

use crate::elements::{parse_pitch, MusicalElement};
use crate::error::{NotationError, Result};

/// Ticks per quarter note in rendered output.
const TICKS_PER_QUARTER: u16 = 480;

/// Time units per token; one unit is a quarter note.
const OFFSET_PER_TOKEN: f64 = 0.5;

/// Every rendered note or chord sounds for one quarter note.
const NOTE_TICKS: u32 = TICKS_PER_QUARTER as u32;

/// Parse one MIDI file into its element stream.
pub fn parse_midi_file(path: &Path) -> Result<Vec<MusicalElement>> {
    let bytes = std::fs::read(path)?;
    parse_midi(&bytes)
}

/// Parse raw SMF bytes into an ordered element stream.
pub fn parse_midi(bytes: &[u8]) -> Result<Vec<MusicalElement>> {
    let smf = Smf::parse(bytes)?;

    let ticks_per_quarter = match smf.header.timing {
        Timing::Metrical(tpq) => tpq.as_int() as u32,
        Timing::Timecode(..) => TICKS_PER_QUARTER as u32,
    };
    // A whole note of silence between onsets reads as a rest.
    let rest_gap = ticks_per_quarter * 4;

    let mut onsets: Vec<(u32, u8)> = Vec::new();
    for track in &smf.tracks {
        let mut tick: u32 = 0;
        for event in track {
            tick += event.delta.as_int();
            if let TrackEventKind::Midi {
                message: MidiMessage::NoteOn { key, vel },
                ..
            } = event.kind
            {
                if vel.as_int() > 0 {
                    onsets.push((tick, key.as_int()));
                }
            }
        }
    }
    onsets.sort_unstable();

    let mut elements = Vec::new();
    let mut prev_tick: Option<u32> = None;
    let mut i = 0;
    while i < onsets.len() {
        let tick = onsets[i].0;
        let mut keys: Vec<u8> = Vec::new();
        while i < onsets.len() && onsets[i].0 == tick {
            keys.push(onsets[i].1);
            i += 1;
        }
        keys.dedup();

        if let Some(prev) = prev_tick {
            if tick - prev >= rest_gap {
                elements.push(MusicalElement::Rest);
            }
        }
        if keys.len() == 1 {
            elements.push(MusicalElement::Note { pitch: keys[0] });
        } else {
            elements.push(MusicalElement::Chord { pitches: keys });
        }
        prev_tick = Some(tick);
    }

    Ok(elements)
}

/// Parse every `.mid`/`.midi` file under a folder, recursively, in sorted
/// path order. Files that fail to parse are skipped, as a corpus often
/// carries the odd corrupt download.
pub fn parse_midi_folder(dir: &Path) -> Result<Vec<MusicalElement>> {
    let mut paths = Vec::new();
    collect_midi_paths(dir, &mut paths)?;
    paths.sort();

    let parsed: Vec<Result<Vec<MusicalElement>>> =
        paths.par_iter().map(|path| parse_midi_file(path)).collect();

    let mut all = Vec::new();
    for (path, result) in paths.iter().zip(parsed) {
        match result {
            Ok(mut elements) => all.append(&mut elements),
            Err(e) => println!("Could not process file {:?}: {}", path, e),
        }
    }
    Ok(all)
}

fn collect_midi_paths(dir: &Path, paths: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_midi_paths(&path, paths)?;
        } else if matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("mid") | Some("midi")
        ) {
            paths.push(path);
        }
    }
    Ok(())
}

/// Render a generated token sequence to SMF bytes.
pub fn render_tokens(tokens: &[String]) -> Result<Vec<u8>> {
    let smf = tokens_to_smf(tokens)?;
    let mut buf = Vec::new();
    smf.write_std(&mut buf)?;
    Ok(buf)
}

/// Render a generated token sequence to a file.
pub fn write_midi(tokens: &[String], path: &Path) -> Result<()> {
    let bytes = render_tokens(tokens)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

/// MIDI keys a token plays. Chord tokens are `.`-joined pitch classes (a
/// bare digit string is a one-note chord), voiced around middle C; anything
/// else is a pitch name.
fn token_keys(token: &str) -> Result<Vec<u8>> {
    if token.contains('.') || token.chars().all(|c| c.is_ascii_digit()) {
        token
            .split('.')
            .map(|part| {
                part.parse::<u8>()
                    .map(|class| 60 + class % 12)
                    .map_err(|_| NotationError::BadPitch(token.to_string()))
            })
            .collect()
    } else {
        parse_pitch(token)
            .map(|key| vec![key])
            .ok_or_else(|| NotationError::BadPitch(token.to_string()))
    }
}

fn tokens_to_smf(tokens: &[String]) -> Result<Smf<'static>> {
    let mut smf = Smf::new(Header::new(
        Format::SingleTrack,
        Timing::Metrical(u15::new(TICKS_PER_QUARTER)),
    ));

    let mut track: Track<'static> = Vec::new();
    // 120 bpm, acoustic grand on channel 0
    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(500_000))),
    });
    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Midi {
            channel: u4::new(0),
            message: MidiMessage::ProgramChange { program: u7::new(0) },
        },
    });

    let step = (OFFSET_PER_TOKEN * TICKS_PER_QUARTER as f64) as u32;

    // Absolute-tick events; offs sort before ons at the same tick.
    let mut events: Vec<(u32, bool, u8)> = Vec::new();
    for (index, token) in tokens.iter().enumerate() {
        let on_tick = index as u32 * step;
        for key in token_keys(token)? {
            events.push((on_tick, true, key));
            events.push((on_tick + NOTE_TICKS, false, key));
        }
    }
    events.sort_unstable();

    let mut last_tick = 0;
    for (tick, is_on, key) in events {
        let message = if is_on {
            MidiMessage::NoteOn {
                key: u7::new(key),
                vel: u7::new(90),
            }
        } else {
            MidiMessage::NoteOff {
                key: u7::new(key),
                vel: u7::new(0),
            }
        };
        track.push(TrackEvent {
            delta: u28::new(tick - last_tick),
            kind: TrackEventKind::Midi {
                channel: u4::new(0),
                message,
            },
        });
        last_tick = tick;
    }

    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });
    smf.tracks.push(track);

    Ok(smf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    fn note_on_ticks(bytes: &[u8]) -> Vec<(u32, u8)> {
        let smf = Smf::parse(bytes).unwrap();
        let mut onsets = Vec::new();
        for track in &smf.tracks {
            let mut tick = 0u32;
            for event in track {
                tick += event.delta.as_int();
                if let TrackEventKind::Midi {
                    message: MidiMessage::NoteOn { key, vel },
                    ..
                } = event.kind
                {
                    if vel.as_int() > 0 {
                        onsets.push((tick, key.as_int()));
                    }
                }
            }
        }
        onsets
    }

    #[test]
    fn test_token_k_starts_at_half_quarter_times_k() {
        let bytes = render_tokens(&stream(&["C4", "E4", "0.4.7"])).unwrap();
        let onsets = note_on_ticks(&bytes);
        // 0.5 units per token at 480 ticks/quarter = 240 ticks per token
        assert_eq!(
            onsets,
            vec![(0, 60), (240, 64), (480, 60), (480, 64), (480, 67)]
        );
    }

    #[test]
    fn test_rendered_notes_parse_back() {
        let bytes = render_tokens(&stream(&["C4", "D4", "F#3"])).unwrap();
        let elements = parse_midi(&bytes).unwrap();
        assert_eq!(
            elements,
            vec![
                MusicalElement::Note { pitch: 60 },
                MusicalElement::Note { pitch: 62 },
                MusicalElement::Note { pitch: 54 },
            ]
        );
    }

    #[test]
    fn test_token_keys() {
        assert_eq!(token_keys("C4").unwrap(), vec![60]);
        assert_eq!(token_keys("4.7.11").unwrap(), vec![64, 67, 71]);
        assert_eq!(token_keys("7").unwrap(), vec![67]);
        assert!(token_keys("notapitch").is_err());
    }

    #[test]
    fn test_simultaneous_onsets_parse_as_chord() {
        let bytes = render_tokens(&stream(&["0.4.7", "C4"])).unwrap();
        let elements = parse_midi(&bytes).unwrap();
        assert_eq!(
            elements,
            vec![
                MusicalElement::Chord {
                    pitches: vec![60, 64, 67],
                },
                MusicalElement::Note { pitch: 60 },
            ]
        );
    }
}
