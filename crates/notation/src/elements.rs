//! Musical elements extracted from a corpus and their token encoding.
//!
//! A note becomes its pitch name (`C4`, `F#3`, `E-5`), a chord becomes the
//! normal order of its pitch classes joined with `.`, and rests carry no
//! token at all.

/// Pitch-class spellings, sharps for C/F/G, flats for E/B.
const PITCH_NAMES: [&str; 12] = [
    "C", "C#", "D", "E-", "E", "F", "F#", "G", "G#", "A", "B-", "B",
];

/// One element of the flattened corpus stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MusicalElement {
    Note { pitch: u8 },
    Chord { pitches: Vec<u8> },
    Rest,
}

impl MusicalElement {
    /// The token this element contributes to the stream, if any.
    pub fn token(&self) -> Option<String> {
        match self {
            MusicalElement::Note { pitch } => Some(pitch_name(*pitch)),
            MusicalElement::Chord { pitches } => {
                let classes: Vec<u8> = pitches.iter().map(|p| p % 12).collect();
                let ordered = normal_order(&classes);
                Some(
                    ordered
                        .iter()
                        .map(u8::to_string)
                        .collect::<Vec<_>>()
                        .join("."),
                )
            }
            MusicalElement::Rest => None,
        }
    }
}

/// The ordered token stream of a corpus. Rests are dropped.
pub fn extract_tokens(elements: &[MusicalElement]) -> Vec<String> {
    elements.iter().filter_map(MusicalElement::token).collect()
}

/// Pitch name of a MIDI key, octave numbered so that key 60 is C4.
pub fn pitch_name(key: u8) -> String {
    let octave = (key / 12) as i32 - 1;
    format!("{}{}", PITCH_NAMES[(key % 12) as usize], octave)
}

/// Parse a pitch name back to its MIDI key.
pub fn parse_pitch(name: &str) -> Option<u8> {
    let mut chars = name.chars();
    let mut class: i32 = match chars.next()? {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };

    let rest: String = chars.collect();
    let mut octave_start = 0;
    for c in rest.chars() {
        match c {
            '#' => class += 1,
            '-' => class -= 1,
            _ => break,
        }
        octave_start += 1;
    }

    let octave: i32 = rest[octave_start..].parse().ok()?;
    let key = (octave + 1) * 12 + class;
    u8::try_from(key).ok().filter(|&k| k <= 127)
}

/// Normal order of a set of pitch classes: the rotation of the sorted set
/// that is most compact, packed toward the left, lowest class on a full tie.
pub fn normal_order(pitch_classes: &[u8]) -> Vec<u8> {
    let mut classes: Vec<u8> = pitch_classes.iter().map(|p| p % 12).collect();
    classes.sort_unstable();
    classes.dedup();
    if classes.len() <= 1 {
        return classes;
    }

    let n = classes.len();
    let mut best: Option<(Vec<u8>, u8)> = None;
    for start in 0..n {
        // Intervals from the rotation's first class, compared outermost first.
        let first = classes[start];
        let mut key: Vec<u8> = (0..n)
            .map(|k| (12 + classes[(start + k) % n] - first) % 12)
            .collect();
        key.reverse();
        let candidate = (key, first);
        if best.as_ref().map_or(true, |b| candidate < *b) {
            best = Some(candidate);
        }
    }

    let (_, first) = best.unwrap_or((Vec::new(), classes[0]));
    let start = classes.iter().position(|&c| c == first).unwrap_or(0);
    (0..n).map(|k| classes[(start + k) % n]).collect()
}
