use std::fmt;
use std::str::FromStr;

/// Natural note letter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Letter {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl Letter {
    fn semitone(self) -> i32 {
        match self {
            Letter::C => 0,
            Letter::D => 2,
            Letter::E => 4,
            Letter::F => 5,
            Letter::G => 7,
            Letter::A => 9,
            Letter::B => 11,
        }
    }

    fn as_char(self) -> char {
        match self {
            Letter::C => 'C',
            Letter::D => 'D',
            Letter::E => 'E',
            Letter::F => 'F',
            Letter::G => 'G',
            Letter::A => 'A',
            Letter::B => 'B',
        }
    }

    fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'C' => Some(Letter::C),
            'D' => Some(Letter::D),
            'E' => Some(Letter::E),
            'F' => Some(Letter::F),
            'G' => Some(Letter::G),
            'A' => Some(Letter::A),
            'B' => Some(Letter::B),
            _ => None,
        }
    }
}

/// Chromatic scale spelled with sharps, starting at C
const CHROMATIC: [(Letter, bool); 12] = [
    (Letter::C, false),
    (Letter::C, true),
    (Letter::D, false),
    (Letter::D, true),
    (Letter::E, false),
    (Letter::F, false),
    (Letter::F, true),
    (Letter::G, false),
    (Letter::G, true),
    (Letter::A, false),
    (Letter::A, true),
    (Letter::B, false),
];

/// MIDI number of A0, the lowest piano key
const PIANO_LOWEST_MIDI: i32 = 21;
/// MIDI number of C8, the highest piano key
const PIANO_HIGHEST_MIDI: i32 = 108;

/// A pitch in scientific notation, e.g. `C#4`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pitch {
    pub letter: Letter,
    pub sharp: bool,
    pub octave: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid pitch '{0}'")]
pub struct ParsePitchError(pub String);

impl Pitch {
    pub fn new(letter: Letter, sharp: bool, octave: u8) -> Self {
        Self {
            letter,
            sharp,
            octave,
        }
    }

    /// MIDI note number (C4 = 60)
    pub fn midi(&self) -> i32 {
        (i32::from(self.octave) + 1) * 12 + self.letter.semitone() + i32::from(self.sharp)
    }

    pub fn from_midi(midi: i32) -> Option<Self> {
        if !(12..=131).contains(&midi) {
            return None;
        }
        let (letter, sharp) = CHROMATIC[(midi % 12) as usize];
        Some(Self::new(letter, sharp, (midi / 12 - 1) as u8))
    }

    /// Index on an 88-key piano (A0 = 0, C8 = 87)
    pub fn piano_index(&self) -> Option<u8> {
        let midi = self.midi();
        if (PIANO_LOWEST_MIDI..=PIANO_HIGHEST_MIDI).contains(&midi) {
            Some((midi - PIANO_LOWEST_MIDI) as u8)
        } else {
            None
        }
    }

    /// All 88 piano keys from A0 to C8, lowest first
    pub fn piano_keys() -> impl Iterator<Item = Pitch> {
        (PIANO_LOWEST_MIDI..=PIANO_HIGHEST_MIDI).filter_map(Pitch::from_midi)
    }

    /// Lowercase key as used for audio samples, e.g. `c#4`
    pub fn key(&self) -> String {
        self.to_string().to_ascii_lowercase()
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter.as_char())?;
        if self.sharp {
            f.write_str("#")?;
        }
        write!(f, "{}", self.octave)
    }
}

impl FromStr for Pitch {
    type Err = ParsePitchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParsePitchError(s.to_string());
        let mut chars = s.chars();
        let letter = chars.next().and_then(Letter::from_char).ok_or_else(err)?;
        let rest = chars.as_str();
        let (sharp, octave) = match rest.strip_prefix('#') {
            Some(octave) => (true, octave),
            None => (false, rest),
        };
        if octave.len() != 1 {
            return Err(err());
        }
        let octave = octave.parse::<u8>().map_err(|_| err())?;
        if sharp && matches!(letter, Letter::E | Letter::B) {
            return Err(err());
        }
        Ok(Pitch::new(letter, sharp, octave))
    }
}
