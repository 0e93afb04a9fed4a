use super::pitch::Pitch;

pub const PRIORITY_ESSENTIAL: u8 = 10;
pub const PRIORITY_COMMON: u8 = 7;
pub const PRIORITY_EXTENDED: u8 = 4;
pub const PRIORITY_RARE: u8 = 1;

/// Assigns a download priority to a pitch; higher is fetched sooner.
pub trait PriorityPolicy: Send + Sync {
    fn priority(&self, pitch: &Pitch) -> u8;
}

impl<F> PriorityPolicy for F
where
    F: Fn(&Pitch) -> u8 + Send + Sync,
{
    fn priority(&self, pitch: &Pitch) -> u8 {
        self(pitch)
    }
}

/// Ranks pitches by how close they sit to middle C.
///
/// | range   | priority |
/// |---------|----------|
/// | C4..=C5 | 10       |
/// | C3..=B5 | 7        |
/// | C2..=C7 | 4        |
/// | other   | 1        |
#[derive(Debug, Clone, Copy, Default)]
pub struct NoteProximityPolicy;

impl PriorityPolicy for NoteProximityPolicy {
    fn priority(&self, pitch: &Pitch) -> u8 {
        match pitch.midi() {
            60..=72 => PRIORITY_ESSENTIAL,
            48..=83 => PRIORITY_COMMON,
            36..=96 => PRIORITY_EXTENDED,
            _ => PRIORITY_RARE,
        }
    }
}

/// Puts every asset in a single band.
#[derive(Debug, Clone, Copy)]
pub struct UniformPolicy(pub u8);

impl PriorityPolicy for UniformPolicy {
    fn priority(&self, _pitch: &Pitch) -> u8 {
        self.0
    }
}
