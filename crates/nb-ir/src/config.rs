//! Song-wide constants, rhythm settings, and scale tables.

/// Parts per beat. All note times are integer counts of parts.
pub const PARTS_PER_BEAT: i32 = 24;

/// Semitones per octave.
pub const PITCHES_PER_OCTAVE: i32 = 12;

/// Highest pitch in a melodic channel.
pub const MAX_PITCH: i32 = 84;

/// Number of rows in a noise channel.
pub const DRUM_COUNT: i32 = 12;

/// Number of modulation lanes in a mod channel. Lane pitch `p` addresses
/// modulator slot `MOD_COUNT - 1 - p`.
pub const MOD_COUNT: i32 = 6;

/// Pin size cap for melodic and noise notes.
pub const NOTE_SIZE_MAX: i32 = 6;

/// Maximum number of pitches in one note's chord.
pub const MAX_CHORD_SIZE: usize = 4;

/// Beat subdivision setting for a song.
///
/// Determines the minimum division notes snap to while editing: one
/// rhythm step, `PARTS_PER_BEAT / steps_per_beat` parts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rhythm {
    /// 3 steps per beat (triplets).
    Triplets,
    /// 4 steps per beat.
    Standard,
    /// 6 steps per beat.
    Sixths,
    /// 8 steps per beat.
    Eighths,
    /// 12 steps per beat.
    Twelfths,
    /// 24 steps per beat: every part is a valid step.
    Freehand,
}

impl Rhythm {
    pub const fn steps_per_beat(self) -> i32 {
        match self {
            Rhythm::Triplets => 3,
            Rhythm::Standard => 4,
            Rhythm::Sixths => 6,
            Rhythm::Eighths => 8,
            Rhythm::Twelfths => 12,
            Rhythm::Freehand => 24,
        }
    }

    /// Smallest time step notes snap to, in parts.
    pub const fn min_division(self) -> i32 {
        PARTS_PER_BEAT / self.steps_per_beat()
    }
}

/// A scale as a flag per semitone within the octave. The tonic (index 0)
/// is always flagged.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Scale {
    pub name: &'static str,
    pub flags: [bool; PITCHES_PER_OCTAVE as usize],
}

const T: bool = true;
const F: bool = false;

impl Scale {
    pub const FREE: Scale = Scale {
        name: "free",
        flags: [T, T, T, T, T, T, T, T, T, T, T, T],
    };
    pub const MAJOR: Scale = Scale {
        name: "major",
        flags: [T, F, T, F, T, T, F, T, F, T, F, T],
    };
    pub const MINOR: Scale = Scale {
        name: "minor",
        flags: [T, F, T, T, F, T, F, T, T, F, T, F],
    };
    pub const DORIAN: Scale = Scale {
        name: "dorian",
        flags: [T, F, T, T, F, T, F, T, F, T, T, F],
    };
    pub const MAJOR_PENTATONIC: Scale = Scale {
        name: "major pentatonic",
        flags: [T, F, T, F, T, F, F, T, F, T, F, F],
    };
    pub const MINOR_PENTATONIC: Scale = Scale {
        name: "minor pentatonic",
        flags: [T, F, F, T, F, T, F, T, F, F, T, F],
    };

    /// Whether a pitch (any octave, may be negative) is in the scale.
    pub fn contains(&self, pitch: i32) -> bool {
        self.flags[pitch.rem_euclid(PITCHES_PER_OCTAVE) as usize]
    }

    /// Number of flagged degrees per octave.
    pub fn degree_count(&self) -> i32 {
        self.flags.iter().filter(|&&f| f).count() as i32
    }
}

/// All built-in scales.
pub const SCALES: &[Scale] = &[
    Scale::FREE,
    Scale::MAJOR,
    Scale::MINOR,
    Scale::DORIAN,
    Scale::MAJOR_PENTATONIC,
    Scale::MINOR_PENTATONIC,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_division_divides_beat() {
        for rhythm in [
            Rhythm::Triplets,
            Rhythm::Standard,
            Rhythm::Sixths,
            Rhythm::Eighths,
            Rhythm::Twelfths,
            Rhythm::Freehand,
        ] {
            assert_eq!(rhythm.min_division() * rhythm.steps_per_beat(), PARTS_PER_BEAT);
        }
    }

    #[test]
    fn scale_contains_wraps_octaves() {
        assert!(Scale::MAJOR.contains(0));
        assert!(Scale::MAJOR.contains(12));
        assert!(Scale::MAJOR.contains(-12));
        assert!(!Scale::MAJOR.contains(1));
        assert!(!Scale::MAJOR.contains(13));
    }

    #[test]
    fn every_scale_flags_the_tonic() {
        for scale in SCALES {
            assert!(scale.flags[0], "{} is missing its tonic", scale.name);
        }
    }

    #[test]
    fn major_has_seven_degrees() {
        assert_eq!(Scale::MAJOR.degree_count(), 7);
        assert_eq!(Scale::FREE.degree_count(), 12);
        assert_eq!(Scale::MAJOR_PENTATONIC.degree_count(), 5);
    }
}
