//! Note and pin types.
//!
//! A `Note` owns a chord of pitches and an envelope of `NotePin`s. Pins
//! are keyframes: strictly increasing time offsets from the note start,
//! with the first pin at offset 0 and the last at offset `end - start`.

use alloc::vec::Vec;
use arrayvec::ArrayVec;
use core::fmt;

use crate::config::MAX_CHORD_SIZE;
use crate::interp::lerp;

/// A keyframe on a note's envelope.
///
/// `size` is volume for melodic/noise notes and the raw automation value
/// for mod notes. `interval` is the pitch-bend offset from the note's
/// base pitch, always 0 in mod channels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NotePin {
    /// Offset from the note start, in parts.
    pub time: i32,
    /// Amplitude or automation value, `0..=cap`.
    pub size: i32,
    /// Pitch-bend offset relative to the note's base pitch.
    pub interval: i32,
}

impl NotePin {
    pub const fn new(time: i32, size: i32, interval: i32) -> Self {
        Self { time, size, interval }
    }
}

/// Stable identity for a note, minted when the note is inserted into a
/// pattern. Drag state refers to notes by id so a target that disappears
/// mid-gesture (out-of-band undo, pattern swap) is detected instead of
/// silently mutating the wrong note.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NoteId(u64);

impl NoteId {
    /// Id of a note not yet inserted into any pattern.
    pub const UNASSIGNED: NoteId = NoteId(0);

    pub(crate) const fn from_raw(raw: u64) -> Self {
        NoteId(raw)
    }

    pub(crate) const fn raw(self) -> u64 {
        self.0
    }
}

/// Invariant violations detected by [`Note::validate`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoteError {
    EmptyChord,
    ZeroLength,
    TooFewPins,
    FirstPinNotAtZero,
    LastPinMismatch,
    PinsNotIncreasing,
}

impl fmt::Display for NoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoteError::EmptyChord => write!(f, "note has no pitches"),
            NoteError::ZeroLength => write!(f, "note start is not before its end"),
            NoteError::TooFewPins => write!(f, "note has fewer than 2 pins"),
            NoteError::FirstPinNotAtZero => write!(f, "first pin is not at offset 0"),
            NoteError::LastPinMismatch => write!(f, "last pin offset does not equal note length"),
            NoteError::PinsNotIncreasing => write!(f, "pin times are not strictly increasing"),
        }
    }
}

/// A note: an ordered chord of pitches over a pin envelope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Note {
    pub id: NoteId,
    /// Chord pitches, ascending, at least one.
    pub pitches: ArrayVec<i32, MAX_CHORD_SIZE>,
    /// Start time in parts, within the pattern's bar.
    pub start: i32,
    /// End time in parts, exclusive. Always greater than `start`.
    pub end: i32,
    pub pins: Vec<NotePin>,
    /// The note's notional start precedes time 0, carried over from the
    /// previous bar.
    pub continues_last_pattern: bool,
}

impl Note {
    /// A single-pitch note with a flat two-pin envelope at `size`.
    pub fn new(pitch: i32, start: i32, end: i32, size: i32) -> Self {
        let mut pitches = ArrayVec::new();
        pitches.push(pitch);
        Self {
            id: NoteId::UNASSIGNED,
            pitches,
            start,
            end,
            pins: alloc::vec![NotePin::new(0, size, 0), NotePin::new(end - start, size, 0)],
            continues_last_pattern: false,
        }
    }

    /// Note length in parts.
    pub fn length(&self) -> i32 {
        self.end - self.start
    }

    /// Pitch-bend interval at an offset from the note start, linearly
    /// interpolated between the bracketing pins. Offsets outside the
    /// envelope clamp to the edge pins.
    pub fn interval_at(&self, offset: f32) -> f32 {
        self.envelope_at(offset, |pin| pin.interval as f32)
    }

    /// Size at an offset from the note start, linearly interpolated.
    pub fn size_at(&self, offset: f32) -> f32 {
        self.envelope_at(offset, |pin| pin.size as f32)
    }

    fn envelope_at(&self, offset: f32, value: impl Fn(&NotePin) -> f32) -> f32 {
        let first = &self.pins[0];
        if offset <= first.time as f32 {
            return value(first);
        }
        for window in self.pins.windows(2) {
            let (prev, next) = (&window[0], &window[1]);
            if offset <= next.time as f32 {
                let span = (next.time - prev.time) as f32;
                let t = if span > 0.0 { (offset - prev.time as f32) / span } else { 0.0 };
                return lerp(value(prev), value(next), t);
            }
        }
        value(self.pins.last().unwrap())
    }

    /// Insert a pitch keeping the chord sorted. Returns false when the
    /// pitch is already present or the chord is full.
    pub fn add_pitch(&mut self, pitch: i32) -> bool {
        if self.pitches.is_full() || self.pitches.contains(&pitch) {
            return false;
        }
        let index = self.pitches.iter().position(|&p| p > pitch).unwrap_or(self.pitches.len());
        self.pitches.insert(index, pitch);
        true
    }

    /// Remove a pitch from the chord. Returns false when absent.
    pub fn remove_pitch(&mut self, pitch: i32) -> bool {
        match self.pitches.iter().position(|&p| p == pitch) {
            Some(index) => {
                self.pitches.remove(index);
                true
            }
            None => false,
        }
    }

    /// Check every note invariant.
    pub fn validate(&self) -> Result<(), NoteError> {
        if self.pitches.is_empty() {
            return Err(NoteError::EmptyChord);
        }
        if self.start >= self.end {
            return Err(NoteError::ZeroLength);
        }
        if self.pins.len() < 2 {
            return Err(NoteError::TooFewPins);
        }
        if self.pins[0].time != 0 {
            return Err(NoteError::FirstPinNotAtZero);
        }
        if self.pins[self.pins.len() - 1].time != self.length() {
            return Err(NoteError::LastPinMismatch);
        }
        for window in self.pins.windows(2) {
            if window[1].time <= window[0].time {
                return Err(NoteError::PinsNotIncreasing);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_note_is_valid() {
        let note = Note::new(40, 6, 12, 3);
        assert_eq!(note.length(), 6);
        assert_eq!(note.pins.len(), 2);
        assert_eq!(note.pins[1], NotePin::new(6, 3, 0));
        assert!(note.validate().is_ok());
    }

    #[test]
    fn interval_interpolates_between_pins() {
        let mut note = Note::new(40, 0, 8, 6);
        note.pins[1].interval = 4;
        assert_eq!(note.interval_at(0.0), 0.0);
        assert_eq!(note.interval_at(4.0), 2.0);
        assert_eq!(note.interval_at(8.0), 4.0);
    }

    #[test]
    fn envelope_clamps_outside_pins() {
        let mut note = Note::new(40, 0, 8, 6);
        note.pins[0].size = 2;
        assert_eq!(note.size_at(-1.0), 2.0);
        assert_eq!(note.size_at(99.0), 6.0);
    }

    #[test]
    fn add_pitch_keeps_chord_sorted() {
        let mut note = Note::new(40, 0, 8, 6);
        assert!(note.add_pitch(36));
        assert!(note.add_pitch(44));
        assert_eq!(note.pitches.as_slice(), &[36, 40, 44]);
        assert!(!note.add_pitch(40));
    }

    #[test]
    fn add_pitch_refuses_full_chord() {
        let mut note = Note::new(40, 0, 8, 6);
        note.add_pitch(41);
        note.add_pitch(42);
        note.add_pitch(43);
        assert!(!note.add_pitch(44));
    }

    #[test]
    fn validate_catches_broken_envelopes() {
        let mut note = Note::new(40, 0, 8, 6);
        note.pins[1].time = 7;
        assert_eq!(note.validate(), Err(NoteError::LastPinMismatch));

        let mut note = Note::new(40, 0, 8, 6);
        note.pins.insert(1, NotePin::new(0, 6, 0));
        assert_eq!(note.validate(), Err(NoteError::PinsNotIncreasing));

        let mut note = Note::new(40, 0, 8, 6);
        note.pins.remove(0);
        note.pins.insert(0, NotePin::new(1, 6, 0));
        assert_eq!(note.validate(), Err(NoteError::FirstPinNotAtZero));

        let mut note = Note::new(40, 4, 4, 6);
        note.end = 4;
        assert_eq!(note.validate(), Err(NoteError::ZeroLength));
    }
}
