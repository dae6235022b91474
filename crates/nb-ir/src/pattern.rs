//! Patterns: the note sequence for one channel at one bar.

use alloc::vec::Vec;
use core::fmt;

use crate::config::MOD_COUNT;
use crate::note::{Note, NoteError, NoteId};
use crate::song::ChannelKind;

/// Invariant violations detected by [`Pattern::validate`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PatternError {
    Note(NoteError),
    /// Two notes of the same pitch class overlap in time.
    Overlap { pitch: i32 },
    /// Notes are not in `(start, pitch)` order.
    Unsorted,
}

impl fmt::Display for PatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternError::Note(err) => write!(f, "invalid note: {}", err),
            PatternError::Overlap { pitch } => write!(f, "overlapping notes at pitch {}", pitch),
            PatternError::Unsorted => write!(f, "notes out of (start, pitch) order"),
        }
    }
}

impl From<NoteError> for PatternError {
    fn from(err: NoteError) -> Self {
        PatternError::Note(err)
    }
}

/// Notes of one channel at one bar, ordered by start time. Mod patterns
/// are additionally ordered by `(start, pitch)` because automation
/// consumers scan sequentially.
#[derive(Clone, Debug, Eq)]
pub struct Pattern {
    pub notes: Vec<Note>,
    /// Index of the instrument this pattern plays.
    pub instrument: usize,
    next_note_id: u64,
}

impl PartialEq for Pattern {
    /// Identity-counter state is bookkeeping, not content.
    fn eq(&self, other: &Self) -> bool {
        self.notes == other.notes && self.instrument == other.instrument
    }
}

impl Pattern {
    pub fn new(instrument: usize) -> Self {
        Self { notes: Vec::new(), instrument, next_note_id: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Insert a note at `index`, minting an id if it has none.
    pub fn insert_note(&mut self, index: usize, mut note: Note) -> NoteId {
        if note.id == NoteId::UNASSIGNED {
            self.next_note_id += 1;
            note.id = NoteId::from_raw(self.next_note_id);
        } else {
            // Re-inserting a note keeps its id; keep the mint counter ahead.
            self.next_note_id = self.next_note_id.max(note.id.raw());
        }
        let id = note.id;
        self.notes.insert(index, note);
        id
    }

    /// Append a note, minting an id if it has none.
    pub fn push_note(&mut self, note: Note) -> NoteId {
        let index = self.notes.len();
        self.insert_note(index, note)
    }

    pub fn remove_note(&mut self, index: usize) -> Note {
        self.notes.remove(index)
    }

    pub fn index_of(&self, id: NoteId) -> Option<usize> {
        self.notes.iter().position(|note| note.id == id)
    }

    pub fn note(&self, id: NoteId) -> Option<&Note> {
        self.notes.iter().find(|note| note.id == id)
    }

    pub fn note_mut(&mut self, id: NoteId) -> Option<&mut Note> {
        self.notes.iter_mut().find(|note| note.id == id)
    }

    /// Restore `(start, pitch)` order after a gesture that may reorder
    /// notes (mod-channel drags, recording).
    pub fn sort_by_start_and_pitch(&mut self) {
        self.notes
            .sort_by(|a, b| a.start.cmp(&b.start).then(a.pitches[0].cmp(&b.pitches[0])));
    }

    /// Check every pattern invariant for the given channel kind.
    ///
    /// Melodic and noise channels allow no overlap at all (a note is the
    /// whole vertical slice); mod channels allow one note per lane at a
    /// time.
    pub fn validate(&self, kind: ChannelKind) -> Result<(), PatternError> {
        for note in &self.notes {
            note.validate()?;
        }
        match kind {
            ChannelKind::Mod => {
                let mut last_ends = [i32::MIN; MOD_COUNT as usize];
                let mut prev_key = (i32::MIN, i32::MIN);
                for note in &self.notes {
                    let pitch = note.pitches[0];
                    let key = (note.start, pitch);
                    if key < prev_key {
                        return Err(PatternError::Unsorted);
                    }
                    prev_key = key;
                    let lane = pitch.rem_euclid(MOD_COUNT) as usize;
                    if note.start < last_ends[lane] {
                        return Err(PatternError::Overlap { pitch });
                    }
                    last_ends[lane] = note.end;
                }
            }
            ChannelKind::Pitch | ChannelKind::Noise => {
                let mut last_end = i32::MIN;
                let mut last_start = i32::MIN;
                for note in &self.notes {
                    if note.start < last_start {
                        return Err(PatternError::Unsorted);
                    }
                    last_start = note.start;
                    if note.start < last_end {
                        return Err(PatternError::Overlap { pitch: note.pitches[0] });
                    }
                    last_end = note.end;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_mints_unique_ids() {
        let mut pattern = Pattern::new(0);
        let a = pattern.push_note(Note::new(40, 0, 8, 6));
        let b = pattern.push_note(Note::new(42, 8, 16, 6));
        assert_ne!(a, b);
        assert_ne!(a, NoteId::UNASSIGNED);
        assert_eq!(pattern.index_of(b), Some(1));
    }

    #[test]
    fn reinsert_keeps_id() {
        let mut pattern = Pattern::new(0);
        let id = pattern.push_note(Note::new(40, 0, 8, 6));
        let note = pattern.remove_note(0);
        pattern.insert_note(0, note);
        assert_eq!(pattern.index_of(id), Some(0));
        // A fresh note after re-insertion must not collide.
        let fresh = pattern.push_note(Note::new(42, 8, 16, 6));
        assert_ne!(fresh, id);
    }

    #[test]
    fn validate_rejects_melodic_overlap() {
        let mut pattern = Pattern::new(0);
        pattern.push_note(Note::new(40, 0, 8, 6));
        pattern.push_note(Note::new(52, 4, 12, 6));
        assert_eq!(
            pattern.validate(ChannelKind::Pitch),
            Err(PatternError::Overlap { pitch: 52 })
        );
    }

    #[test]
    fn validate_allows_mod_lanes_to_coexist() {
        let mut pattern = Pattern::new(0);
        pattern.push_note(Note::new(2, 0, 8, 6));
        pattern.push_note(Note::new(5, 0, 8, 6));
        assert!(pattern.validate(ChannelKind::Mod).is_ok());
    }

    #[test]
    fn validate_rejects_same_lane_overlap() {
        let mut pattern = Pattern::new(0);
        pattern.push_note(Note::new(3, 0, 8, 6));
        pattern.push_note(Note::new(3, 4, 12, 6));
        assert_eq!(
            pattern.validate(ChannelKind::Mod),
            Err(PatternError::Overlap { pitch: 3 })
        );
    }

    #[test]
    fn validate_requires_mod_order() {
        let mut pattern = Pattern::new(0);
        pattern.push_note(Note::new(3, 8, 12, 6));
        pattern.push_note(Note::new(3, 0, 4, 6));
        assert_eq!(pattern.validate(ChannelKind::Mod), Err(PatternError::Unsorted));
        pattern.sort_by_start_and_pitch();
        assert!(pattern.validate(ChannelKind::Mod).is_ok());
    }
}
