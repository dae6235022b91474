//! Core data model for the notebox pattern editor.
//!
//! This crate defines the song, pattern, note, and modulation types that
//! the editing engine operates on, together with the note mutation
//! operations gestures are built from. The editor crate consumes these
//! types; no rendering or audio concern lives here.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod config;
mod interp;
mod modulator;
mod note;
mod ops;
mod pattern;
mod song;

pub use config::{
    Rhythm, Scale, DRUM_COUNT, MAX_CHORD_SIZE, MAX_PITCH, MOD_COUNT, NOTE_SIZE_MAX,
    PARTS_PER_BEAT, PITCHES_PER_OCTAVE, SCALES,
};
pub use interp::{drag_counts, grab_arc, lerp, round_to_part};
pub use modulator::{ModParam, ModScope, ModSlot};
pub use note::{Note, NoteError, NoteId, NotePin};
pub use ops::{
    change_pin_time, drag_selected_notes, normalize_pins, pitch_bend, size_bend,
    transpose_pitch, truncate_note, truncate_range,
};
pub use pattern::{Pattern, PatternError};
pub use song::{Channel, ChannelKind, Instrument, Song};
