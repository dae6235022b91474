//! Note mutation operations that gestures are built from.
//!
//! Every operation leaves its note satisfying the pin invariants: pins
//! strictly increasing, first at offset 0, last at offset `end - start`.
//! Operations take absolute part times and re-anchor the note afterwards.

use alloc::vec::Vec;
use arrayvec::ArrayVec;

use crate::config::{Scale, MAX_CHORD_SIZE, NOTE_SIZE_MAX};
use crate::interp::round_to_part;
use crate::note::{Note, NoteId, NotePin};
use crate::pattern::Pattern;
use crate::song::ChannelKind;

/// Re-anchor a note after its pins were edited: merge pins that landed on
/// the same time (earlier wins), shift times so the first pin is at
/// offset 0, and fold the first pin's interval into the base pitches.
pub fn normalize_pins(note: &mut Note, max_pitch: i32) {
    note.pins.dedup_by(|a, b| a.time == b.time);
    let first_time = note.pins[0].time;
    let first_interval = note.pins[0].interval;
    if first_time != 0 {
        for pin in &mut note.pins {
            pin.time -= first_time;
        }
        note.start += first_time;
    }
    if first_interval != 0 {
        for pin in &mut note.pins {
            pin.interval -= first_interval;
        }
        for pitch in &mut note.pitches {
            *pitch = (*pitch + first_interval).clamp(0, max_pitch);
        }
    }
    note.end = note.start + note.pins[note.pins.len() - 1].time;
}

/// Truncate a note to the window `[new_start, new_end]`, interpolating
/// pin values at the cut edges.
pub fn truncate_note(note: &mut Note, new_start: i32, new_end: i32, max_pitch: i32) {
    let rel_start = new_start - note.start;
    let rel_end = new_end - note.start;
    let mut new_pins = Vec::with_capacity(note.pins.len());
    new_pins.push(NotePin::new(
        rel_start,
        round_to_part(note.size_at(rel_start as f32)),
        round_to_part(note.interval_at(rel_start as f32)),
    ));
    for pin in &note.pins {
        if pin.time > rel_start && pin.time < rel_end {
            new_pins.push(*pin);
        }
    }
    new_pins.push(NotePin::new(
        rel_end,
        round_to_part(note.size_at(rel_end as f32)),
        round_to_part(note.interval_at(rel_end as f32)),
    ));
    note.pins = new_pins;
    if rel_start > 0 {
        note.continues_last_pattern = false;
    }
    normalize_pins(note, max_pitch);
}

/// Clear the range `[start, end)` of notes colliding with a (possibly
/// hypothetical) note, truncating notes that straddle a boundary and
/// splitting notes that span the whole range.
///
/// `keep` exempts the note being edited. `pitch_filter` restricts the
/// collision domain to one lane (mod channels); melodic and noise
/// channels collide across all pitches.
pub fn truncate_range(
    pattern: &mut Pattern,
    start: i32,
    end: i32,
    keep: Option<NoteId>,
    pitch_filter: Option<i32>,
    max_pitch: i32,
) {
    if start >= end {
        return;
    }
    let mut i = 0;
    while i < pattern.notes.len() {
        let note = &pattern.notes[i];
        if keep == Some(note.id) {
            i += 1;
            continue;
        }
        if let Some(pitch) = pitch_filter {
            if note.pitches[0] != pitch {
                i += 1;
                continue;
            }
        }
        if note.end <= start {
            i += 1;
            continue;
        }
        if note.start >= end {
            // Notes are ordered by start; nothing further can overlap.
            break;
        }
        let (note_start, note_end) = (note.start, note.end);
        if note_start < start && note_end > end {
            let mut tail = pattern.notes[i].clone();
            tail.id = NoteId::UNASSIGNED;
            tail.continues_last_pattern = false;
            truncate_note(&mut tail, end, note_end, max_pitch);
            truncate_note(&mut pattern.notes[i], note_start, start, max_pitch);
            pattern.insert_note(i + 1, tail);
            i += 2;
        } else if note_start < start {
            truncate_note(&mut pattern.notes[i], note_start, start, max_pitch);
            i += 1;
        } else if note_end > end {
            truncate_note(&mut pattern.notes[i], end, note_end, max_pitch);
            i += 1;
        } else {
            pattern.remove_note(i);
        }
    }
}

/// Move one pin to `shifted_abs` (an absolute part time). Pins the drag
/// passed over are swallowed; the note is re-anchored so dragging an edge
/// pin widens or narrows the note.
pub fn change_pin_time(
    note: &mut Note,
    pin_index: usize,
    shifted_abs: i32,
    continues_last_pattern: bool,
    max_pitch: i32,
) {
    let shifted = shifted_abs - note.start;
    let original = note.pins[pin_index].time;
    let skip_start = original.min(shifted);
    let skip_end = original.max(shifted);
    let moved = note.pins[pin_index];
    let mut new_pins = Vec::with_capacity(note.pins.len());
    let mut placed = false;
    for pin in &note.pins {
        if pin.time < skip_start {
            new_pins.push(*pin);
        } else if pin.time > skip_end {
            if !placed {
                new_pins.push(NotePin::new(shifted, moved.size, moved.interval));
                placed = true;
            }
            new_pins.push(*pin);
        }
        // Pins within the skipped span are swallowed by the drag.
    }
    if !placed {
        new_pins.push(NotePin::new(shifted, moved.size, moved.interval));
    }
    debug_assert!(new_pins.len() >= 2);
    note.pins = new_pins;
    note.continues_last_pattern = continues_last_pattern;
    normalize_pins(note, max_pitch);
}

/// Set size (and pitch-bend interval) at one envelope position,
/// inserting a pin there if none exists. With `uniform` every pin's size
/// is set, flattening the whole envelope to `size`.
pub fn size_bend(
    note: &mut Note,
    bend_part: i32,
    size: i32,
    interval: i32,
    uniform: bool,
    max_pitch: i32,
) {
    let mut new_pins = Vec::with_capacity(note.pins.len() + 1);
    let mut placed = false;
    for pin in &note.pins {
        let pin_size = if uniform { size } else { pin.size };
        if pin.time < bend_part {
            new_pins.push(NotePin::new(pin.time, pin_size, pin.interval));
        } else if pin.time == bend_part {
            new_pins.push(NotePin::new(bend_part, size, interval));
            placed = true;
        } else {
            if !placed {
                new_pins.push(NotePin::new(bend_part, size, interval));
                placed = true;
            }
            new_pins.push(NotePin::new(pin.time, pin_size, pin.interval));
        }
    }
    if !placed {
        new_pins.push(NotePin::new(bend_part, size, interval));
    }
    note.pins = new_pins;
    normalize_pins(note, max_pitch);
}

/// Bend the pitch curve so that it reaches `bend_to` (an absolute pitch
/// for chord tone `pitch_index`) at `bend_end_abs`, replacing whatever
/// the curve did between the bend endpoints. Flat continuation past the
/// bend follows the new interval until the old curve moves again.
pub fn pitch_bend(
    note: &mut Note,
    bend_start_abs: i32,
    bend_end_abs: i32,
    bend_to: i32,
    pitch_index: usize,
    max_pitch: i32,
) {
    let bend_start = bend_start_abs - note.start;
    let bend_end = bend_end_abs - note.start;
    let bend_interval = bend_to - note.pitches[pitch_index];
    let forward = bend_end >= bend_start;
    // Comparisons flip with drag direction so a backwards bend walks the
    // pins from the far end.
    let le = |a: i32, b: i32| if forward { a <= b } else { a >= b };
    let lt = |a: i32, b: i32| if forward { a < b } else { a > b };

    let mut new_pins: Vec<NotePin> = Vec::with_capacity(note.pins.len() + 2);
    let mut set_start = false;
    let mut set_end = false;
    let mut prev_interval = 0;
    let mut prev_size = NOTE_SIZE_MAX;
    let mut persist = true;

    let ordered: Vec<&NotePin> = if forward {
        note.pins.iter().collect()
    } else {
        note.pins.iter().rev().collect()
    };
    for pin in ordered {
        loop {
            if !set_start {
                if le(pin.time, bend_start) {
                    prev_interval = pin.interval;
                    prev_size = pin.size;
                }
                if lt(pin.time, bend_start) {
                    new_pins.push(*pin);
                    break;
                }
                new_pins.push(NotePin::new(bend_start, prev_size, prev_interval));
                set_start = true;
            } else if !set_end {
                if le(pin.time, bend_end) {
                    prev_interval = pin.interval;
                    prev_size = pin.size;
                }
                if lt(pin.time, bend_end) {
                    break;
                }
                new_pins.push(NotePin::new(bend_end, prev_size, bend_interval));
                set_end = true;
            } else {
                if pin.time == bend_end {
                    break;
                }
                if pin.interval != prev_interval {
                    persist = false;
                }
                let interval = if persist { bend_interval } else { pin.interval };
                new_pins.push(NotePin::new(pin.time, pin.size, interval));
                break;
            }
        }
    }
    if !set_end {
        new_pins.push(NotePin::new(bend_end, prev_size, bend_interval));
    }
    if !forward {
        new_pins.reverse();
    }
    note.pins = new_pins;
    normalize_pins(note, max_pitch);
}

/// Move a pitch by `steps` scale degrees (melodic channels) or semitone
/// rows (noise and mod channels), clamped into `[0, max_pitch]`.
pub fn transpose_pitch(
    pitch: i32,
    steps: i32,
    scale: &Scale,
    kind: ChannelKind,
    max_pitch: i32,
) -> i32 {
    if kind != ChannelKind::Pitch {
        return (pitch + steps).clamp(0, max_pitch);
    }
    let mut current = pitch;
    if steps > 0 {
        for _ in 0..steps {
            let mut next = current + 1;
            while next <= max_pitch && !scale.contains(next) {
                next += 1;
            }
            if next > max_pitch {
                break;
            }
            current = next;
        }
    } else {
        for _ in 0..-steps {
            let mut next = current - 1;
            while next >= 0 && !scale.contains(next) {
                next -= 1;
            }
            if next < 0 {
                break;
            }
            current = next;
        }
    }
    current.clamp(0, max_pitch)
}

/// Move every note starting inside `[sel_start, sel_end)` by
/// `parts_offset` parts and `transpose` pitch steps, clearing whatever
/// the moved notes land on. Returns the shifted selection bounds.
pub fn drag_selected_notes(
    pattern: &mut Pattern,
    kind: ChannelKind,
    scale: &Scale,
    sel_start: i32,
    sel_end: i32,
    parts_offset: i32,
    transpose: i32,
    total_parts: i32,
    max_pitch: i32,
) -> (i32, i32) {
    let new_sel_start = (sel_start + parts_offset).clamp(0, total_parts);
    let new_sel_end = (sel_end + parts_offset).clamp(0, total_parts);

    let mut selected: Vec<Note> = Vec::new();
    let mut i = 0;
    while i < pattern.notes.len() {
        let note = &pattern.notes[i];
        if note.start >= sel_start && note.start < sel_end {
            selected.push(pattern.remove_note(i));
        } else {
            i += 1;
        }
    }

    for mut note in selected {
        // Pin times are note-relative; only the anchor moves.
        note.start += parts_offset;
        note.end += parts_offset;
        if note.end <= 0 || note.start >= total_parts {
            continue;
        }
        if note.start < 0 || note.end > total_parts {
            let (start, end) = (note.start.max(0), note.end.min(total_parts));
            truncate_note(&mut note, start, end, max_pitch);
        }
        if transpose != 0 {
            let mut moved = ArrayVec::<i32, MAX_CHORD_SIZE>::new();
            for &pitch in &note.pitches {
                let transposed = transpose_pitch(pitch, transpose, scale, kind, max_pitch);
                if !moved.contains(&transposed) {
                    moved.push(transposed);
                }
            }
            moved.sort_unstable();
            note.pitches = moved;
        }
        let pitch_filter = (kind == ChannelKind::Mod).then(|| note.pitches[0]);
        truncate_range(pattern, note.start, note.end, None, pitch_filter, max_pitch);
        let index = pattern
            .notes
            .iter()
            .position(|other| {
                (other.start, other.pitches[0]) > (note.start, note.pitches[0])
            })
            .unwrap_or(pattern.notes.len());
        pattern.insert_note(index, note);
    }
    (new_sel_start, new_sel_end)
}
