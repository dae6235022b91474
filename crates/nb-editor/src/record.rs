//! Live automation recording into mod patterns.
//!
//! Whenever a tracked parameter changes while the transport plays (or a
//! slider is held), the recorder finds the modulation lane wired to that
//! parameter (allocating one if nothing matches) and writes the value
//! into the lane's note pins at a coarse time quantum, sanitizing the
//! surrounding window so the captured curve stays clean.

use nb_ir::{
    ChannelKind, ModParam, ModScope, ModSlot, Note, NoteId, NotePin, Pattern,
    MOD_COUNT, PARTS_PER_BEAT,
};

use crate::coords::Modifiers;
use crate::doc::{ChangeKind, Document};

/// Decouples the engine from UI widgets. The host maps each slider to a
/// binding: the committed *base* value only moves on deliberate edits,
/// while the *preview* value follows the live drag and the recorded
/// modulation. The recorder never touches the base.
#[derive(Clone, Copy, Debug)]
pub struct ParameterBinding {
    param: ModParam,
    base: i32,
    preview: i32,
}

impl ParameterBinding {
    pub fn new(param: ModParam, value: i32) -> Self {
        Self { param, base: value, preview: value }
    }

    pub fn param(&self) -> ModParam {
        self.param
    }

    pub fn base_value(&self) -> i32 {
        self.base
    }

    /// Deliberate edit of the underlying parameter.
    pub fn set_base(&mut self, value: i32) {
        self.base = value;
        self.preview = value;
    }

    pub fn preview_value(&self) -> i32 {
        self.preview
    }

    /// Live slider movement.
    pub fn set_preview(&mut self, value: i32) {
        self.preview = value;
    }

    /// Slider released: the preview falls back to the base value.
    pub fn restore_base(&mut self) {
        self.preview = self.base;
    }
}

#[derive(Clone, Copy)]
struct HeldValue {
    param: ModParam,
    raw: i32,
}

struct Target {
    channel: usize,
    slot: usize,
}

/// Captures live parameter changes into mod-channel patterns.
pub struct ModRecorder {
    held: Option<HeldValue>,
}

impl ModRecorder {
    pub fn new() -> Self {
        Self { held: None }
    }

    /// End the current continuous recording session (slider released,
    /// transport stopped).
    pub fn finish(&mut self) {
        self.held = None;
    }

    /// Record the binding's live value at the playhead. Returns whether
    /// any pattern was created or re-targeted (the host should refresh
    /// pattern-level UI when so).
    pub fn apply_live_value(
        &mut self,
        doc: &mut Document,
        binding: &mut ParameterBinding,
        mods: Modifiers,
    ) -> bool {
        let param = binding.param();
        let raw = (binding.preview_value() - param.real_offset()).clamp(0, param.max_raw());
        binding.set_preview(raw + param.real_offset());

        // Holding the slider at one value keeps the session continuous:
        // the trailing window is flattened instead of re-sampled.
        let continuous = self
            .held
            .map_or(false, |held| held.param == param && held.raw == raw);
        self.held = Some(HeldValue { param, raw });

        let quantum = (PARTS_PER_BEAT / doc.song.rhythm.steps_per_beat()).max(4);
        let bar = doc.playhead_bar();
        let real_part = doc.playhead_part();
        let total_parts = doc.song.total_parts();
        // Round up so the synth has time to catch the update, but down
        // to 0 within half a quantum of the bar start so the very first
        // sample is not skipped.
        let current_part = if real_part < quantum / 2 {
            0
        } else {
            (real_part + quantum - 1) / quantum * quantum
        };

        let edited_channel = doc.channel;
        let edited_instrument = doc.instrument;
        let mut changed_patterns = false;

        doc.record_with(ChangeKind::ModRecording, true, |doc| {
            let mut targets: Vec<Target> = Vec::new();

            // Match existing slots across every mod channel's bar.
            for channel in 0..doc.song.channels.len() {
                if !doc.song.is_mod(channel) {
                    continue;
                }
                match doc.song.pattern(channel, bar) {
                    Some(pattern) => {
                        let instrument = pattern.instrument;
                        let slot = doc.song.channels[channel].instruments[instrument]
                            .matching_slot(param, edited_channel, edited_instrument);
                        if let Some(slot) = slot {
                            targets.push(Target { channel, slot });
                        }
                    }
                    None => {
                        // Wired in some instrument, but no pattern this
                        // bar yet: create one pointed at that instrument.
                        let found = doc.song.channels[channel]
                            .instruments
                            .iter()
                            .enumerate()
                            .find_map(|(index, instrument)| {
                                instrument
                                    .matching_slot(param, edited_channel, edited_instrument)
                                    .map(|slot| (index, slot))
                            });
                        if let Some((instrument, slot)) = found {
                            let pattern = doc.song.ensure_pattern(channel, bar);
                            pattern.instrument = instrument;
                            targets.push(Target { channel, slot });
                            changed_patterns = true;
                        }
                    }
                }
            }

            // Nothing wired anywhere: claim the first free slot.
            if targets.is_empty() {
                if let Some(target) = allocate_slot(
                    doc,
                    param,
                    edited_channel,
                    edited_instrument,
                    bar,
                    mods,
                    &mut changed_patterns,
                ) {
                    targets.push(target);
                }
            }

            for target in &targets {
                write_sample(
                    doc,
                    target.channel,
                    bar,
                    target.slot,
                    raw,
                    current_part,
                    quantum,
                    continuous,
                    total_parts,
                );
            }
        });

        changed_patterns
    }
}

impl Default for ModRecorder {
    fn default() -> Self {
        Self::new()
    }
}

/// Wire the changed parameter into the first free modulator slot of any
/// mod instrument, creating a pattern in the current bar when needed.
fn allocate_slot(
    doc: &mut Document,
    param: ModParam,
    edited_channel: usize,
    edited_instrument: usize,
    bar: usize,
    mods: Modifiers,
    changed_patterns: &mut bool,
) -> Option<Target> {
    for channel in 0..doc.song.channels.len() {
        if !doc.song.is_mod(channel) {
            continue;
        }
        // With a pattern present only its instrument makes sense as a
        // home for the new slot; otherwise any instrument will do.
        let instrument = match doc.song.pattern(channel, bar) {
            Some(pattern) => {
                let index = pattern.instrument;
                doc.song.channels[channel].instruments[index]
                    .first_free_slot()
                    .map(|_| index)
            }
            None => {
                let found = doc.song.channels[channel]
                    .instruments
                    .iter()
                    .position(|instrument| instrument.first_free_slot().is_some());
                if let Some(index) = found {
                    let pattern = doc.song.ensure_pattern(channel, bar);
                    pattern.instrument = index;
                    *changed_patterns = true;
                }
                found
            }
        };
        let Some(index) = instrument else {
            continue;
        };
        let instrument_count = doc.song.channels[edited_channel].instruments.len();
        let target_instrument = &mut doc.song.channels[channel].instruments[index];
        let Some(slot) = target_instrument.first_free_slot() else {
            continue;
        };
        let scope = if param.for_song() {
            ModScope::All
        } else if instrument_count > 1 {
            // Control+shift pins the slot to the edited instrument;
            // otherwise "active" gives the most flexibility.
            if mods.control && mods.shift {
                ModScope::Instrument(edited_instrument)
            } else {
                ModScope::Active
            }
        } else {
            ModScope::Instrument(0)
        };
        target_instrument.mod_slots[slot] = ModSlot {
            param: Some(param),
            channel: (!param.for_song()).then_some(edited_channel),
            scope,
        };
        *changed_patterns = true;
        return Some(Target { channel, slot });
    }
    None
}

/// Write one sample into a lane's pin sequence.
#[allow(clippy::too_many_arguments)]
fn write_sample(
    doc: &mut Document,
    channel: usize,
    bar: usize,
    slot: usize,
    value: i32,
    current_part: i32,
    quantum: i32,
    continuous: bool,
    total_parts: i32,
) {
    let lane = MOD_COUNT - 1 - slot as i32;
    // The distance past which a prior note is left alone and a new one
    // started. Longer at large quanta, where the chance of missing the
    // end of a note is higher.
    let new_note_dist = if quantum >= 6 { 18 } else { 12 };
    let window_start = (current_part - quantum).max(0);
    let end_part = (current_part + quantum).min(total_parts);

    // Latest pin at or before this part on this lane, and the note
    // ending most recently before it. A note starting exactly at the
    // latest part outranks another note's end there.
    let mut latest_part = -1;
    let mut latest_note: Option<NoteId> = None;
    let mut latest_pin_index = 0;
    let mut prev_note_part = -1;
    let mut prev_note: Option<NoteId> = None;
    {
        let Some(pattern) = doc.song.pattern(channel, bar) else {
            return;
        };
        for note in &pattern.notes {
            if note.pitches[0] != lane {
                continue;
            }
            if note.start <= current_part {
                for (pin_index, pin) in note.pins.iter().enumerate() {
                    let time = note.start + pin.time;
                    if time <= current_part && (time > latest_part || note.start == latest_part) {
                        latest_part = time;
                        latest_pin_index = pin_index;
                        latest_note = Some(note.id);
                    }
                }
            }
            if note.end <= current_part && note.end > prev_note_part {
                prev_note_part = note.end;
                prev_note = Some(note.id);
            }
        }
    }

    // Facts the decision tree needs, read before sanitization can
    // reshuffle or delete pins.
    let (latest_note_end, latest_pin_size, latest_has_later_pins) = match latest_note {
        Some(id) => {
            let note = doc
                .song
                .pattern(channel, bar)
                .and_then(|pattern| pattern.note(id))
                .expect("note found by the scan above");
            (
                note.end,
                note.pins[latest_pin_index].size,
                latest_pin_index + 1 < note.pins.len(),
            )
        }
        None => (0, 0, false),
    };

    let pattern = doc
        .song
        .pattern_mut(channel, bar)
        .expect("mod pattern resolved for this target");

    if latest_note.is_none() || current_part - latest_note_end >= new_note_dist {
        // (a) Nothing recent: start a fresh flat note at the value.
        if current_part == end_part {
            return;
        }
        sanitize_interval(pattern, current_part, end_part, lane);
        pattern.push_note(Note::new(lane, current_part, end_part, value));
    } else if latest_part == current_part {
        // (b) A pin sits exactly here: overwrite it in place, and stitch
        // the previous note's seam so the curve has no discontinuity.
        sanitize_interval(pattern, window_start, current_part, lane);
        sanitize_interval(pattern, current_part, end_part, lane);
        let latest_id = latest_note.expect("case (b) implies a latest note");
        if let Some(note) = pattern.note_mut(latest_id) {
            let start = note.start;
            if let Some(pin) = note.pins.iter_mut().find(|pin| start + pin.time == current_part) {
                pin.size = value;
            }
            if continuous {
                flatten_window(note, window_start, current_part, value);
            }
        }
        if let Some(prev_id) = prev_note {
            if prev_note_part == current_part {
                if let Some(note) = pattern.note_mut(prev_id) {
                    let last = note.pins.len() - 1;
                    note.pins[last].size = value;
                    if continuous {
                        flatten_window(note, window_start, i32::MAX, value);
                    }
                }
            } else if prev_note_part == window_start {
                // Bridge the gap from the previous note to this one.
                let latest_starts_here =
                    pattern.note(latest_id).map(|note| note.start) == Some(current_part);
                if latest_starts_here {
                    if let Some(note) = pattern.note_mut(prev_id) {
                        let time = current_part - note.start;
                        note.pins.push(NotePin::new(time, value, 0));
                        note.end = current_part;
                    }
                }
            }
        }
    } else if current_part - latest_part < 8 && latest_pin_size == value {
        // (c) A close flat reading: suppress the redundant pin, prefer
        // smooth interpolation.
        if continuous {
            if let Some(note) = pattern.note_mut(latest_note.expect("case (c) implies a latest note")) {
                flatten_window(note, window_start, current_part, value);
            }
        }
    } else {
        // (d) Insert within the note, or append past its last pin.
        sanitize_interval(pattern, window_start, current_part, lane);
        sanitize_interval(pattern, current_part, end_part, lane);
        let latest_id = latest_note.expect("case (d) implies a latest note");
        if let Some(note) = pattern.note_mut(latest_id) {
            let start = note.start;
            if latest_has_later_pins {
                // Sanitization can snap a pin onto the insertion point;
                // reuse it instead of splicing a duplicate.
                let mut insert_at = note.pins.len();
                let mut reused = false;
                for (pin_index, pin) in note.pins.iter_mut().enumerate() {
                    if start + pin.time == current_part {
                        pin.size = value;
                        reused = true;
                        break;
                    }
                    if start + pin.time > current_part {
                        insert_at = pin_index;
                        break;
                    }
                }
                if !reused {
                    note.pins.insert(insert_at, NotePin::new(current_part - start, value, 0));
                }
            } else {
                note.pins.push(NotePin::new(current_part - start, value, 0));
                note.end = current_part;
            }
            if continuous {
                flatten_window(note, window_start, current_part, value);
            }
        }
    }

    // Every write must leave the pattern structurally sound; a violation
    // here is a bug, not a recoverable state.
    pattern.sort_by_start_and_pitch();
    if let Err(err) = pattern.validate(ChannelKind::Mod) {
        panic!("mod recording corrupted the pattern: {}", err);
    }
}

/// Set every pin whose absolute time falls in `[from, to]` to `value`.
fn flatten_window(note: &mut Note, from: i32, to: i32, value: i32) {
    let start = note.start;
    for pin in &mut note.pins {
        let time = start + pin.time;
        if time >= from && time <= to {
            pin.size = value;
        }
    }
}

/// Remove same-lane pins strictly inside `[start_part, end_part]`,
/// clipping boundary-crossing pins to the window edges instead of
/// deleting them, and dropping notes that sanitization leaves with
/// fewer than 2 pins.
fn sanitize_interval(pattern: &mut Pattern, start_part: i32, end_part: i32, lane: i32) {
    if start_part >= end_part {
        return;
    }
    let mut index = 0;
    while index < pattern.notes.len() {
        let note = &mut pattern.notes[index];
        if note.pitches[0] != lane || note.start >= end_part || note.end <= start_part {
            index += 1;
            continue;
        }

        // The note spans the whole interval: drop strictly-interior pins
        // and keep the boundary ones.
        if note.start <= start_part && note.end >= end_part {
            let start = note.start;
            note.pins
                .retain(|pin| !(start + pin.time > start_part && start + pin.time < end_part));
            return;
        }

        let mut first_interior: Option<usize> = None;
        let mut interior = 0;
        let mut could_intersect_start = false;
        let mut intersects_end = false;
        for (pin_index, pin) in note.pins.iter().enumerate() {
            let time = note.start + pin.time;
            if time >= start_part && time <= end_part {
                if first_interior.is_none() {
                    first_interior = Some(pin_index);
                }
                interior += 1;
            } else {
                if interior == 0 {
                    could_intersect_start = true;
                }
                if interior > 0 {
                    intersects_end = true;
                }
            }
        }
        let mut first = first_interior.unwrap_or(0);
        if could_intersect_start && interior > 0 {
            note.pins[first].time = start_part - note.start;
            first += 1;
            interior -= 1;
        }
        if intersects_end && interior > 0 {
            note.pins[first + interior - 1].time = end_part - note.start;
            interior -= 1;
        }
        if interior > 0 {
            note.pins.drain(first..first + interior);
        }

        if note.pins.len() < 2 {
            pattern.remove_note(index);
            continue;
        }

        let adjust = note.pins[0].time;
        note.start += adjust;
        for pin in &mut note.pins {
            pin.time -= adjust;
        }
        note.end = note.start + note.pins[note.pins.len() - 1].time;
        if note.end <= note.start {
            pattern.remove_note(index);
            continue;
        }
        index += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nb_ir::{Rhythm, Song};

    const NONE: Modifiers = Modifiers { shift: false, control: false };

    fn mod_song(rhythm: Rhythm) -> Document {
        let mut song = Song::new(1, 0, 1, 1);
        song.beats_per_bar = 2;
        song.rhythm = rhythm;
        Document::new(song)
    }

    fn wire(doc: &mut Document, slot: usize, param: ModParam) {
        doc.song.channels[1].instruments[0].mod_slots[slot] = ModSlot {
            param: Some(param),
            channel: (!param.for_song()).then_some(0),
            scope: ModScope::All,
        };
    }

    fn set_playhead_part(doc: &mut Document, part: i32) {
        doc.playhead = part as f64 / doc.song.total_parts() as f64 + 1e-9;
    }

    #[test]
    fn fresh_note_spans_one_quantum() {
        // Triplets: quantum 8, new-note distance 18. Raw part 38 rounds
        // up to 40; the fresh note spans [40, 48] flat at the value.
        let mut doc = mod_song(Rhythm::Triplets);
        wire(&mut doc, 0, ModParam::MixVolume);
        set_playhead_part(&mut doc, 38);
        let mut binding = ParameterBinding::new(ModParam::MixVolume, 0);
        let mut recorder = ModRecorder::new();
        let changed = recorder.apply_live_value(&mut doc, &mut binding, NONE);
        assert!(changed, "a pattern was created for the wired slot");
        let pattern = doc.song.pattern(1, 0).expect("pattern created");
        assert_eq!(pattern.notes.len(), 1);
        let note = &pattern.notes[0];
        assert_eq!(note.pitches[0], MOD_COUNT - 1);
        assert_eq!((note.start, note.end), (40, 48));
        // Real value 0 maps to raw 25 for mix volume.
        assert!(note.pins.iter().all(|pin| pin.size == 25));
        assert!(pattern.validate(ChannelKind::Mod).is_ok());
    }

    #[test]
    fn repeated_value_at_same_part_is_idempotent() {
        let mut doc = mod_song(Rhythm::Triplets);
        wire(&mut doc, 0, ModParam::MixVolume);
        set_playhead_part(&mut doc, 38);
        let mut binding = ParameterBinding::new(ModParam::MixVolume, 0);
        let mut recorder = ModRecorder::new();
        recorder.apply_live_value(&mut doc, &mut binding, NONE);
        let before = doc.song.pattern(1, 0).unwrap().clone();
        recorder.apply_live_value(&mut doc, &mut binding, NONE);
        assert_eq!(doc.song.pattern(1, 0).unwrap(), &before);
        // Both calls coalesce into at most one undo step.
        assert!(doc.undo_step());
        assert!(doc.song.pattern(1, 0).map_or(true, |p| p.is_empty()));
        assert!(!doc.can_undo());
    }

    #[test]
    fn near_first_sample_rounds_down_to_zero() {
        let mut doc = mod_song(Rhythm::Triplets);
        wire(&mut doc, 0, ModParam::MixVolume);
        set_playhead_part(&mut doc, 3); // under half a quantum
        let mut binding = ParameterBinding::new(ModParam::MixVolume, 10);
        ModRecorder::new().apply_live_value(&mut doc, &mut binding, NONE);
        let note = &doc.song.pattern(1, 0).unwrap().notes[0];
        assert_eq!(note.start, 0);
    }

    #[test]
    fn later_samples_extend_the_note() {
        // Twelfths: quantum 4.
        let mut doc = mod_song(Rhythm::Twelfths);
        wire(&mut doc, 0, ModParam::Pan);
        let mut recorder = ModRecorder::new();
        let mut binding = ParameterBinding::new(ModParam::Pan, 30);
        set_playhead_part(&mut doc, 10); // rounds to 12
        recorder.apply_live_value(&mut doc, &mut binding, NONE);
        binding.set_preview(80);
        set_playhead_part(&mut doc, 22); // rounds to 24
        recorder.apply_live_value(&mut doc, &mut binding, NONE);
        let pattern = doc.song.pattern(1, 0).unwrap();
        assert_eq!(pattern.notes.len(), 1);
        let note = &pattern.notes[0];
        assert_eq!((note.start, note.end), (12, 24));
        assert_eq!(note.pins.len(), 3);
        assert_eq!(note.pins.last().unwrap().size, 80);
        assert!(pattern.validate(ChannelKind::Mod).is_ok());
    }

    #[test]
    fn distant_sample_starts_a_new_note() {
        let mut doc = mod_song(Rhythm::Twelfths);
        wire(&mut doc, 0, ModParam::Pan);
        let mut recorder = ModRecorder::new();
        let mut binding = ParameterBinding::new(ModParam::Pan, 30);
        set_playhead_part(&mut doc, 10); // note [12, 16]
        recorder.apply_live_value(&mut doc, &mut binding, NONE);
        binding.set_preview(90);
        set_playhead_part(&mut doc, 34); // 36 - 16 >= 12: fresh note
        recorder.apply_live_value(&mut doc, &mut binding, NONE);
        let pattern = doc.song.pattern(1, 0).unwrap();
        assert_eq!(pattern.notes.len(), 2);
        assert_eq!((pattern.notes[1].start, pattern.notes[1].end), (36, 40));
        assert!(pattern.notes[1].pins.iter().all(|pin| pin.size == 90));
    }

    #[test]
    fn unwired_parameter_claims_a_free_slot() {
        let mut doc = mod_song(Rhythm::Twelfths);
        set_playhead_part(&mut doc, 10);
        let mut binding = ParameterBinding::new(ModParam::Reverb, 12);
        let changed = ModRecorder::new().apply_live_value(&mut doc, &mut binding, NONE);
        assert!(changed);
        let slot = doc.song.channels[1].instruments[0].mod_slots[0];
        assert_eq!(slot.param, Some(ModParam::Reverb));
        assert_eq!(slot.channel, Some(0));
        assert_eq!(slot.scope, ModScope::Instrument(0));
        // Lane for slot 0 is the top pitch.
        let note = &doc.song.pattern(1, 0).unwrap().notes[0];
        assert_eq!(note.pitches[0], MOD_COUNT - 1);
    }

    #[test]
    fn song_wide_parameter_gets_no_channel() {
        let mut doc = mod_song(Rhythm::Twelfths);
        set_playhead_part(&mut doc, 10);
        let mut binding = ParameterBinding::new(ModParam::Tempo, 150);
        ModRecorder::new().apply_live_value(&mut doc, &mut binding, NONE);
        let slot = doc.song.channels[1].instruments[0].mod_slots[0];
        assert_eq!(slot.param, Some(ModParam::Tempo));
        assert_eq!(slot.channel, None);
        // Real 150 at offset 30 is raw 120.
        let note = &doc.song.pattern(1, 0).unwrap().notes[0];
        assert_eq!(note.pins[0].size, 120);
    }

    #[test]
    fn close_flat_reading_is_suppressed() {
        let mut doc = mod_song(Rhythm::Twelfths);
        wire(&mut doc, 0, ModParam::Pan);
        let mut recorder = ModRecorder::new();
        let mut binding = ParameterBinding::new(ModParam::Pan, 30);
        set_playhead_part(&mut doc, 10); // note [12, 16]
        recorder.apply_live_value(&mut doc, &mut binding, NONE);
        let pins_before = doc.song.pattern(1, 0).unwrap().notes[0].pins.len();
        set_playhead_part(&mut doc, 18); // rounds to 20, 20-16 < 8, same value
        recorder.apply_live_value(&mut doc, &mut binding, NONE);
        let pins_after = doc.song.pattern(1, 0).unwrap().notes[0].pins.len();
        assert_eq!(pins_before, pins_after);
    }

    #[test]
    fn sanitize_clips_boundary_pins_and_drops_interior() {
        let mut pattern = Pattern::new(0);
        let mut note = Note::new(3, 0, 20, 10);
        note.pins = vec![
            NotePin::new(0, 10, 0),
            NotePin::new(6, 20, 0),
            NotePin::new(10, 30, 0),
            NotePin::new(14, 40, 0),
            NotePin::new(20, 50, 0),
        ];
        pattern.push_note(note);
        // The note spans the window: strictly-interior pins vanish.
        sanitize_interval(&mut pattern, 4, 16, 3);
        let note = &pattern.notes[0];
        assert_eq!(note.pins.len(), 2);
        assert_eq!(note.pins[0].time, 0);
        assert_eq!(note.pins[1].time, 20);
    }

    #[test]
    fn sanitize_deletes_notes_reduced_below_two_pins() {
        let mut pattern = Pattern::new(0);
        pattern.push_note(Note::new(3, 6, 10, 10));
        // Window covers the note entirely (not spanned by it): gone.
        sanitize_interval(&mut pattern, 4, 16, 3);
        assert!(pattern.is_empty());
        // Other lanes are untouched.
        pattern.push_note(Note::new(2, 6, 10, 10));
        sanitize_interval(&mut pattern, 4, 16, 3);
        assert_eq!(pattern.notes.len(), 1);
    }

    #[test]
    fn binding_preview_is_clamped_into_range() {
        let mut doc = mod_song(Rhythm::Twelfths);
        wire(&mut doc, 0, ModParam::Pan);
        set_playhead_part(&mut doc, 10);
        let mut binding = ParameterBinding::new(ModParam::Pan, 300);
        ModRecorder::new().apply_live_value(&mut doc, &mut binding, NONE);
        assert_eq!(binding.preview_value(), 100);
        assert_eq!(binding.base_value(), 300);
        binding.restore_base();
        assert_eq!(binding.preview_value(), 300);
    }
}
