//! The interactive edit/drag state machine.
//!
//! `PatternEditor` owns the press → drag → release lifecycle. A press
//! opens a speculative overlay on the document and picks exactly one
//! gesture; every move while dragging rewinds the overlay and rebuilds
//! the gesture's edits against the committed baseline; release commits
//! the overlay as one undo step (or discards it). If the document's
//! current change stops matching the gesture's token (an out-of-band
//! undo, or the pattern swapped out from under the editor), the drag
//! aborts silently.

use nb_ir::{
    change_pin_time, drag_counts, drag_selected_notes, lerp, pitch_bend, round_to_part,
    size_bend, truncate_range, ChannelKind, Note, NotePin, Song, MAX_CHORD_SIZE,
    NOTE_SIZE_MAX, PARTS_PER_BEAT, PITCHES_PER_OCTAVE,
};

use crate::coords::{min_division, snap_to_pitch, Modifiers, Viewport};
use crate::cursor::{resolve_cursor, CopiedPins, ModLabelTarget, PatternCursor};
use crate::doc::{ChangeKind, Document, PartRange};

/// Pointer travel (pixels) before a press becomes a drag.
const DEADZONE_RADIUS: f32 = 5.0;

/// Parts of tolerance on the far side of a selection edge.
const SELECTION_EDGE_OUTER: f32 = 3.0;
/// Parts of tolerance on the near side of a selection edge.
const SELECTION_EDGE_INNER: f32 = 1.25;

struct ModLabelEdit {
    target: ModLabelTarget,
    text: String,
    token: u64,
}

/// The pointer-driven editing engine for the bound pattern.
pub struct PatternEditor {
    width: f32,
    height: f32,
    /// The resolved hit under the pointer, recomputed on hover moves and
    /// frozen for the duration of a drag.
    pub cursor: PatternCursor,
    copied: CopiedPins,
    mouse_x: f32,
    mouse_y: f32,
    mouse_x_start: f32,
    mouse_y_start: f32,
    mouse_down: bool,
    mouse_dragging: bool,
    mouse_horizontal: bool,
    /// Shift state captured at press; cleared when a size drag takes
    /// over the gesture.
    shift_held: bool,
    /// Live modifier state.
    shift_mode: bool,
    control_mode: bool,
    drag_confirmed: bool,
    dragging_start_of_selection: bool,
    dragging_end_of_selection: bool,
    dragging_selection_contents: bool,
    last_change_was_selection: bool,
    drag_token: Option<u64>,
    drag_kind: ChangeKind,
    bound: Option<(usize, usize)>,
    label_edit: Option<ModLabelEdit>,
}

impl PatternEditor {
    pub fn new(song: &Song, width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            cursor: PatternCursor::default(),
            copied: CopiedPins::new(song),
            mouse_x: 0.0,
            mouse_y: 0.0,
            mouse_x_start: 0.0,
            mouse_y_start: 0.0,
            mouse_down: false,
            mouse_dragging: false,
            mouse_horizontal: false,
            shift_held: false,
            shift_mode: false,
            control_mode: false,
            drag_confirmed: false,
            dragging_start_of_selection: false,
            dragging_end_of_selection: false,
            dragging_selection_contents: false,
            last_change_was_selection: false,
            drag_token: None,
            drag_kind: ChangeKind::NoteEdit,
            bound: None,
            label_edit: None,
        }
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
    }

    /// Replace a channel's copied-pins template directly (session
    /// restore).
    pub fn set_copied_pins(&mut self, channel: usize, pins: Vec<NotePin>) {
        self.copied.set_template(channel, pins);
    }

    pub fn editing_label(&self) -> bool {
        self.label_edit.is_some()
    }

    fn viewport(&self, doc: &Document) -> Viewport {
        Viewport::for_channel(&doc.song, doc.channel, self.width, self.height)
    }

    fn update_cursor(&mut self, doc: &Document) {
        let viewport = self.viewport(doc);
        self.cursor = resolve_cursor(
            &doc.song,
            doc.channel,
            doc.instrument,
            doc.pattern(),
            &viewport,
            self.mouse_x,
            self.mouse_y,
            self.control_mode && self.mouse_horizontal,
            &self.copied,
            self.label_edit.is_some(),
        );
    }

    /// Flush in-flight state when the document's selected channel/bar
    /// changed out from under the editor, and keep the template cache in
    /// step with the song's layout.
    fn sync_binding(&mut self, doc: &mut Document) {
        self.copied.sync(&doc.song);
        let current = (doc.channel, doc.bar);
        if self.bound != Some(current) {
            if let Some(token) = self.drag_token.take() {
                if doc.prospective_is(token) {
                    doc.discard_prospective();
                }
            }
            self.label_edit = None;
            self.reset_gesture();
            if doc.kind() == ChannelKind::Mod {
                if let Some(pattern) = doc.pattern_mut() {
                    pattern.sort_by_start_and_pitch();
                }
            }
            self.bound = Some(current);
        }
    }

    fn reset_gesture(&mut self) {
        self.mouse_down = false;
        self.mouse_dragging = false;
        self.drag_confirmed = false;
        self.dragging_start_of_selection = false;
        self.dragging_end_of_selection = false;
        self.dragging_selection_contents = false;
        self.last_change_was_selection = false;
    }

    fn abort_drag(&mut self, doc: &mut Document) {
        if let Some(token) = self.drag_token.take() {
            if doc.prospective_is(token) {
                doc.discard_prospective();
            }
        }
        self.reset_gesture();
    }

    fn cursor_is_in_selection(&self, doc: &Document) -> bool {
        self.cursor.valid
            && doc.selection.map_or(false, |sel| sel.contains(self.cursor.exact_part))
    }

    fn cursor_at_start_of_selection(&self, doc: &Document) -> bool {
        let Some(sel) = doc.selection else {
            return false;
        };
        self.cursor.valid
            && self.cursor.pitch_index.is_none()
            && sel.start as f32 - SELECTION_EDGE_OUTER <= self.cursor.exact_part
            && self.cursor.exact_part <= sel.start as f32 + SELECTION_EDGE_INNER
    }

    fn cursor_at_end_of_selection(&self, doc: &Document) -> bool {
        let Some(sel) = doc.selection else {
            return false;
        };
        self.cursor.valid
            && self.cursor.pitch_index.is_none()
            && sel.end as f32 - SELECTION_EDGE_INNER <= self.cursor.exact_part
            && self.cursor.exact_part <= sel.end as f32 + SELECTION_EDGE_OUTER
    }

    // ── Press ───────────────────────────────────────────────────────

    pub fn pointer_pressed(&mut self, doc: &mut Document, x: f32, y: f32, mods: Modifiers) {
        self.sync_binding(doc);
        self.shift_mode = mods.shift;
        self.control_mode = mods.control;
        self.mouse_x = x;
        self.mouse_y = y;
        self.shift_held = mods.shift;
        self.drag_confirmed = false;

        // A press on the floating value label enters the text-edit
        // sub-mode; everything else is suspended until confirm/cancel.
        if doc.kind() == ChannelKind::Mod && self.label_edit.is_none() {
            if let Some(label) = self.cursor.mod_label {
                if label.hit(x, y) {
                    let token = doc.begin_prospective();
                    self.label_edit = Some(ModLabelEdit { target: label, text: String::new(), token });
                    return;
                }
            }
        }
        if self.label_edit.is_some() {
            // Pressing elsewhere confirms the edit in progress.
            self.label_commit(doc);
        }

        self.mouse_down = true;
        self.mouse_x_start = x;
        self.mouse_y_start = y;
        self.update_cursor(doc);
        let token = doc.begin_prospective();
        self.drag_token = Some(token);
        self.last_change_was_selection = doc.last_kind() == Some(ChangeKind::Selection);
        self.drag_kind = ChangeKind::NoteEdit;

        if self.cursor_at_start_of_selection(doc) {
            self.dragging_start_of_selection = true;
            self.drag_kind = ChangeKind::Selection;
        } else if self.cursor_at_end_of_selection(doc) {
            self.dragging_end_of_selection = true;
            self.drag_kind = ChangeKind::Selection;
        } else if self.shift_held {
            self.drag_kind = ChangeKind::Selection;
            if (doc.selection_active() && self.cursor.pitch_index.is_none())
                || self.cursor_is_in_selection(doc)
            {
                doc.set_selection(None);
            } else if let Some(id) = self.cursor.cur_note {
                if let Some(note) = doc.pattern().and_then(|pattern| pattern.note(id)) {
                    let range = PartRange { start: note.start, end: note.end };
                    doc.set_selection(Some(range));
                }
            } else if self.cursor.valid {
                let start = ((self.cursor.exact_part / PARTS_PER_BEAT as f32).floor() as i32
                    * PARTS_PER_BEAT)
                    .clamp(0, (doc.song.beats_per_bar - 1) * PARTS_PER_BEAT);
                doc.set_selection(Some(PartRange { start, end: start + PARTS_PER_BEAT }));
            }
        } else if self.cursor_is_in_selection(doc) {
            self.dragging_selection_contents = true;
            self.drag_kind = ChangeKind::DragContents;
        } else if self.cursor.valid && self.cursor.cur_note.is_none() {
            doc.set_selection(None);
            self.drag_kind = ChangeKind::NoteAdded;

            // Clicking empty space can only mean adding a note, so it is
            // materialized immediately. On or near an existing note the
            // result depends on whether a drag follows, so nothing
            // happens until then.
            let mut note = Note::new(self.cursor.pitch, self.cursor.start, self.cursor.end, NOTE_SIZE_MAX);
            note.pins = self.cursor.pins.clone();
            let index = self.cursor.cur_index;
            let pattern = doc.ensure_pattern();
            let index = index.min(pattern.notes.len());
            pattern.insert_note(index, note);
        }
    }

    // ── Move ────────────────────────────────────────────────────────

    pub fn pointer_moved(&mut self, doc: &mut Document, x: f32, y: f32, mods: Modifiers) {
        self.sync_binding(doc);
        self.control_mode = mods.control;
        self.shift_mode = mods.shift;
        self.mouse_x = x;
        self.mouse_y = y;
        if self.label_edit.is_some() {
            return;
        }

        let continuous = self.drag_token.map_or(false, |token| doc.prospective_is(token));

        if !self.mouse_dragging && self.mouse_down && self.cursor.valid && continuous {
            let dx = x - self.mouse_x_start;
            let dy = y - self.mouse_y_start;
            if (dx * dx + dy * dy).sqrt() > DEADZONE_RADIUS {
                self.mouse_dragging = true;
                self.mouse_horizontal = dx.abs() >= dy.abs();
            }
        }

        if self.shift_held && self.mouse_horizontal && (self.mouse_x_start - x).abs() > DEADZONE_RADIUS {
            self.drag_confirmed = true;
        }

        if self.mouse_dragging && self.mouse_down && self.cursor.valid && continuous {
            doc.rewind_prospective();
            let fine = self.control_mode && self.mouse_horizontal;
            let min_div = min_division(doc.song.rhythm, fine);
            let viewport = self.viewport(doc);
            let exact = viewport.exact_part(x);
            let current_part = (exact / min_div as f32).floor() as i32 * min_div;
            let total = doc.song.total_parts();

            if self.dragging_start_of_selection {
                let end = doc.selection.map_or(0, |sel| sel.end);
                doc.set_selection(Some(PartRange { start: current_part.clamp(0, total), end }));
            } else if self.dragging_end_of_selection {
                let start = doc.selection.map_or(0, |sel| sel.start);
                doc.set_selection(Some(PartRange { start, end: current_part.clamp(0, total) }));
            } else if self.dragging_selection_contents {
                self.drag_selection_contents(doc, min_div);
            } else if self.shift_held && self.drag_confirmed {
                self.drag_expand_selection(doc, current_part);
            } else if self.cursor.cur_note.is_none() {
                self.drag_create(doc, min_div, current_part);
            } else if self.mouse_horizontal {
                self.drag_pin_time(doc, min_div);
            } else if self.cursor.pitch_index.is_none() || doc.kind() == ChannelKind::Mod {
                self.drag_size_bend(doc, min_div);
            } else {
                self.drag_pitch_bend(doc, min_div, current_part);
            }
        }

        // Hover path: refresh the cursor, no state change.
        if !(self.mouse_down && self.cursor.valid && continuous) {
            self.update_cursor(doc);
        }
    }

    fn drag_selection_contents(&mut self, doc: &mut Document, min_div: i32) {
        let Some(sel) = doc.selection else {
            return;
        };
        let kind = doc.kind();
        let viewport = self.viewport(doc);
        let pitch_ratio = if kind == ChannelKind::Noise {
            1.0
        } else {
            PITCHES_PER_OCTAVE as f32 / doc.song.scale.degree_count() as f32
        };
        let dragged_parts = ((self.mouse_x - self.mouse_x_start)
            / (viewport.part_width * min_div as f32))
            .round() as i32
            * min_div;
        let dragged_transpose =
            ((self.mouse_y_start - self.mouse_y) / (viewport.pitch_height * pitch_ratio)).round() as i32;
        let total = doc.song.total_parts();
        let max_pitch = Song::max_pitch(kind);
        let scale = doc.song.scale;
        if let Some(pattern) = doc.pattern_mut() {
            let (start, end) = drag_selected_notes(
                pattern,
                kind,
                &scale,
                sel.start,
                sel.end,
                dragged_parts,
                dragged_transpose,
                total,
                max_pitch,
            );
            doc.set_selection(Some(PartRange { start, end }));
        }
        self.drag_kind = ChangeKind::DragContents;
    }

    /// Shift-drag: grow the selection over whole beats, or to note
    /// boundaries where notes interrupt the beat grid.
    fn drag_expand_selection(&mut self, doc: &mut Document, current_part: i32) {
        let total = doc.song.total_parts();
        let mut start = ((self.cursor.exact_part / PARTS_PER_BEAT as f32).floor() as i32
            * PARTS_PER_BEAT)
            .clamp(0, (doc.song.beats_per_bar - 1) * PARTS_PER_BEAT);
        let mut end = start + PARTS_PER_BEAT;
        if let Some(id) = self.cursor.cur_note {
            if let Some(note) = doc.pattern().and_then(|pattern| pattern.note(id)) {
                start = start.max(note.start);
                end = end.min(note.end);
            }
        }
        if current_part < start {
            start = 0;
            if let Some(pattern) = doc.pattern() {
                for note in &pattern.notes {
                    if note.start <= current_part {
                        start = note.start;
                    }
                    if note.end <= current_part {
                        start = note.end;
                    }
                }
            }
            for beat in 0..=doc.song.beats_per_bar {
                let part = beat * PARTS_PER_BEAT;
                if start <= part && part <= current_part {
                    start = part;
                }
            }
        }
        if current_part > end {
            end = total;
            if let Some(pattern) = doc.pattern() {
                for note in &pattern.notes {
                    if note.start >= current_part {
                        end = note.start;
                        break;
                    }
                    if note.end >= current_part {
                        end = note.end;
                        break;
                    }
                }
            }
            for beat in 0..=doc.song.beats_per_bar {
                let part = beat * PARTS_PER_BEAT;
                if current_part < part && part < end {
                    end = part;
                }
            }
        }
        doc.set_selection(Some(PartRange { start, end }));
        self.drag_kind = ChangeKind::Selection;
    }

    /// Horizontal drag from empty space: create a note whose length
    /// walks the table of natural lengths toward the pointer.
    fn drag_create(&mut self, doc: &mut Document, min_div: i32, current_part: i32) {
        doc.set_selection(None);
        let kind = doc.kind();
        let is_mod = kind == ChannelKind::Mod;
        let max_pitch = Song::max_pitch(kind);
        let total = doc.song.total_parts();

        let (backwards, direct_length) = if current_part < self.cursor.start {
            (true, self.cursor.start - current_part)
        } else {
            (false, current_part - self.cursor.start + min_div)
        };
        let default_length = default_drag_length(direct_length, min_div, total);
        let (mut start, mut end) = if backwards {
            (self.cursor.start - default_length, self.cursor.start)
        } else {
            (self.cursor.start, self.cursor.start + default_length)
        };
        let continues = start < 0 && !is_mod;
        start = start.max(0);
        end = end.min(total);
        if start >= end {
            return;
        }

        self.drag_kind = ChangeKind::NoteAdded;
        let size = doc.song.new_note_size(doc.channel, doc.instrument, self.cursor.pitch);
        let channel = doc.channel;
        let pitch = self.cursor.pitch;
        let pattern = doc.ensure_pattern();
        truncate_range(pattern, start, end, None, is_mod.then_some(pitch), max_pitch);
        let index = pattern
            .notes
            .iter()
            .position(|note| note.start >= end)
            .unwrap_or(pattern.notes.len());
        let mut note = Note::new(pitch, start, end, size);
        note.continues_last_pattern = continues;
        let id = pattern.insert_note(index, note);
        let created = pattern.note(id).expect("freshly inserted note").clone();
        if is_mod {
            pattern.sort_by_start_and_pitch();
        }
        self.copied.copy_from_note(channel, &created);
    }

    /// Horizontal drag over a note: shift the grabbed pin's time.
    /// Dragging past the note's own opposite boundary deletes the note.
    fn drag_pin_time(&mut self, doc: &mut Document, min_div: i32) {
        doc.set_selection(None);
        let Some(id) = self.cursor.cur_note else {
            return;
        };
        let kind = doc.kind();
        let is_mod = kind == ChannelKind::Mod;
        let max_pitch = Song::max_pitch(kind);
        let Some(note) = doc.pattern().and_then(|pattern| pattern.note(id)).cloned() else {
            self.abort_drag(doc);
            return;
        };
        let viewport = self.viewport(doc);
        let shift = (self.mouse_x - self.mouse_x_start) / viewport.part_width;
        let near = self.cursor.near_pin_index;
        let pin_abs = (note.start + note.pins[near].time) as f32;
        let mut shifted = ((pin_abs + shift) / min_div as f32).round() as i32 * min_div;
        let continues = shifted < 0 && !is_mod;
        shifted = shifted.clamp(0, doc.song.total_parts());
        let last = note.pins.len() - 1;

        let channel = doc.channel;
        let pattern = doc.pattern_mut().expect("pattern vanished mid-gesture");
        if (shifted <= note.start && near == last) || (shifted >= note.end && near == 0) {
            if let Some(index) = pattern.index_of(id) {
                pattern.remove_note(index);
            }
            self.drag_kind = ChangeKind::NoteEdit;
        } else {
            let range_start = note.start.min(shifted);
            let range_end = note.end.max(shifted);
            truncate_range(pattern, range_start, range_end, Some(id), is_mod.then(|| note.pitches[0]), max_pitch);
            let edited = pattern.note_mut(id).expect("kept note survives truncation");
            change_pin_time(edited, near, shifted, continues, max_pitch);
            let edited = edited.clone();
            self.copied.copy_from_note(channel, &edited);
            self.drag_kind = ChangeKind::PinTime;
        }
    }

    /// Vertical drag at a pin (or anywhere in a mod note): recompute the
    /// pin size with the two-speed sensitivity curve, and the interval
    /// by interpolation between the bracketing pins.
    fn drag_size_bend(&mut self, doc: &mut Document, min_div: i32) {
        let Some(id) = self.cursor.cur_note else {
            return;
        };
        let kind = doc.kind();
        let is_mod = kind == ChannelKind::Mod;
        let max_pitch = Song::max_pitch(kind);
        let Some(note) = doc.pattern().and_then(|pattern| pattern.note(id)).cloned() else {
            self.abort_drag(doc);
            return;
        };
        let viewport = self.viewport(doc);
        let bend_part = ((self.mouse_x / (viewport.part_width * min_div as f32)).round() as i32
            * min_div)
            .clamp(note.start, note.end)
            - note.start;
        let cap = doc.song.volume_cap(doc.channel, doc.instrument, self.cursor.pitch);
        let drag_sign = if self.mouse_y_start > self.mouse_y { 1.0 } else { -1.0 };
        let counts = drag_counts(self.mouse_y_start - self.mouse_y, cap);
        if counts > 0.0 {
            // A size drag overrides any attempt at a pattern selection.
            self.shift_held = false;
        }

        let mut bend_size = 0;
        let mut bend_interval = 0;
        for window in note.pins.windows(2) {
            let (prev, next) = (&window[0], &window[1]);
            if bend_part > next.time {
                continue;
            }
            assert!(bend_part >= prev.time, "bend position outside the grabbed note");
            let ratio = (bend_part - prev.time) as f32 / (next.time - prev.time) as f32;
            bend_size = round_to_part(lerp(prev.size as f32, next.size as f32, ratio) + drag_sign * counts);
            if !self.control_mode && !is_mod {
                // Coarse volume steps unless fine control is held.
                bend_size = bend_size.div_euclid(2) * 2;
            }
            bend_size = bend_size.clamp(0, cap);
            bend_interval = snap_to_pitch(
                lerp(prev.interval as f32, next.interval as f32, ratio) + note.pitches[0] as f32,
                0,
                max_pitch,
                &doc.song.scale,
                kind,
            ) - note.pitches[0];
            break;
        }

        let uniform = self.shift_mode;
        if is_mod && self.control_mode {
            self.link_adjacent_bend(doc, &note, bend_part, bend_size, bend_interval, uniform, max_pitch);
        }

        if doc.pattern().and_then(|pattern| pattern.index_of(id)).is_none() {
            self.abort_drag(doc);
            return;
        }
        let channel = doc.channel;
        let pattern = doc.pattern_mut().expect("pattern checked above");
        let edited = pattern.note_mut(id).expect("note checked above");
        size_bend(edited, bend_part, bend_size, bend_interval, uniform, max_pitch);
        let edited = edited.clone();
        self.copied.copy_from_note(channel, &edited);
        self.drag_kind = ChangeKind::SizeBend;
    }

    /// While control is held in a mod channel, a bend at the note's
    /// extreme boundary also writes the value onto the adjacent note,
    /// in this pattern or across the bar edge when the neighboring
    /// pattern plays the same instrument, so automation stays continuous.
    fn link_adjacent_bend(
        &mut self,
        doc: &mut Document,
        note: &Note,
        bend_part: i32,
        bend_size: i32,
        bend_interval: i32,
        uniform: bool,
        max_pitch: i32,
    ) {
        let channel = doc.channel;
        let bar = doc.bar;
        let total = doc.song.total_parts();
        let lane = note.pitches[0];
        let last_pin_time = note.pins[note.pins.len() - 1].time;

        if bend_part >= last_pin_time {
            let boundary = note.start + last_pin_time;
            if boundary < total {
                if let Some(pattern) = doc.song.pattern_mut(channel, bar) {
                    for other in &mut pattern.notes {
                        if other.id != note.id && other.start == boundary && other.pitches[0] == lane {
                            size_bend(other, 0, bend_size, bend_interval, uniform, max_pitch);
                        }
                    }
                }
            } else if bar + 1 < doc.song.bar_count {
                let instrument = doc.song.pattern(channel, bar).map(|pattern| pattern.instrument);
                if let Some(next_pattern) = doc.song.pattern_mut(channel, bar + 1) {
                    if Some(next_pattern.instrument) == instrument {
                        for other in &mut next_pattern.notes {
                            if other.start == 0 && other.pitches[0] == lane {
                                size_bend(other, 0, bend_size, bend_interval, uniform, max_pitch);
                            }
                        }
                    }
                }
            }
        } else if bend_part <= note.pins[0].time {
            if note.start > 0 {
                if let Some(pattern) = doc.song.pattern_mut(channel, bar) {
                    for other in &mut pattern.notes {
                        if other.id != note.id && other.end == note.start && other.pitches[0] == lane {
                            let edge = other.pins[other.pins.len() - 1].time;
                            size_bend(other, edge, bend_size, bend_interval, uniform, max_pitch);
                        }
                    }
                }
            } else if bar > 0 {
                let instrument = doc.song.pattern(channel, bar).map(|pattern| pattern.instrument);
                if let Some(prev_pattern) = doc.song.pattern_mut(channel, bar - 1) {
                    if Some(prev_pattern.instrument) == instrument {
                        for other in &mut prev_pattern.notes {
                            if other.end == total && other.pitches[0] == lane {
                                let edge = other.pins[other.pins.len() - 1].time;
                                size_bend(other, edge, bend_size, bend_interval, uniform, max_pitch);
                            }
                        }
                    }
                }
            }
        }
    }

    /// Vertical drag on a chord tone away from its pins: bend that tone
    /// across the dragged time range, extending the note when the drag
    /// runs past its end.
    fn drag_pitch_bend(&mut self, doc: &mut Document, min_div: i32, current_part: i32) {
        doc.set_selection(None);
        let Some(id) = self.cursor.cur_note else {
            return;
        };
        let Some(pitch_index) = self.cursor.pitch_index else {
            return;
        };
        let kind = doc.kind();
        let max_pitch = Song::max_pitch(kind);
        let Some(note) = doc.pattern().and_then(|pattern| pattern.note(id)).cloned() else {
            self.abort_drag(doc);
            return;
        };
        let total = doc.song.total_parts();

        let (bend_start, mut bend_end);
        if self.mouse_x >= self.mouse_x_start {
            bend_start = note.start.max(self.cursor.part);
            bend_end = current_part + min_div;
        } else {
            bend_start = note.end.min(self.cursor.part + min_div);
            bend_end = current_part;
        }
        bend_end = bend_end.clamp(0, total);

        if bend_end > note.end {
            truncate_range(doc.pattern_mut().expect("pattern vanished mid-gesture"), note.start, bend_end, Some(id), None, max_pitch);
        }
        if bend_end < note.start {
            truncate_range(doc.pattern_mut().expect("pattern vanished mid-gesture"), bend_end, note.end, Some(id), None, max_pitch);
        }

        let mut min_offset = i32::MAX;
        let mut max_offset = i32::MIN;
        for &pitch in &note.pitches {
            min_offset = min_offset.min(pitch);
            max_offset = max_offset.max(pitch);
        }
        min_offset -= note.pitches[pitch_index];
        max_offset -= note.pitches[pitch_index];

        let viewport = self.viewport(doc);
        let bend_to = snap_to_pitch(
            viewport.pitch_at(self.mouse_y),
            -min_offset,
            max_pitch - max_offset,
            &doc.song.scale,
            kind,
        );
        if doc.pattern().and_then(|pattern| pattern.index_of(id)).is_none() {
            self.abort_drag(doc);
            return;
        }
        let channel = doc.channel;
        let pattern = doc.pattern_mut().expect("pattern checked above");
        let edited = pattern.note_mut(id).expect("note checked above");
        pitch_bend(edited, bend_start, bend_end, bend_to, pitch_index, max_pitch);
        let edited = edited.clone();
        self.copied.copy_from_note(channel, &edited);
        self.drag_kind = ChangeKind::PitchBend;
    }

    // ── Release ─────────────────────────────────────────────────────

    pub fn pointer_released(&mut self, doc: &mut Document) {
        if self.label_edit.is_some() {
            return;
        }
        let continuous = self.drag_token.map_or(false, |token| doc.prospective_is(token));
        if !self.cursor.valid {
            if continuous {
                doc.discard_prospective();
            }
            self.drag_token = None;
            self.reset_gesture();
            return;
        }

        if self.mouse_down && continuous {
            let is_mod = doc.kind() == ChannelKind::Mod;
            if self.dragging_selection_contents {
                if is_mod {
                    if let Some(pattern) = doc.pattern_mut() {
                        pattern.sort_by_start_and_pitch();
                    }
                }
                doc.commit_prospective(ChangeKind::DragContents, false);
            } else if self.dragging_start_of_selection
                || self.dragging_end_of_selection
                || self.shift_held
            {
                doc.commit_prospective(ChangeKind::Selection, self.last_change_was_selection);
            } else if self.mouse_dragging || self.cursor.cur_note.is_none() {
                if is_mod {
                    if let Some(pattern) = doc.pattern_mut() {
                        pattern.sort_by_start_and_pitch();
                    }
                }
                doc.commit_prospective(self.drag_kind, false);
            } else {
                self.click_chord_toggle(doc);
            }
        } else if continuous {
            doc.discard_prospective();
        }

        self.drag_token = None;
        self.reset_gesture();
        self.update_cursor(doc);
    }

    /// A sub-deadzone release over an existing note toggles chord
    /// membership at the resolved pitch; removing the last pitch removes
    /// the note.
    fn click_chord_toggle(&mut self, doc: &mut Document) {
        let Some(id) = self.cursor.cur_note else {
            doc.discard_prospective();
            return;
        };
        if doc.pattern().and_then(|pattern| pattern.index_of(id)).is_none() {
            doc.discard_prospective();
            return;
        }
        doc.set_selection(None);
        let channel = doc.channel;
        let pitch = self.cursor.pitch;
        let pitch_index = self.cursor.pitch_index;
        let mut template: Option<Note> = None;
        {
            let pattern = doc.pattern_mut().expect("pattern checked above");
            let index = pattern.index_of(id).expect("note checked above");
            match pitch_index {
                None => {
                    let note = &mut pattern.notes[index];
                    if note.pitches.len() == MAX_CHORD_SIZE {
                        let lowest = note.pitches[0];
                        note.remove_pitch(lowest);
                    }
                    note.add_pitch(pitch);
                    template = Some(note.clone());
                }
                Some(_) => {
                    if pattern.notes[index].pitches.len() == 1 {
                        pattern.remove_note(index);
                    } else {
                        pattern.notes[index].remove_pitch(pitch);
                    }
                }
            }
        }
        if let Some(note) = template {
            self.copied.copy_from_note(channel, &note);
        }
        doc.commit_prospective(ChangeKind::ChordTone, false);
    }

    // ── Numeric label sub-mode ──────────────────────────────────────

    /// Text typed into the floating value label. Out-of-range values are
    /// held without effect until they re-enter range; non-numeric input
    /// coerces to the lower bound; accepted values re-issue the
    /// speculative pin edit.
    pub fn label_input(&mut self, doc: &mut Document, text: &str) {
        let Some(edit) = &mut self.label_edit else {
            return;
        };
        let target = edit.target;
        let token = edit.token;
        edit.text.clear();
        edit.text.push_str(text);

        if !doc.prospective_is(token) {
            // Out-of-band undo while editing: drop the sub-mode.
            self.label_edit = None;
            return;
        }
        // Typing toward a larger number: values in [0, lower) are held.
        if let Ok(value) = text.trim().parse::<f64>() {
            if value >= 0.0 && (value as i32) < target.lower {
                return;
            }
        }
        if text.is_empty() || text == "-" {
            return;
        }
        let value = text.trim().parse::<f64>().unwrap_or(target.lower as f64);
        let shown = value.clamp(target.lower as f64, target.upper as f64).floor() as i32;
        if let Some(edit) = &mut self.label_edit {
            edit.text = shown.to_string();
        }

        doc.rewind_prospective();
        let raw = shown - target.param.real_offset();
        let uniform = self.shift_mode;
        let max_pitch = Song::max_pitch(ChannelKind::Mod);
        if let Some(note) = doc.pattern_mut().and_then(|pattern| pattern.note_mut(target.note)) {
            let pin_time = note.pins[target.pin_index].time;
            let interval = note.pins[target.pin_index].interval;
            size_bend(note, pin_time, raw, interval, uniform, max_pitch);
        }
    }

    /// Confirm the label edit (Enter/blur), recording the change.
    pub fn label_commit(&mut self, doc: &mut Document) {
        let Some(edit) = self.label_edit.take() else {
            return;
        };
        if doc.prospective_is(edit.token) {
            doc.commit_prospective(ChangeKind::ModLabel, false);
        }
        self.update_cursor(doc);
    }

    /// Cancel the label edit (Escape), reverting the pin to its pre-edit
    /// value.
    pub fn label_cancel(&mut self, doc: &mut Document) {
        let Some(edit) = self.label_edit.take() else {
            return;
        };
        if doc.prospective_is(edit.token) {
            doc.discard_prospective();
        }
        self.update_cursor(doc);
    }
}

/// Whether `length` is one of the natural note lengths a creation drag
/// snaps to.
fn blessed_length(length: i32, min_div: i32) -> bool {
    if min_div == 1 {
        if length < 5 {
            true
        } else if length <= PARTS_PER_BEAT / 2 {
            length % 3 == 0 || length % 4 == 0
        } else if length <= PARTS_PER_BEAT * 3 / 2 {
            length % 6 == 0 || length % 8 == 0
        } else {
            length % PARTS_PER_BEAT == 0
        }
    } else {
        length < 5 * min_div
            || length % PARTS_PER_BEAT == 0
            || length == PARTS_PER_BEAT * 3 / 4
            || length == PARTS_PER_BEAT * 3 / 2
            || length == PARTS_PER_BEAT * 4 / 3
    }
}

/// The natural length nearest the dragged distance.
fn default_drag_length(direct_length: i32, min_div: i32, total_parts: i32) -> i32 {
    let mut default_length = min_div;
    let mut length = min_div;
    while length <= total_parts {
        if blessed_length(length, min_div) {
            if length == direct_length {
                return length;
            }
            if length < direct_length {
                default_length = length;
            } else {
                if default_length < direct_length - min_div {
                    default_length = length;
                }
                break;
            }
        }
        length += min_div;
    }
    default_length
}
