//! Cursor resolution: what is under the pointer.
//!
//! Each pointer move recomputes a `PatternCursor` from scratch: the
//! notes around the pointer's time, the interpolated pitch, the nearest
//! pin, and, when the pointer hovers empty space, a candidate note
//! shape previewing what a click would create.

use nb_ir::{
    ChannelKind, ModParam, Note, NoteId, NotePin, Pattern, Song, grab_arc, lerp,
    round_to_part, MOD_COUNT, NOTE_SIZE_MAX, PARTS_PER_BEAT,
};

use crate::coords::{max_division, min_division, quantize_part, snap_to_pitch, Viewport};

/// The floating numeric value label over the nearest pin of a mod note.
/// Bounds are real-world values of the lane's wired parameter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ModLabelTarget {
    pub note: NoteId,
    pub pin_index: usize,
    pub param: ModParam,
    /// Inclusive real-world bounds for typed values.
    pub lower: i32,
    pub upper: i32,
    /// Raw pin size when the label was resolved.
    pub start_value: i32,
    /// Label hit rectangle, in editor pixels.
    pub left: f32,
    pub top: f32,
    pub width: f32,
}

impl ModLabelTarget {
    /// Whether a press at `(x, y)` lands on the label.
    pub fn hit(&self, x: f32, y: f32) -> bool {
        x > self.left - 6.0
            && x < self.left + self.width + 6.0
            && y > self.top - 8.0
            && y < self.top + 11.0
    }
}

/// The resolved hit under the pointer, recomputed every pointer move.
#[derive(Clone, Debug)]
pub struct PatternCursor {
    pub valid: bool,
    /// Latest note ending at or before the pointer's time.
    pub prev_note: Option<NoteId>,
    /// Note straddling the pointer's time.
    pub cur_note: Option<NoteId>,
    /// First note starting after the pointer's time.
    pub next_note: Option<NoteId>,
    /// Snapped pitch under the pointer.
    pub pitch: i32,
    /// Index of `pitch` within the current note's chord, if it is one.
    pub pitch_index: Option<usize>,
    /// Insertion index for a new note at the pointer's time.
    pub cur_index: usize,
    /// Start of the current or candidate note.
    pub start: i32,
    /// End of the current or candidate note.
    pub end: i32,
    /// Pointer time floored to the minimum division.
    pub part: i32,
    /// Pointer time, unquantized.
    pub exact_part: f32,
    /// Pin of the current note nearest the pointer's time.
    pub near_pin_index: usize,
    /// The current note's pins, or the candidate note's synthesized pins.
    pub pins: Vec<NotePin>,
    /// Value-label target on mod channels.
    pub mod_label: Option<ModLabelTarget>,
}

impl Default for PatternCursor {
    fn default() -> Self {
        Self {
            valid: false,
            prev_note: None,
            cur_note: None,
            next_note: None,
            pitch: 0,
            pitch_index: None,
            cur_index: 0,
            start: 0,
            end: 0,
            part: 0,
            exact_part: 0.0,
            near_pin_index: 0,
            pins: Vec::new(),
            mod_label: None,
        }
    }
}

/// Per-channel template of the last-used pin shape, applied to candidate
/// notes. Owned by the editing session; reset whenever the channel count
/// or rhythm changes. Mod channels stash the pre-scaling sizes so moving
/// the preview across lanes with different caps does not erode the
/// template.
#[derive(Clone, Debug)]
pub struct CopiedPins {
    channels: Vec<Vec<NotePin>>,
    stash_sizes: Vec<Vec<i32>>,
    rhythm: nb_ir::Rhythm,
}

impl CopiedPins {
    pub fn new(song: &Song) -> Self {
        let mut copied = Self {
            channels: Vec::new(),
            stash_sizes: Vec::new(),
            rhythm: song.rhythm,
        };
        copied.reset(song);
        copied
    }

    /// Rebuild every channel's template with the default flat shape.
    pub fn reset(&mut self, song: &Song) {
        let length = max_division(song.rhythm, false);
        let cap = NOTE_SIZE_MAX;
        self.channels.clear();
        self.stash_sizes.clear();
        for channel in &song.channels {
            let (pins, sizes) = match channel.kind {
                ChannelKind::Pitch => (
                    vec![NotePin::new(0, cap, 0), NotePin::new(length, cap, 0)],
                    vec![cap, cap],
                ),
                ChannelKind::Noise | ChannelKind::Mod => (
                    vec![NotePin::new(0, cap, 0), NotePin::new(length, 0, 0)],
                    vec![cap, 0],
                ),
            };
            self.channels.push(pins);
            self.stash_sizes.push(sizes);
        }
        self.rhythm = song.rhythm;
    }

    /// Reset when the song's channel layout or rhythm changed.
    pub fn sync(&mut self, song: &Song) {
        if self.channels.len() != song.channels.len() || self.rhythm != song.rhythm {
            self.reset(song);
        }
    }

    pub fn pins(&self, channel: usize) -> &[NotePin] {
        &self.channels[channel]
    }

    pub fn stashed_sizes(&self, channel: usize) -> &[i32] {
        &self.stash_sizes[channel]
    }

    /// Replace one channel's template directly.
    pub fn set_template(&mut self, channel: usize, pins: Vec<NotePin>) {
        self.stash_sizes[channel] = pins.iter().map(|pin| pin.size).collect();
        self.channels[channel] = pins;
    }

    /// Store a note's envelope as the channel's template, dropping
    /// interior pins of flat runs.
    pub fn copy_from_note(&mut self, channel: usize, note: &Note) {
        let mut pins: Vec<NotePin> = note
            .pins
            .iter()
            .map(|pin| NotePin::new(pin.time, pin.size, 0))
            .collect();
        let mut i = 1;
        while i + 1 < pins.len() {
            if pins[i - 1].size == pins[i].size && pins[i].size == pins[i + 1].size {
                pins.remove(i);
            } else {
                i += 1;
            }
        }
        self.set_template(channel, pins);
    }
}

/// Resolve what is under the pointer.
///
/// `fine` is the fine-grain modifier state (control held during a
/// horizontal drag); `editing_label` suppresses re-resolving the value
/// label while its text is being edited.
#[allow(clippy::too_many_arguments)]
pub fn resolve_cursor(
    song: &Song,
    channel: usize,
    instrument: usize,
    pattern: Option<&Pattern>,
    viewport: &Viewport,
    x: f32,
    y: f32,
    fine: bool,
    copied: &CopiedPins,
    editing_label: bool,
) -> PatternCursor {
    let mut cursor = PatternCursor::default();
    if !viewport.in_bounds(x, y) {
        return cursor;
    }

    let kind = song.channel_kind(channel);
    let is_mod = kind == ChannelKind::Mod;
    let total_parts = song.total_parts();
    let min_div = min_division(song.rhythm, fine);
    cursor.exact_part = viewport.exact_part(x);
    cursor.part = quantize_part(cursor.exact_part, min_div, total_parts);

    let mouse_pitch_raw = viewport.pitch_at(y);
    let lane = mouse_pitch_raw.floor() as i32;

    let mut prev_end: Option<i32> = None;
    let mut next_start: Option<i32> = None;
    let mut cur_note_start = 0;
    let mut found_note = false;

    if let Some(pattern) = pattern {
        for note in &pattern.notes {
            if (note.end as f32) <= cursor.exact_part {
                if is_mod {
                    if note.pitches[0] == lane {
                        cursor.prev_note = Some(note.id);
                        prev_end = Some(note.end);
                    }
                    if !found_note {
                        cursor.cur_index += 1;
                    }
                } else {
                    cursor.prev_note = Some(note.id);
                    prev_end = Some(note.end);
                    cursor.cur_index += 1;
                }
            } else if (note.start as f32) <= cursor.exact_part && (note.end as f32) > cursor.exact_part {
                if is_mod {
                    if note.pitches[0] == lane {
                        cursor.cur_note = Some(note.id);
                        cur_note_start = note.start;
                        found_note = true;
                    } else if !found_note
                        || (cursor.cur_note.is_some() && note.start < cur_note_start)
                    {
                        // Only count notes that truly start before the
                        // sought lane's note.
                        cursor.cur_index += 1;
                    }
                } else {
                    cursor.cur_note = Some(note.id);
                    cur_note_start = note.start;
                }
            } else if (note.start as f32) > cursor.exact_part {
                if is_mod {
                    if note.pitches[0] == lane {
                        cursor.next_note = Some(note.id);
                        next_start = Some(note.start);
                        break;
                    }
                } else {
                    cursor.next_note = Some(note.id);
                    next_start = Some(note.start);
                    break;
                }
            }
        }

        if is_mod && !editing_label {
            cursor.mod_label = cursor.cur_note.and_then(|id| {
                resolve_mod_label(song, channel, instrument, pattern.note(id)?, cursor.exact_part, viewport)
            });
        }
    }

    let mut mouse_pitch = mouse_pitch_raw;

    if let Some(id) = cursor.cur_note {
        let note = pattern
            .and_then(|pattern| pattern.note(id))
            .expect("current note vanished during cursor resolution");
        cursor.start = note.start;
        cursor.end = note.end;
        cursor.pins = note.pins.clone();

        // Interpolate the pitch bend between the bracketing pins, with a
        // half-ellipse bias so the estimate hugs whichever pin is near.
        let mut interval = 0.0;
        let mut error = 0.0;
        for window in note.pins.windows(2) {
            let (prev, next) = (&window[0], &window[1]);
            let left_side = viewport.part_width * (note.start + prev.time) as f32;
            let right_side = viewport.part_width * (note.start + next.time) as f32;
            if x > right_side {
                continue;
            }
            assert!(x >= left_side, "pointer left of the note it resolved into");
            let ratio = (x - left_side) / (right_side - left_side);
            let bend_height = (next.interval - prev.interval).abs() as f32;
            interval = lerp(prev.interval as f32, next.interval as f32, ratio);
            error = grab_arc(ratio) * bend_height + 0.95;
            break;
        }

        let mut min_interval = i32::MAX;
        let mut max_interval = i32::MIN;
        let mut best_distance = f32::MAX;
        for (index, pin) in note.pins.iter().enumerate() {
            min_interval = min_interval.min(pin.interval);
            max_interval = max_interval.max(pin.interval);
            let pin_distance = ((note.start + pin.time) as f32 - cursor.exact_part).abs();
            if pin_distance < best_distance {
                best_distance = pin_distance;
                cursor.near_pin_index = index;
            }
        }

        mouse_pitch -= interval;
        cursor.pitch = snap_to_pitch(
            mouse_pitch,
            -min_interval,
            Song::max_pitch(kind) - max_interval,
            &song.scale,
            kind,
        );

        // Snap to a nearby existing chord tone if one is closer than the
        // bend estimate's error margin.
        if kind == ChannelKind::Pitch {
            let mut nearest = error;
            for &pitch in &note.pitches {
                let distance = (pitch as f32 - mouse_pitch + 0.5).abs();
                if distance > nearest {
                    continue;
                }
                nearest = distance;
                cursor.pitch = pitch;
            }
        }

        cursor.pitch_index = note.pitches.iter().position(|&p| p == cursor.pitch);
    } else {
        cursor.pitch = snap_to_pitch(mouse_pitch, 0, Song::max_pitch(kind), &song.scale, kind);

        // Synthesize the candidate note from the channel's template.
        let template = copied.pins(channel);
        let default_length = template.last().map_or(min_div, |pin| pin.time);
        let full_beat_parts = (cursor.part / PARTS_PER_BEAT) * PARTS_PER_BEAT;
        let max_div = max_division(song.rhythm, fine);
        let mod_mouse = cursor.part % PARTS_PER_BEAT;

        if default_length == 1 {
            cursor.start = cursor.part;
        } else if default_length > PARTS_PER_BEAT {
            cursor.start = full_beat_parts;
        } else if default_length == PARTS_PER_BEAT {
            cursor.start = full_beat_parts;
            if max_div < PARTS_PER_BEAT && mod_mouse > max_div {
                cursor.start += (mod_mouse / max_div) * max_div;
            }
        } else {
            cursor.start = cursor.part;
        }
        cursor.end = cursor.start + default_length;

        // Clip against the neighbors, re-deriving the opposite bound
        // from the fixed length.
        let force_start = prev_end.unwrap_or(0);
        let force_end = next_start.unwrap_or(total_parts);
        if cursor.start < force_start {
            cursor.start = force_start;
            cursor.end = cursor.start + default_length;
            if cursor.end > force_end {
                cursor.end = force_end;
            }
        } else if cursor.end > force_end {
            cursor.end = force_end;
            cursor.start = cursor.end - default_length;
            if cursor.start < force_start {
                cursor.start = force_start;
            }
        }

        let length = cursor.end - cursor.start;
        if length == default_length {
            cursor.pins = template.to_vec();
        } else {
            cursor.pins = Vec::new();
            for pin in template {
                if pin.time <= length {
                    cursor.pins.push(NotePin::new(pin.time, pin.size, 0));
                    if pin.time == length {
                        break;
                    }
                } else {
                    cursor.pins.push(NotePin::new(length, pin.size, 0));
                    break;
                }
            }
        }

        if is_mod {
            cursor.pitch = cursor.pitch.clamp(0, MOD_COUNT - 1);

            // Restore the stashed template sizes before re-scaling, so
            // hovering across lanes never degrades the template.
            let stash = copied.stashed_sizes(channel);
            for (pin, &size) in cursor.pins.iter_mut().zip(stash) {
                pin.size = size;
            }

            let cap = song.volume_cap(channel, instrument, cursor.pitch);
            let max_found = cursor.pins.iter().map(|pin| pin.size).max().unwrap_or(0);
            if max_found > cap {
                for pin in &mut cursor.pins {
                    pin.size = round_to_part(pin.size as f32 * cap as f32 / max_found as f32);
                }
            }
        }
    }

    cursor.valid = true;
    cursor
}

/// Resolve the floating value label for the pin of a mod note nearest
/// the pointer's time. Unwired lanes have no label.
fn resolve_mod_label(
    song: &Song,
    channel: usize,
    instrument: usize,
    note: &Note,
    exact_part: f32,
    viewport: &Viewport,
) -> Option<ModLabelTarget> {
    let mut pin_index = 0;
    while pin_index + 1 < note.pins.len()
        && ((note.start + note.pins[pin_index].time) as f32) < exact_part
    {
        pin_index += 1;
    }
    if pin_index > 0 {
        let here = (note.start + note.pins[pin_index].time) as f32 - exact_part;
        let before = exact_part - (note.start + note.pins[pin_index - 1].time) as f32;
        if here > before {
            pin_index -= 1;
        }
    }

    let lane = note.pitches[0];
    let param = song.mod_lane_param(channel, instrument, lane)?;
    let pin = note.pins[pin_index];
    let shown = pin.size + param.real_offset();

    // Nudge left of wide or negative numbers so the text stays centered
    // over the pin.
    let digits = (shown >= 10) as i32 + (shown >= 100) as i32 + (shown < 0) as i32 + (shown <= -10) as i32;
    let width = (8 + digits * 8) as f32;
    let anchor = viewport.part_width * (note.start + pin.time) as f32 - 4.0 - (digits * 4) as f32;
    let left = anchor.min(viewport.width - 10.0 - (digits * 8) as f32).max(2.0);
    let top = viewport.pitch_to_pixel(lane as f32) - 17.0 - viewport.pitch_height / 2.0;

    let cap = song.volume_cap(channel, instrument, lane);
    Some(ModLabelTarget {
        note: note.id,
        pin_index,
        param,
        lower: param.real_offset(),
        upper: param.real_offset() + cap,
        start_value: pin.size,
        left,
        top,
        width,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use nb_ir::{ModScope, ModSlot, Rhythm};

    fn song() -> Song {
        let mut song = Song::new(1, 0, 1, 1);
        song.beats_per_bar = 2;
        song.rhythm = Rhythm::Twelfths; // min division 2
        song
    }

    fn viewport(song: &Song, channel: usize) -> Viewport {
        Viewport::for_channel(song, channel, 192.0, 370.0)
    }

    fn resolve(song: &Song, channel: usize, x: f32, y: f32, copied: &CopiedPins) -> PatternCursor {
        let viewport = viewport(song, channel);
        resolve_cursor(
            song,
            channel,
            0,
            song.pattern(channel, 0),
            &viewport,
            x,
            y,
            false,
            copied,
            false,
        )
    }

    fn y_for_pitch(viewport: &Viewport, pitch: i32) -> f32 {
        (viewport.pitch_count - pitch - viewport.octave_offset) as f32 * viewport.pitch_height
            - viewport.pitch_height / 2.0
    }

    #[test]
    fn out_of_bounds_is_invalid() {
        let song = song();
        let copied = CopiedPins::new(&song);
        let cursor = resolve(&song, 0, -5.0, 10.0, &copied);
        assert!(!cursor.valid);
    }

    #[test]
    fn empty_pattern_synthesizes_candidate_from_template() {
        // Template of length 4, click at part 6: candidate spans [6, 10).
        let song = song();
        let mut copied = CopiedPins::new(&song);
        copied.set_template(0, vec![NotePin::new(0, 6, 0), NotePin::new(4, 6, 0)]);
        let vp = viewport(&song, 0);
        let cursor = resolve(&song, 0, 25.0, y_for_pitch(&vp, 20), &copied);
        assert!(cursor.valid);
        assert!(cursor.cur_note.is_none());
        assert_eq!(cursor.part, 6);
        assert_eq!((cursor.start, cursor.end), (6, 10));
        assert_eq!(cursor.pins.len(), 2);
        assert_eq!(cursor.pins[1].time, 4);
        assert_eq!(cursor.pitch, 20);
    }

    #[test]
    fn candidate_clips_against_next_note() {
        let mut song = song();
        song.ensure_pattern(0, 0).push_note(Note::new(30, 8, 16, 6));
        let mut copied = CopiedPins::new(&song);
        copied.set_template(0, vec![NotePin::new(0, 6, 0), NotePin::new(4, 6, 0)]);
        let vp = viewport(&song, 0);
        let cursor = resolve(&song, 0, 25.0, y_for_pitch(&vp, 20), &copied);
        // Natural span [6, 10) would cross the note at 8: clipped to end
        // exactly at its start, start re-derived from the length.
        assert_eq!((cursor.start, cursor.end), (4, 8));
        assert!(cursor.next_note.is_some());
    }

    #[test]
    fn candidate_shortens_when_pinched_by_neighbors() {
        let mut song = song();
        {
            let pattern = song.ensure_pattern(0, 0);
            pattern.push_note(Note::new(30, 0, 6, 6));
            pattern.push_note(Note::new(30, 8, 16, 6));
        }
        let mut copied = CopiedPins::new(&song);
        copied.set_template(0, vec![NotePin::new(0, 6, 0), NotePin::new(4, 6, 0)]);
        let vp = viewport(&song, 0);
        let cursor = resolve(&song, 0, 26.0, y_for_pitch(&vp, 20), &copied);
        assert_eq!((cursor.start, cursor.end), (6, 8));
        // Template clipped to the shorter length.
        assert_eq!(cursor.pins.last().unwrap().time, 2);
    }

    #[test]
    fn hover_over_note_resolves_it() {
        let mut song = song();
        song.ensure_pattern(0, 0).push_note(Note::new(20, 4, 12, 6));
        let copied = CopiedPins::new(&song);
        let vp = viewport(&song, 0);
        let cursor = resolve(&song, 0, 8.0 * 4.0, y_for_pitch(&vp, 20), &copied);
        assert!(cursor.cur_note.is_some());
        assert_eq!((cursor.start, cursor.end), (4, 12));
        assert_eq!(cursor.pitch, 20);
        assert_eq!(cursor.pitch_index, Some(0));
        // Part 8 is equidistant in parts but the last pin at 12 wins
        // only if strictly closer; the first pin at 4 is kept.
        assert_eq!(cursor.near_pin_index, 0);
    }

    #[test]
    fn mod_lane_filter_ignores_other_lanes() {
        let mut song = song();
        song.ensure_pattern(1, 0).push_note(Note::new(2, 0, 24, 6));
        let copied = CopiedPins::new(&song);
        let vp = viewport(&song, 1);
        // Hover lane 4: the lane-2 note is invisible to the cursor.
        let cursor = resolve(&song, 1, 20.0, y_for_pitch(&vp, 4), &copied);
        assert!(cursor.cur_note.is_none());
        // Hover lane 2: found.
        let cursor = resolve(&song, 1, 20.0, y_for_pitch(&vp, 2), &copied);
        assert!(cursor.cur_note.is_some());
    }

    #[test]
    fn mod_label_targets_nearest_pin_of_wired_lane() {
        let mut song = song();
        let slot = (MOD_COUNT - 1) as usize - 2; // lane 2
        song.channels[1].instruments[0].mod_slots[slot] = ModSlot {
            param: Some(ModParam::Pan),
            channel: Some(0),
            scope: ModScope::All,
        };
        song.ensure_pattern(1, 0).push_note(Note::new(2, 0, 24, 50));
        let copied = CopiedPins::new(&song);
        let vp = viewport(&song, 1);
        let cursor = resolve(&song, 1, 80.0, y_for_pitch(&vp, 2), &copied);
        let label = cursor.mod_label.expect("wired lane has a label");
        assert_eq!(label.param, ModParam::Pan);
        assert_eq!(label.pin_index, 1);
        assert_eq!((label.lower, label.upper), (0, 100));
        assert_eq!(label.start_value, 50);
    }

    #[test]
    fn mod_candidate_scales_template_to_lane_cap() {
        let mut song = song();
        let slot = (MOD_COUNT - 1) as usize; // lane 0
        song.channels[1].instruments[0].mod_slots[slot] = ModSlot {
            param: Some(ModParam::Distortion), // cap 7
            channel: Some(0),
            scope: ModScope::All,
        };
        let mut copied = CopiedPins::new(&song);
        copied.set_template(1, vec![NotePin::new(0, 50, 0), NotePin::new(4, 25, 0)]);
        let vp = viewport(&song, 1);
        let cursor = resolve(&song, 1, 25.0, y_for_pitch(&vp, 0), &copied);
        assert_eq!(cursor.pitch, 0);
        let cap = 7;
        assert!(cursor.pins.iter().all(|pin| pin.size <= cap));
        assert_eq!(cursor.pins[0].size, 7);
        assert_eq!(cursor.pins[1].size, 4); // 25 * 7/50, rounded
        // The stored template is untouched.
        assert_eq!(copied.pins(1)[0].size, 50);
    }

    #[test]
    fn copy_from_note_drops_flat_interior_pins() {
        let song = song();
        let mut copied = CopiedPins::new(&song);
        let mut note = Note::new(20, 0, 12, 6);
        note.pins = vec![
            NotePin::new(0, 6, 0),
            NotePin::new(4, 6, 0),
            NotePin::new(8, 6, 0),
            NotePin::new(12, 3, 0),
        ];
        copied.copy_from_note(0, &note);
        let template = copied.pins(0);
        assert_eq!(template.len(), 3);
        assert_eq!(template[1].time, 8);
    }
}
