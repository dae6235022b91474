//! End-to-end gesture scenarios across the editor, document, and
//! recorder.

use nb_editor::{Document, ModRecorder, Modifiers, ParameterBinding, PartRange, PatternEditor};
use nb_ir::{ChannelKind, ModParam, NotePin, Rhythm, Song, MOD_COUNT};

const NONE: Modifiers = Modifiers { shift: false, control: false };
const SHIFT: Modifiers = Modifiers { shift: true, control: false };

// 2 beats of 24 parts across 192px: part_width 4. The melodic window is
// 37 rows over 370px: pitch_height 10.
fn setup() -> (Document, PatternEditor) {
    let mut song = Song::new(1, 0, 1, 2);
    song.beats_per_bar = 2;
    song.rhythm = Rhythm::Twelfths;
    let editor = PatternEditor::new(&song, 192.0, 370.0);
    (Document::new(song), editor)
}

fn x_for_part(part: f32) -> f32 {
    part * 4.0
}

fn y_for_pitch(pitch: i32) -> f32 {
    (37 - pitch) as f32 * 10.0 - 5.0
}

fn y_for_lane(lane: i32) -> f32 {
    let row_height = 370.0 / MOD_COUNT as f32;
    (MOD_COUNT - lane) as f32 * row_height - row_height / 2.0
}

fn click(doc: &mut Document, editor: &mut PatternEditor, x: f32, y: f32) {
    editor.pointer_pressed(doc, x, y, NONE);
    editor.pointer_released(doc);
}

fn assert_valid(doc: &Document) {
    for (index, channel) in doc.song.channels.iter().enumerate() {
        for pattern in channel.patterns.iter().flatten() {
            pattern
                .validate(channel.kind)
                .unwrap_or_else(|err| panic!("channel {} broke an invariant: {}", index, err));
        }
    }
}

#[test]
fn note_lifecycle_with_undo() {
    let (mut doc, mut editor) = setup();
    editor.set_copied_pins(0, vec![NotePin::new(0, 6, 0), NotePin::new(4, 6, 0)]);

    // Click at part 6: a note from the template, spanning [6, 10).
    click(&mut doc, &mut editor, x_for_part(6.25), y_for_pitch(20));
    assert_eq!(doc.pattern().unwrap().notes.len(), 1);
    assert_valid(&doc);

    // Stretch it: grab near the last pin, drag to part 16.
    editor.pointer_pressed(&mut doc, x_for_part(9.5), y_for_pitch(20), NONE);
    editor.pointer_moved(&mut doc, x_for_part(16.0), y_for_pitch(20), NONE);
    editor.pointer_released(&mut doc);
    {
        let note = &doc.pattern().unwrap().notes[0];
        assert_eq!((note.start, note.end), (6, 16));
    }
    assert_valid(&doc);

    // Three undos: back through the stretch, the add, to empty.
    assert!(doc.undo_step());
    assert_eq!(
        doc.pattern().unwrap().notes[0].end,
        10,
        "stretch undone first"
    );
    assert!(doc.undo_step());
    assert!(doc.pattern().map_or(true, |pattern| pattern.is_empty()));
    assert!(!doc.can_undo());

    // Redo restores both.
    assert!(doc.redo_step());
    assert!(doc.redo_step());
    assert_eq!(doc.pattern().unwrap().notes[0].end, 16);
    assert_valid(&doc);
}

#[test]
fn chord_tone_then_pitch_bend() {
    let (mut doc, mut editor) = setup();
    doc.ensure_pattern().push_note(nb_ir::Note::new(20, 4, 12, 6));

    // Click above the note to add a chord tone.
    click(&mut doc, &mut editor, x_for_part(8.0), y_for_pitch(24));
    assert_eq!(doc.pattern().unwrap().notes[0].pitches.as_slice(), &[20, 24]);

    // Grab the new tone mid-note and drag it upward: a pitch bend.
    editor.pointer_pressed(&mut doc, x_for_part(8.0), y_for_pitch(24), NONE);
    editor.pointer_moved(&mut doc, x_for_part(8.0), y_for_pitch(28), NONE);
    editor.pointer_released(&mut doc);
    let note = &doc.pattern().unwrap().notes[0];
    assert!(note.validate().is_ok());
    assert_eq!(note.pins.last().unwrap().interval, 4);
    assert_valid(&doc);
}

#[test]
fn mod_lanes_stay_independent() {
    let (mut doc, mut editor) = setup();
    doc.channel = 1;

    // A note in lane 2 and one in lane 4, at the same time range.
    click(&mut doc, &mut editor, x_for_part(6.0), y_for_lane(2));
    click(&mut doc, &mut editor, x_for_part(6.0), y_for_lane(4));
    let pattern = doc.pattern().unwrap();
    assert_eq!(pattern.notes.len(), 2);
    assert!(pattern.validate(ChannelKind::Mod).is_ok());

    // Clicking a lane's note deletes only that note.
    click(&mut doc, &mut editor, x_for_part(7.0), y_for_lane(2));
    let pattern = doc.pattern().unwrap();
    assert_eq!(pattern.notes.len(), 1);
    assert_eq!(pattern.notes[0].pitches[0], 4);
    assert_valid(&doc);
}

#[test]
fn recorded_automation_is_editable_and_undoable() {
    let (mut doc, mut editor) = setup();
    let slot = 0;
    doc.song.channels[1].instruments[0].mod_slots[slot] = nb_ir::ModSlot {
        param: Some(ModParam::Pan),
        channel: Some(0),
        scope: nb_ir::ModScope::All,
    };

    // Record two samples while "playing".
    let mut recorder = ModRecorder::new();
    let mut binding = ParameterBinding::new(ModParam::Pan, 30);
    doc.playhead = 10.0 / 48.0 + 1e-9;
    recorder.apply_live_value(&mut doc, &mut binding, NONE);
    binding.set_preview(80);
    doc.playhead = 22.0 / 48.0 + 1e-9;
    recorder.apply_live_value(&mut doc, &mut binding, NONE);
    assert_valid(&doc);

    let lane = MOD_COUNT - 1 - slot as i32;
    {
        let pattern = doc.song.pattern(1, 0).unwrap();
        assert_eq!(pattern.notes.len(), 1);
        assert_eq!(pattern.notes[0].pitches[0], lane);
        assert_eq!((pattern.notes[0].start, pattern.notes[0].end), (12, 24));
    }

    // The recorded note responds to ordinary editing.
    doc.channel = 1;
    click(&mut doc, &mut editor, x_for_part(14.0), y_for_lane(lane));
    assert!(doc.pattern().unwrap().is_empty());

    // Undo the click, then the (coalesced) recording.
    assert!(doc.undo_step());
    assert_eq!(doc.pattern().unwrap().notes.len(), 1);
    assert!(doc.undo_step());
    assert!(doc.pattern().map_or(true, |pattern| pattern.is_empty()));
    assert!(!doc.can_undo());
}

#[test]
fn selection_workflow_shifts_notes() {
    let (mut doc, mut editor) = setup();
    doc.ensure_pattern().push_note(nb_ir::Note::new(20, 0, 8, 6));
    doc.ensure_pattern().push_note(nb_ir::Note::new(24, 12, 20, 6));

    // Shift-click empty space in the first beat to select it.
    editor.pointer_pressed(&mut doc, x_for_part(10.0), y_for_pitch(30), SHIFT);
    editor.pointer_released(&mut doc);
    assert_eq!(doc.selection, Some(PartRange { start: 0, end: 24 }));

    // Drag the selection contents right by 24 parts.
    editor.pointer_pressed(&mut doc, x_for_part(10.0), y_for_pitch(30), NONE);
    editor.pointer_moved(&mut doc, x_for_part(34.0), y_for_pitch(30), NONE);
    editor.pointer_released(&mut doc);
    {
        let pattern = doc.pattern().unwrap();
        assert_eq!(pattern.notes[0].start, 24);
        assert_eq!(pattern.notes[1].start, 36);
        assert_eq!(doc.selection, Some(PartRange { start: 24, end: 48 }));
    }
    assert_valid(&doc);

    // One undo returns the notes and the selection.
    assert!(doc.undo_step());
    let pattern = doc.pattern().unwrap();
    assert_eq!(pattern.notes[0].start, 0);
    assert_eq!(doc.selection, Some(PartRange { start: 0, end: 24 }));
}

#[test]
fn candidate_never_overlaps_existing_notes() {
    let (mut doc, mut editor) = setup();
    doc.ensure_pattern().push_note(nb_ir::Note::new(30, 8, 16, 6));
    editor.set_copied_pins(0, vec![NotePin::new(0, 6, 0), NotePin::new(4, 6, 0)]);

    // Natural span [6, 10) would cross the note at 8: the click lands
    // clipped against it.
    click(&mut doc, &mut editor, x_for_part(6.25), y_for_pitch(20));
    let pattern = doc.pattern().unwrap();
    assert_eq!(pattern.notes.len(), 2);
    let added = &pattern.notes[0];
    assert_eq!((added.start, added.end), (4, 8));
    assert!(pattern.validate(ChannelKind::Pitch).is_ok());
}
