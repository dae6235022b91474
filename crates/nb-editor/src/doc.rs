//! Document state and the undo boundary.
//!
//! The document owns the song, the selected channel/bar, the pattern
//! selection range, and the undo history. Edits reach it one of two
//! ways: a gesture opens a *prospective* overlay (rewound and rebuilt on
//! every pointer move, committed or discarded exactly once), or a caller
//! records a closed mutation directly. Either way one gesture produces
//! at most one undo step.

use nb_ir::{ChannelKind, Pattern, Song};

/// A `[start, end)` part interval on the pattern, independent of notes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PartRange {
    pub start: i32,
    pub end: i32,
}

impl PartRange {
    /// Both edges inclusive: grabbing exactly on an edge counts as
    /// inside.
    pub fn contains(&self, part: f32) -> bool {
        self.start as f32 <= part && part <= self.end as f32
    }
}

/// What kind of edit an undo step holds. Consecutive steps of the same
/// kind may coalesce when the caller asks for it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    NoteAdded,
    NoteEdit,
    PinTime,
    SizeBend,
    PitchBend,
    ChordTone,
    Selection,
    DragContents,
    ModLabel,
    ModRecording,
}

#[derive(Clone, Debug, PartialEq)]
struct Snapshot {
    song: Song,
    selection: Option<PartRange>,
}

#[derive(Clone, Debug)]
struct UndoEntry {
    kind: ChangeKind,
    before: Snapshot,
    after: Snapshot,
}

/// Undo/redo stack of committed snapshots.
struct UndoStack {
    entries: Vec<UndoEntry>,
    position: usize,
}

impl UndoStack {
    fn new() -> Self {
        Self { entries: Vec::new(), position: 0 }
    }

    fn push(&mut self, entry: UndoEntry) {
        // Truncate any redo history beyond current position.
        self.entries.truncate(self.position);
        self.entries.push(entry);
        self.position = self.entries.len();
    }

    /// The latest committed entry, when nothing has been undone past it.
    fn top_mut(&mut self) -> Option<&mut UndoEntry> {
        if self.position == self.entries.len() {
            self.entries.last_mut()
        } else {
            None
        }
    }

    fn undo(&mut self) -> Option<&UndoEntry> {
        if self.position == 0 {
            return None;
        }
        self.position -= 1;
        Some(&self.entries[self.position])
    }

    fn redo(&mut self) -> Option<&UndoEntry> {
        if self.position >= self.entries.len() {
            return None;
        }
        let entry = &self.entries[self.position];
        self.position += 1;
        Some(entry)
    }
}

/// The song plus everything the editing engine needs from its host:
/// selected channel/bar/instrument, selection range, playhead, and the
/// undo boundary.
pub struct Document {
    pub song: Song,
    /// Selected channel index.
    pub channel: usize,
    /// Selected bar index.
    pub bar: usize,
    /// Selected instrument within the channel.
    pub instrument: usize,
    pub selection: Option<PartRange>,
    /// Playhead position in bars (fraction is the position within the
    /// bar).
    pub playhead: f64,
    undo: UndoStack,
    baseline: Option<Snapshot>,
    prospective: Option<u64>,
    next_token: u64,
}

impl Document {
    pub fn new(song: Song) -> Self {
        Self {
            song,
            channel: 0,
            bar: 0,
            instrument: 0,
            selection: None,
            playhead: 0.0,
            undo: UndoStack::new(),
            baseline: None,
            prospective: None,
            next_token: 0,
        }
    }

    pub fn kind(&self) -> ChannelKind {
        self.song.channel_kind(self.channel)
    }

    /// The bound pattern (selected channel and bar).
    pub fn pattern(&self) -> Option<&Pattern> {
        self.song.pattern(self.channel, self.bar)
    }

    pub fn pattern_mut(&mut self) -> Option<&mut Pattern> {
        self.song.pattern_mut(self.channel, self.bar)
    }

    pub fn ensure_pattern(&mut self) -> &mut Pattern {
        self.song.ensure_pattern(self.channel, self.bar)
    }

    /// Bar under the playhead.
    pub fn playhead_bar(&self) -> usize {
        (self.playhead.max(0.0) as usize).min(self.song.bar_count.saturating_sub(1))
    }

    /// Part position within the playhead's bar.
    pub fn playhead_part(&self) -> i32 {
        let fraction = self.playhead.max(0.0).fract();
        (fraction * self.song.total_parts() as f64) as i32
    }

    /// Replace the selection range; empty or inverted ranges clear it.
    pub fn set_selection(&mut self, selection: Option<PartRange>) {
        self.selection = selection.and_then(|range| {
            let (start, end) = (range.start.min(range.end), range.start.max(range.end));
            (start != end).then_some(PartRange { start, end })
        });
    }

    pub fn selection_active(&self) -> bool {
        self.selection.is_some()
    }

    // ── Speculative overlay ─────────────────────────────────────────

    /// Start a speculative change. The current state becomes the
    /// baseline; the returned token identifies this overlay until it is
    /// committed or discarded.
    pub fn begin_prospective(&mut self) -> u64 {
        self.next_token += 1;
        self.baseline = Some(self.snapshot());
        self.prospective = Some(self.next_token);
        self.next_token
    }

    /// Whether the given overlay is still the document's current change.
    /// Out-of-band undo/redo invalidates it; the gesture must then abort.
    pub fn prospective_is(&self, token: u64) -> bool {
        self.prospective == Some(token)
    }

    /// Throw away the overlay's edits but keep the overlay open, so the
    /// gesture can rebuild its change from the committed baseline.
    pub fn rewind_prospective(&mut self) {
        if let Some(baseline) = self.baseline.clone() {
            self.restore(baseline);
        }
    }

    /// Commit the overlay as one undo step. No-change overlays record
    /// nothing. With `coalesce`, a same-kind step directly below absorbs
    /// this one.
    pub fn commit_prospective(&mut self, kind: ChangeKind, coalesce: bool) {
        self.prospective = None;
        let Some(before) = self.baseline.take() else {
            return;
        };
        let after = self.snapshot();
        if before == after {
            return;
        }
        self.push_entry(UndoEntry { kind, before, after }, coalesce);
    }

    /// Abort the overlay, restoring the baseline.
    pub fn discard_prospective(&mut self) {
        self.prospective = None;
        if let Some(baseline) = self.baseline.take() {
            self.restore(baseline);
        }
    }

    /// Record a closed mutation as one undo step, bypassing the overlay.
    /// Used by the automation recorder, which edits on transport ticks
    /// rather than across a press/release gesture.
    pub fn record_with<R>(
        &mut self,
        kind: ChangeKind,
        coalesce: bool,
        mutate: impl FnOnce(&mut Document) -> R,
    ) -> R {
        let before = self.snapshot();
        let result = mutate(self);
        let after = self.snapshot();
        if before != after {
            self.push_entry(UndoEntry { kind, before, after }, coalesce);
        }
        result
    }

    fn push_entry(&mut self, entry: UndoEntry, coalesce: bool) {
        if coalesce {
            if let Some(top) = self.undo.top_mut() {
                if top.kind == entry.kind {
                    top.after = entry.after;
                    return;
                }
            }
        }
        self.undo.push(entry);
    }

    // ── Undo/redo ───────────────────────────────────────────────────

    /// Kind of the latest committed step, when nothing has been undone.
    pub fn last_kind(&self) -> Option<ChangeKind> {
        if self.undo.position == self.undo.entries.len() {
            self.undo.entries.last().map(|entry| entry.kind)
        } else {
            None
        }
    }

    pub fn can_undo(&self) -> bool {
        self.undo.position > 0
    }

    pub fn can_redo(&self) -> bool {
        self.undo.position < self.undo.entries.len()
    }

    /// Undo one step. Any open overlay is orphaned: its token stops
    /// matching and the in-flight gesture aborts on its next event.
    pub fn undo_step(&mut self) -> bool {
        self.prospective = None;
        self.baseline = None;
        let snapshot = match self.undo.undo() {
            Some(entry) => entry.before.clone(),
            None => return false,
        };
        self.restore(snapshot);
        true
    }

    pub fn redo_step(&mut self) -> bool {
        self.prospective = None;
        self.baseline = None;
        let snapshot = match self.undo.redo() {
            Some(entry) => entry.after.clone(),
            None => return false,
        };
        self.restore(snapshot);
        true
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot { song: self.song.clone(), selection: self.selection }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.song = snapshot.song;
        self.selection = snapshot.selection;
    }
}
