//! Pointer-driven note and automation editing engine.
//!
//! The host feeds pointer events, modifier state, and live parameter
//! changes; the engine resolves them against the bound pattern and
//! produces committed, undoable changes on the [`Document`]. Rendering
//! is entirely the host's concern: everything here is geometry and
//! pattern mutation, nothing draws.

mod coords;
mod cursor;
mod doc;
mod editor;
mod record;

pub use coords::{max_division, min_division, quantize_part, snap_to_pitch, Modifiers, Viewport};
pub use cursor::{resolve_cursor, CopiedPins, ModLabelTarget, PatternCursor};
pub use doc::{ChangeKind, Document, PartRange};
pub use editor::PatternEditor;
pub use record::{ModRecorder, ParameterBinding};
