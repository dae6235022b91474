//! Pointer-to-musical coordinate mapping.
//!
//! Converts pixel positions into part times and pitches, honoring the
//! channel's pitch domain, the song's rhythm-derived time grid, and
//! scale quantization for melodic channels.

use nb_ir::{ChannelKind, Rhythm, Scale, Song, PARTS_PER_BEAT, PITCHES_PER_OCTAVE};

/// Octaves visible at once in a melodic channel.
const VISIBLE_OCTAVES: i32 = 3;

/// Modifier key state accompanying a pointer event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub control: bool,
}

/// Pixel geometry of the editing surface for one channel.
#[derive(Clone, Copy, Debug)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    pub part_width: f32,
    pub pitch_height: f32,
    pub pitch_count: i32,
    /// Pitch of the bottom visible row (melodic octave scrolling).
    pub octave_offset: i32,
}

impl Viewport {
    /// Geometry for a channel filling `width` x `height` pixels. Melodic
    /// channels show a [`VISIBLE_OCTAVES`]-octave window positioned by
    /// the channel's octave; noise and mod channels always show their
    /// whole domain.
    pub fn for_channel(song: &Song, channel: usize, width: f32, height: f32) -> Self {
        let kind = song.channel_kind(channel);
        let (pitch_count, octave_offset) = match kind {
            ChannelKind::Pitch => (
                VISIBLE_OCTAVES * PITCHES_PER_OCTAVE + 1,
                song.channels[channel].octave * PITCHES_PER_OCTAVE,
            ),
            ChannelKind::Noise | ChannelKind::Mod => (Song::max_pitch(kind) + 1, 0),
        };
        Self {
            width,
            height,
            part_width: width / song.total_parts() as f32,
            pitch_height: height / pitch_count as f32,
            pitch_count,
            octave_offset,
        }
    }

    /// Whether a pointer position can produce a valid cursor.
    pub fn in_bounds(&self, x: f32, y: f32) -> bool {
        x >= 0.0 && x <= self.width && y >= 0.0 && y <= self.height && self.pitch_height > 0.0
    }

    /// Real-valued part time under a pixel column.
    pub fn exact_part(&self, x: f32) -> f32 {
        x / self.part_width
    }

    /// Real-valued pitch under a pixel row, clamped into the visible
    /// window and shifted by the octave offset.
    pub fn pitch_at(&self, y: f32) -> f32 {
        let raw = self.pitch_count as f32 - y / self.pitch_height;
        raw.clamp(0.0, (self.pitch_count - 1) as f32) + self.octave_offset as f32
    }

    /// Pixel row of a pitch already relative to the octave offset.
    pub fn pitch_to_pixel(&self, pitch: f32) -> f32 {
        (self.pitch_count as f32 - pitch) * self.pitch_height
    }
}

/// Smallest time step for the current gesture, in parts. The fine-grain
/// modifier (control during a horizontal drag) drops to single parts.
pub fn min_division(rhythm: Rhythm, fine: bool) -> i32 {
    if fine {
        1
    } else {
        rhythm.min_division()
    }
}

/// Largest "natural" subdivision for anchoring new notes. Widens to the
/// whole beat under the fine-grain modifier.
pub fn max_division(rhythm: Rhythm, fine: bool) -> i32 {
    if fine {
        return PARTS_PER_BEAT;
    }
    let steps = rhythm.steps_per_beat();
    if steps % 4 == 0 {
        PARTS_PER_BEAT / 2
    } else if steps % 3 == 0 {
        PARTS_PER_BEAT / 3
    } else if steps % 2 == 0 {
        PARTS_PER_BEAT / 2
    } else {
        PARTS_PER_BEAT
    }
}

/// Floor a real part position to the division grid, clamped so a full
/// division still fits before the end of the bar.
pub fn quantize_part(exact: f32, division: i32, total_parts: i32) -> i32 {
    let clamped = exact.clamp(0.0, (total_parts - division) as f32);
    (clamped / division as f32).floor() as i32 * division
}

/// Snap a real-valued pitch guess to the nearest valid pitch in
/// `[min, max]`.
///
/// Noise and mod channels accept every integer level. Melodic channels
/// snap to the nearest flagged scale tone, tie-breaking by fractional
/// distance with a half-row bias on tonic and fifth degrees so the
/// picker stays sticky between accidentals.
pub fn snap_to_pitch(guess: f32, min: i32, max: i32, scale: &Scale, kind: ChannelKind) -> i32 {
    let guess = guess.clamp(min as f32, max as f32);
    let floor_guess = guess.floor() as i32;
    if kind != ChannelKind::Pitch || scale.contains(floor_guess) {
        return floor_guess;
    }
    let mut top = floor_guess + 1;
    while !scale.contains(top) {
        top += 1;
    }
    let mut bottom = floor_guess - 1;
    while !scale.contains(bottom) {
        bottom -= 1;
    }
    if top > max {
        return if bottom < min { min } else { bottom };
    }
    if bottom < min {
        return top;
    }
    let mut top_range = top as f32;
    let mut bottom_range = bottom as f32 + 1.0;
    let top_degree = top.rem_euclid(PITCHES_PER_OCTAVE);
    let bottom_degree = bottom.rem_euclid(PITCHES_PER_OCTAVE);
    if top_degree == 0 || top_degree == 7 {
        top_range -= 0.5;
    }
    if bottom_degree == 0 || bottom_degree == 7 {
        bottom_range += 0.5;
    }
    if guess - bottom_range > top_range - guess {
        top
    } else {
        bottom
    }
}
