//! Song structure: channels, instruments, and per-bar patterns.

use alloc::vec::Vec;

use crate::config::{Rhythm, Scale, DRUM_COUNT, MAX_PITCH, MOD_COUNT, NOTE_SIZE_MAX, PARTS_PER_BEAT};
use crate::modulator::{ModParam, ModSlot};
use crate::pattern::Pattern;

/// What a channel's notes mean.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelKind {
    /// Melodic: scale quantization applies, pitch bends allowed.
    Pitch,
    /// Noise rows: every integer level is valid.
    Noise,
    /// Automation lanes: note size is the recorded parameter value.
    Mod,
}

/// An instrument. Only the fields the editing engine reads are modeled;
/// synthesis parameters live with the synth.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instrument {
    /// Mix volume in real units.
    pub volume: i32,
    /// Modulation slots; only meaningful on mod-channel instruments.
    pub mod_slots: [ModSlot; MOD_COUNT as usize],
}

impl Instrument {
    pub fn new() -> Self {
        Self { volume: 0, mod_slots: [ModSlot::default(); MOD_COUNT as usize] }
    }

    /// First slot capturing a live edit of `param`, if any.
    pub fn matching_slot(
        &self,
        param: ModParam,
        edited_channel: usize,
        edited_instrument: usize,
    ) -> Option<usize> {
        self.mod_slots
            .iter()
            .position(|slot| slot.matches(param, edited_channel, edited_instrument))
    }

    /// First unwired slot, if any.
    pub fn first_free_slot(&self) -> Option<usize> {
        self.mod_slots.iter().position(|slot| slot.param.is_none())
    }
}

impl Default for Instrument {
    fn default() -> Self {
        Self::new()
    }
}

/// One channel: a kind, an octave shift, instruments, and a pattern per
/// bar.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Channel {
    pub kind: ChannelKind,
    /// Octave offset applied to displayed pitches (melodic channels).
    pub octave: i32,
    pub instruments: Vec<Instrument>,
    /// Pattern per bar; `None` where the bar is empty.
    pub patterns: Vec<Option<Pattern>>,
}

impl Channel {
    pub fn new(kind: ChannelKind, bar_count: usize) -> Self {
        Self {
            kind,
            octave: 0,
            instruments: alloc::vec![Instrument::new()],
            patterns: alloc::vec![None; bar_count],
        }
    }
}

/// The song: channel list plus the global settings the editor honors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Song {
    pub channels: Vec<Channel>,
    pub beats_per_bar: i32,
    pub bar_count: usize,
    pub rhythm: Rhythm,
    pub scale: Scale,
    pub tempo: i32,
}

impl Song {
    /// A song with the given channel counts, in pitch/noise/mod order.
    pub fn new(pitch_channels: usize, noise_channels: usize, mod_channels: usize, bar_count: usize) -> Self {
        let mut channels = Vec::new();
        for _ in 0..pitch_channels {
            channels.push(Channel::new(ChannelKind::Pitch, bar_count));
        }
        for _ in 0..noise_channels {
            channels.push(Channel::new(ChannelKind::Noise, bar_count));
        }
        for _ in 0..mod_channels {
            channels.push(Channel::new(ChannelKind::Mod, bar_count));
        }
        Self {
            channels,
            beats_per_bar: 8,
            bar_count,
            rhythm: Rhythm::Standard,
            scale: Scale::FREE,
            tempo: 150,
        }
    }

    /// Parts per bar.
    pub fn total_parts(&self) -> i32 {
        self.beats_per_bar * PARTS_PER_BEAT
    }

    pub fn channel_kind(&self, channel: usize) -> ChannelKind {
        self.channels[channel].kind
    }

    pub fn is_mod(&self, channel: usize) -> bool {
        self.channels[channel].kind == ChannelKind::Mod
    }

    pub fn is_noise(&self, channel: usize) -> bool {
        self.channels[channel].kind == ChannelKind::Noise
    }

    /// Highest valid pitch for a channel kind.
    pub fn max_pitch(kind: ChannelKind) -> i32 {
        match kind {
            ChannelKind::Pitch => MAX_PITCH,
            ChannelKind::Noise => DRUM_COUNT - 1,
            ChannelKind::Mod => MOD_COUNT - 1,
        }
    }

    pub fn pattern(&self, channel: usize, bar: usize) -> Option<&Pattern> {
        self.channels.get(channel)?.patterns.get(bar)?.as_ref()
    }

    pub fn pattern_mut(&mut self, channel: usize, bar: usize) -> Option<&mut Pattern> {
        self.channels.get_mut(channel)?.patterns.get_mut(bar)?.as_mut()
    }

    /// The pattern at `(channel, bar)`, created empty if missing.
    pub fn ensure_pattern(&mut self, channel: usize, bar: usize) -> &mut Pattern {
        self.channels[channel].patterns[bar].get_or_insert_with(|| Pattern::new(0))
    }

    /// The parameter wired to a mod lane, if any.
    pub fn mod_lane_param(&self, channel: usize, instrument: usize, lane_pitch: i32) -> Option<ModParam> {
        let slot = (MOD_COUNT - 1 - lane_pitch).clamp(0, MOD_COUNT - 1) as usize;
        self.channels
            .get(channel)?
            .instruments
            .get(instrument)?
            .mod_slots[slot]
            .param
    }

    /// Pin size cap for a note at `pitch` in the given channel. Mod lanes
    /// use the wired parameter's range; everything else uses the note
    /// volume cap.
    pub fn volume_cap(&self, channel: usize, instrument: usize, pitch: i32) -> i32 {
        if self.is_mod(channel) {
            self.mod_lane_param(channel, instrument, pitch)
                .map_or(NOTE_SIZE_MAX, ModParam::max_raw)
        } else {
            NOTE_SIZE_MAX
        }
    }

    /// Size for a freshly created note at `pitch`.
    pub fn new_note_size(&self, channel: usize, instrument: usize, pitch: i32) -> i32 {
        self.volume_cap(channel, instrument, pitch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modulator::ModScope;

    #[test]
    fn channel_layout_follows_counts() {
        let song = Song::new(2, 1, 1, 4);
        assert_eq!(song.channels.len(), 4);
        assert_eq!(song.channel_kind(0), ChannelKind::Pitch);
        assert_eq!(song.channel_kind(2), ChannelKind::Noise);
        assert!(song.is_mod(3));
    }

    #[test]
    fn ensure_pattern_creates_once() {
        let mut song = Song::new(1, 0, 0, 2);
        assert!(song.pattern(0, 1).is_none());
        song.ensure_pattern(0, 1);
        assert!(song.pattern(0, 1).is_some());
        song.ensure_pattern(0, 1).instrument = 0;
        assert_eq!(song.channels[0].patterns[1].as_ref().map(|p| p.notes.len()), Some(0));
    }

    #[test]
    fn volume_cap_uses_wired_param_on_mod_lanes() {
        let mut song = Song::new(1, 0, 1, 1);
        let slot = MOD_COUNT as usize - 1; // lane pitch 0
        song.channels[1].instruments[0].mod_slots[slot] = ModSlot {
            param: Some(ModParam::Tempo),
            channel: None,
            scope: ModScope::All,
        };
        assert_eq!(song.volume_cap(1, 0, 0), ModParam::Tempo.max_raw());
        // Unwired lane falls back to the note size cap.
        assert_eq!(song.volume_cap(1, 0, 1), NOTE_SIZE_MAX);
        // Melodic channels always cap at the note size.
        assert_eq!(song.volume_cap(0, 0, 40), NOTE_SIZE_MAX);
    }

    #[test]
    fn total_parts_follows_beats() {
        let mut song = Song::new(1, 0, 0, 1);
        song.beats_per_bar = 2;
        assert_eq!(song.total_parts(), 48);
    }
}
