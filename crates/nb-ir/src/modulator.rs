//! Modulation slots: routing recorded automation to parameter targets.
//!
//! A mod channel's instrument carries [`MOD_COUNT`](crate::MOD_COUNT)
//! slots. Each wired slot names a parameter, the channel it applies to
//! (none for song-wide parameters), and which of that channel's
//! instruments it covers. Lane pitch `p` in a mod pattern addresses slot
//! `MOD_COUNT - 1 - p`.

// ── Parameters ──────────────────────────────────────────────────────

/// A parameter that live automation can be recorded against.
///
/// `real_offset` converts between the raw pin value (`0..=max_raw`) and
/// the parameter's real-world display value: `real = raw + real_offset`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ModParam {
    // Song-wide.
    Tempo,
    SongVolume,
    // Per-instrument.
    MixVolume,
    Pan,
    Reverb,
    Distortion,
    PulseWidth,
    Detune,
    VibratoDepth,
    Chorus,
    EchoSustain,
    PitchShift,
}

impl ModParam {
    pub const ALL: [ModParam; 12] = [
        ModParam::Tempo,
        ModParam::SongVolume,
        ModParam::MixVolume,
        ModParam::Pan,
        ModParam::Reverb,
        ModParam::Distortion,
        ModParam::PulseWidth,
        ModParam::Detune,
        ModParam::VibratoDepth,
        ModParam::Chorus,
        ModParam::EchoSustain,
        ModParam::PitchShift,
    ];

    /// Whether the parameter applies to the whole song rather than one
    /// channel's instruments.
    pub const fn for_song(self) -> bool {
        matches!(self, ModParam::Tempo | ModParam::SongVolume)
    }

    /// Largest raw pin value for this parameter.
    pub const fn max_raw(self) -> i32 {
        match self {
            ModParam::Tempo => 220,
            ModParam::SongVolume => 100,
            ModParam::MixVolume => 50,
            ModParam::Pan => 100,
            ModParam::Reverb => 32,
            ModParam::Distortion => 7,
            ModParam::PulseWidth => 50,
            ModParam::Detune => 400,
            ModParam::VibratoDepth => 50,
            ModParam::Chorus => 8,
            ModParam::EchoSustain => 8,
            ModParam::PitchShift => 24,
        }
    }

    /// Display offset: `real = raw + real_offset`.
    pub const fn real_offset(self) -> i32 {
        match self {
            ModParam::Tempo => 30,
            ModParam::MixVolume => -25,
            ModParam::Detune => -200,
            ModParam::PitchShift => -12,
            _ => 0,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            ModParam::Tempo => "tempo",
            ModParam::SongVolume => "song volume",
            ModParam::MixVolume => "mix volume",
            ModParam::Pan => "pan",
            ModParam::Reverb => "reverb",
            ModParam::Distortion => "distortion",
            ModParam::PulseWidth => "pulse width",
            ModParam::Detune => "detune",
            ModParam::VibratoDepth => "vibrato depth",
            ModParam::Chorus => "chorus",
            ModParam::EchoSustain => "echo sustain",
            ModParam::PitchShift => "pitch shift",
        }
    }
}

// ── Slots ───────────────────────────────────────────────────────────

/// Which instruments of the targeted channel a slot covers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModScope {
    /// Exactly one instrument.
    Instrument(usize),
    /// Whatever instruments are active in the targeted channel's bar.
    Active,
    /// Every instrument in the targeted channel.
    All,
}

impl ModScope {
    /// Whether a live edit of `instrument` falls under this scope.
    ///
    /// `Active` matches regardless of which instrument is being edited:
    /// recording from an inactive instrument still writes to the lane
    /// modulating the channel's active ones.
    pub fn includes(self, instrument: usize) -> bool {
        match self {
            ModScope::Instrument(index) => index == instrument,
            ModScope::Active | ModScope::All => true,
        }
    }
}

/// One modulation slot of a mod-channel instrument.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModSlot {
    /// The wired parameter, or `None` for a free slot.
    pub param: Option<ModParam>,
    /// Targeted channel; `None` for song-wide parameters.
    pub channel: Option<usize>,
    pub scope: ModScope,
}

impl Default for ModSlot {
    fn default() -> Self {
        Self { param: None, channel: None, scope: ModScope::All }
    }
}

impl ModSlot {
    /// Whether this slot captures a live edit of `param` on
    /// `edited_instrument` of `edited_channel`.
    pub fn matches(self, param: ModParam, edited_channel: usize, edited_instrument: usize) -> bool {
        if self.param != Some(param) {
            return false;
        }
        if param.for_song() {
            self.channel.is_none()
        } else {
            self.channel == Some(edited_channel) && self.scope.includes(edited_instrument)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn song_wide_slot_matches_any_channel() {
        let slot = ModSlot { param: Some(ModParam::Tempo), channel: None, scope: ModScope::All };
        assert!(slot.matches(ModParam::Tempo, 0, 0));
        assert!(slot.matches(ModParam::Tempo, 3, 1));
        assert!(!slot.matches(ModParam::Pan, 0, 0));
    }

    #[test]
    fn instrument_slot_requires_channel_and_scope() {
        let slot = ModSlot {
            param: Some(ModParam::Pan),
            channel: Some(1),
            scope: ModScope::Instrument(0),
        };
        assert!(slot.matches(ModParam::Pan, 1, 0));
        assert!(!slot.matches(ModParam::Pan, 1, 1));
        assert!(!slot.matches(ModParam::Pan, 2, 0));
    }

    #[test]
    fn active_scope_matches_any_instrument() {
        let slot = ModSlot {
            param: Some(ModParam::Reverb),
            channel: Some(0),
            scope: ModScope::Active,
        };
        assert!(slot.matches(ModParam::Reverb, 0, 0));
        assert!(slot.matches(ModParam::Reverb, 0, 5));
    }

    #[test]
    fn free_slot_matches_nothing() {
        let slot = ModSlot::default();
        for param in ModParam::ALL {
            assert!(!slot.matches(param, 0, 0));
        }
    }

    #[test]
    fn real_offset_round_trips() {
        // raw 0 maps to the parameter's lowest real value.
        assert_eq!(ModParam::Tempo.real_offset(), 30);
        assert_eq!(ModParam::MixVolume.real_offset() + ModParam::MixVolume.max_raw(), 25);
    }
}
