//! Status byte classification (design §4.1, "MIDI classifier").
//!
//! Pure, side-effect-free functions operating on a single status byte. Used
//! by both the packet writer and the packet parser so the two sides of the
//! wire agree on message boundaries.

use core::convert::TryFrom;
use num_enum::TryFromPrimitive;

pub const NOTE_OFF: u8 = 0x80;
pub const NOTE_ON: u8 = 0x90;
pub const POLY_PRESSURE: u8 = 0xA0;
pub const CONTROL_CHANGE: u8 = 0xB0;
pub const PROGRAM_CHANGE: u8 = 0xC0;
pub const CHANNEL_PRESSURE: u8 = 0xD0;
pub const PITCH_BEND: u8 = 0xE0;

pub const SYSEX_START: u8 = 0xF0;
pub const TIME_CODE_QUARTER_FRAME: u8 = 0xF1;
pub const SONG_POSITION_POINTER: u8 = 0xF2;
pub const SONG_SELECT: u8 = 0xF3;
pub const TUNE_REQUEST: u8 = 0xF6;
/// Sysex terminator. Not a channel/common/realtime status (§3: `SysexEnd(0xF7)`).
pub const SYSEX_END: u8 = 0xF7;

pub const TIMING_CLOCK: u8 = 0xF8;
pub const START: u8 = 0xFA;
pub const CONTINUE: u8 = 0xFB;
pub const STOP: u8 = 0xFC;
pub const ACTIVE_SENSING: u8 = 0xFE;
pub const SYSTEM_RESET: u8 = 0xFF;

/// `true` for data bytes (`b < 0x80`).
#[inline]
pub fn is_data(b: u8) -> bool {
    b < 0x80
}

/// Channel voice messages, `8x`..`Ex`.
#[inline]
pub fn is_channel(b: u8) -> bool {
    (NOTE_OFF..SYSEX_START).contains(&b)
}

/// System real-time, single-byte, may be interspersed anywhere including
/// inside a sysex stream.
#[inline]
pub fn is_realtime(b: u8) -> bool {
    matches!(
        b,
        TIMING_CLOCK | START | CONTINUE | STOP | ACTIVE_SENSING | SYSTEM_RESET
    )
}

/// System common, `F1/F2/F3/F6`.
#[inline]
pub fn is_system_common(b: u8) -> bool {
    matches!(
        b,
        TIME_CODE_QUARTER_FRAME | SONG_POSITION_POINTER | SONG_SELECT | TUNE_REQUEST
    )
}

/// Expected message length in bytes (status byte included), or `0` if `b`
/// is not a status byte recognized here. Sysex framing bytes (`F0`, `F7`)
/// are handled out-of-band by the writer/parser and return `0`.
pub fn status_length(b: u8) -> u8 {
    if is_channel(b) {
        match b & 0xF0 {
            PROGRAM_CHANGE | CHANNEL_PRESSURE => 2,
            _ => 3,
        }
    } else {
        match b {
            TIME_CODE_QUARTER_FRAME | SONG_SELECT => 2,
            SONG_POSITION_POINTER => 3,
            TUNE_REQUEST => 1,
            TIMING_CLOCK | START | CONTINUE | STOP | ACTIVE_SENSING | SYSTEM_RESET => 1,
            _ => 0,
        }
    }
}

/// Typed status byte, channel nibble stripped for channel messages.
///
/// Used by the typed [`crate::message::Message`] convenience layer; the
/// writer and parser (C2/C3) work directly on raw bytes and do not need
/// this type.
#[derive(Copy, Clone, Debug, Eq, PartialEq, TryFromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Status {
    NoteOff = NOTE_OFF,
    NoteOn = NOTE_ON,
    PolyPressure = POLY_PRESSURE,
    ControlChange = CONTROL_CHANGE,
    ProgramChange = PROGRAM_CHANGE,
    ChannelPressure = CHANNEL_PRESSURE,
    PitchBend = PITCH_BEND,

    SysexStart = SYSEX_START,

    TimeCodeQuarterFrame = TIME_CODE_QUARTER_FRAME,
    SongPositionPointer = SONG_POSITION_POINTER,
    SongSelect = SONG_SELECT,
    TuneRequest = TUNE_REQUEST,

    TimingClock = TIMING_CLOCK,
    Start = START,
    Continue = CONTINUE,
    Stop = STOP,
    ActiveSensing = ACTIVE_SENSING,
    SystemReset = SYSTEM_RESET,
}

impl TryFrom<u8> for Status {
    type Error = ();

    fn try_from(mut byte: u8) -> Result<Self, Self::Error> {
        if is_channel(byte) {
            byte &= 0xF0;
        }
        Status::try_from_primitive(byte).map_err(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_lengths() {
        assert_eq!(status_length(0x80), 3); // note off
        assert_eq!(status_length(0x9F), 3); // note on, channel nibble ignored
        assert_eq!(status_length(0xC3), 2); // program change
        assert_eq!(status_length(0xD7), 2); // channel pressure
        assert_eq!(status_length(0xB0), 3); // control change
        assert_eq!(status_length(0xE0), 3); // pitch bend
    }

    #[test]
    fn system_common_lengths() {
        assert_eq!(status_length(0xF1), 2);
        assert_eq!(status_length(0xF2), 3);
        assert_eq!(status_length(0xF3), 2);
        assert_eq!(status_length(0xF6), 1);
    }

    #[test]
    fn realtime_lengths_are_one() {
        for b in [0xF8, 0xFA, 0xFB, 0xFC, 0xFE, 0xFF] {
            assert_eq!(status_length(b), 1);
        }
    }

    #[test]
    fn sysex_framing_returns_zero() {
        assert_eq!(status_length(0xF0), 0);
        assert_eq!(status_length(0xF7), 0);
    }

    #[test]
    fn undefined_bytes_return_zero() {
        assert_eq!(status_length(0xF4), 0);
        assert_eq!(status_length(0xF5), 0);
        assert_eq!(status_length(0xF9), 0);
        assert_eq!(status_length(0xFD), 0);
    }

    #[test]
    fn classification_predicates() {
        assert!(is_channel(0x91));
        assert!(!is_channel(0xF1));
        assert!(is_realtime(0xF8));
        assert!(!is_realtime(0xF9));
        assert!(is_system_common(0xF6));
        assert!(!is_system_common(0xF8));
        assert!(is_data(0x7F));
        assert!(!is_data(0x80));
    }
}
