//! Typed, ergonomic view of a non-sysex MIDI message.
//!
//! The writer and parser (C2/C3) work directly on raw `[u8; 3]` buffers and
//! a status byte, as the wire format and spec require. `Message` is a
//! convenience layer on top of that: callers who don't want to poke at raw
//! bytes can build a `Message` and convert it with [`Message::to_bytes`], or
//! turn a parsed `(bytes, len)` pair back into one with
//! [`Message::from_bytes`]. Sysex is not representable here — it is always
//! streamed through the `begin_sysex`/`append_sysex_data`/`end_sysex` API.

use core::convert::{TryFrom, TryInto};
use Message::*;

use crate::note::Note;
use crate::status::{self, Status};
use crate::{Bend, Channel, Control, MidiError, Pressure, Program, Velocity, U7};

#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Message {
    NoteOff(Channel, Note, Velocity),
    NoteOn(Channel, Note, Velocity),
    PolyPressure(Channel, Note, Pressure),
    ChannelPressure(Channel, Pressure),
    ProgramChange(Channel, Program),
    ControlChange(Channel, Control, U7),
    PitchBend(Channel, Bend),

    TimeCodeQuarterFrame(U7),
    SongPositionPointer(U7, U7),
    SongSelect(U7),
    TuneRequest,

    TimingClock,
    Start,
    Continue,
    Stop,
    ActiveSensing,
    SystemReset,
}

pub fn note_on(
    channel: Channel,
    note: impl TryInto<Note, Error = MidiError>,
    velocity: impl TryInto<Velocity, Error = MidiError>,
) -> Result<Message, MidiError> {
    Ok(NoteOn(channel, note.try_into()?, velocity.try_into()?))
}

pub fn note_off(
    channel: Channel,
    note: impl TryInto<Note, Error = MidiError>,
    velocity: impl TryInto<Velocity, Error = MidiError>,
) -> Result<Message, MidiError> {
    Ok(NoteOff(channel, note.try_into()?, velocity.try_into()?))
}

pub fn program_change(
    channel: Channel,
    program: impl TryInto<Program, Error = MidiError>,
) -> Result<Message, MidiError> {
    Ok(ProgramChange(channel, program.try_into()?))
}

impl Message {
    /// Status byte this message would be encoded with, channel folded in.
    pub fn status_byte(&self) -> u8 {
        match self {
            NoteOff(ch, ..) => status::NOTE_OFF | ch.0,
            NoteOn(ch, ..) => status::NOTE_ON | ch.0,
            PolyPressure(ch, ..) => status::POLY_PRESSURE | ch.0,
            ChannelPressure(ch, ..) => status::CHANNEL_PRESSURE | ch.0,
            ProgramChange(ch, ..) => status::PROGRAM_CHANGE | ch.0,
            ControlChange(ch, ..) => status::CONTROL_CHANGE | ch.0,
            PitchBend(ch, ..) => status::PITCH_BEND | ch.0,

            TimeCodeQuarterFrame(_) => status::TIME_CODE_QUARTER_FRAME,
            SongPositionPointer(..) => status::SONG_POSITION_POINTER,
            SongSelect(_) => status::SONG_SELECT,
            TuneRequest => status::TUNE_REQUEST,
            TimingClock => status::TIMING_CLOCK,
            Start => status::START,
            Continue => status::CONTINUE,
            Stop => status::STOP,
            ActiveSensing => status::ACTIVE_SENSING,
            SystemReset => status::SYSTEM_RESET,
        }
    }

    /// Encode into a zero-padded 3 byte buffer, as consumed by
    /// `Writer::append_message`.
    pub fn to_bytes(&self) -> [u8; 3] {
        let mut bytes = [self.status_byte(), 0, 0];
        match *self {
            NoteOff(_, note, vel) | NoteOn(_, note, vel) => {
                bytes[1] = u8::from(note);
                bytes[2] = u8::from(vel);
            }
            PolyPressure(_, note, pres) => {
                bytes[1] = u8::from(note);
                bytes[2] = u8::from(pres);
            }
            ChannelPressure(_, pres) => bytes[1] = u8::from(pres),
            ProgramChange(_, prog) => bytes[1] = u8::from(prog),
            ControlChange(_, ctrl, val) => {
                bytes[1] = u8::from(ctrl);
                bytes[2] = u8::from(val);
            }
            PitchBend(_, bend) => {
                let (lsb, msb): (U7, U7) = bend.into();
                bytes[1] = u8::from(lsb);
                bytes[2] = u8::from(msb);
            }
            TimeCodeQuarterFrame(v) => bytes[1] = u8::from(v),
            SongPositionPointer(lsb, msb) => {
                bytes[1] = u8::from(lsb);
                bytes[2] = u8::from(msb);
            }
            SongSelect(song) => bytes[1] = u8::from(song),
            TuneRequest | TimingClock | Start | Continue | Stop | ActiveSensing | SystemReset => {}
        }
        bytes
    }

    /// Parse a message from its status byte and data bytes, as delivered by
    /// `ParseCallbacks::on_message`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Message, MidiError> {
        if bytes.is_empty() {
            return Err(MidiError::InvalidStatus(0));
        }
        let status_byte = bytes[0];
        let status =
            Status::try_from(status_byte).map_err(|_| MidiError::InvalidStatus(status_byte))?;
        let channel = crate::channel_from_status(status_byte);
        let d = |i: usize| -> u8 { *bytes.get(i).unwrap_or(&0) };

        Ok(match status {
            Status::NoteOff => NoteOff(channel, Note::try_from(d(1))?, Velocity::try_from(d(2))?),
            Status::NoteOn => NoteOn(channel, Note::try_from(d(1))?, Velocity::try_from(d(2))?),
            Status::PolyPressure => {
                PolyPressure(channel, Note::try_from(d(1))?, Pressure::try_from(d(2))?)
            }
            Status::ChannelPressure => ChannelPressure(channel, Pressure::try_from(d(1))?),
            Status::ProgramChange => ProgramChange(channel, Program::try_from(d(1))?),
            Status::ControlChange => {
                ControlChange(channel, Control::try_from(d(1))?, U7::try_from(d(2))?)
            }
            Status::PitchBend => PitchBend(channel, Bend::try_from((d(1), d(2)))?),
            Status::TimeCodeQuarterFrame => TimeCodeQuarterFrame(U7::try_from(d(1))?),
            Status::SongPositionPointer => {
                SongPositionPointer(U7::try_from(d(1))?, U7::try_from(d(2))?)
            }
            Status::SongSelect => SongSelect(U7::try_from(d(1))?),
            Status::TuneRequest => TuneRequest,
            Status::TimingClock => TimingClock,
            Status::Start => Start,
            Status::Continue => Continue,
            Status::Stop => Stop,
            Status::ActiveSensing => ActiveSensing,
            Status::SystemReset => SystemReset,
            Status::SysexStart => return Err(MidiError::InvalidStatus(status_byte)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel;

    #[test]
    fn note_on_round_trips() {
        let msg = note_on(channel(1), 60u8, 100u8).unwrap();
        let bytes = msg.to_bytes();
        assert_eq!(bytes, [0x90, 60, 100]);
        let back = Message::from_bytes(&bytes).unwrap();
        match back {
            NoteOn(ch, note, vel) => {
                assert_eq!(ch.0, 0);
                assert_eq!(u8::from(note), 60);
                assert_eq!(u8::from(vel), 100);
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn realtime_has_no_data_bytes() {
        let bytes = TimingClock.to_bytes();
        assert_eq!(bytes, [0xF8, 0, 0]);
    }
}
