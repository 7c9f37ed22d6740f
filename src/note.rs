use crate::{Cull, Fill, MidiError};
use core::convert::TryFrom;

/// A MIDI note number, 0-127 (middle C is 60).
#[derive(Copy, Clone, Debug, Eq, PartialOrd, PartialEq, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Note(pub u8);

impl TryFrom<u8> for Note {
    type Error = MidiError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value > Note::MAX.0 {
            Err(MidiError::InvalidNote)
        } else {
            Ok(Note(value))
        }
    }
}

impl From<Note> for u8 {
    fn from(value: Note) -> u8 {
        value.0
    }
}

impl Cull<u8> for Note {
    fn cull(value: u8) -> Note {
        Note(0x7F & value)
    }
}

impl Fill<u8> for Note {
    fn fill(value: u8) -> Note {
        match Note::try_from(value) {
            Ok(x) => x,
            _ => Note::MAX,
        }
    }
}

impl Note {
    pub const MAX: Note = Note(0x7F);
    pub const MIN: Note = Note(0);
}
