//! Outgoing MIDI messages and their wire encoding.

use serde::{Deserialize, Serialize};

const NOTE_OFF: u8 = 0x80;
const NOTE_ON: u8 = 0x90;
const PROGRAM_CHANGE: u8 = 0xC0;

/// The messages the engine emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MidiMessage {
    NoteOn {
        note: u8,
        velocity: u8,
        channel: u8,
    },
    NoteOff {
        note: u8,
        velocity: u8,
        channel: u8,
    },
    ProgramChange {
        preset: u8,
        channel: u8,
    },
}

impl MidiMessage {
    pub fn channel(&self) -> u8 {
        match *self {
            MidiMessage::NoteOn { channel, .. }
            | MidiMessage::NoteOff { channel, .. }
            | MidiMessage::ProgramChange { channel, .. } => channel,
        }
    }

    /// Encode as raw MIDI bytes. Channel is masked to 4 bits and data bytes
    /// to 7 bits; callers are expected to have clamped already.
    pub fn to_bytes(&self) -> Vec<u8> {
        match *self {
            MidiMessage::NoteOn { note, velocity, channel } => {
                vec![NOTE_ON | (channel & 0x0F), note & 0x7F, velocity & 0x7F]
            }
            MidiMessage::NoteOff { note, velocity, channel } => {
                vec![NOTE_OFF | (channel & 0x0F), note & 0x7F, velocity & 0x7F]
            }
            MidiMessage::ProgramChange { preset, channel } => {
                vec![PROGRAM_CHANGE | (channel & 0x0F), preset & 0x7F]
            }
        }
    }

    /// Decode a message produced by [`MidiMessage::to_bytes`].
    /// Returns `None` for anything else.
    pub fn from_bytes(bytes: &[u8]) -> Option<MidiMessage> {
        let status = *bytes.first()?;
        let channel = status & 0x0F;
        match status & 0xF0 {
            NOTE_ON if bytes.len() >= 3 => Some(MidiMessage::NoteOn {
                note: bytes[1] & 0x7F,
                velocity: bytes[2] & 0x7F,
                channel,
            }),
            NOTE_OFF if bytes.len() >= 3 => Some(MidiMessage::NoteOff {
                note: bytes[1] & 0x7F,
                velocity: bytes[2] & 0x7F,
                channel,
            }),
            PROGRAM_CHANGE if bytes.len() >= 2 => Some(MidiMessage::ProgramChange {
                preset: bytes[1] & 0x7F,
                channel,
            }),
            _ => None,
        }
    }
}
