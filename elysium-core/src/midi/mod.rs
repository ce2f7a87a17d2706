//! MIDI output: the sink trait the engine writes to, plus a recording sink
//! for tests and a midir-backed hardware/virtual port sink.

use elysium_types::MidiMessage;
use midir::{MidiOutput, MidiOutputConnection};

use crate::config::Config;
use crate::error::{EngineError, EngineResult};

/// Destination for engine output. Sends are fire-and-forget.
pub trait MidiSink {
    fn note_on(&mut self, note: u8, velocity: u8, channel: u8);
    fn note_off(&mut self, note: u8, velocity: u8, channel: u8);
    fn program_change(&mut self, preset: u8, channel: u8);

    fn send(&mut self, message: MidiMessage) {
        match message {
            MidiMessage::NoteOn { note, velocity, channel } => self.note_on(note, velocity, channel),
            MidiMessage::NoteOff { note, velocity, channel } => self.note_off(note, velocity, channel),
            MidiMessage::ProgramChange { preset, channel } => self.program_change(preset, channel),
        }
    }
}

/// Keeps every message in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordingSink {
    pub messages: Vec<MidiMessage>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain the recorded messages.
    pub fn take(&mut self) -> Vec<MidiMessage> {
        std::mem::take(&mut self.messages)
    }

    pub fn note_ons(&self) -> impl Iterator<Item = &MidiMessage> {
        self.messages.iter().filter(|m| matches!(m, MidiMessage::NoteOn { .. }))
    }
}

impl MidiSink for RecordingSink {
    fn note_on(&mut self, note: u8, velocity: u8, channel: u8) {
        self.messages.push(MidiMessage::NoteOn { note, velocity, channel });
    }

    fn note_off(&mut self, note: u8, velocity: u8, channel: u8) {
        self.messages.push(MidiMessage::NoteOff { note, velocity, channel });
    }

    fn program_change(&mut self, preset: u8, channel: u8) {
        self.messages.push(MidiMessage::ProgramChange { preset, channel });
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl MidiSink for NullSink {
    fn note_on(&mut self, _note: u8, _velocity: u8, _channel: u8) {}
    fn note_off(&mut self, _note: u8, _velocity: u8, _channel: u8) {}
    fn program_change(&mut self, _preset: u8, _channel: u8) {}
}

/// Information about an available MIDI output port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MidiPortInfo {
    pub index: usize,
    pub name: String,
}

/// Writes to a system MIDI output port through midir.
pub struct MidiOutputSink {
    client_name: String,
    port_name: String,
    connection: Option<MidiOutputConnection>,
    connected_port_name: Option<String>,
}

impl MidiOutputSink {
    pub fn new(client_name: &str, port_name: &str) -> Self {
        Self {
            client_name: client_name.to_string(),
            port_name: port_name.to_string(),
            connection: None,
            connected_port_name: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.midi_client_name(), config.midi_port_name())
    }

    /// List the output ports currently visible to the MIDI backend.
    pub fn list_ports(&self) -> Vec<MidiPortInfo> {
        let Ok(midi_out) = MidiOutput::new(&self.client_name) else {
            return Vec::new();
        };
        midi_out
            .ports()
            .iter()
            .enumerate()
            .filter_map(|(index, port)| {
                midi_out.port_name(port).ok().map(|name| MidiPortInfo { index, name })
            })
            .collect()
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    pub fn connected_port_name(&self) -> Option<&str> {
        self.connected_port_name.as_deref()
    }

    /// Connect to an output port by index, dropping any existing connection.
    pub fn connect(&mut self, port_index: usize) -> EngineResult {
        self.disconnect();

        let midi_out = MidiOutput::new(&self.client_name).map_err(|e| EngineError::Midi(e.to_string()))?;
        let ports = midi_out.ports();
        let port = ports
            .get(port_index)
            .ok_or_else(|| EngineError::Midi(format!("invalid port index: {}", port_index)))?;
        let name = midi_out.port_name(port).unwrap_or_else(|_| "Unknown".to_string());

        let connection = midi_out
            .connect(port, &self.port_name)
            .map_err(|e| EngineError::Midi(e.to_string()))?;
        log::info!(target: "midi", "connected to output port {}", name);
        self.connection = Some(connection);
        self.connected_port_name = Some(name);
        Ok(())
    }

    pub fn disconnect(&mut self) {
        if let Some(conn) = self.connection.take() {
            conn.close();
        }
        self.connected_port_name = None;
    }

    fn write(&mut self, message: MidiMessage) {
        let Some(conn) = self.connection.as_mut() else {
            log::trace!(target: "midi", "not connected, dropping {:?}", message);
            return;
        };
        if let Err(e) = conn.send(&message.to_bytes()) {
            log::warn!(target: "midi", "send failed: {}", e);
        }
    }
}

impl MidiSink for MidiOutputSink {
    fn note_on(&mut self, note: u8, velocity: u8, channel: u8) {
        self.write(MidiMessage::NoteOn { note, velocity, channel });
    }

    fn note_off(&mut self, note: u8, velocity: u8, channel: u8) {
        self.write(MidiMessage::NoteOff { note, velocity, channel });
    }

    fn program_change(&mut self, preset: u8, channel: u8) {
        self.write(MidiMessage::ProgramChange { preset, channel });
    }
}

impl Drop for MidiOutputSink {
    fn drop(&mut self) {
        self.disconnect();
    }
}
