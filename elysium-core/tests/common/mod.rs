#![allow(dead_code)]

use elysium_core::midi::RecordingSink;
use elysium_core::state::{EdgePolicy, Layer, LayerSettings};
use elysium_core::tool::ToolRegistry;
use elysium_types::{CellId, MidiMessage};

pub fn registry() -> ToolRegistry {
    ToolRegistry::with_builtins()
}

pub fn layer(columns: u32, rows: u32, base_pitch: i32, edge_policy: EdgePolicy) -> Layer {
    Layer::new(LayerSettings { columns, rows, base_pitch, edge_policy, seed: 1 })
}

pub fn cell(layer: &Layer, column: u32, row: u32) -> CellId {
    layer.cell_at(column, row).expect("cell on grid")
}

/// Tick `n` times, returning what each tick sent.
pub fn run(layer: &mut Layer, n: usize) -> Vec<Vec<MidiMessage>> {
    let mut sink = RecordingSink::new();
    (0..n)
        .map(|_| {
            layer.tick(&mut sink).expect("tick");
            sink.take()
        })
        .collect()
}

pub fn note_ons(messages: &[MidiMessage]) -> Vec<(u8, u8)> {
    messages
        .iter()
        .filter_map(|m| match m {
            MidiMessage::NoteOn { note, velocity, .. } => Some((*note, *velocity)),
            _ => None,
        })
        .collect()
}
