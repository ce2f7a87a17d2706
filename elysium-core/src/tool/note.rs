use elysium_types::{KnobId, MidiMessage};

use super::{RunContext, ToolEffects};
use crate::error::EngineResult;
use crate::state::knob::{Knob, KnobBank, KnobRange};

const MIDI_VALUE: KnobRange = KnobRange::fixed(0.0, 127.0, 1.0);
const DURATION: KnobRange = KnobRange::fixed(0.0, 64.0, 0.01);
const TRIAD: KnobRange = KnobRange::fixed(0.0, 6.0, 1.0);

/// Semitone offsets for each `triad` setting. 0 plays the single note.
const CHORDS: [&[i32]; 7] = [
    &[0],
    &[0, 4, 7],
    &[0, 3, 7],
    &[0, 3, 6],
    &[0, 4, 8],
    &[0, 2, 7],
    &[0, 5, 7],
];

/// Plays the cell's pitch (plus layer transpose) on the layer channel.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteTool {
    pub velocity: KnobId,
    /// Velocity for the first beat of a bar; 0 disables emphasis.
    pub emphasis: KnobId,
    /// Steps until the note-off.
    pub duration: KnobId,
    pub triad: KnobId,
}

impl NoteTool {
    pub fn new(bank: &mut KnobBank) -> Self {
        Self {
            velocity: bank.insert(Knob::integer("velocity", 100, MIDI_VALUE)),
            emphasis: bank.insert(Knob::integer("emphasis", 0, MIDI_VALUE)),
            duration: bank.insert(Knob::float("duration", 0.5, DURATION)),
            triad: bank.insert(Knob::integer("triad", 0, TRIAD)),
        }
    }

    pub(super) fn knobs(&self) -> Vec<(&'static str, KnobId)> {
        vec![
            ("velocity", self.velocity),
            ("emphasis", self.emphasis),
            ("duration", self.duration),
            ("triad", self.triad),
        ]
    }

    pub(super) fn run(&self, ctx: &RunContext, effects: &mut ToolEffects) -> EngineResult {
        let knobs = ctx.knobs;
        let t = ctx.time;

        // Read every knob first so a failure emits nothing.
        let transpose = knobs.dynamic_i32(ctx.layer.transpose, t)?;
        let channel = knobs.dynamic_i32(ctx.layer.channel, t)?.clamp(0, 15) as u8;
        let bar_length = knobs.dynamic_i32(ctx.layer.bar_length, t)?.max(1) as u64;
        let emphasis = knobs.dynamic_i32(self.emphasis, t)?;
        let velocity = knobs.dynamic_i32(self.velocity, t)?;
        let duration = knobs.dynamic_f32(self.duration, t)?;
        let triad = knobs.dynamic_i32(self.triad, t)?.clamp(0, CHORDS.len() as i32 - 1);

        let Some(pitch) = ctx.pitch else {
            return Ok(());
        };
        let velocity = if emphasis > 0 && ctx.beat % bar_length == 0 {
            emphasis
        } else {
            velocity
        }
        .clamp(0, 127) as u8;

        for offset in CHORDS[triad as usize] {
            let note = pitch as i32 + transpose + offset;
            if !(0..=127).contains(&note) {
                continue;
            }
            let note = note as u8;
            effects.messages.push(MidiMessage::NoteOn { note, velocity, channel });
            effects
                .note_offs
                .push((MidiMessage::NoteOff { note, velocity, channel }, duration));
        }
        Ok(())
    }
}
