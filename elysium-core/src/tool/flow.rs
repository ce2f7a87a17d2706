//! Tools that create or remove playheads.

use elysium_types::{Direction, KnobId};

use super::{RunContext, ToolEffects};
use crate::error::EngineResult;
use crate::state::knob::{Knob, KnobBank, KnobRange};

const DIRECTION: KnobRange = KnobRange::fixed(0.0, 5.0, 1.0);
const PULSE: KnobRange = KnobRange::fixed(1.0, 64.0, 1.0);
const OFFSET: KnobRange = KnobRange::fixed(0.0, 63.0, 1.0);
const LIFETIME: KnobRange = KnobRange::fixed(1.0, 256.0, 1.0);

/// Replaces the visiting playhead with one per outgoing direction.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitTool {
    /// Also send a playhead back the way it came.
    pub bounce_back: KnobId,
}

impl SplitTool {
    pub fn new(bank: &mut KnobBank) -> Self {
        Self {
            bounce_back: bank.insert(Knob::boolean("bounce_back", false)),
        }
    }

    pub(super) fn knobs(&self) -> Vec<(&'static str, KnobId)> {
        vec![("bounce_back", self.bounce_back)]
    }

    pub(super) fn run(&self, ctx: &RunContext, effects: &mut ToolEffects) -> EngineResult {
        let bounce_back = ctx.knobs.dynamic_bool(self.bounce_back, ctx.time)?;
        let incoming = ctx.direction.opposite();
        effects.spawn = Direction::ALL
            .into_iter()
            .filter(|d| bounce_back || *d != incoming)
            .collect();
        effects.absorb = true;
        Ok(())
    }
}

/// Starts a new playhead on its cell every `pulse_every` beats.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateTool {
    pub direction: KnobId,
    pub pulse_every: KnobId,
    pub offset: KnobId,
    pub time_to_live: KnobId,
}

impl GenerateTool {
    pub fn new(bank: &mut KnobBank) -> Self {
        Self {
            direction: bank.insert(Knob::integer("direction", Direction::N.index() as i32, DIRECTION)),
            pulse_every: bank.insert(Knob::integer("pulse_every", 16, PULSE)),
            offset: bank.insert(Knob::integer("offset", 0, OFFSET)),
            time_to_live: bank.insert(Knob::integer("time_to_live", 16, LIFETIME)),
        }
    }

    pub(super) fn knobs(&self) -> Vec<(&'static str, KnobId)> {
        vec![
            ("direction", self.direction),
            ("pulse_every", self.pulse_every),
            ("offset", self.offset),
            ("time_to_live", self.time_to_live),
        ]
    }

    pub(super) fn pulse(&self, ctx: &RunContext) -> EngineResult<Option<(Direction, Option<u32>)>> {
        let every = ctx.knobs.dynamic_i32(self.pulse_every, ctx.time)?.max(1) as i64;
        let offset = ctx.knobs.dynamic_i32(self.offset, ctx.time)? as i64;
        let direction = ctx.knobs.dynamic_i32(self.direction, ctx.time)?;
        let ttl = ctx.knobs.dynamic_i32(self.time_to_live, ctx.time)?.max(1) as u32;
        if (ctx.beat as i64 - offset).rem_euclid(every) != 0 {
            return Ok(None);
        }
        Ok(Some((Direction::from_index(direction as i64), Some(ttl))))
    }
}
