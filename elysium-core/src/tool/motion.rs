//! Tools that steer the visiting playhead.

use elysium_types::{Direction, KnobId};

use super::{RunContext, ToolEffects};
use crate::error::EngineResult;
use crate::state::knob::{Knob, KnobBank, KnobRange};

const DIRECTION: KnobRange = KnobRange::fixed(0.0, 5.0, 1.0);
const ROTATION: KnobRange = KnobRange::fixed(1.0, 5.0, 1.0);
const SKIP_AMOUNT: KnobRange = KnobRange::fixed(0.0, 16.0, 1.0);

/// Sends the playhead off in a fixed direction.
#[derive(Debug, Clone, PartialEq)]
pub struct ReboundTool {
    pub direction: KnobId,
}

impl ReboundTool {
    pub fn new(bank: &mut KnobBank) -> Self {
        Self {
            direction: bank.insert(Knob::integer("direction", Direction::N.index() as i32, DIRECTION)),
        }
    }

    pub(super) fn knobs(&self) -> Vec<(&'static str, KnobId)> {
        vec![("direction", self.direction)]
    }

    pub(super) fn run(&self, ctx: &RunContext, effects: &mut ToolEffects) -> EngineResult {
        let index = ctx.knobs.dynamic_i32(self.direction, ctx.time)?;
        effects.direction = Some(Direction::from_index(index as i64));
        Ok(())
    }
}

/// Rotates the playhead's current direction.
#[derive(Debug, Clone, PartialEq)]
pub struct SpinTool {
    pub clockwise: KnobId,
    pub stepping: KnobId,
}

impl SpinTool {
    pub fn new(bank: &mut KnobBank) -> Self {
        Self {
            clockwise: bank.insert(Knob::boolean("clockwise", true)),
            stepping: bank.insert(Knob::integer("stepping", 1, ROTATION)),
        }
    }

    pub(super) fn knobs(&self) -> Vec<(&'static str, KnobId)> {
        vec![("clockwise", self.clockwise), ("stepping", self.stepping)]
    }

    pub(super) fn run(&self, ctx: &RunContext, effects: &mut ToolEffects) -> EngineResult {
        let clockwise = ctx.knobs.dynamic_bool(self.clockwise, ctx.time)?;
        let steps = ctx.knobs.dynamic_i32(self.stepping, ctx.time)? as i64;
        let steps = if clockwise { steps } else { -steps };
        effects.direction = Some(ctx.direction.rotate(steps));
        Ok(())
    }
}

/// Makes the playhead jump over cells on its next move.
#[derive(Debug, Clone, PartialEq)]
pub struct SkipTool {
    pub amount: KnobId,
}

impl SkipTool {
    pub fn new(bank: &mut KnobBank) -> Self {
        Self {
            amount: bank.insert(Knob::integer("amount", 1, SKIP_AMOUNT)),
        }
    }

    pub(super) fn knobs(&self) -> Vec<(&'static str, KnobId)> {
        vec![("amount", self.amount)]
    }

    pub(super) fn run(&self, ctx: &RunContext, effects: &mut ToolEffects) -> EngineResult {
        effects.skip += ctx.knobs.dynamic_i32(self.amount, ctx.time)?.max(0) as u32;
        Ok(())
    }
}
