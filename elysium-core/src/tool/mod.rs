//! Tools: behaviours attached to cells and run when a playhead visits.
//!
//! A [`Tool`] holds what every tool shares (enabled flag, preferred order,
//! gate knobs, run state, script references, attachment) and a [`ToolKind`]
//! with the type-specific knobs and effect. Running a tool never touches the
//! grid: it returns [`ToolEffects`] that the layer commits.

mod flow;
mod motion;
mod note;
pub mod registry;

use std::collections::BTreeMap;

use elysium_types::{CellId, Direction, KnobId, MidiMessage, ToolData};

use crate::error::{EngineError, EngineResult};
use crate::state::knob::{Knob, KnobBank, KnobRange};
use crate::state::layer::LayerKnobs;
use crate::state::random::Lcg;

pub use flow::{GenerateTool, SplitTool};
pub use motion::{ReboundTool, SkipTool, SpinTool};
pub use note::NoteTool;
pub use registry::{ToolConstructor, ToolRegistry};

pub const NOTE: &str = "note";
pub const REBOUND: &str = "rebound";
pub const SPIN: &str = "spin";
pub const SKIP: &str = "skip";
pub const ABSORB: &str = "absorb";
pub const SPLIT: &str = "split";
pub const GENERATE: &str = "generate";

const PERCENT: KnobRange = KnobRange::fixed(0.0, 100.0, 1.0);
const GATE: KnobRange = KnobRange::fixed(1.0, 64.0, 1.0);

/// Per-visit bookkeeping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunState {
    /// The effect ran on the most recent visit.
    pub fired: bool,
    /// Visits still to be suppressed.
    pub skip: u32,
    /// Visits seen since attachment.
    pub gate_count: u32,
}

/// Read-only view of the world a tool runs against.
pub struct RunContext<'a> {
    pub knobs: &'a KnobBank,
    pub layer: &'a LayerKnobs,
    /// Logical time used for every oscillator sample in this tick.
    pub time: f64,
    pub beat: u64,
    pub cell: CellId,
    pub pitch: Option<u8>,
    /// Playhead direction as left by the tools that ran before.
    pub direction: Direction,
}

/// Staged outcome of one tool run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolEffects {
    /// Sent immediately, in order.
    pub messages: Vec<MidiMessage>,
    /// Sent once the given number of steps has elapsed.
    pub note_offs: Vec<(MidiMessage, f32)>,
    pub direction: Option<Direction>,
    pub skip: u32,
    /// Remove the visiting playhead after this visit.
    pub absorb: bool,
    /// Start new playheads next to this cell, one per direction.
    pub spawn: Vec<Direction>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ToolKind {
    Note(NoteTool),
    Rebound(ReboundTool),
    Spin(SpinTool),
    Skip(SkipTool),
    Absorb,
    Split(SplitTool),
    Generate(GenerateTool),
}

impl ToolKind {
    fn knobs(&self) -> Vec<(&'static str, KnobId)> {
        match self {
            ToolKind::Note(t) => t.knobs(),
            ToolKind::Rebound(t) => t.knobs(),
            ToolKind::Spin(t) => t.knobs(),
            ToolKind::Skip(t) => t.knobs(),
            ToolKind::Absorb => Vec::new(),
            ToolKind::Split(t) => t.knobs(),
            ToolKind::Generate(t) => t.knobs(),
        }
    }

    fn run(&self, ctx: &RunContext, effects: &mut ToolEffects) -> EngineResult {
        match self {
            ToolKind::Note(t) => t.run(ctx, effects),
            ToolKind::Rebound(t) => t.run(ctx, effects),
            ToolKind::Spin(t) => t.run(ctx, effects),
            ToolKind::Skip(t) => t.run(ctx, effects),
            ToolKind::Absorb => {
                effects.absorb = true;
                Ok(())
            }
            ToolKind::Split(t) => t.run(ctx, effects),
            // Generators act on the beat pulse, not on visits.
            ToolKind::Generate(_) => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tool {
    tool_type: String,
    kind: ToolKind,
    enabled: bool,
    preferred_order: i32,
    p_knob: KnobId,
    gate_knob: KnobId,
    state: RunState,
    scripts: BTreeMap<String, String>,
    cell: Option<CellId>,
    attach_seq: u64,
}

impl Tool {
    /// Build a tool around `kind`, allocating the shared gate knobs in `bank`.
    pub fn new(tool_type: &str, kind: ToolKind, preferred_order: i32, bank: &mut KnobBank) -> Self {
        Self {
            tool_type: tool_type.to_string(),
            kind,
            enabled: true,
            preferred_order,
            p_knob: bank.insert(Knob::integer("p", 100, PERCENT)),
            gate_knob: bank.insert(Knob::integer("gate", 1, GATE)),
            state: RunState::default(),
            scripts: BTreeMap::new(),
            cell: None,
            attach_seq: 0,
        }
    }

    pub fn tool_type(&self) -> &str {
        &self.tool_type
    }

    pub fn kind(&self) -> &ToolKind {
        &self.kind
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn preferred_order(&self) -> i32 {
        self.preferred_order
    }

    pub fn set_preferred_order(&mut self, order: i32) {
        self.preferred_order = order;
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Suppress the effect of the next `visits` visits.
    pub fn skip_next(&mut self, visits: u32) {
        self.state.skip = self.state.skip.saturating_add(visits);
    }

    pub fn cell(&self) -> Option<CellId> {
        self.cell
    }

    pub(crate) fn attach_seq(&self) -> u64 {
        self.attach_seq
    }

    pub fn scripts(&self) -> &BTreeMap<String, String> {
        &self.scripts
    }

    pub fn set_script(&mut self, name: &str, source: &str) {
        self.scripts.insert(name.to_string(), source.to_string());
    }

    pub fn remove_script(&mut self, name: &str) -> Option<String> {
        self.scripts.remove(name)
    }

    /// All knobs owned by this tool, gate knobs first.
    pub fn knobs(&self) -> Vec<(&'static str, KnobId)> {
        let mut knobs = vec![("p", self.p_knob), ("gate", self.gate_knob)];
        knobs.extend(self.kind.knobs());
        knobs
    }

    pub fn knob(&self, name: &str) -> Option<KnobId> {
        self.knobs().into_iter().find(|(n, _)| *n == name).map(|(_, id)| id)
    }

    pub(crate) fn added_to_layer(&mut self, cell: CellId, attach_seq: u64) {
        self.cell = Some(cell);
        self.attach_seq = attach_seq;
        self.state = RunState::default();
    }

    /// Detach hook: clears the attachment and releases the tool's knobs.
    pub(crate) fn removed_from_layer(&mut self, bank: &mut KnobBank) {
        for (_, id) in self.knobs() {
            bank.release(id);
        }
        self.cell = None;
    }

    /// Handle a playhead visit. Run state is only updated when every knob
    /// read succeeds, so a failing tool leaves nothing half-done.
    pub(crate) fn visit(&mut self, ctx: &RunContext, rng: &mut Lcg) -> EngineResult<ToolEffects> {
        let mut state = self.state;
        state.gate_count = state.gate_count.wrapping_add(1);
        state.fired = false;
        let mut effects = ToolEffects::default();

        if self.enabled && state.skip > 0 {
            state.skip -= 1;
        } else if self.enabled && self.gate_open(ctx, state.gate_count, rng)? {
            self.kind.run(ctx, &mut effects)?;
            state.fired = true;
        }

        self.state = state;
        Ok(effects)
    }

    /// Beat pulse for generators. Returns the direction and lifetime of a
    /// playhead to start on this tool's cell.
    pub(crate) fn pulse(&self, ctx: &RunContext, rng: &mut Lcg) -> EngineResult<Option<(Direction, Option<u32>)>> {
        let ToolKind::Generate(generator) = &self.kind else {
            return Ok(None);
        };
        if !self.enabled {
            return Ok(None);
        }
        let spawn = generator.pulse(ctx)?;
        if spawn.is_none() || !self.probability_passes(ctx, rng)? {
            return Ok(None);
        }
        Ok(spawn)
    }

    fn gate_open(&self, ctx: &RunContext, gate_count: u32, rng: &mut Lcg) -> EngineResult<bool> {
        let every = ctx.knobs.dynamic_i32(self.gate_knob, ctx.time)?.max(1) as u32;
        if gate_count.wrapping_sub(1) % every != 0 {
            return Ok(false);
        }
        self.probability_passes(ctx, rng)
    }

    /// Rolls the random source only when `p` is below 100, so tools that
    /// never declare a probability stay fully deterministic.
    fn probability_passes(&self, ctx: &RunContext, rng: &mut Lcg) -> EngineResult<bool> {
        let p = ctx.knobs.dynamic_i32(self.p_knob, ctx.time)?;
        if p >= 100 {
            return Ok(true);
        }
        Ok((rng.next_percent() as i32) < p)
    }

    pub fn to_data(&self, bank: &KnobBank, link_name: impl Fn(KnobId) -> Option<String>) -> EngineResult<ToolData> {
        let mut knobs = BTreeMap::new();
        for (name, id) in self.knobs() {
            let knob = bank.get(id)?;
            let linked = knob.linked().and_then(&link_name);
            if knob.linked().is_some() && linked.is_none() {
                log::warn!(target: "save", "{} knob {} links to a non-layer knob; link not saved", self.tool_type, name);
            }
            knobs.insert(name.to_string(), knob.to_data(linked));
        }
        Ok(ToolData {
            tool_type: self.tool_type.clone(),
            enabled: self.enabled,
            preferred_order: self.preferred_order,
            knobs,
            scripts: self.scripts.clone(),
        })
    }

    /// Apply saved configuration to a freshly constructed tool. Links are
    /// resolved through `resolve_link`, which maps a layer knob name to its id.
    pub fn apply_data(
        &mut self,
        data: &ToolData,
        bank: &mut KnobBank,
        resolve_link: impl Fn(&str) -> Option<KnobId>,
    ) -> EngineResult {
        if data.tool_type != self.tool_type {
            return Err(EngineError::Malformed(format!(
                "expected {} data, got {}",
                self.tool_type, data.tool_type
            )));
        }
        for name in data.knobs.keys() {
            if self.knob(name).is_none() {
                return Err(EngineError::UnknownKnob(format!("{}.{}", self.tool_type, name)));
            }
        }
        // Validate everything on scratch copies before touching the bank.
        let mut staged = Vec::new();
        for (name, knob_data) in &data.knobs {
            let id = self.knob(name).ok_or_else(|| EngineError::UnknownKnob(name.clone()))?;
            let mut knob = bank.get(id)?.clone();
            knob.apply_data(knob_data)?;
            let target = match &knob_data.linked {
                Some(target_name) => Some(
                    resolve_link(target_name).ok_or_else(|| EngineError::UnknownKnob(target_name.clone()))?,
                ),
                None => None,
            };
            staged.push((id, knob, target, knob_data.link_value));
        }
        for (id, knob, target, link_value) in staged {
            *bank.get_mut(id)? = knob;
            match target {
                Some(target) => bank.link(id, target, link_value)?,
                None => bank.unlink(id)?,
            }
        }
        self.enabled = data.enabled;
        self.preferred_order = data.preferred_order;
        self.scripts = data.scripts.clone();
        Ok(())
    }
}
