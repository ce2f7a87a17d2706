//! The layer: owner of the cell arena, the playheads and the knob bank, and
//! the place where ticks happen.
//!
//! A tick runs in five phases:
//! 1. note-offs due at or before the current beat are sent, so a re-struck
//!    pitch is released before it sounds again;
//! 2. generator tools pulse and may start playheads on their cells;
//! 3. every playhead, in creation order, has the tools of its cell run and
//!    then moves (tool output is sent before the move);
//! 4. playheads started by split tools join the layer;
//! 5. note-offs due before the next beat are sent and the beat advances.
//!
//! Every edit method takes `&mut self`, so edits and ticks can never overlap.

use std::sync::mpsc::{self, Receiver, Sender};

use elysium_types::{CellId, Direction, HexCoord, KnobId, KnobValue, MidiMessage, PlayheadId};

use super::hex::{harmonic_pitch, neighbour_coord, HexCell};
use super::knob::{Knob, KnobBank, KnobRange};
use super::oscillator::Oscillator;
use super::playhead::{EdgePolicy, Playhead};
use super::random::Lcg;
use crate::error::{EngineError, EngineResult};
use crate::midi::MidiSink;
use crate::tool::{RunContext, Tool, ToolRegistry};

/// Longest side of a grid.
pub const MAX_DIMENSION: u32 = 256;

/// Construction parameters for a layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerSettings {
    pub columns: u32,
    pub rows: u32,
    /// Pitch of the cell at column 0, row 0.
    pub base_pitch: i32,
    pub edge_policy: EdgePolicy,
    pub seed: u64,
}

impl Default for LayerSettings {
    fn default() -> Self {
        Self {
            columns: 12,
            rows: 17,
            base_pitch: 12,
            edge_policy: EdgePolicy::default(),
            seed: 1,
        }
    }
}

/// Ids of the layer-wide knobs. Tool knobs can be linked to any of these.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerKnobs {
    pub enabled: KnobId,
    pub channel: KnobId,
    pub transpose: KnobId,
    pub velocity: KnobId,
    pub emphasis: KnobId,
    pub duration: KnobId,
    pub bar_length: KnobId,
    pub time_to_live: KnobId,
    pub pulse_every: KnobId,
    /// Program sent on start; -1 sends nothing.
    pub program: KnobId,
}

impl LayerKnobs {
    pub(crate) fn new(bank: &mut KnobBank) -> Self {
        let midi = KnobRange::fixed(0.0, 127.0, 1.0);
        Self {
            enabled: bank.insert(Knob::boolean("enabled", true)),
            channel: bank.insert(Knob::integer("channel", 0, KnobRange::fixed(0.0, 15.0, 1.0))),
            transpose: bank.insert(Knob::integer("transpose", 0, KnobRange::fixed(-36.0, 36.0, 1.0))),
            velocity: bank.insert(Knob::integer("velocity", 100, midi)),
            emphasis: bank.insert(Knob::integer("emphasis", 0, midi)),
            duration: bank.insert(Knob::float("duration", 0.5, KnobRange::fixed(0.0, 64.0, 0.01))),
            bar_length: bank.insert(Knob::integer("bar_length", 4, KnobRange::fixed(1.0, 16.0, 1.0))),
            time_to_live: bank.insert(Knob::integer("time_to_live", 16, KnobRange::fixed(1.0, 256.0, 1.0))),
            pulse_every: bank.insert(Knob::integer("pulse_every", 16, KnobRange::fixed(1.0, 64.0, 1.0))),
            program: bank.insert(Knob::integer("program", -1, KnobRange::fixed(-1.0, 127.0, 1.0))),
        }
    }

    pub fn all(&self) -> Vec<(&'static str, KnobId)> {
        vec![
            ("enabled", self.enabled),
            ("channel", self.channel),
            ("transpose", self.transpose),
            ("velocity", self.velocity),
            ("emphasis", self.emphasis),
            ("duration", self.duration),
            ("bar_length", self.bar_length),
            ("time_to_live", self.time_to_live),
            ("pulse_every", self.pulse_every),
            ("program", self.program),
        ]
    }

    pub fn get(&self, name: &str) -> Option<KnobId> {
        self.all().into_iter().find(|(n, _)| *n == name).map(|(_, id)| id)
    }

    pub fn name_of(&self, id: KnobId) -> Option<&'static str> {
        self.all().into_iter().find(|(_, k)| *k == id).map(|(n, _)| n)
    }
}

/// Change notifications delivered to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerEvent {
    KnobChanged(KnobId),
    ToolAdded { cell: CellId, tool_type: String },
    ToolRemoved { cell: CellId, tool_type: String },
    ToolFired { cell: CellId, tool_type: String, playhead: PlayheadId },
    PlayheadSpawned { playhead: PlayheadId, cell: CellId },
    PlayheadMoved { playhead: PlayheadId, from: CellId, to: CellId },
    PlayheadRemoved { playhead: PlayheadId, cell: CellId },
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct PendingNoteOff {
    due: f64,
    message: MidiMessage,
}

pub struct Layer {
    columns: u32,
    rows: u32,
    base_pitch: i32,
    cells: Vec<HexCell>,
    playheads: Vec<Playhead>,
    knobs: KnobBank,
    layer_knobs: LayerKnobs,
    edge_policy: EdgePolicy,
    beat: u64,
    next_playhead: u64,
    next_attach: u64,
    pending_offs: Vec<PendingNoteOff>,
    seed: u64,
    rng: Lcg,
    observers: Vec<Sender<LayerEvent>>,
}

impl Layer {
    /// Build a fully wired `columns` x `rows` hex grid. Each side is clamped
    /// to `1..=MAX_DIMENSION`.
    pub fn new(settings: LayerSettings) -> Self {
        Self::build(LayerSettings {
            columns: settings.columns.clamp(1, MAX_DIMENSION),
            rows: settings.rows.clamp(1, MAX_DIMENSION),
            ..settings
        })
    }

    /// Like [`Layer::new`], but a side longer than `MAX_DIMENSION` is an error
    /// instead of being clamped.
    pub fn try_new(settings: LayerSettings) -> EngineResult<Self> {
        let columns = settings.columns.max(1);
        let rows = settings.rows.max(1);
        let fits = columns <= MAX_DIMENSION && rows <= MAX_DIMENSION && columns.checked_mul(rows).is_some();
        if !fits {
            return Err(EngineError::Malformed(format!(
                "{}x{} grid exceeds {}x{}",
                settings.columns, settings.rows, MAX_DIMENSION, MAX_DIMENSION
            )));
        }
        Ok(Self::build(LayerSettings { columns, rows, ..settings }))
    }

    fn build(settings: LayerSettings) -> Self {
        let LayerSettings { columns, rows, .. } = settings;
        let mut cells = Vec::with_capacity(columns as usize * rows as usize);
        for column in 0..columns {
            for row in 0..rows {
                let coord = HexCoord::new(column, row);
                let id = CellId::new(cells.len() as u32);
                cells.push(HexCell::new(id, coord, harmonic_pitch(coord, settings.base_pitch)));
            }
        }

        let mut knobs = KnobBank::new();
        let layer_knobs = LayerKnobs::new(&mut knobs);
        let mut layer = Self {
            columns,
            rows,
            base_pitch: settings.base_pitch,
            cells,
            playheads: Vec::new(),
            knobs,
            layer_knobs,
            edge_policy: settings.edge_policy,
            beat: 0,
            next_playhead: 1,
            next_attach: 0,
            pending_offs: Vec::new(),
            seed: settings.seed,
            rng: Lcg::new(settings.seed),
            observers: Vec::new(),
        };

        for index in 0..layer.cells.len() {
            let coord = layer.cells[index].coord();
            for direction in [Direction::N, Direction::NE, Direction::SE] {
                if let Some(other) = neighbour_coord(coord, direction, columns, rows) {
                    let a = CellId::new(index as u32);
                    let b = layer.cell_index(other);
                    layer.link_cells(a, b, direction);
                }
            }
        }
        log::debug!(target: "layer", "built {}x{} grid ({} cells)", columns, rows, layer.cells.len());
        layer
    }

    pub fn columns(&self) -> u32 {
        self.columns
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn base_pitch(&self) -> i32 {
        self.base_pitch
    }

    pub fn beat(&self) -> u64 {
        self.beat
    }

    pub fn edge_policy(&self) -> EdgePolicy {
        self.edge_policy
    }

    pub fn set_edge_policy(&mut self, policy: EdgePolicy) {
        self.edge_policy = policy;
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Reseed the probability source.
    pub fn set_seed(&mut self, seed: u64) {
        self.seed = seed;
        self.rng = Lcg::new(seed);
    }

    /// Receive change notifications. Dropped receivers are pruned on the next send.
    pub fn subscribe(&mut self) -> Receiver<LayerEvent> {
        let (tx, rx) = mpsc::channel();
        self.observers.push(tx);
        rx
    }

    fn notify(&mut self, event: LayerEvent) {
        if self.observers.is_empty() {
            return;
        }
        self.observers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    // --- Cells ---

    fn cell_index(&self, coord: HexCoord) -> CellId {
        CellId::new(coord.column * self.rows + coord.row)
    }

    pub fn cell_at(&self, column: u32, row: u32) -> Option<CellId> {
        (column < self.columns && row < self.rows).then(|| self.cell_index(HexCoord::new(column, row)))
    }

    pub fn cell(&self, id: CellId) -> Option<&HexCell> {
        self.cells.get(id.index())
    }

    fn check_cell(&self, id: CellId) -> EngineResult<&HexCell> {
        self.cells.get(id.index()).ok_or(EngineError::UnknownCell(id))
    }

    pub fn cells(&self) -> &[HexCell] {
        &self.cells
    }

    pub fn neighbour(&self, cell: CellId, direction: Direction) -> Option<CellId> {
        self.cell(cell)?.neighbour(direction)
    }

    fn link_cells(&mut self, a: CellId, b: CellId, direction: Direction) {
        self.cells[a.index()].set_neighbour(direction, Some(b));
        self.cells[b.index()].set_neighbour(direction.opposite(), Some(a));
    }

    /// Make `b` the neighbour of `a` in `direction` and `a` the neighbour of
    /// `b` in the opposite direction. Links previously held by either slot
    /// are cut on both ends.
    pub fn connect_neighbour(&mut self, a: CellId, b: CellId, direction: Direction) -> EngineResult {
        self.check_cell(a)?;
        self.check_cell(b)?;
        if a == b {
            return Err(EngineError::SelfLink(a));
        }
        self.disconnect_neighbour(a, direction)?;
        self.disconnect_neighbour(b, direction.opposite())?;
        self.link_cells(a, b, direction);
        Ok(())
    }

    /// Cut the link from `cell` in `direction`, and its mirror.
    pub fn disconnect_neighbour(&mut self, cell: CellId, direction: Direction) -> EngineResult {
        let Some(other) = self.check_cell(cell)?.neighbour(direction) else {
            return Ok(());
        };
        self.cells[cell.index()].set_neighbour(direction, None);
        if self.cells[other.index()].neighbour(direction.opposite()) == Some(cell) {
            self.cells[other.index()].set_neighbour(direction.opposite(), None);
        }
        Ok(())
    }

    // --- Tools ---

    /// Construct a detached tool whose knobs live in this layer's bank.
    pub fn create_tool(&mut self, registry: &ToolRegistry, tool_type: &str) -> EngineResult<Tool> {
        registry.create(tool_type, &mut self.knobs)
    }

    /// Throw away a detached tool, releasing its knobs.
    pub fn discard_tool(&mut self, mut tool: Tool) {
        tool.removed_from_layer(&mut self.knobs);
    }

    /// Attach `tool` to `cell`, replacing (and detaching) any tool of the same type.
    pub fn add_tool(&mut self, cell: CellId, mut tool: Tool) -> EngineResult {
        self.check_cell(cell)?;
        if let Some((name, _)) = tool.knobs().into_iter().find(|(_, id)| !self.knobs.contains(*id)) {
            return Err(EngineError::Malformed(format!(
                "{} tool knob {} does not belong to this layer",
                tool.tool_type(),
                name
            )));
        }
        self.next_attach += 1;
        tool.added_to_layer(cell, self.next_attach);
        let tool_type = tool.tool_type().to_string();
        if let Some(mut replaced) = self.cells[cell.index()].insert_tool(tool) {
            replaced.removed_from_layer(&mut self.knobs);
            self.notify(LayerEvent::ToolRemoved { cell, tool_type: tool_type.clone() });
        }
        self.notify(LayerEvent::ToolAdded { cell, tool_type });
        Ok(())
    }

    /// Create a tool from the registry and attach it in one go.
    pub fn add_new_tool(&mut self, registry: &ToolRegistry, cell: CellId, tool_type: &str) -> EngineResult<&mut Tool> {
        self.check_cell(cell)?;
        let tool = self.create_tool(registry, tool_type)?;
        self.add_tool(cell, tool)?;
        self.cells[cell.index()]
            .tool_mut(tool_type)
            .ok_or_else(|| EngineError::UnknownToolType(tool_type.to_string()))
    }

    /// Detach the tool of `tool_type` from `cell`. Returns false if there was none.
    pub fn remove_tool(&mut self, cell: CellId, tool_type: &str) -> EngineResult<bool> {
        self.check_cell(cell)?;
        let Some(mut tool) = self.cells[cell.index()].take_tool(tool_type) else {
            return Ok(false);
        };
        tool.removed_from_layer(&mut self.knobs);
        self.notify(LayerEvent::ToolRemoved { cell, tool_type: tool_type.to_string() });
        Ok(true)
    }

    pub fn remove_all_tools(&mut self, cell: CellId) -> EngineResult {
        self.check_cell(cell)?;
        for mut tool in self.cells[cell.index()].take_all_tools() {
            tool.removed_from_layer(&mut self.knobs);
            let tool_type = tool.tool_type().to_string();
            self.notify(LayerEvent::ToolRemoved { cell, tool_type });
        }
        Ok(())
    }

    pub fn tool(&self, cell: CellId, tool_type: &str) -> Option<&Tool> {
        self.cell(cell)?.tool(tool_type)
    }

    pub fn tool_mut(&mut self, cell: CellId, tool_type: &str) -> Option<&mut Tool> {
        self.cells.get_mut(cell.index())?.tool_mut(tool_type)
    }

    pub fn tool_knob(&self, cell: CellId, tool_type: &str, knob: &str) -> Option<KnobId> {
        self.tool(cell, tool_type)?.knob(knob)
    }

    // --- Knobs ---

    pub fn knobs(&self) -> &KnobBank {
        &self.knobs
    }

    pub fn layer_knobs(&self) -> &LayerKnobs {
        &self.layer_knobs
    }

    pub fn layer_knob(&self, name: &str) -> Option<KnobId> {
        self.layer_knobs.get(name)
    }

    pub fn knob(&self, id: KnobId) -> EngineResult<&Knob> {
        self.knobs.get(id)
    }

    pub fn set_knob(&mut self, id: KnobId, value: KnobValue) -> EngineResult {
        self.knobs.set(id, value)?;
        self.notify(LayerEvent::KnobChanged(id));
        Ok(())
    }

    pub fn set_knob_range(&mut self, id: KnobId, minimum: f32, maximum: f32, stepping: f32) -> EngineResult {
        self.knobs.set_range(id, minimum, maximum, stepping)?;
        self.notify(LayerEvent::KnobChanged(id));
        Ok(())
    }

    pub fn link_knob(&mut self, id: KnobId, target: KnobId, link_value: bool) -> EngineResult {
        self.knobs.link(id, target, link_value)?;
        self.notify(LayerEvent::KnobChanged(id));
        Ok(())
    }

    pub fn unlink_knob(&mut self, id: KnobId) -> EngineResult {
        self.knobs.unlink(id)?;
        self.notify(LayerEvent::KnobChanged(id));
        Ok(())
    }

    pub fn set_knob_link_value(&mut self, id: KnobId, link_value: bool) -> EngineResult {
        self.knobs.set_link_value(id, link_value)?;
        self.notify(LayerEvent::KnobChanged(id));
        Ok(())
    }

    pub fn set_knob_oscillator(&mut self, id: KnobId, oscillator: Option<Oscillator>) -> EngineResult {
        self.knobs.set_oscillator(id, oscillator)?;
        self.notify(LayerEvent::KnobChanged(id));
        Ok(())
    }

    pub(crate) fn knobs_mut(&mut self) -> &mut KnobBank {
        &mut self.knobs
    }

    // --- Playheads ---

    pub fn playheads(&self) -> &[Playhead] {
        &self.playheads
    }

    fn playhead_index(&self, id: PlayheadId) -> Option<usize> {
        self.playheads.binary_search_by_key(&id, Playhead::id).ok()
    }

    pub fn playhead(&self, id: PlayheadId) -> Option<&Playhead> {
        self.playhead_index(id).map(|i| &self.playheads[i])
    }

    pub(crate) fn playhead_mut(&mut self, id: PlayheadId) -> Option<&mut Playhead> {
        let index = self.playhead_index(id)?;
        Some(&mut self.playheads[index])
    }

    pub fn add_playhead(&mut self, cell: CellId, direction: Direction, time_to_live: Option<u32>) -> EngineResult<PlayheadId> {
        self.check_cell(cell)?;
        Ok(self.spawn_playhead(cell, direction, time_to_live))
    }

    fn spawn_playhead(&mut self, cell: CellId, direction: Direction, time_to_live: Option<u32>) -> PlayheadId {
        let id = PlayheadId::new(self.next_playhead);
        self.next_playhead += 1;
        self.playheads.push(Playhead::new(id, cell, direction, time_to_live));
        self.cells[cell.index()].playhead_entering(id);
        self.notify(LayerEvent::PlayheadSpawned { playhead: id, cell });
        id
    }

    pub fn remove_playhead(&mut self, id: PlayheadId) -> EngineResult {
        let index = self.playhead_index(id).ok_or(EngineError::NoSuchPlayhead(id))?;
        self.remove_playhead_at(index);
        Ok(())
    }

    pub fn clear_playheads(&mut self) {
        while !self.playheads.is_empty() {
            self.remove_playhead_at(self.playheads.len() - 1);
        }
    }

    fn remove_playhead_at(&mut self, index: usize) {
        let playhead = self.playheads.remove(index);
        self.cells[playhead.cell().index()].playhead_leaving(playhead.id());
        self.notify(LayerEvent::PlayheadRemoved { playhead: playhead.id(), cell: playhead.cell() });
    }

    // --- Transport ---

    /// Send the layer's program change, if one is set.
    pub fn start<S: MidiSink + ?Sized>(&mut self, sink: &mut S) -> EngineResult {
        let time = self.beat as f64;
        let program = self.knobs.dynamic_i32(self.layer_knobs.program, time)?;
        if program >= 0 {
            let channel = self.knobs.dynamic_i32(self.layer_knobs.channel, time)?.clamp(0, 15) as u8;
            sink.program_change(program.min(127) as u8, channel);
        }
        Ok(())
    }

    /// Send every outstanding note-off now.
    pub fn release_all<S: MidiSink + ?Sized>(&mut self, sink: &mut S) {
        for off in std::mem::take(&mut self.pending_offs) {
            sink.send(off.message);
        }
    }

    /// Release notes, remove playheads and rewind to beat 0.
    pub fn reset<S: MidiSink + ?Sized>(&mut self, sink: &mut S) {
        self.release_all(sink);
        self.clear_playheads();
        self.beat = 0;
        self.rng = Lcg::new(self.seed);
    }

    pub fn pending_note_offs(&self) -> usize {
        self.pending_offs.len()
    }

    /// Advance every playhead one step.
    pub fn tick<S: MidiSink + ?Sized>(&mut self, sink: &mut S) -> EngineResult {
        let time = self.beat as f64;
        self.flush_note_offs(|due| due <= time, sink);
        if self.knobs.dynamic_bool(self.layer_knobs.enabled, time)? {
            self.pulse_generators(time)?;

            let order: Vec<PlayheadId> = self.playheads.iter().map(Playhead::id).collect();
            let mut spawned = Vec::new();
            for id in order {
                self.advance_playhead(id, time, sink, &mut spawned)?;
            }
            for (cell, direction, ttl) in spawned {
                self.spawn_playhead(cell, direction, ttl);
            }
        }
        self.flush_note_offs(|due| due < time + 1.0, sink);
        self.beat += 1;
        Ok(())
    }

    fn pulse_generators(&mut self, time: f64) -> EngineResult {
        let mut births = Vec::new();
        for cell in &self.cells {
            for tool_type in cell.tools_in_order() {
                let Some(tool) = cell.tool(&tool_type) else { continue };
                let ctx = RunContext {
                    knobs: &self.knobs,
                    layer: &self.layer_knobs,
                    time,
                    beat: self.beat,
                    cell: cell.id(),
                    pitch: cell.pitch(),
                    direction: Direction::N,
                };
                if let Some((direction, ttl)) = tool.pulse(&ctx, &mut self.rng)? {
                    births.push((cell.id(), direction, ttl));
                }
            }
        }
        for (cell, direction, ttl) in births {
            log::debug!(target: "layer", "beat {}: generator at cell {} starts a playhead {}", self.beat, cell, direction);
            self.spawn_playhead(cell, direction, ttl);
        }
        Ok(())
    }

    fn advance_playhead<S: MidiSink + ?Sized>(
        &mut self,
        id: PlayheadId,
        time: f64,
        sink: &mut S,
        spawned: &mut Vec<(CellId, Direction, Option<u32>)>,
    ) -> EngineResult {
        let Some(index) = self.playhead_index(id) else {
            return Ok(());
        };
        if self.playheads[index].is_expired() {
            self.remove_playhead_at(index);
            return Ok(());
        }
        let cell = self.playheads[index].cell();
        self.cells[cell.index()].playhead_entering(id);

        let pitch = self.cells[cell.index()].pitch();
        let mut direction = self.playheads[index].direction();
        let mut skip = 0;
        let mut absorbed = false;
        let mut split = Vec::new();

        for tool_type in self.cells[cell.index()].tools_in_order() {
            let ctx = RunContext {
                knobs: &self.knobs,
                layer: &self.layer_knobs,
                time,
                beat: self.beat,
                cell,
                pitch,
                direction,
            };
            let Some(tool) = self.cells[cell.index()].tool_mut(&tool_type) else {
                continue;
            };
            let effects = tool.visit(&ctx, &mut self.rng)?;
            let fired = tool.state().fired;

            for message in &effects.messages {
                sink.send(*message);
            }
            for (message, delay) in &effects.note_offs {
                self.pending_offs.push(PendingNoteOff { due: time + *delay as f64, message: *message });
            }
            if let Some(d) = effects.direction {
                direction = d;
            }
            skip += effects.skip;
            absorbed |= effects.absorb;
            split.extend(effects.spawn);
            if fired {
                self.notify(LayerEvent::ToolFired { cell, tool_type, playhead: id });
            }
        }

        let playhead = &mut self.playheads[index];
        playhead.set_direction(direction);
        playhead.add_skip(skip);
        playhead.count_visit();
        let ttl = playhead.time_to_live();
        for d in split {
            if let Some(next) = self.cells[cell.index()].neighbour(d) {
                spawned.push((next, d, ttl));
            }
        }

        if absorbed {
            self.remove_playhead_at(index);
        } else {
            self.move_playhead(index);
        }
        Ok(())
    }

    fn move_playhead(&mut self, index: usize) {
        let id = self.playheads[index].id();
        let from = self.playheads[index].cell();
        let mut direction = self.playheads[index].direction();
        let steps = 1 + self.playheads[index].take_skip();

        let mut at = from;
        for _ in 0..steps {
            if let Some(next) = self.cells[at.index()].neighbour(direction) {
                at = next;
                continue;
            }
            match self.edge_policy {
                EdgePolicy::Stop => break,
                EdgePolicy::Wrap => at = self.wrap_target(at, direction),
                EdgePolicy::Bounce => {
                    direction = direction.opposite();
                    match self.cells[at.index()].neighbour(direction) {
                        Some(next) => at = next,
                        None => break,
                    }
                }
                EdgePolicy::Remove => {
                    self.remove_playhead_at(index);
                    return;
                }
            }
        }

        self.playheads[index].set_direction(direction);
        if at != from {
            self.cells[from.index()].playhead_leaving(id);
            self.cells[at.index()].playhead_entering(id);
            self.playheads[index].set_cell(at);
            self.notify(LayerEvent::PlayheadMoved { playhead: id, from, to: at });
        }
    }

    /// Furthest cell reachable from `from` walking against `direction`.
    fn wrap_target(&self, from: CellId, direction: Direction) -> CellId {
        let back = direction.opposite();
        let mut at = from;
        for _ in 0..self.cells.len() {
            match self.cells[at.index()].neighbour(back) {
                Some(prev) if prev != from => at = prev,
                _ => break,
            }
        }
        at
    }

    fn flush_note_offs<S: MidiSink + ?Sized>(&mut self, is_due: impl Fn(f64) -> bool, sink: &mut S) {
        let (mut due, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending_offs)
            .into_iter()
            .partition(|off| is_due(off.due));
        self.pending_offs = pending;
        due.sort_by(|a, b| a.due.total_cmp(&b.due));
        for off in due {
            sink.send(off.message);
        }
    }
}

#[cfg(test)]
mod tests;
