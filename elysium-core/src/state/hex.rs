//! Hex cells and the odd-q grid geometry they sit on.

use std::collections::{BTreeSet, HashMap};

use elysium_types::{CellId, Direction, HexCoord, PlayheadId};

use crate::tool::Tool;

/// A node of the hex grid.
#[derive(Debug, Clone)]
pub struct HexCell {
    id: CellId,
    coord: HexCoord,
    pitch: Option<u8>,
    neighbours: [Option<CellId>; 6],
    tools: HashMap<String, Tool>,
    playheads: BTreeSet<PlayheadId>,
}

impl HexCell {
    pub(crate) fn new(id: CellId, coord: HexCoord, pitch: Option<u8>) -> Self {
        Self {
            id,
            coord,
            pitch,
            neighbours: [None; 6],
            tools: HashMap::new(),
            playheads: BTreeSet::new(),
        }
    }

    pub fn id(&self) -> CellId {
        self.id
    }

    pub fn coord(&self) -> HexCoord {
        self.coord
    }

    pub fn pitch(&self) -> Option<u8> {
        self.pitch
    }

    pub fn neighbour(&self, direction: Direction) -> Option<CellId> {
        self.neighbours[direction.index()]
    }

    pub(crate) fn set_neighbour(&mut self, direction: Direction, cell: Option<CellId>) {
        self.neighbours[direction.index()] = cell;
    }

    pub fn has_tool(&self, tool_type: &str) -> bool {
        self.tools.contains_key(tool_type)
    }

    pub fn tool(&self, tool_type: &str) -> Option<&Tool> {
        self.tools.get(tool_type)
    }

    pub(crate) fn tool_mut(&mut self, tool_type: &str) -> Option<&mut Tool> {
        self.tools.get_mut(tool_type)
    }

    pub fn tools(&self) -> impl Iterator<Item = &Tool> {
        self.tools.values()
    }

    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }

    /// Tool types in execution order: ascending preferred order, then attach order.
    pub fn tools_in_order(&self) -> Vec<String> {
        let mut tools: Vec<&Tool> = self.tools.values().collect();
        tools.sort_by_key(|t| (t.preferred_order(), t.attach_seq()));
        tools.into_iter().map(|t| t.tool_type().to_string()).collect()
    }

    /// Insert a tool, returning any tool of the same type it replaces.
    pub(crate) fn insert_tool(&mut self, tool: Tool) -> Option<Tool> {
        self.tools.insert(tool.tool_type().to_string(), tool)
    }

    pub(crate) fn take_tool(&mut self, tool_type: &str) -> Option<Tool> {
        self.tools.remove(tool_type)
    }

    pub(crate) fn take_all_tools(&mut self) -> Vec<Tool> {
        self.tools.drain().map(|(_, tool)| tool).collect()
    }

    pub fn playheads(&self) -> impl Iterator<Item = PlayheadId> + '_ {
        self.playheads.iter().copied()
    }

    pub fn has_playhead(&self, playhead: PlayheadId) -> bool {
        self.playheads.contains(&playhead)
    }

    pub fn is_occupied(&self) -> bool {
        !self.playheads.is_empty()
    }

    /// Returns false if the playhead was already resident.
    pub(crate) fn playhead_entering(&mut self, playhead: PlayheadId) -> bool {
        self.playheads.insert(playhead)
    }

    pub(crate) fn playhead_leaving(&mut self, playhead: PlayheadId) -> bool {
        self.playheads.remove(&playhead)
    }
}

/// Coordinate of the neighbour in `direction`, if it lies on the grid.
///
/// Columns are offset "odd-q": odd columns sit half a cell higher, so the
/// diagonal neighbours of an odd column share its row or the one above.
pub fn neighbour_coord(coord: HexCoord, direction: Direction, columns: u32, rows: u32) -> Option<HexCoord> {
    let col = coord.column as i64;
    let row = coord.row as i64;
    let odd = col % 2 == 1;
    let (dc, dr) = match (direction, odd) {
        (Direction::N, _) => (0, 1),
        (Direction::S, _) => (0, -1),
        (Direction::NE, false) => (1, 0),
        (Direction::NE, true) => (1, 1),
        (Direction::SE, false) => (1, -1),
        (Direction::SE, true) => (1, 0),
        (Direction::NW, false) => (-1, 0),
        (Direction::NW, true) => (-1, 1),
        (Direction::SW, false) => (-1, -1),
        (Direction::SW, true) => (-1, 0),
    };
    let (c, r) = (col + dc, row + dr);
    if c < 0 || r < 0 || c >= columns as i64 || r >= rows as i64 {
        return None;
    }
    Some(HexCoord::new(c as u32, r as u32))
}

/// Harmonic-table pitch: N is a fifth up, NE a major third, SE a minor
/// third down. Cells that land outside the MIDI range are silent.
pub fn harmonic_pitch(coord: HexCoord, base_pitch: i32) -> Option<u8> {
    let column = coord.column as i32;
    let column_offset = (column / 2) + (column % 2) * 4;
    let pitch = base_pitch + 7 * coord.row as i32 + column_offset;
    (0..=127).contains(&pitch).then_some(pitch as u8)
}
