use elysium_types::{CellId, Direction, PlayheadId};

/// What a playhead does when its next cell is off the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EdgePolicy {
    /// Stay on the current cell; tools run again next tick.
    Stop,
    /// Re-enter from the far side of the grid along the same line.
    Wrap,
    /// Reverse direction and step back.
    Bounce,
    /// The playhead is removed.
    #[default]
    Remove,
}

/// A traversal cursor. Holds its cell by id only; the layer owns both.
#[derive(Debug, Clone, PartialEq)]
pub struct Playhead {
    id: PlayheadId,
    cell: CellId,
    direction: Direction,
    /// Remaining visits, `None` for immortal playheads.
    time_to_live: Option<u32>,
    /// Extra cells to jump on the next move.
    pending_skip: u32,
}

impl Playhead {
    pub(crate) fn new(id: PlayheadId, cell: CellId, direction: Direction, time_to_live: Option<u32>) -> Self {
        Self {
            id,
            cell,
            direction,
            time_to_live,
            pending_skip: 0,
        }
    }

    pub fn id(&self) -> PlayheadId {
        self.id
    }

    pub fn cell(&self) -> CellId {
        self.cell
    }

    pub(crate) fn set_cell(&mut self, cell: CellId) {
        self.cell = cell;
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    pub fn time_to_live(&self) -> Option<u32> {
        self.time_to_live
    }

    pub fn is_expired(&self) -> bool {
        self.time_to_live == Some(0)
    }

    pub(crate) fn count_visit(&mut self) {
        if let Some(ttl) = self.time_to_live.as_mut() {
            *ttl = ttl.saturating_sub(1);
        }
    }

    pub fn pending_skip(&self) -> u32 {
        self.pending_skip
    }

    pub(crate) fn add_skip(&mut self, cells: u32) {
        self.pending_skip = self.pending_skip.saturating_add(cells);
    }

    pub(crate) fn take_skip(&mut self) -> u32 {
        std::mem::take(&mut self.pending_skip)
    }
}
