use serde::{Deserialize, Serialize};

/// One of the six edges of a hex cell, clockwise from north.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    N,
    NE,
    SE,
    S,
    SW,
    NW,
}

impl Direction {
    pub const ALL: [Direction; 6] = [
        Direction::N,
        Direction::NE,
        Direction::SE,
        Direction::S,
        Direction::SW,
        Direction::NW,
    ];

    pub fn index(self) -> usize {
        match self {
            Direction::N => 0,
            Direction::NE => 1,
            Direction::SE => 2,
            Direction::S => 3,
            Direction::SW => 4,
            Direction::NW => 5,
        }
    }

    /// Direction for a slot index; wraps modulo 6 so knob values can be used directly.
    pub fn from_index(index: i64) -> Direction {
        Self::ALL[index.rem_euclid(6) as usize]
    }

    pub fn opposite(self) -> Direction {
        self.rotate(3)
    }

    /// Rotate by `steps` sixths of a turn. Positive is clockwise.
    pub fn rotate(self, steps: i64) -> Direction {
        Self::from_index(self.index() as i64 + steps)
    }

    pub fn clockwise(self) -> Direction {
        self.rotate(1)
    }

    pub fn anticlockwise(self) -> Direction {
        self.rotate(-1)
    }

    pub fn name(self) -> &'static str {
        match self {
            Direction::N => "N",
            Direction::NE => "NE",
            Direction::SE => "SE",
            Direction::S => "S",
            Direction::SW => "SW",
            Direction::NW => "NW",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
