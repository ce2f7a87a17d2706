//! Engine error type.

use elysium_types::{CellId, HexCoord, KnobId, PlayheadId};

pub type EngineResult<T = ()> = Result<T, EngineError>;

#[derive(Debug)]
pub enum EngineError {
    /// No constructor registered for a tool type id.
    UnknownToolType(String),
    /// Oscillator period must be strictly positive.
    InvalidPeriod(f32),
    /// Range with minimum above maximum, or non-positive stepping.
    InvalidRange { minimum: f32, maximum: f32, stepping: f32 },
    /// Linking would put a knob in its own link chain.
    LinkCycle { knob: KnobId, target: KnobId },
    /// Knob id not present in the bank.
    MissingKnob(KnobId),
    /// A tool or layer has no knob with this name.
    UnknownKnob(String),
    /// A cell cannot neighbour itself.
    SelfLink(CellId),
    NoSuchCell(HexCoord),
    UnknownCell(CellId),
    NoSuchPlayhead(PlayheadId),
    /// Saved element that cannot be applied.
    Malformed(String),
    Json(serde_json::Error),
    Midi(String),
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownToolType(t) => write!(f, "no such tool type: {}", t),
            Self::InvalidPeriod(p) => write!(f, "oscillator period must be positive, got {}", p),
            Self::InvalidRange { minimum, maximum, stepping } => write!(
                f,
                "invalid range: minimum {} maximum {} stepping {}",
                minimum, maximum, stepping
            ),
            Self::LinkCycle { knob, target } => {
                write!(f, "linking knob {} to {} would create a cycle", knob, target)
            }
            Self::MissingKnob(id) => write!(f, "knob {} does not exist", id),
            Self::UnknownKnob(name) => write!(f, "unknown knob: {}", name),
            Self::SelfLink(id) => write!(f, "cell {} cannot neighbour itself", id),
            Self::NoSuchCell(coord) => write!(f, "no cell at {}", coord),
            Self::UnknownCell(id) => write!(f, "no cell with id {}", id),
            Self::NoSuchPlayhead(id) => write!(f, "no playhead {}", id),
            Self::Malformed(msg) => write!(f, "malformed element: {}", msg),
            Self::Json(e) => write!(f, "JSON error: {}", e),
            Self::Midi(msg) => write!(f, "MIDI error: {}", msg),
        }
    }
}

impl std::error::Error for EngineError {}
