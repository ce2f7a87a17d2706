//! Configuration tree exchanged with the persistence collaborator.
//!
//! The engine builds a [`LayerData`] on save and consumes one on load. How the
//! tree is written to disk is not the engine's business; everything here only
//! derives serde so any tree format can carry it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::Direction;

/// A stored knob value. The variant doubles as the knob kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum KnobValue {
    Float(f32),
    Integer(i32),
    Boolean(bool),
}

impl KnobValue {
    pub fn to_f32(&self) -> f32 {
        match self {
            KnobValue::Float(v) => *v,
            KnobValue::Integer(v) => *v as f32,
            KnobValue::Boolean(v) => {
                if *v {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            KnobValue::Float(_) => "float",
            KnobValue::Integer(_) => "integer",
            KnobValue::Boolean(_) => "boolean",
        }
    }
}

/// Periodic waveform used by oscillators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Waveform {
    #[default]
    Sine,
    Square,
    Saw,
    Triangle,
}

impl Waveform {
    pub fn name(&self) -> &'static str {
        match self {
            Waveform::Sine => "Sine",
            Waveform::Square => "Square",
            Waveform::Saw => "Saw",
            Waveform::Triangle => "Triangle",
        }
    }

    pub fn all() -> Vec<Waveform> {
        vec![Waveform::Sine, Waveform::Square, Waveform::Saw, Waveform::Triangle]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OscillatorData {
    pub shape: Waveform,
    pub enabled: bool,
    pub minimum: f32,
    pub maximum: f32,
    /// Period in steps.
    pub period: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnobData {
    pub value: KnobValue,
    #[serde(default)]
    pub minimum: Option<f32>,
    #[serde(default)]
    pub maximum: Option<f32>,
    #[serde(default)]
    pub stepping: Option<f32>,
    /// Name of the layer knob this knob is linked to, if any.
    #[serde(default)]
    pub linked: Option<String>,
    #[serde(default)]
    pub link_value: bool,
    #[serde(default)]
    pub oscillator: Option<OscillatorData>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolData {
    pub tool_type: String,
    pub enabled: bool,
    pub preferred_order: i32,
    #[serde(default)]
    pub knobs: BTreeMap<String, KnobData>,
    /// Named script sources. Opaque to the engine.
    #[serde(default)]
    pub scripts: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellData {
    pub column: u32,
    pub row: u32,
    #[serde(default)]
    pub tools: Vec<ToolData>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayheadData {
    pub column: u32,
    pub row: u32,
    pub direction: Direction,
    #[serde(default)]
    pub time_to_live: Option<u32>,
    /// Cells still to be jumped over on the next move.
    #[serde(default)]
    pub pending_skip: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerData {
    pub columns: u32,
    pub rows: u32,
    #[serde(default)]
    pub knobs: BTreeMap<String, KnobData>,
    /// Only cells that carry tools are stored.
    #[serde(default)]
    pub cells: Vec<CellData>,
    #[serde(default)]
    pub playheads: Vec<PlayheadData>,
}
