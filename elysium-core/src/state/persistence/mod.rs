//! Conversion between a [`Layer`] and its [`LayerData`] configuration tree.
//!
//! The engine only produces and consumes the tree. Writing it somewhere is
//! up to the host; the JSON helpers here are a convenience for that.

pub mod load;
pub mod save;

#[cfg(test)]
mod tests;

use elysium_types::LayerData;

use super::layer::{Layer, LayerSettings};
use crate::error::{EngineError, EngineResult};
use crate::tool::ToolRegistry;

/// Serialize a layer's configuration as pretty-printed JSON.
pub fn to_json(layer: &Layer) -> EngineResult<String> {
    let data = layer.to_data()?;
    Ok(serde_json::to_string_pretty(&data)?)
}

/// Rebuild a layer from JSON. Elements that cannot be applied are skipped
/// and returned next to the layer.
pub fn from_json(
    json: &str,
    registry: &ToolRegistry,
    settings: LayerSettings,
) -> EngineResult<(Layer, Vec<EngineError>)> {
    let data: LayerData = serde_json::from_str(json)?;
    Layer::from_data(&data, registry, settings)
}
