use elysium_types::{HexCoord, LayerData};

use crate::error::{EngineError, EngineResult};
use crate::state::layer::{Layer, LayerSettings};
use crate::tool::ToolRegistry;

impl Layer {
    /// Build a layer from saved configuration. Grid size comes from `data`;
    /// pitch, edge policy and seed from `settings`.
    ///
    /// A knob, tool or playhead that cannot be applied is skipped and its
    /// error collected; the rest of the layer still loads. A grid too large
    /// to build fails the whole load.
    pub fn from_data(data: &LayerData, registry: &ToolRegistry, settings: LayerSettings) -> EngineResult<(Layer, Vec<EngineError>)> {
        let mut layer = Layer::try_new(LayerSettings {
            columns: data.columns,
            rows: data.rows,
            ..settings
        })?;
        let mut problems = Vec::new();

        load_layer_knobs(&mut layer, data, &mut problems);
        load_cells(&mut layer, data, registry, &mut problems);
        load_playheads(&mut layer, data, &mut problems);

        for problem in &problems {
            log::warn!(target: "load", "skipped: {}", problem);
        }
        log::debug!(
            target: "load",
            "loaded {}x{} layer, {} cell(s) with tools, {} playhead(s), {} problem(s)",
            layer.columns(),
            layer.rows(),
            data.cells.len(),
            layer.playheads().len(),
            problems.len()
        );
        Ok((layer, problems))
    }
}

fn load_layer_knobs(layer: &mut Layer, data: &LayerData, problems: &mut Vec<EngineError>) {
    let layer_knobs = layer.layer_knobs().clone();

    // Values first, links second, so a link can target a knob loaded later.
    let mut links = Vec::new();
    for (name, knob_data) in &data.knobs {
        let Some(id) = layer_knobs.get(name) else {
            problems.push(EngineError::UnknownKnob(name.clone()));
            continue;
        };
        let applied = layer.knobs_mut().get_mut(id).and_then(|knob| {
            let mut staged = knob.clone();
            staged.apply_data(knob_data)?;
            *knob = staged;
            Ok(())
        });
        match applied {
            Ok(()) => {
                if let Some(target) = &knob_data.linked {
                    links.push((id, target.clone(), knob_data.link_value));
                }
            }
            Err(e) => problems.push(e),
        }
    }

    for (id, target, link_value) in links {
        let result = layer_knobs
            .get(&target)
            .ok_or(EngineError::UnknownKnob(target))
            .and_then(|target| layer.knobs_mut().link(id, target, link_value));
        if let Err(e) = result {
            problems.push(e);
        }
    }
}

fn load_cells(layer: &mut Layer, data: &LayerData, registry: &ToolRegistry, problems: &mut Vec<EngineError>) {
    let layer_knobs = layer.layer_knobs().clone();
    for cell_data in &data.cells {
        let Some(cell) = layer.cell_at(cell_data.column, cell_data.row) else {
            problems.push(EngineError::NoSuchCell(HexCoord::new(cell_data.column, cell_data.row)));
            continue;
        };
        for tool_data in &cell_data.tools {
            let result: EngineResult = registry
                .restore(tool_data, layer.knobs_mut(), |name| layer_knobs.get(name))
                .and_then(|tool| layer.add_tool(cell, tool));
            if let Err(e) = result {
                problems.push(e);
            }
        }
    }
}

fn load_playheads(layer: &mut Layer, data: &LayerData, problems: &mut Vec<EngineError>) {
    for playhead in &data.playheads {
        let result = match layer.cell_at(playhead.column, playhead.row) {
            Some(cell) => layer.add_playhead(cell, playhead.direction, playhead.time_to_live).map(|id| {
                if let Some(restored) = layer.playhead_mut(id) {
                    restored.add_skip(playhead.pending_skip);
                }
            }),
            None => Err(EngineError::NoSuchCell(HexCoord::new(playhead.column, playhead.row))),
        };
        if let Err(e) = result {
            problems.push(e);
        }
    }
}
