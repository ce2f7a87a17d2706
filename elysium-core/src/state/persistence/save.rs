use std::collections::BTreeMap;

use elysium_types::{CellData, KnobId, LayerData, PlayheadData};

use crate::error::EngineResult;
use crate::state::layer::Layer;

impl Layer {
    /// Snapshot the layer's configuration: layer knobs, every cell that
    /// carries tools, and the current playheads.
    pub fn to_data(&self) -> EngineResult<LayerData> {
        let layer_knobs = self.layer_knobs();
        let link_name = |id: KnobId| layer_knobs.name_of(id).map(str::to_string);

        let mut knobs = BTreeMap::new();
        for (name, id) in layer_knobs.all() {
            let knob = self.knobs().get(id)?;
            let linked = knob.linked().and_then(link_name);
            if knob.linked().is_some() && linked.is_none() {
                log::warn!(target: "save", "layer knob {} links to a non-layer knob; link not saved", name);
            }
            knobs.insert(name.to_string(), knob.to_data(linked));
        }

        let mut cells = Vec::new();
        for cell in self.cells() {
            if cell.tool_count() == 0 {
                continue;
            }
            let mut tools = Vec::with_capacity(cell.tool_count());
            for tool_type in cell.tools_in_order() {
                if let Some(tool) = cell.tool(&tool_type) {
                    tools.push(tool.to_data(self.knobs(), link_name)?);
                }
            }
            let coord = cell.coord();
            cells.push(CellData { column: coord.column, row: coord.row, tools });
        }

        let playheads = self
            .playheads()
            .iter()
            .filter_map(|p| {
                let coord = self.cell(p.cell())?.coord();
                Some(PlayheadData {
                    column: coord.column,
                    row: coord.row,
                    direction: p.direction(),
                    time_to_live: p.time_to_live(),
                    pending_skip: p.pending_skip(),
                })
            })
            .collect();

        Ok(LayerData {
            columns: self.columns(),
            rows: self.rows(),
            knobs,
            cells,
            playheads,
        })
    }
}
