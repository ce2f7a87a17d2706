//! Maps stable tool type ids to constructors.

use std::collections::BTreeMap;

use elysium_types::ToolData;

use super::{
    GenerateTool, NoteTool, ReboundTool, SkipTool, SpinTool, SplitTool, Tool, ToolKind, ABSORB,
    GENERATE, NOTE, REBOUND, SKIP, SPIN, SPLIT,
};
use crate::config::Config;
use crate::error::{EngineError, EngineResult};
use crate::state::knob::KnobBank;

/// Builds the type-specific part of a tool, allocating its knobs in the bank.
pub type ToolConstructor = fn(&mut KnobBank) -> ToolKind;

#[derive(Clone, Copy)]
struct Entry {
    constructor: ToolConstructor,
    preferred_order: i32,
}

#[derive(Clone, Default)]
pub struct ToolRegistry {
    entries: BTreeMap<String, Entry>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(id, e)| (id, e.preferred_order)))
            .finish()
    }
}

impl ToolRegistry {
    /// An empty registry. Most callers want [`ToolRegistry::with_builtins`].
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(GENERATE, |bank| ToolKind::Generate(GenerateTool::new(bank)), 0);
        registry.register(NOTE, |bank| ToolKind::Note(NoteTool::new(bank)), 1);
        registry.register(REBOUND, |bank| ToolKind::Rebound(ReboundTool::new(bank)), 2);
        registry.register(SPIN, |bank| ToolKind::Spin(SpinTool::new(bank)), 3);
        registry.register(SKIP, |bank| ToolKind::Skip(SkipTool::new(bank)), 4);
        registry.register(SPLIT, |bank| ToolKind::Split(SplitTool::new(bank)), 5);
        registry.register(ABSORB, |_| ToolKind::Absorb, 6);
        registry
    }

    /// Built-ins with preferred orders taken from `[tools.order]`.
    pub fn from_config(config: &Config) -> Self {
        let mut registry = Self::with_builtins();
        for (type_id, entry) in registry.entries.iter_mut() {
            if let Some(order) = config.tool_order(type_id) {
                entry.preferred_order = order;
            }
        }
        registry
    }

    /// Register (or replace) a constructor for `type_id`.
    pub fn register(&mut self, type_id: &str, constructor: ToolConstructor, preferred_order: i32) {
        self.entries.insert(type_id.to_string(), Entry { constructor, preferred_order });
    }

    pub fn contains(&self, type_id: &str) -> bool {
        self.entries.contains_key(type_id)
    }

    pub fn type_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Construct a detached tool with default knob values.
    pub fn create(&self, type_id: &str, bank: &mut KnobBank) -> EngineResult<Tool> {
        let entry = self
            .entries
            .get(type_id)
            .ok_or_else(|| EngineError::UnknownToolType(type_id.to_string()))?;
        let kind = (entry.constructor)(bank);
        Ok(Tool::new(type_id, kind, entry.preferred_order, bank))
    }

    /// Construct a tool from saved data. On failure every knob allocated for
    /// the tool is released again.
    pub fn restore(
        &self,
        data: &ToolData,
        bank: &mut KnobBank,
        resolve_link: impl Fn(&str) -> Option<elysium_types::KnobId>,
    ) -> EngineResult<Tool> {
        let mut tool = self.create(&data.tool_type, bank)?;
        if let Err(e) = tool.apply_data(data, bank, resolve_link) {
            tool.removed_from_layer(bank);
            return Err(e);
        }
        Ok(tool)
    }
}
