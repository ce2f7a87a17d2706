use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::state::{EdgePolicy, LayerSettings};

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    grid: GridConfig,
    #[serde(default)]
    engine: EngineConfig,
    #[serde(default)]
    tools: ToolsConfig,
    #[serde(default)]
    midi: MidiConfig,
}

#[derive(Deserialize, Default)]
struct GridConfig {
    columns: Option<u32>,
    rows: Option<u32>,
    base_pitch: Option<i32>,
}

#[derive(Deserialize, Default)]
struct EngineConfig {
    edge_policy: Option<String>,
    seed: Option<u64>,
}

#[derive(Deserialize, Default)]
struct ToolsConfig {
    #[serde(default)]
    order: BTreeMap<String, i32>,
}

#[derive(Deserialize, Default)]
struct MidiConfig {
    client_name: Option<String>,
    port_name: Option<String>,
}

pub struct Config {
    grid: GridConfig,
    engine: EngineConfig,
    tools: ToolsConfig,
    midi: MidiConfig,
}

impl Config {
    /// Embedded defaults merged with the user's config file, if present.
    pub fn load() -> Self {
        match user_config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Self::embedded(),
        }
    }

    /// Embedded defaults merged with the file at `path`. A missing or
    /// malformed file is logged and the defaults are kept.
    pub fn load_from(path: &Path) -> Self {
        let mut base = embedded_file();
        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<ConfigFile>(&contents) {
                Ok(user) => merge(&mut base, user),
                Err(e) => {
                    log::warn!(target: "config", "ignoring malformed config {}: {}", path.display(), e)
                }
            },
            Err(e) => {
                log::warn!(target: "config", "could not read config {}: {}", path.display(), e)
            }
        }
        Self::from_file(base)
    }

    pub fn embedded() -> Self {
        Self::from_file(embedded_file())
    }

    fn from_file(file: ConfigFile) -> Self {
        Config {
            grid: file.grid,
            engine: file.engine,
            tools: file.tools,
            midi: file.midi,
        }
    }

    pub fn edge_policy(&self) -> EdgePolicy {
        self.engine
            .edge_policy
            .as_deref()
            .and_then(parse_edge_policy)
            .unwrap_or_default()
    }

    pub fn layer_settings(&self) -> LayerSettings {
        let fallback = LayerSettings::default();
        LayerSettings {
            columns: self.grid.columns.unwrap_or(fallback.columns).max(1),
            rows: self.grid.rows.unwrap_or(fallback.rows).max(1),
            base_pitch: self.grid.base_pitch.unwrap_or(fallback.base_pitch),
            edge_policy: self.edge_policy(),
            seed: self.engine.seed.unwrap_or(fallback.seed),
        }
    }

    /// Preferred execution order for a tool type, if configured.
    pub fn tool_order(&self, tool_type: &str) -> Option<i32> {
        self.tools.order.get(tool_type).copied()
    }

    pub fn midi_client_name(&self) -> &str {
        self.midi.client_name.as_deref().unwrap_or("elysium")
    }

    pub fn midi_port_name(&self) -> &str {
        self.midi.port_name.as_deref().unwrap_or("Elysium out")
    }
}

fn embedded_file() -> ConfigFile {
    match toml::from_str(DEFAULT_CONFIG) {
        Ok(file) => file,
        Err(e) => {
            log::error!(target: "config", "embedded config.toml is invalid: {}", e);
            ConfigFile::default()
        }
    }
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("elysium").join("config.toml"))
}

fn merge(base: &mut ConfigFile, user: ConfigFile) {
    if user.grid.columns.is_some() {
        base.grid.columns = user.grid.columns;
    }
    if user.grid.rows.is_some() {
        base.grid.rows = user.grid.rows;
    }
    if user.grid.base_pitch.is_some() {
        base.grid.base_pitch = user.grid.base_pitch;
    }
    if user.engine.edge_policy.is_some() {
        base.engine.edge_policy = user.engine.edge_policy;
    }
    if user.engine.seed.is_some() {
        base.engine.seed = user.engine.seed;
    }
    base.tools.order.extend(user.tools.order);
    if user.midi.client_name.is_some() {
        base.midi.client_name = user.midi.client_name;
    }
    if user.midi.port_name.is_some() {
        base.midi.port_name = user.midi.port_name;
    }
}

fn parse_edge_policy(s: &str) -> Option<EdgePolicy> {
    match s.to_lowercase().as_str() {
        "stop" => Some(EdgePolicy::Stop),
        "wrap" => Some(EdgePolicy::Wrap),
        "bounce" => Some(EdgePolicy::Bounce),
        "remove" | "absorb" => Some(EdgePolicy::Remove),
        _ => None,
    }
}
