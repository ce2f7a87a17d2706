//! # elysium-core
//!
//! Engine library for the Elysium generative sequencer. Playheads travel a
//! hexagonal grid of cells laid out on a harmonic table; tools attached to
//! the cells emit MIDI, steer playheads and spawn new ones. Everything is
//! step driven: the host decides when a tick happens.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use elysium_core::config::Config;
//! use elysium_core::midi::RecordingSink;
//! use elysium_core::state::Layer;
//! use elysium_core::tool::{ToolRegistry, NOTE};
//! use elysium_types::Direction;
//!
//! let config = Config::load();
//! let registry = ToolRegistry::from_config(&config);
//! let mut layer = Layer::new(config.layer_settings());
//!
//! let cell = layer.cell_at(3, 4).unwrap();
//! layer.add_new_tool(&registry, cell, NOTE)?;
//! layer.add_playhead(cell, Direction::N, None)?;
//!
//! let mut sink = RecordingSink::new();
//! layer.tick(&mut sink)?;
//! ```
//!
//! ## Module Overview
//!
//! - [`state`]: cells, knobs, oscillators, playheads, the [`state::Layer`]
//!   tick engine, the multi-layer [`state::Player`] and persistence
//! - [`tool`]: tool behaviours and the [`tool::ToolRegistry`]
//! - [`midi`]: the [`midi::MidiSink`] output trait and its implementations
//! - [`config`]: TOML configuration (embedded defaults + user override)
//! - [`error`]: [`error::EngineError`]

pub mod config;
pub mod error;
pub mod midi;
pub mod state;
pub mod tool;

pub use error::{EngineError, EngineResult};
