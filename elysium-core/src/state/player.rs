//! Transport over several layers sharing one MIDI sink.

use super::layer::{Layer, LayerSettings};
use super::playhead::EdgePolicy;
use crate::config::Config;
use crate::error::EngineResult;
use crate::midi::MidiSink;

pub struct Player<S: MidiSink> {
    layers: Vec<Layer>,
    sink: S,
    edge_policy: EdgePolicy,
    running: bool,
}

impl<S: MidiSink> Player<S> {
    pub fn new(sink: S) -> Self {
        Self {
            layers: Vec::new(),
            sink,
            edge_policy: EdgePolicy::default(),
            running: false,
        }
    }

    pub fn from_config(sink: S, config: &Config) -> Self {
        let mut player = Self::new(sink);
        player.edge_policy = config.edge_policy();
        player
    }

    /// Default policy given to layers created through [`Player::new_layer`].
    pub fn edge_policy(&self) -> EdgePolicy {
        self.edge_policy
    }

    pub fn set_edge_policy(&mut self, policy: EdgePolicy) {
        self.edge_policy = policy;
    }

    /// Create a layer with the player's edge policy. Returns its index.
    pub fn new_layer(&mut self, settings: LayerSettings) -> usize {
        self.add_layer(Layer::new(LayerSettings { edge_policy: self.edge_policy, ..settings }))
    }

    pub fn add_layer(&mut self, layer: Layer) -> usize {
        self.layers.push(layer);
        self.layers.len() - 1
    }

    pub fn remove_layer(&mut self, index: usize) -> Option<Layer> {
        if index >= self.layers.len() {
            return None;
        }
        let mut layer = self.layers.remove(index);
        layer.release_all(&mut self.sink);
        Some(layer)
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)
    }

    pub fn layer_mut(&mut self, index: usize) -> Option<&mut Layer> {
        self.layers.get_mut(index)
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Send program changes and begin accepting ticks.
    pub fn start(&mut self) -> EngineResult {
        for layer in &mut self.layers {
            layer.start(&mut self.sink)?;
        }
        self.running = true;
        log::info!(target: "player", "started with {} layer(s)", self.layers.len());
        Ok(())
    }

    /// Tick every layer in order. Does nothing while stopped.
    pub fn tick(&mut self) -> EngineResult {
        if !self.running {
            return Ok(());
        }
        for layer in &mut self.layers {
            layer.tick(&mut self.sink)?;
        }
        Ok(())
    }

    /// Stop and release every sounding note.
    pub fn stop(&mut self) {
        for layer in &mut self.layers {
            layer.release_all(&mut self.sink);
        }
        self.running = false;
        log::info!(target: "player", "stopped");
    }

    /// Stop, clear playheads and rewind every layer.
    pub fn reset(&mut self) {
        self.stop();
        for layer in &mut self.layers {
            layer.reset(&mut self.sink);
        }
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}
