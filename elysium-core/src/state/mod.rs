pub mod hex;
pub mod knob;
pub mod layer;
pub mod oscillator;
pub mod persistence;
pub mod player;
pub mod playhead;
pub mod random;

pub use hex::{harmonic_pitch, neighbour_coord, HexCell};
pub use knob::{Knob, KnobBank, KnobRange};
pub use layer::{Layer, LayerEvent, LayerKnobs, LayerSettings, MAX_DIMENSION};
pub use oscillator::Oscillator;
pub use persistence::{from_json, to_json};
pub use player::Player;
pub use playhead::{EdgePolicy, Playhead};
pub use random::Lcg;
