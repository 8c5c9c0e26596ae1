// Purpose: Channel → bus → master routing with sends and mute/solo.

pub mod graph;
pub mod state;
pub mod strip;

pub use graph::MixerGraph;
pub use state::MixerState;
pub use strip::{Bus, Channel, FxSend, Master};
