//! modmix: a modulation-routed synthesis and mixing engine.
//!
//! Voices play through per-instrument channels, channels feed buses, buses
//! feed the master, and a modulation matrix routes LFOs, envelopes and
//! performance controls onto synthesis destinations. Sample-level DSP is left
//! to an [`AudioBackend`]; this crate decides the node graph and the values
//! the backend is driven with at control rate.
//!
//! ```
//! use modmix::{Engine, EngineConfig, OfflineBackend};
//!
//! let engine = Engine::new(EngineConfig::default(), OfflineBackend::new()).unwrap();
//! engine.add_routing("lfo1", "filterCutoff", 0.5).unwrap();
//! let voice = engine.play_note("tb303", "A2", 0.9, Some(0.25)).unwrap();
//! assert!(voice.is_some());
//! engine.tick();
//! ```

pub mod backend;
pub mod config;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod instruments;
pub mod mixer;
pub mod modulation;
pub mod preset;
pub mod synth;

/// Shortest envelope segment; zero and negative times are clamped up to this.
pub const MIN_SEGMENT_SECS: f32 = 0.001;

pub use backend::{AudioBackend, BackendError, NodeId, OfflineBackend};
pub use config::EngineConfig;
pub use engine::{Engine, EngineStats, TickReport};
pub use error::{EngineError, Result};
pub use mixer::MixerState;
pub use modulation::{LfoPatch, ModulationMatrix, RoutingId};
pub use preset::{Preset, PresetReport};
pub use synth::message::ControlMessage;
pub use synth::params::ParamValue;
pub use synth::voice::VoiceId;
