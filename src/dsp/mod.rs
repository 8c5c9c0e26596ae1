//! Control-rate signal math used by the modulation matrix and voices.
//!
//! Everything here is a pure function of time and parameters: no allocation,
//! no locking, no backend calls. Sample-level DSP lives in the audio backend;
//! these helpers only decide *what values* the backend should be driven with.

/// Attack/decay/sustain/release level as a function of elapsed time.
pub mod envelope;
/// LFO waveform evaluation and bipolar/unipolar helpers.
pub mod lfo;
/// Note names, MIDI numbers and equal-temperament frequencies.
pub mod note;

pub use envelope::{EnvelopeSpec, EnvelopeStage};
pub use lfo::{LfoState, LfoWaveform, RandomMode};
