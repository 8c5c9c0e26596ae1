//! Pad - sustained, atmospheric texture.
//!
//! # How It Works
//!
//! 1. Two detuned sawtooth oscillators create width and movement
//! 2. Slow attack for a gradual fade-in
//! 3. High sustain keeps the sound alive while held
//! 4. Long release for a smooth fade-out
//! 5. Low-pass filter softens the brightness
//!
//! # Variations
//!
//! - More detune (20+ cents) = wider, more dramatic
//! - Route `lfo2` to `filterCutoff` = evolving texture

use crate::backend::{FilterKind, OscillatorShape};
use crate::dsp::envelope::EnvelopeSpec;
use crate::synth::params::ParamSet;

pub fn pad() -> ParamSet {
    ParamSet::default()
        .with_osc1(OscillatorShape::Sawtooth, 0.6)
        .with_osc2(OscillatorShape::Sawtooth, 0.6, 0.0, 8.0)
        .with_filter(FilterKind::Lowpass, 2500.0, 0.7)
        .with_amp_env(EnvelopeSpec::adsr(0.3, 0.1, 0.8, 0.5))
        .with_volume(0.6)
}
