//! Bass.
//!
//! A classic subtractive bass: a square wave filtered down, with a sine sub
//! an octave below for weight.
//!
//! # How It Works
//!
//! 1. Square oscillator provides hollow, odd-harmonic content
//! 2. Sine sub oscillator reinforces the fundamental
//! 3. Low-pass filter removes upper harmonics
//! 4. Snappy amplitude envelope for rhythmic lines
//!
//! # Variations
//!
//! - Higher cutoff = more aggressive bass
//! - Add filter envelope amount = 303-style bass (see [`acid`](super::acid))
//! - Sawtooth instead = brighter, more present

use crate::backend::{FilterKind, OscillatorShape};
use crate::dsp::envelope::EnvelopeSpec;
use crate::synth::params::ParamSet;

pub fn bass() -> ParamSet {
    ParamSet::default()
        .with_osc1(OscillatorShape::Square, 0.8)
        .with_sub(OscillatorShape::Sine, 0.5)
        .with_filter(FilterKind::Lowpass, 500.0, 1.0)
        .with_amp_env(EnvelopeSpec::adsr(0.01, 0.1, 0.7, 0.15))
        .with_volume(0.8)
}
