//! Snare drum.
//!
//! A tonal triangle body mixed with noise for the wire rattle.
//!
//! # How It Works
//!
//! 1. Triangle wave provides the drum head
//! 2. White noise provides the snare wires
//! 3. Band-pass filter shapes the noise toward wire buzz
//!
//! # Variations
//!
//! - More noise = trashy, lo-fi snare
//! - Less noise = more tom-like

use crate::backend::{FilterKind, NoiseColor, OscillatorShape};
use crate::dsp::envelope::EnvelopeSpec;
use crate::synth::params::ParamSet;

pub fn snare() -> ParamSet {
    ParamSet::default()
        .with_osc1(OscillatorShape::Triangle, 0.4)
        .with_noise(NoiseColor::White, 0.7)
        .with_filter(FilterKind::Bandpass, 3000.0, 0.9)
        .with_amp_env(EnvelopeSpec::adsr(0.001, 0.12, 0.0, 0.08))
}
