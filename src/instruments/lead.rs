//! Lead.
//!
//! A bright sawtooth doubled by a slightly detuned square. Sawtooth waves
//! contain all harmonics, so leads built on them cut through a mix.
//!
//! # Variations
//!
//! - Route an LFO to `filterCutoff` = wah-wah
//! - Shorter decay, no sustain = plucky lead

use crate::backend::{FilterKind, OscillatorShape};
use crate::dsp::envelope::EnvelopeSpec;
use crate::synth::params::ParamSet;

pub fn lead() -> ParamSet {
    ParamSet::default()
        .with_osc1(OscillatorShape::Sawtooth, 0.8)
        .with_osc2(OscillatorShape::Square, 0.4, 0.0, 7.0)
        .with_filter(FilterKind::Lowpass, 2500.0, 2.0)
        .with_filter_env(EnvelopeSpec::adsr(0.01, 0.25, 0.4, 0.2), 0.3)
        .with_amp_env(EnvelopeSpec::adsr(0.01, 0.1, 0.6, 0.2))
}
