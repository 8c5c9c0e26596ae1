//! Tom drum.
//!
//! A pitched drum in the range above the kick. Sine body plus a quiet
//! triangle a fifth up for a touch of ring.

use crate::backend::{FilterKind, OscillatorShape};
use crate::dsp::envelope::EnvelopeSpec;
use crate::synth::params::ParamSet;

pub fn tom() -> ParamSet {
    ParamSet::default()
        .with_osc1(OscillatorShape::Sine, 0.9)
        .with_osc2(OscillatorShape::Triangle, 0.2, 7.0, 0.0)
        .with_filter(FilterKind::Lowpass, 400.0, 1.0)
        .with_amp_env(EnvelopeSpec::adsr(0.001, 0.12, 0.0, 0.05))
}
