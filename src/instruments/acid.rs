//! Acid bass.
//!
//! A resonant sawtooth with a strong filter envelope sweep. Low base cutoff
//! plus a high envelope amount gives the squelchy attack of a TB-303 line.

use crate::backend::{FilterKind, OscillatorShape};
use crate::dsp::envelope::EnvelopeSpec;
use crate::synth::params::ParamSet;

pub fn acid() -> ParamSet {
    ParamSet::default()
        .with_osc1(OscillatorShape::Sawtooth, 0.9)
        .with_filter(FilterKind::Lowpass, 300.0, 12.0)
        .with_filter_env(EnvelopeSpec::adsr(0.002, 0.18, 0.0, 0.1), 0.6)
        .with_amp_env(EnvelopeSpec::adsr(0.002, 0.2, 0.5, 0.08))
        .with_volume(0.7)
}
