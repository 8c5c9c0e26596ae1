//! Keys.
//!
//! A soft piano-like tone: triangle plus a quiet sine an octave up, fast
//! attack and a long decay into a low sustain.

use crate::backend::{FilterKind, OscillatorShape};
use crate::dsp::envelope::EnvelopeSpec;
use crate::synth::params::ParamSet;

pub fn keys() -> ParamSet {
    ParamSet::default()
        .with_osc1(OscillatorShape::Triangle, 0.8)
        .with_osc2(OscillatorShape::Sine, 0.3, 12.0, 0.0)
        .with_filter(FilterKind::Lowpass, 3500.0, 0.7)
        .with_amp_env(EnvelopeSpec::adsr(0.002, 1.2, 0.2, 0.4))
}
