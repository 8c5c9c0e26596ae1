//! Organ.
//!
//! Square and sine drawbars at unison and an octave up. Gate-like envelope:
//! full level while held, short click-free release.

use crate::backend::{FilterKind, OscillatorShape};
use crate::dsp::envelope::EnvelopeSpec;
use crate::synth::params::ParamSet;

pub fn organ() -> ParamSet {
    ParamSet::default()
        .with_osc1(OscillatorShape::Square, 0.5)
        .with_osc2(OscillatorShape::Sine, 0.5, 12.0, 0.0)
        .with_sub(OscillatorShape::Sine, 0.4)
        .with_filter(FilterKind::Lowpass, 5000.0, 0.7)
        .with_amp_env(EnvelopeSpec::adsr(0.005, 0.01, 1.0, 0.05))
}
