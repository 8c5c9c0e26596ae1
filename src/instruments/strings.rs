//! Strings - bowed ensemble.
//!
//! Two detuned sawtooths with a slow attack and a band-limiting high-pass in
//! series to thin out the low end.

use crate::backend::{FilterKind, OscillatorShape};
use crate::dsp::envelope::EnvelopeSpec;
use crate::synth::params::ParamSet;

pub fn strings() -> ParamSet {
    ParamSet::default()
        .with_osc1(OscillatorShape::Sawtooth, 0.6)
        .with_osc2(OscillatorShape::Sawtooth, 0.6, 0.0, -12.0)
        .with_filter(FilterKind::Lowpass, 3000.0, 0.8)
        .with_filter2(FilterKind::Highpass, 120.0, 0.7)
        .with_amp_env(EnvelopeSpec::adsr(0.25, 0.2, 0.85, 0.6))
        .with_volume(0.6)
}
