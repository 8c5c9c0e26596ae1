//! Closed hi-hat: a tight burst of high-passed noise.

use crate::backend::{FilterKind, NoiseColor, OscillatorShape};
use crate::dsp::envelope::EnvelopeSpec;
use crate::synth::params::ParamSet;

pub fn hihat() -> ParamSet {
    ParamSet::default()
        .with_osc1(OscillatorShape::Square, 0.0)
        .with_noise(NoiseColor::White, 0.9)
        .with_filter(FilterKind::Highpass, 7000.0, 0.7)
        .with_amp_env(EnvelopeSpec::adsr(0.001, 0.05, 0.0, 0.03))
        .with_volume(0.5)
}
