//! Clap - punchy, bright hand clap.
//!
//! Band-passed noise around 1.5 kHz with a slight attack. The band-pass
//! removes both the low rumble and the ultra-high hiss, leaving the
//! characteristic crack.

use crate::backend::{FilterKind, NoiseColor, OscillatorShape};
use crate::dsp::envelope::EnvelopeSpec;
use crate::synth::params::ParamSet;

pub fn clap() -> ParamSet {
    ParamSet::default()
        .with_osc1(OscillatorShape::Square, 0.0)
        .with_noise(NoiseColor::Pink, 1.0)
        .with_filter(FilterKind::Bandpass, 1500.0, 1.2)
        .with_amp_env(EnvelopeSpec::adsr(0.005, 0.08, 0.0, 0.1))
}
