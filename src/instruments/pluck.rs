//! Pluck - percussive, quickly decaying note.
//!
//! Triangle wave through a bright filter with an instant attack and no
//! sustain. Works for guitar-like parts, arpeggios and kalimba tones.

use crate::backend::{FilterKind, OscillatorShape};
use crate::dsp::envelope::EnvelopeSpec;
use crate::synth::params::ParamSet;

pub fn pluck() -> ParamSet {
    ParamSet::default()
        .with_osc1(OscillatorShape::Triangle, 0.9)
        .with_filter(FilterKind::Lowpass, 4000.0, 1.0)
        .with_filter_env(EnvelopeSpec::adsr(0.001, 0.12, 0.0, 0.1), 0.4)
        .with_amp_env(EnvelopeSpec::adsr(0.001, 0.15, 0.0, 0.1))
}
