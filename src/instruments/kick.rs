//! Kick drum.
//!
//! A sine body with an instant attack and a quick decay. A short filter
//! envelope adds click at the front of the hit.
//!
//! # Variations
//!
//! - Longer decay = boomy 808-style kick
//! - Route `env1` to `osc1Pitch` = pitch-swept kick

use crate::backend::{FilterKind, OscillatorShape};
use crate::dsp::envelope::EnvelopeSpec;
use crate::synth::params::ParamSet;

pub fn kick() -> ParamSet {
    ParamSet::default()
        .with_osc1(OscillatorShape::Sine, 1.0)
        .with_filter(FilterKind::Lowpass, 200.0, 1.0)
        .with_filter_env(EnvelopeSpec::adsr(0.001, 0.03, 0.0, 0.01), 0.2)
        .with_amp_env(EnvelopeSpec::adsr(0.001, 0.15, 0.0, 0.05))
        .with_volume(0.9)
}
