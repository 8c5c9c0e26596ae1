use crate::dsp::lfo::{self, LfoState, LfoWaveform, RandomMode};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub const LFO1: &str = "lfo1";
pub const LFO2: &str = "lfo2";
pub const LFO3: &str = "lfo3";
pub const LFO4: &str = "lfo4";
/// Filter envelope.
pub const ENV1: &str = "env1";
/// Amplitude envelope.
pub const ENV2: &str = "env2";
pub const VELOCITY: &str = "velocity";
pub const MOD_WHEEL: &str = "modwheel";
pub const AFTERTOUCH: &str = "aftertouch";
pub const PITCH_BEND: &str = "pitchbend";

#[derive(Debug, Clone, PartialEq)]
pub enum SourceKind {
    Lfo(LfoState),
    /// Per-voice envelope; the stored value mirrors the newest voice.
    Envelope,
    /// Performance control (velocity, wheels, aftertouch).
    Performance,
}

/// A named modulation source and its most recent value.
#[derive(Debug, Clone)]
pub struct ModulationSource {
    pub id: String,
    pub name: String,
    pub kind: SourceKind,
    pub current_value: f32,
    /// Time the cycle restarts from when the LFO retriggers on note-on.
    origin: f64,
}

impl ModulationSource {
    pub fn lfo(id: &str, name: &str, state: LfoState) -> Self {
        Self::new(id, name, SourceKind::Lfo(state))
    }

    pub fn envelope(id: &str, name: &str) -> Self {
        Self::new(id, name, SourceKind::Envelope)
    }

    pub fn performance(id: &str, name: &str) -> Self {
        Self::new(id, name, SourceKind::Performance)
    }

    fn new(id: &str, name: &str, kind: SourceKind) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            kind,
            current_value: 0.0,
            origin: 0.0,
        }
    }

    pub fn is_lfo(&self) -> bool {
        matches!(self.kind, SourceKind::Lfo(_))
    }

    pub fn lfo_state(&self) -> Option<&LfoState> {
        match &self.kind {
            SourceKind::Lfo(state) => Some(state),
            _ => None,
        }
    }

    pub(crate) fn lfo_state_mut(&mut self) -> Option<&mut LfoState> {
        match &mut self.kind {
            SourceKind::Lfo(state) => Some(state),
            _ => None,
        }
    }

    /// Value at time `t` without touching stored state.
    pub fn value_at(&self, t: f64) -> f32 {
        match &self.kind {
            SourceKind::Lfo(state) => {
                let local = if state.retrigger { t - self.origin } else { t };
                lfo::evaluate(state, local)
            }
            SourceKind::Envelope | SourceKind::Performance => {
                if self.current_value.is_finite() {
                    self.current_value
                } else {
                    0.0
                }
            }
        }
    }

    /// Value seen by direct evaluation at `t`.
    ///
    /// A per-sample random LFO has no value as a function of time, so it
    /// reads what the last tick drew instead of redrawing on every query.
    pub fn observed_at(&self, t: f64) -> f32 {
        match &self.kind {
            SourceKind::Lfo(state)
                if state.waveform == LfoWaveform::Random
                    && state.random_mode == RandomMode::PerSample =>
            {
                if self.current_value.is_finite() {
                    self.current_value
                } else {
                    0.0
                }
            }
            _ => self.value_at(t),
        }
    }

    /// Sample once for a control tick and store the result.
    pub(crate) fn advance(&mut self, t: f64) -> f32 {
        self.current_value = self.value_at(t);
        self.current_value
    }

    /// Restart a retriggering LFO at `now`.
    pub(crate) fn retrigger(&mut self, now: f64) {
        if matches!(&self.kind, SourceKind::Lfo(state) if state.retrigger) {
            self.origin = now;
        }
    }
}

/// Partial LFO update; unset fields keep their current value.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LfoPatch {
    pub rate_hz: Option<f32>,
    pub waveform: Option<LfoWaveform>,
    pub phase: Option<f32>,
    pub depth: Option<f32>,
    pub bipolar: Option<bool>,
    pub retrigger: Option<bool>,
    pub random_mode: Option<RandomMode>,
}

impl LfoPatch {
    pub fn from_state(state: &LfoState) -> Self {
        Self {
            rate_hz: Some(state.rate_hz),
            waveform: Some(state.waveform),
            phase: Some(state.phase),
            depth: Some(state.depth),
            bipolar: Some(state.bipolar),
            retrigger: Some(state.retrigger),
            random_mode: Some(state.random_mode),
        }
    }

    /// Apply to `state`. Rate is kept non-negative, depth in [0, 1], phase in [0, 1).
    pub fn apply(&self, state: &mut LfoState) {
        if let Some(rate) = self.rate_hz.filter(|r| r.is_finite()) {
            state.rate_hz = rate.max(0.0);
        }
        if let Some(waveform) = self.waveform {
            state.waveform = waveform;
        }
        if let Some(phase) = self.phase.filter(|p| p.is_finite()) {
            state.phase = phase - phase.floor();
        }
        if let Some(depth) = self.depth.filter(|d| d.is_finite()) {
            state.depth = depth.clamp(0.0, 1.0);
        }
        if let Some(bipolar) = self.bipolar {
            state.bipolar = bipolar;
        }
        if let Some(retrigger) = self.retrigger {
            state.retrigger = retrigger;
        }
        if let Some(mode) = self.random_mode {
            state.random_mode = mode;
        }
    }
}

/// The stock source set: four LFOs, two envelopes, four performance controls.
pub fn default_sources(seed: u64) -> Vec<ModulationSource> {
    vec![
        ModulationSource::lfo(LFO1, "LFO 1", LfoState::sine(4.0)),
        ModulationSource::lfo(LFO2, "LFO 2", LfoState::triangle(0.5)),
        ModulationSource::lfo(LFO3, "LFO 3", LfoState::square(8.0)),
        ModulationSource::lfo(
            LFO4,
            "LFO 4",
            LfoState::random(1.0).unipolar().retriggered().with_seed(seed),
        ),
        ModulationSource::envelope(ENV1, "Filter Env"),
        ModulationSource::envelope(ENV2, "Amp Env"),
        ModulationSource::performance(VELOCITY, "Velocity"),
        ModulationSource::performance(MOD_WHEEL, "Mod Wheel"),
        ModulationSource::performance(AFTERTOUCH, "Aftertouch"),
        ModulationSource::performance(PITCH_BEND, "Pitch Bend"),
    ]
}
