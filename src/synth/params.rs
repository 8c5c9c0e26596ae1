//! Typed instrument parameter schema.
//!
//! Every instrument exposes the same closed set of parameters. Names are the
//! camelCase identifiers presets use (`filter1Cutoff`, `ampEnvRelease`, ...).
//! Numeric values are clamped to the parameter's range; text values must name
//! a known waveform, filter type or noise colour.

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::backend::{FilterKind, NoiseColor, OscillatorShape};
use crate::dsp::envelope::EnvelopeSpec;
use crate::error::{EngineError, Result};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Bool(bool),
    Number(f32),
    Text(String),
}

impl From<f32> for ParamValue {
    fn from(value: f32) -> Self {
        ParamValue::Number(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

/// What a parameter accepts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamType {
    Number { min: f32, max: f32 },
    Waveform,
    Filter,
    Noise,
    Toggle,
}

macro_rules! params {
    ($($variant:ident => $name:literal, $ty:expr;)+) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Param {
            $($variant,)+
        }

        impl Param {
            pub const ALL: &'static [Param] = &[$(Param::$variant,)+];

            pub fn name(self) -> &'static str {
                match self {
                    $(Param::$variant => $name,)+
                }
            }

            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($name => Some(Param::$variant),)+
                    _ => None,
                }
            }

            pub fn param_type(self) -> ParamType {
                match self {
                    $(Param::$variant => $ty,)+
                }
            }
        }
    };
}

const LEVEL: ParamType = ParamType::Number { min: 0.0, max: 1.0 };
const SEMITONES: ParamType = ParamType::Number { min: -24.0, max: 24.0 };
const CENTS: ParamType = ParamType::Number { min: -100.0, max: 100.0 };
const CUTOFF: ParamType = ParamType::Number { min: 20.0, max: 10_000.0 };
const RESONANCE: ParamType = ParamType::Number { min: 0.1, max: 30.0 };
const SECONDS: ParamType = ParamType::Number { min: 0.0, max: 10.0 };

params! {
    Osc1Waveform => "osc1Waveform", ParamType::Waveform;
    Osc1Level => "osc1Level", LEVEL;
    Osc1Semitone => "osc1Semitone", SEMITONES;
    Osc1Detune => "osc1Detune", CENTS;
    Osc2Waveform => "osc2Waveform", ParamType::Waveform;
    Osc2Level => "osc2Level", LEVEL;
    Osc2Semitone => "osc2Semitone", SEMITONES;
    Osc2Detune => "osc2Detune", CENTS;
    SubWaveform => "subWaveform", ParamType::Waveform;
    SubLevel => "subLevel", LEVEL;
    NoiseType => "noiseType", ParamType::Noise;
    NoiseLevel => "noiseLevel", LEVEL;
    Filter1Type => "filter1Type", ParamType::Filter;
    Filter1Cutoff => "filter1Cutoff", CUTOFF;
    Filter1Resonance => "filter1Resonance", RESONANCE;
    Filter2Enabled => "filter2Enabled", ParamType::Toggle;
    Filter2Type => "filter2Type", ParamType::Filter;
    Filter2Cutoff => "filter2Cutoff", CUTOFF;
    Filter2Resonance => "filter2Resonance", RESONANCE;
    FilterEnvAttack => "filterEnvAttack", SECONDS;
    FilterEnvDecay => "filterEnvDecay", SECONDS;
    FilterEnvSustain => "filterEnvSustain", LEVEL;
    FilterEnvRelease => "filterEnvRelease", SECONDS;
    FilterEnvAmount => "filterEnvAmount", LEVEL;
    AmpEnvAttack => "ampEnvAttack", SECONDS;
    AmpEnvDecay => "ampEnvDecay", SECONDS;
    AmpEnvSustain => "ampEnvSustain", LEVEL;
    AmpEnvRelease => "ampEnvRelease", SECONDS;
    Volume => "volume", LEVEL;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OscLayer {
    pub shape: OscillatorShape,
    pub level: f32,
    pub semitone: f32,
    pub detune: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterStage {
    pub kind: FilterKind,
    pub cutoff: f32,
    pub resonance: f32,
}

/// Current values of every [`Param`] for one instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSet {
    pub osc1: OscLayer,
    pub osc2: OscLayer,
    pub sub_shape: OscillatorShape,
    pub sub_level: f32,
    pub noise_color: NoiseColor,
    pub noise_level: f32,
    pub filter1: FilterStage,
    pub filter2_enabled: bool,
    pub filter2: FilterStage,
    pub filter_env: EnvelopeSpec,
    /// How far the filter envelope sweeps cutoff toward the top of its range.
    pub filter_env_amount: f32,
    pub amp_env: EnvelopeSpec,
    pub volume: f32,
}

impl Default for ParamSet {
    fn default() -> Self {
        Self {
            osc1: OscLayer {
                shape: OscillatorShape::Sawtooth,
                level: 0.8,
                semitone: 0.0,
                detune: 0.0,
            },
            osc2: OscLayer {
                shape: OscillatorShape::Square,
                level: 0.0,
                semitone: 0.0,
                detune: 7.0,
            },
            sub_shape: OscillatorShape::Sine,
            sub_level: 0.0,
            noise_color: NoiseColor::White,
            noise_level: 0.0,
            filter1: FilterStage {
                kind: FilterKind::Lowpass,
                cutoff: 2000.0,
                resonance: 1.0,
            },
            filter2_enabled: false,
            filter2: FilterStage {
                kind: FilterKind::Highpass,
                cutoff: 20.0,
                resonance: 0.7,
            },
            filter_env: EnvelopeSpec::adsr(0.01, 0.3, 0.3, 0.3),
            filter_env_amount: 0.0,
            amp_env: EnvelopeSpec::default(),
            volume: 0.7,
        }
    }
}

impl ParamSet {
    pub fn with_osc1(mut self, shape: OscillatorShape, level: f32) -> Self {
        self.osc1.shape = shape;
        self.osc1.level = level.clamp(0.0, 1.0);
        self
    }

    pub fn with_osc2(mut self, shape: OscillatorShape, level: f32, semitone: f32, detune: f32) -> Self {
        self.osc2 = OscLayer {
            shape,
            level: level.clamp(0.0, 1.0),
            semitone: semitone.clamp(-24.0, 24.0),
            detune: detune.clamp(-100.0, 100.0),
        };
        self
    }

    pub fn with_sub(mut self, shape: OscillatorShape, level: f32) -> Self {
        self.sub_shape = shape;
        self.sub_level = level.clamp(0.0, 1.0);
        self
    }

    pub fn with_noise(mut self, color: NoiseColor, level: f32) -> Self {
        self.noise_color = color;
        self.noise_level = level.clamp(0.0, 1.0);
        self
    }

    pub fn with_filter(mut self, kind: FilterKind, cutoff: f32, resonance: f32) -> Self {
        self.filter1 = FilterStage {
            kind,
            cutoff: cutoff.clamp(20.0, 10_000.0),
            resonance: resonance.clamp(0.1, 30.0),
        };
        self
    }

    /// Enable the second, serial filter.
    pub fn with_filter2(mut self, kind: FilterKind, cutoff: f32, resonance: f32) -> Self {
        self.filter2_enabled = true;
        self.filter2 = FilterStage {
            kind,
            cutoff: cutoff.clamp(20.0, 10_000.0),
            resonance: resonance.clamp(0.1, 30.0),
        };
        self
    }

    pub fn with_filter_env(mut self, env: EnvelopeSpec, amount: f32) -> Self {
        self.filter_env = env;
        self.filter_env_amount = amount.clamp(0.0, 1.0);
        self
    }

    pub fn with_amp_env(mut self, env: EnvelopeSpec) -> Self {
        self.amp_env = env;
        self
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume.clamp(0.0, 1.0);
        self
    }

    /// Set `param`, clamping numbers into range.
    pub fn set(&mut self, param: Param, value: &ParamValue) -> Result<()> {
        match param.param_type() {
            ParamType::Number { min, max } => {
                let v = as_number(param, value)?.clamp(min, max);
                *self.number_mut(param).ok_or_else(|| mismatch(param, "a number"))? = v;
            }
            ParamType::Waveform => {
                let shape = OscillatorShape::from_name(as_text(param, value)?)
                    .ok_or_else(|| mismatch(param, "sine, square, sawtooth or triangle"))?;
                match param {
                    Param::Osc1Waveform => self.osc1.shape = shape,
                    Param::Osc2Waveform => self.osc2.shape = shape,
                    _ => self.sub_shape = shape,
                }
            }
            ParamType::Filter => {
                let kind = FilterKind::from_name(as_text(param, value)?)
                    .ok_or_else(|| mismatch(param, "lowpass, highpass, bandpass or notch"))?;
                match param {
                    Param::Filter1Type => self.filter1.kind = kind,
                    _ => self.filter2.kind = kind,
                }
            }
            ParamType::Noise => {
                self.noise_color = NoiseColor::from_name(as_text(param, value)?)
                    .ok_or_else(|| mismatch(param, "white, pink or brown"))?;
            }
            ParamType::Toggle => {
                self.filter2_enabled = match value {
                    ParamValue::Bool(b) => *b,
                    ParamValue::Number(n) if n.is_finite() => *n != 0.0,
                    ParamValue::Number(_) => return Err(EngineError::NonFinite("toggle value")),
                    ParamValue::Text(_) => return Err(mismatch(param, "true or false")),
                };
            }
        }
        Ok(())
    }

    pub fn get(&self, param: Param) -> ParamValue {
        match param {
            Param::Osc1Waveform => self.osc1.shape.name().into(),
            Param::Osc2Waveform => self.osc2.shape.name().into(),
            Param::SubWaveform => self.sub_shape.name().into(),
            Param::NoiseType => self.noise_color.name().into(),
            Param::Filter1Type => self.filter1.kind.name().into(),
            Param::Filter2Type => self.filter2.kind.name().into(),
            Param::Filter2Enabled => self.filter2_enabled.into(),
            _ => ParamValue::Number(self.number(param).unwrap_or(0.0)),
        }
    }

    /// Every parameter by name, as stored in presets.
    pub fn to_map(&self) -> BTreeMap<String, ParamValue> {
        Param::ALL
            .iter()
            .map(|&p| (p.name().to_string(), self.get(p)))
            .collect()
    }

    fn number(&self, param: Param) -> Option<f32> {
        Some(match param {
            Param::Osc1Level => self.osc1.level,
            Param::Osc1Semitone => self.osc1.semitone,
            Param::Osc1Detune => self.osc1.detune,
            Param::Osc2Level => self.osc2.level,
            Param::Osc2Semitone => self.osc2.semitone,
            Param::Osc2Detune => self.osc2.detune,
            Param::SubLevel => self.sub_level,
            Param::NoiseLevel => self.noise_level,
            Param::Filter1Cutoff => self.filter1.cutoff,
            Param::Filter1Resonance => self.filter1.resonance,
            Param::Filter2Cutoff => self.filter2.cutoff,
            Param::Filter2Resonance => self.filter2.resonance,
            Param::FilterEnvAttack => self.filter_env.attack,
            Param::FilterEnvDecay => self.filter_env.decay,
            Param::FilterEnvSustain => self.filter_env.sustain,
            Param::FilterEnvRelease => self.filter_env.release,
            Param::FilterEnvAmount => self.filter_env_amount,
            Param::AmpEnvAttack => self.amp_env.attack,
            Param::AmpEnvDecay => self.amp_env.decay,
            Param::AmpEnvSustain => self.amp_env.sustain,
            Param::AmpEnvRelease => self.amp_env.release,
            Param::Volume => self.volume,
            _ => return None,
        })
    }

    fn number_mut(&mut self, param: Param) -> Option<&mut f32> {
        Some(match param {
            Param::Osc1Level => &mut self.osc1.level,
            Param::Osc1Semitone => &mut self.osc1.semitone,
            Param::Osc1Detune => &mut self.osc1.detune,
            Param::Osc2Level => &mut self.osc2.level,
            Param::Osc2Semitone => &mut self.osc2.semitone,
            Param::Osc2Detune => &mut self.osc2.detune,
            Param::SubLevel => &mut self.sub_level,
            Param::NoiseLevel => &mut self.noise_level,
            Param::Filter1Cutoff => &mut self.filter1.cutoff,
            Param::Filter1Resonance => &mut self.filter1.resonance,
            Param::Filter2Cutoff => &mut self.filter2.cutoff,
            Param::Filter2Resonance => &mut self.filter2.resonance,
            Param::FilterEnvAttack => &mut self.filter_env.attack,
            Param::FilterEnvDecay => &mut self.filter_env.decay,
            Param::FilterEnvSustain => &mut self.filter_env.sustain,
            Param::FilterEnvRelease => &mut self.filter_env.release,
            Param::FilterEnvAmount => &mut self.filter_env_amount,
            Param::AmpEnvAttack => &mut self.amp_env.attack,
            Param::AmpEnvDecay => &mut self.amp_env.decay,
            Param::AmpEnvSustain => &mut self.amp_env.sustain,
            Param::AmpEnvRelease => &mut self.amp_env.release,
            Param::Volume => &mut self.volume,
            _ => return None,
        })
    }
}

fn as_number(param: Param, value: &ParamValue) -> Result<f32> {
    match value {
        ParamValue::Number(n) if n.is_finite() => Ok(*n),
        ParamValue::Number(_) => Err(EngineError::NonFinite("parameter value")),
        _ => Err(mismatch(param, "a number")),
    }
}

fn as_text(param: Param, value: &ParamValue) -> Result<&str> {
    match value {
        ParamValue::Text(s) => Ok(s.as_str()),
        _ => Err(mismatch(param, "a name")),
    }
}

fn mismatch(param: Param, expected: &str) -> EngineError {
    EngineError::InvalidParameterValue {
        name: param.name().to_string(),
        reason: format!("expected {expected}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for &p in Param::ALL {
            assert_eq!(Param::from_name(p.name()), Some(p));
        }
        assert_eq!(Param::from_name("warpDrive"), None);
    }

    #[test]
    fn numbers_are_clamped() {
        let mut set = ParamSet::default();
        set.set(Param::Filter1Cutoff, &50_000.0f32.into()).unwrap();
        assert_eq!(set.filter1.cutoff, 10_000.0);
        set.set(Param::Osc2Level, &(-1.0f32).into()).unwrap();
        assert_eq!(set.osc2.level, 0.0);
    }

    #[test]
    fn type_mismatch_is_rejected() {
        let mut set = ParamSet::default();
        let before = set.clone();
        assert!(set.set(Param::Volume, &"loud".into()).is_err());
        assert!(set.set(Param::Osc1Waveform, &"wobble".into()).is_err());
        assert!(set.set(Param::Osc1Waveform, &0.5f32.into()).is_err());
        assert!(set.set(Param::Volume, &f32::NAN.into()).is_err());
        assert_eq!(set, before);
    }

    #[test]
    fn names_set_enums() {
        let mut set = ParamSet::default();
        set.set(Param::Filter1Type, &"bandpass".into()).unwrap();
        set.set(Param::NoiseType, &"pink".into()).unwrap();
        set.set(Param::Filter2Enabled, &1.0f32.into()).unwrap();
        assert_eq!(set.filter1.kind, FilterKind::Bandpass);
        assert_eq!(set.noise_color, NoiseColor::Pink);
        assert!(set.filter2_enabled);
        assert_eq!(set.get(Param::Filter1Type), ParamValue::Text("bandpass".into()));
    }

    #[test]
    fn map_covers_every_param() {
        let map = ParamSet::default().to_map();
        assert_eq!(map.len(), Param::ALL.len());
        assert_eq!(map["volume"], ParamValue::Number(0.7));
    }
}
