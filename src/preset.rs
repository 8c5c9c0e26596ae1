//! Instrument presets.
//!
//! A preset is opaque configuration: parameter values by name, plus optional
//! modulation routings and LFO settings. The engine applies it through the
//! same setters as live edits, so every entry is validated the same way and
//! bad entries are skipped rather than failing the whole load.

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::modulation::{LfoPatch, RoutingSpec};
use crate::synth::params::ParamValue;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Preset {
    pub name: String,
    pub params: BTreeMap<String, ParamValue>,
    /// Replaces every routing in the matrix when present.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub routings: Option<Vec<RoutingSpec>>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub lfos: Option<BTreeMap<String, LfoPatch>>,
}

impl Preset {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_param(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
        self.params.insert(name.to_string(), value.into());
        self
    }

    pub fn with_routing(mut self, source: &str, destination: &str, amount: f32) -> Self {
        self.routings
            .get_or_insert_with(Vec::new)
            .push(RoutingSpec::new(source, destination, amount));
        self
    }

    pub fn with_lfo(mut self, id: &str, patch: LfoPatch) -> Self {
        self.lfos
            .get_or_insert_with(BTreeMap::new)
            .insert(id.to_string(), patch);
        self
    }

    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> crate::error::Result<Self> {
        serde_json::from_str(json).map_err(|err| crate::error::EngineError::Preset(err.to_string()))
    }

    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// What a preset load applied and what it skipped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PresetReport {
    pub applied: usize,
    /// One human-readable line per rejected entry.
    pub skipped: Vec<String>,
}

impl PresetReport {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

#[cfg(all(test, feature = "serde"))]
mod tests {
    use super::*;

    #[test]
    fn parses_mixed_value_types() {
        let preset = Preset::from_json(
            r#"{
                "name": "Wobble",
                "params": { "filter1Cutoff": 800, "osc1Waveform": "square", "filter2Enabled": true },
                "routings": [ { "source": "lfo1", "destination": "filterCutoff", "amount": 0.5 } ]
            }"#,
        )
        .unwrap();

        assert_eq!(preset.params["filter1Cutoff"], ParamValue::Number(800.0));
        assert_eq!(preset.params["osc1Waveform"], ParamValue::Text("square".into()));
        assert_eq!(preset.params["filter2Enabled"], ParamValue::Bool(true));
        assert_eq!(preset.routings.as_ref().unwrap().len(), 1);
        assert!(preset.lfos.is_none());
    }

    #[test]
    fn survives_json_round_trip() {
        let preset = Preset::new("Acid")
            .with_param("filter1Resonance", 12.0f32)
            .with_param("noiseType", "pink")
            .with_routing("env1", "filterCutoff", 0.7)
            .with_lfo(
                "lfo2",
                LfoPatch {
                    rate_hz: Some(0.25),
                    ..Default::default()
                },
            );
        let back = Preset::from_json(&preset.to_json().unwrap()).unwrap();
        assert_eq!(back, preset);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            Preset::from_json("{ not json"),
            Err(crate::error::EngineError::Preset(_))
        ));
    }
}
