//! Engine configuration and the default mixer topology.

use std::collections::HashSet;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::dsp::note::A4_HZ;
use crate::error::{EngineError, Result};
use crate::instruments;
use crate::synth::voice::VoiceLimits;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct BusConfig {
    pub id: String,
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default = "default_bus_gain"))]
    pub gain: f32,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct SendConfig {
    pub id: String,
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default = "unity"))]
    pub gain: f32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub wet_dry: f32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub pre_fader: bool,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelConfig {
    /// Channel id, also the id of the instrument that plays through it.
    pub id: String,
    pub name: String,
    pub bus: String,
    /// Instrument template name, see [`instruments::template`].
    pub template: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub polyphony: Option<usize>,
    #[cfg_attr(feature = "serde", serde(default = "default_channel_gain"))]
    pub gain: f32,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Control ticks per second; voices ramp to new values over one period.
    pub control_rate_hz: f32,
    /// Reference pitch for A4.
    pub tuning_hz: f32,
    /// Polyphony for channels that do not set their own.
    pub default_polyphony: usize,
    /// Seconds after note-off before a voice is torn down regardless of its envelope.
    pub voice_ceiling_secs: f64,
    /// Seconds after note-on before a voice is torn down regardless of state.
    pub max_voice_age_secs: f64,
    pub lfo_seed: u64,
    pub master_gain: f32,
    pub buses: Vec<BusConfig>,
    pub sends: Vec<SendConfig>,
    pub channels: Vec<ChannelConfig>,
}

fn default_bus_gain() -> f32 {
    0.8
}

fn default_channel_gain() -> f32 {
    0.75
}

#[cfg(feature = "serde")]
fn unity() -> f32 {
    1.0
}

fn bus(id: &str, name: &str) -> BusConfig {
    BusConfig {
        id: id.into(),
        name: name.into(),
        gain: default_bus_gain(),
    }
}

fn send(id: &str, name: &str, wet_dry: f32) -> SendConfig {
    SendConfig {
        id: id.into(),
        name: name.into(),
        gain: 1.0,
        wet_dry,
        pre_fader: false,
    }
}

fn channel(id: &str, name: &str, bus: &str, template: &str, polyphony: usize) -> ChannelConfig {
    ChannelConfig {
        id: id.into(),
        name: name.into(),
        bus: bus.into(),
        template: template.into(),
        polyphony: Some(polyphony),
        gain: default_channel_gain(),
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            control_rate_hz: 100.0,
            tuning_hz: A4_HZ,
            default_polyphony: 8,
            voice_ceiling_secs: 30.0,
            max_voice_age_secs: 600.0,
            lfo_seed: 0x5EED,
            master_gain: 0.8,
            buses: vec![
                bus("drums", "Drums"),
                bus("synths", "Synths"),
                bus("melody", "Melody"),
                bus("strings", "Strings"),
            ],
            sends: vec![
                send("reverb", "Reverb", 0.3),
                send("delay", "Delay", 0.25),
                send("chorus", "Chorus", 0.2),
            ],
            channels: vec![
                channel("kick", "Kick", "drums", "kick", 2),
                channel("snare", "Snare", "drums", "snare", 2),
                channel("hihat", "Hi-Hat", "drums", "hihat", 4),
                channel("clap", "Clap", "drums", "clap", 2),
                channel("tom", "Tom", "drums", "tom", 4),
                channel("arp2600", "ARP 2600", "synths", "lead", 4),
                channel("juno106", "Juno-106", "synths", "pad", 6),
                channel("minimoog", "Minimoog", "synths", "bass", 1),
                channel("tb303", "TB-303", "synths", "acid", 1),
                channel("piano", "Piano", "melody", "keys", 16),
                channel("organ", "Organ", "melody", "organ", 8),
                channel("guitar", "Guitar", "melody", "pluck", 6),
                channel("strings", "Strings", "strings", "strings", 8),
                channel("violin", "Violin", "strings", "strings", 4),
                channel("cello", "Cello", "strings", "strings", 4),
            ],
        }
    }
}

impl EngineConfig {
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn limits(&self) -> VoiceLimits {
        VoiceLimits {
            release_ceiling_secs: self.voice_ceiling_secs,
            max_age_secs: self.max_voice_age_secs,
        }
    }

    /// Seconds between control ticks.
    pub fn control_period(&self) -> f64 {
        1.0 / self.control_rate_hz as f64
    }

    pub fn polyphony_for(&self, channel: &ChannelConfig) -> usize {
        channel.polyphony.unwrap_or(self.default_polyphony).max(1)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(EngineError::InvalidConfig(msg));

        if !(self.control_rate_hz.is_finite() && self.control_rate_hz > 0.0) {
            return invalid(format!("control rate must be positive, got {}", self.control_rate_hz));
        }
        if !(self.tuning_hz.is_finite() && self.tuning_hz > 0.0) {
            return invalid(format!("tuning must be positive, got {}", self.tuning_hz));
        }
        for (label, secs) in [
            ("voice ceiling", self.voice_ceiling_secs),
            ("max voice age", self.max_voice_age_secs),
        ] {
            if !(secs.is_finite() && secs > 0.0) {
                return invalid(format!("{label} must be positive, got {secs}"));
            }
        }

        let mut bus_ids = HashSet::new();
        for b in &self.buses {
            if !bus_ids.insert(b.id.as_str()) {
                return invalid(format!("duplicate bus '{}'", b.id));
            }
        }
        let mut send_ids = HashSet::new();
        for s in &self.sends {
            if !send_ids.insert(s.id.as_str()) {
                return invalid(format!("duplicate send '{}'", s.id));
            }
        }
        let mut channel_ids = HashSet::new();
        for c in &self.channels {
            if !channel_ids.insert(c.id.as_str()) {
                return invalid(format!("duplicate channel '{}'", c.id));
            }
            if !bus_ids.contains(c.bus.as_str()) {
                return Err(EngineError::UnknownBus(c.bus.clone()));
            }
            if instruments::template(&c.template).is_none() {
                return invalid(format!("channel '{}' uses unknown template '{}'", c.id, c.template));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_topology_is_valid() {
        let config = EngineConfig::default();
        config.validate().unwrap();
        assert_eq!(config.buses.len(), 4);
        assert_eq!(config.sends.len(), 3);
        assert_eq!(config.channels.len(), 15);
    }

    #[test]
    fn channel_must_reference_existing_bus() {
        let mut config = EngineConfig::default();
        config.channels[0].bus = "nowhere".into();
        assert!(matches!(config.validate(), Err(EngineError::UnknownBus(_))));
    }

    #[test]
    fn rejects_non_positive_control_rate() {
        let config = EngineConfig {
            control_rate_hz: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn partial_json_fills_defaults() {
        let config = EngineConfig::from_json(r#"{ "control_rate_hz": 50.0 }"#).unwrap();
        assert_eq!(config.control_rate_hz, 50.0);
        assert_eq!(config.channels.len(), 15);
    }
}
