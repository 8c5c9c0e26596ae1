//! Mixer records: plain data, no backend handles.

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    pub id: String,
    pub name: String,
    pub bus_id: String,
    pub gain: f32,
    pub pan: f32,
    pub mute: bool,
    pub solo: bool,
    /// Send id to amount in [0, 1].
    pub sends: BTreeMap<String, f32>,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Bus {
    pub id: String,
    pub name: String,
    pub gain: f32,
    pub pan: f32,
    pub mute: bool,
    pub solo: bool,
    /// Member channel ids in routing order.
    pub channels: Vec<String>,
}

/// An auxiliary effect return.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct FxSend {
    pub id: String,
    pub name: String,
    pub gain: f32,
    pub wet_dry: f32,
    /// Tap the channel before its fader.
    pub pre_fader: bool,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Master {
    pub gain: f32,
    pub pan: f32,
    pub mute: bool,
}

impl Default for Master {
    fn default() -> Self {
        Self {
            gain: 0.8,
            pan: 0.0,
            mute: false,
        }
    }
}

pub(crate) fn unit(value: f32) -> f32 {
    value.clamp(0.0, 1.0)
}

pub(crate) fn pan(value: f32) -> f32 {
    value.clamp(-1.0, 1.0)
}
