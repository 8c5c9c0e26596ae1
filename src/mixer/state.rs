#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::strip::{Bus, Channel, FxSend, Master};

/// Owned snapshot of the whole mixer.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MixerState {
    pub master: Master,
    pub buses: Vec<Bus>,
    pub sends: Vec<FxSend>,
    pub channels: Vec<Channel>,
}

impl MixerState {
    pub fn channel(&self, id: &str) -> Option<&Channel> {
        self.channels.iter().find(|c| c.id == id)
    }

    pub fn bus(&self, id: &str) -> Option<&Bus> {
        self.buses.iter().find(|b| b.id == id)
    }

    pub fn send(&self, id: &str) -> Option<&FxSend> {
        self.sends.iter().find(|s| s.id == id)
    }

    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> crate::error::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
