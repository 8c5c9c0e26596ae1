use super::params::{Param, ParamSet, ParamValue};
use crate::error::{EngineError, Result};

/// A playable instrument: its id, polyphony ceiling and current parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentSpec {
    pub id: String,
    pub polyphony: usize,
    pub params: ParamSet,
}

impl InstrumentSpec {
    pub fn new(id: &str, polyphony: usize, params: ParamSet) -> Self {
        Self {
            id: id.to_string(),
            polyphony: polyphony.max(1),
            params,
        }
    }

    /// Set a parameter by name.
    pub fn set(&mut self, name: &str, value: &ParamValue) -> Result<()> {
        let param = Param::from_name(name).ok_or_else(|| EngineError::UnknownParameter {
            instrument: self.id.clone(),
            name: name.to_string(),
        })?;
        self.params.set(param, value)
    }

    pub fn get(&self, name: &str) -> Result<ParamValue> {
        let param = Param::from_name(name).ok_or_else(|| EngineError::UnknownParameter {
            instrument: self.id.clone(),
            name: name.to_string(),
        })?;
        Ok(self.params.get(param))
    }
}
