//! Error taxonomy for the engine's public surface.
//!
//! Validation failures are returned to the caller and leave the engine
//! untouched. Polyphony exhaustion is never an error (voices are stolen), and
//! degenerate envelope times are clamped rather than reported. Nothing here
//! is ever raised from inside [`Engine::tick`](crate::engine::Engine::tick).

use crate::backend::BackendError;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("unknown instrument: {0}")]
    UnknownInstrument(String),

    #[error("unknown parameter '{name}' for instrument '{instrument}'")]
    UnknownParameter { instrument: String, name: String },

    #[error("invalid value for parameter '{name}': {reason}")]
    InvalidParameterValue { name: String, reason: String },

    #[error("unknown modulation source: {0}")]
    UnknownSource(String),

    #[error("unknown modulation destination: {0}")]
    UnknownDestination(String),

    #[error("unknown routing id: {0}")]
    UnknownRouting(u64),

    #[error("unknown channel: {0}")]
    UnknownChannel(String),

    #[error("unknown bus: {0}")]
    UnknownBus(String),

    #[error("unknown send: {0}")]
    UnknownSend(String),

    #[error("malformed note name: {0:?}")]
    InvalidNote(String),

    #[error("non-finite value for {0}")]
    NonFinite(&'static str),

    #[error("backend failure: {0}")]
    Backend(#[from] BackendError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid preset: {0}")]
    Preset(String),

    #[cfg(feature = "serde")]
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    /// True for errors caused by bad caller input rather than the backend.
    pub fn is_validation(&self) -> bool {
        !matches!(self, EngineError::Backend(_))
    }
}
