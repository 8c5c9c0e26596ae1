//! Capability interface to the audio backend.
//!
//! The engine never computes samples. It creates primitive nodes, wires them
//! together and schedules time-stamped parameter changes; the backend (a Web
//! Audio style graph, a native host, or the in-memory [`OfflineBackend`])
//! does the actual signal processing.
//!
//! Node handles are plain ids. A backend must tolerate `disconnect`, `stop`
//! and `release` on ids it no longer knows, because voice teardown runs those
//! unconditionally.

pub mod offline;

pub use offline::OfflineBackend;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Opaque handle to a backend node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Oscillator,
    Filter,
    Gain,
    BufferSource,
    Destination,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OscillatorShape {
    Sine,
    Square,
    #[default]
    Sawtooth,
    Triangle,
}

impl OscillatorShape {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "sine" => Some(Self::Sine),
            "square" => Some(Self::Square),
            "sawtooth" | "saw" => Some(Self::Sawtooth),
            "triangle" | "tri" => Some(Self::Triangle),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Sine => "sine",
            Self::Square => "square",
            Self::Sawtooth => "sawtooth",
            Self::Triangle => "triangle",
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterKind {
    #[default]
    Lowpass,
    Highpass,
    Bandpass,
    Notch,
}

impl FilterKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "lowpass" => Some(Self::Lowpass),
            "highpass" => Some(Self::Highpass),
            "bandpass" => Some(Self::Bandpass),
            "notch" => Some(Self::Notch),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Lowpass => "lowpass",
            Self::Highpass => "highpass",
            Self::Bandpass => "bandpass",
            Self::Notch => "notch",
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NoiseColor {
    #[default]
    White,
    Pink,
    Brown,
}

impl NoiseColor {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "white" => Some(Self::White),
            "pink" => Some(Self::Pink),
            "brown" => Some(Self::Brown),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::White => "white",
            Self::Pink => "pink",
            Self::Brown => "brown",
        }
    }
}

/// Automatable parameter on a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    /// Oscillator pitch or filter cutoff, in Hz.
    Frequency,
    /// Oscillator fine tune, in cents.
    Detune,
    /// Filter resonance.
    Q,
    /// Linear gain.
    Gain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RampCurve {
    Linear,
    /// Exponential ramps cannot target zero; callers ramp to a small floor.
    Exponential,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BackendError {
    #[error("failed to create {kind:?} node: {reason}")]
    CreateFailed { kind: NodeKind, reason: String },

    #[error("unknown node {0:?}")]
    UnknownNode(NodeId),

    #[error("{kind:?} node {node:?} has no {param:?} parameter")]
    NoSuchParam {
        node: NodeId,
        kind: NodeKind,
        param: ParamKind,
    },

    #[error("invalid value {value} for {param:?}")]
    InvalidValue { param: ParamKind, value: f32 },
}

/// Primitive node factory and automation surface.
pub trait AudioBackend: Send {
    /// Backend clock in seconds.
    fn current_time(&self) -> f64;

    /// The final output node.
    fn destination(&self) -> NodeId;

    fn create_oscillator(
        &mut self,
        shape: OscillatorShape,
        frequency: f32,
    ) -> Result<NodeId, BackendError>;

    fn create_filter(&mut self, kind: FilterKind, cutoff: f32, q: f32)
        -> Result<NodeId, BackendError>;

    fn create_gain(&mut self, gain: f32) -> Result<NodeId, BackendError>;

    /// A looping noise buffer.
    fn create_buffer_source(&mut self, color: NoiseColor) -> Result<NodeId, BackendError>;

    fn connect(&mut self, from: NodeId, to: NodeId) -> Result<(), BackendError>;

    fn disconnect(&mut self, from: NodeId, to: NodeId);

    /// Set a parameter at an absolute backend time.
    fn set_param(
        &mut self,
        node: NodeId,
        param: ParamKind,
        value: f32,
        at: f64,
    ) -> Result<(), BackendError>;

    /// Ramp a parameter from its current value to `target`, arriving at `end_time`.
    fn ramp_param(
        &mut self,
        node: NodeId,
        param: ParamKind,
        target: f32,
        end_time: f64,
        curve: RampCurve,
    ) -> Result<(), BackendError>;

    /// Start a source node (oscillator or buffer source).
    fn start(&mut self, node: NodeId, at: f64) -> Result<(), BackendError>;

    fn stop(&mut self, node: NodeId, at: f64);

    /// Drop the node and every connection touching it.
    fn release(&mut self, node: NodeId);
}

/// Allow boxed backends to be used where a concrete backend is expected.
impl AudioBackend for Box<dyn AudioBackend> {
    fn current_time(&self) -> f64 {
        (**self).current_time()
    }

    fn destination(&self) -> NodeId {
        (**self).destination()
    }

    fn create_oscillator(
        &mut self,
        shape: OscillatorShape,
        frequency: f32,
    ) -> Result<NodeId, BackendError> {
        (**self).create_oscillator(shape, frequency)
    }

    fn create_filter(&mut self, kind: FilterKind, cutoff: f32, q: f32)
        -> Result<NodeId, BackendError> {
        (**self).create_filter(kind, cutoff, q)
    }

    fn create_gain(&mut self, gain: f32) -> Result<NodeId, BackendError> {
        (**self).create_gain(gain)
    }

    fn create_buffer_source(&mut self, color: NoiseColor) -> Result<NodeId, BackendError> {
        (**self).create_buffer_source(color)
    }

    fn connect(&mut self, from: NodeId, to: NodeId) -> Result<(), BackendError> {
        (**self).connect(from, to)
    }

    fn disconnect(&mut self, from: NodeId, to: NodeId) {
        (**self).disconnect(from, to)
    }

    fn set_param(
        &mut self,
        node: NodeId,
        param: ParamKind,
        value: f32,
        at: f64,
    ) -> Result<(), BackendError> {
        (**self).set_param(node, param, value, at)
    }

    fn ramp_param(
        &mut self,
        node: NodeId,
        param: ParamKind,
        target: f32,
        end_time: f64,
        curve: RampCurve,
    ) -> Result<(), BackendError> {
        (**self).ramp_param(node, param, target, end_time, curve)
    }

    fn start(&mut self, node: NodeId, at: f64) -> Result<(), BackendError> {
        (**self).start(node, at)
    }

    fn stop(&mut self, node: NodeId, at: f64) {
        (**self).stop(node, at)
    }

    fn release(&mut self, node: NodeId) {
        (**self).release(node)
    }
}
