//! In-memory backend with a manual clock.
//!
//! Keeps the node graph as plain bookkeeping: which nodes exist, how they are
//! connected, and the last value scheduled on each parameter. Nothing renders.
//! Tests, benches and the demo binary drive the engine against it and then
//! inspect the graph.

use std::collections::{BTreeSet, HashMap};

use super::{
    AudioBackend, BackendError, FilterKind, NodeId, NodeKind, NoiseColor, OscillatorShape,
    ParamKind, RampCurve,
};

#[derive(Debug, Clone)]
pub struct OfflineNode {
    pub kind: NodeKind,
    pub params: HashMap<ParamKind, f32>,
    pub started: bool,
    pub stopped: bool,
}

impl OfflineNode {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            params: HashMap::new(),
            started: false,
            stopped: false,
        }
    }

    fn supports(&self, param: ParamKind) -> bool {
        match self.kind {
            NodeKind::Oscillator => matches!(param, ParamKind::Frequency | ParamKind::Detune),
            NodeKind::Filter => matches!(param, ParamKind::Frequency | ParamKind::Q | ParamKind::Gain),
            NodeKind::Gain => matches!(param, ParamKind::Gain),
            NodeKind::BufferSource => matches!(param, ParamKind::Detune),
            NodeKind::Destination => false,
        }
    }
}

#[derive(Debug)]
pub struct OfflineBackend {
    time: f64,
    next_id: u64,
    destination: NodeId,
    nodes: HashMap<NodeId, OfflineNode>,
    connections: BTreeSet<(NodeId, NodeId)>,
    created: usize,
    released: usize,
    /// Remaining successful creations before every creation fails.
    fail_after: Option<usize>,
}

impl OfflineBackend {
    pub fn new() -> Self {
        let destination = NodeId(0);
        let mut nodes = HashMap::new();
        nodes.insert(destination, OfflineNode::new(NodeKind::Destination));
        Self {
            time: 0.0,
            next_id: 1,
            destination,
            nodes,
            connections: BTreeSet::new(),
            created: 0,
            released: 0,
            fail_after: None,
        }
    }

    /// Move the clock forward by `seconds`.
    pub fn advance(&mut self, seconds: f64) {
        if seconds.is_finite() && seconds > 0.0 {
            self.time += seconds;
        }
    }

    pub fn set_time(&mut self, time: f64) {
        if time.is_finite() {
            self.time = time;
        }
    }

    /// Let `n` more node creations succeed, then fail every one after that.
    pub fn fail_after(&mut self, n: usize) {
        self.fail_after = Some(n);
    }

    pub fn clear_failures(&mut self) {
        self.fail_after = None;
    }

    /// Nodes alive right now, excluding the destination.
    pub fn live_nodes(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn count_kind(&self, kind: NodeKind) -> usize {
        self.nodes.values().filter(|n| n.kind == kind).count()
    }

    pub fn created_count(&self) -> usize {
        self.created
    }

    pub fn released_count(&self) -> usize {
        self.released
    }

    pub fn node(&self, id: NodeId) -> Option<&OfflineNode> {
        self.nodes.get(&id)
    }

    pub fn param(&self, id: NodeId, param: ParamKind) -> Option<f32> {
        self.nodes.get(&id)?.params.get(&param).copied()
    }

    pub fn is_connected(&self, from: NodeId, to: NodeId) -> bool {
        self.connections.contains(&(from, to))
    }

    pub fn outputs(&self, from: NodeId) -> Vec<NodeId> {
        self.connections
            .iter()
            .filter(|(f, _)| *f == from)
            .map(|(_, t)| *t)
            .collect()
    }

    pub fn inputs(&self, to: NodeId) -> Vec<NodeId> {
        self.connections
            .iter()
            .filter(|(_, t)| *t == to)
            .map(|(f, _)| *f)
            .collect()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    fn create(&mut self, kind: NodeKind, params: &[(ParamKind, f32)]) -> Result<NodeId, BackendError> {
        if let Some(remaining) = self.fail_after.as_mut() {
            if *remaining == 0 {
                return Err(BackendError::CreateFailed {
                    kind,
                    reason: "injected failure".into(),
                });
            }
            *remaining -= 1;
        }

        let id = NodeId(self.next_id);
        self.next_id += 1;
        let mut node = OfflineNode::new(kind);
        for &(param, value) in params {
            node.params.insert(param, value);
        }
        self.nodes.insert(id, node);
        self.created += 1;
        Ok(id)
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut OfflineNode, BackendError> {
        self.nodes.get_mut(&id).ok_or(BackendError::UnknownNode(id))
    }

    fn write_param(&mut self, id: NodeId, param: ParamKind, value: f32) -> Result<(), BackendError> {
        if !value.is_finite() {
            return Err(BackendError::InvalidValue { param, value });
        }
        let node = self.node_mut(id)?;
        if !node.supports(param) {
            return Err(BackendError::NoSuchParam {
                node: id,
                kind: node.kind,
                param,
            });
        }
        node.params.insert(param, value);
        Ok(())
    }
}

impl Default for OfflineBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioBackend for OfflineBackend {
    fn current_time(&self) -> f64 {
        self.time
    }

    fn destination(&self) -> NodeId {
        self.destination
    }

    fn create_oscillator(
        &mut self,
        _shape: OscillatorShape,
        frequency: f32,
    ) -> Result<NodeId, BackendError> {
        self.create(
            NodeKind::Oscillator,
            &[(ParamKind::Frequency, frequency), (ParamKind::Detune, 0.0)],
        )
    }

    fn create_filter(
        &mut self,
        _kind: FilterKind,
        cutoff: f32,
        q: f32,
    ) -> Result<NodeId, BackendError> {
        self.create(NodeKind::Filter, &[(ParamKind::Frequency, cutoff), (ParamKind::Q, q)])
    }

    fn create_gain(&mut self, gain: f32) -> Result<NodeId, BackendError> {
        self.create(NodeKind::Gain, &[(ParamKind::Gain, gain)])
    }

    fn create_buffer_source(&mut self, _color: NoiseColor) -> Result<NodeId, BackendError> {
        self.create(NodeKind::BufferSource, &[(ParamKind::Detune, 0.0)])
    }

    fn connect(&mut self, from: NodeId, to: NodeId) -> Result<(), BackendError> {
        if !self.nodes.contains_key(&from) {
            return Err(BackendError::UnknownNode(from));
        }
        if !self.nodes.contains_key(&to) {
            return Err(BackendError::UnknownNode(to));
        }
        self.connections.insert((from, to));
        Ok(())
    }

    fn disconnect(&mut self, from: NodeId, to: NodeId) {
        self.connections.remove(&(from, to));
    }

    fn set_param(
        &mut self,
        node: NodeId,
        param: ParamKind,
        value: f32,
        _at: f64,
    ) -> Result<(), BackendError> {
        self.write_param(node, param, value)
    }

    fn ramp_param(
        &mut self,
        node: NodeId,
        param: ParamKind,
        target: f32,
        _end_time: f64,
        curve: RampCurve,
    ) -> Result<(), BackendError> {
        if curve == RampCurve::Exponential && target <= 0.0 {
            return Err(BackendError::InvalidValue {
                param,
                value: target,
            });
        }
        self.write_param(node, param, target)
    }

    fn start(&mut self, node: NodeId, _at: f64) -> Result<(), BackendError> {
        let entry = self.node_mut(node)?;
        entry.started = true;
        Ok(())
    }

    fn stop(&mut self, node: NodeId, _at: f64) {
        if let Some(entry) = self.nodes.get_mut(&node) {
            entry.stopped = true;
        }
    }

    fn release(&mut self, node: NodeId) {
        if node == self.destination {
            return;
        }
        if self.nodes.remove(&node).is_some() {
            self.released += 1;
        }
        self.connections.retain(|(f, t)| *f != node && *t != node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_and_connects_nodes() {
        let mut backend = OfflineBackend::new();
        let osc = backend.create_oscillator(OscillatorShape::Sine, 440.0).unwrap();
        let gain = backend.create_gain(0.5).unwrap();
        backend.connect(osc, gain).unwrap();
        backend.connect(gain, backend.destination()).unwrap();

        assert_eq!(backend.live_nodes(), 2);
        assert!(backend.is_connected(osc, gain));
        assert_eq!(backend.param(gain, ParamKind::Gain), Some(0.5));
    }

    #[test]
    fn release_drops_connections() {
        let mut backend = OfflineBackend::new();
        let a = backend.create_gain(1.0).unwrap();
        let b = backend.create_gain(1.0).unwrap();
        backend.connect(a, b).unwrap();
        backend.release(a);

        assert_eq!(backend.connection_count(), 0);
        assert!(backend.connect(a, b).is_err());
        // Releasing twice is harmless.
        backend.release(a);
        assert_eq!(backend.released_count(), 1);
    }

    #[test]
    fn injected_failure_after_budget() {
        let mut backend = OfflineBackend::new();
        backend.fail_after(1);
        assert!(backend.create_gain(1.0).is_ok());
        assert!(matches!(
            backend.create_gain(1.0),
            Err(BackendError::CreateFailed { .. })
        ));
        backend.clear_failures();
        assert!(backend.create_gain(1.0).is_ok());
    }

    #[test]
    fn rejects_unsupported_and_non_finite_params() {
        let mut backend = OfflineBackend::new();
        let gain = backend.create_gain(1.0).unwrap();
        assert!(backend.set_param(gain, ParamKind::Q, 2.0, 0.0).is_err());
        assert!(backend.set_param(gain, ParamKind::Gain, f32::NAN, 0.0).is_err());
        assert!(backend
            .ramp_param(gain, ParamKind::Gain, 0.0, 1.0, RampCurve::Exponential)
            .is_err());
        assert!(backend
            .ramp_param(gain, ParamKind::Gain, 0.0, 1.0, RampCurve::Linear)
            .is_ok());
    }

    #[test]
    fn clock_only_moves_forward_on_advance() {
        let mut backend = OfflineBackend::new();
        backend.advance(0.5);
        backend.advance(-1.0);
        backend.advance(f64::NAN);
        assert!((backend.current_time() - 0.5).abs() < 1e-12);
    }
}
