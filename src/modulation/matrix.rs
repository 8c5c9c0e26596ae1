/*
Modulation Matrix
=================

A routing table from named sources to named destinations.

    sources                 routings                    destinations
    lfo1 ──────┐
    env1 ──────┼── (source, destination, amount) ──▶  filterCutoff [20, 10000]
    modwheel ──┘                                       ampLevel     [0, 1]

For a destination with range [min, max] and a base value:

    result = clamp(base + Σ value(source) · amount · (max - min), min, max)

Only enabled routings contribute. A routing whose source value or amount is
not finite contributes 0, so one bad input never poisons a destination.

Each (source, destination) pair appears at most once. Adding an existing pair
updates its amount in place and keeps its id and position.

The engine never calls `get_modulated_value` per destination on the hot path.
Once per control tick it calls `sample`, which advances every LFO exactly once
and copies the enabled routings into a `ModFrame`. Voices read from that frame
with the matrix lock already dropped.
*/

use std::collections::{BTreeMap, HashMap, HashSet};

use super::destination::{default_destinations, ModulationDestination};
use super::frame::{contribution, FrameRoute, FrameTarget, ModFrame, VoiceSlot, VoiceSources};
use super::routing::{Routing, RoutingId, RoutingSpec, RoutingTable};
use super::source::{default_sources, LfoPatch, ModulationSource, SourceKind, ENV1, ENV2, VELOCITY};
use crate::dsp::lfo::LfoState;
use crate::error::{EngineError, Result};

/// A routing with display names resolved, as returned by [`ModulationMatrix::routings`].
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingView {
    pub id: RoutingId,
    pub source: String,
    pub source_name: String,
    pub destination: String,
    pub destination_name: String,
    pub amount: f32,
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatrixStats {
    pub total_routings: usize,
    pub active_routings: usize,
    pub sources_used: usize,
    pub destinations_used: usize,
    pub lfo_count: usize,
}

pub struct ModulationMatrix {
    sources: Vec<ModulationSource>,
    source_index: HashMap<String, usize>,
    destinations: Vec<ModulationDestination>,
    destination_index: HashMap<String, usize>,
    routings: RoutingTable,
}

impl ModulationMatrix {
    /// Matrix with the stock source and destination catalogs.
    pub fn new(lfo_seed: u64) -> Self {
        Self::with_catalog(default_sources(lfo_seed), default_destinations())
    }

    pub fn with_catalog(
        sources: Vec<ModulationSource>,
        destinations: Vec<ModulationDestination>,
    ) -> Self {
        let source_index = sources
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id.clone(), i))
            .collect();
        let destination_index = destinations
            .iter()
            .enumerate()
            .map(|(i, d)| (d.id.clone(), i))
            .collect();
        Self {
            sources,
            source_index,
            destinations,
            destination_index,
            routings: RoutingTable::new(),
        }
    }

    pub fn has_source(&self, id: &str) -> bool {
        self.source_index.contains_key(id)
    }

    pub fn has_destination(&self, id: &str) -> bool {
        self.destination_index.contains_key(id)
    }

    pub fn sources(&self) -> &[ModulationSource] {
        &self.sources
    }

    pub fn destinations(&self) -> &[ModulationDestination] {
        &self.destinations
    }

    pub fn destination(&self, id: &str) -> Option<&ModulationDestination> {
        self.destination_index.get(id).map(|&i| &self.destinations[i])
    }

    fn source(&self, id: &str) -> Option<&ModulationSource> {
        self.source_index.get(id).map(|&i| &self.sources[i])
    }

    fn source_mut(&mut self, id: &str) -> Option<&mut ModulationSource> {
        let index = self.source_index.get(id).copied()?;
        self.sources.get_mut(index)
    }

    /// Create a routing, or update the amount of the existing one for the pair.
    pub fn add_routing(&mut self, source: &str, destination: &str, amount: f32) -> Result<RoutingId> {
        if !self.has_source(source) {
            return Err(EngineError::UnknownSource(source.to_string()));
        }
        if !self.has_destination(destination) {
            return Err(EngineError::UnknownDestination(destination.to_string()));
        }
        if !amount.is_finite() {
            return Err(EngineError::NonFinite("routing amount"));
        }

        let (id, created) = self.routings.upsert(source, destination, amount);
        if created {
            log::debug!("routing {} added: {source} -> {destination} ({amount:.3})", id.0);
        } else {
            log::debug!("routing {} updated: {source} -> {destination} ({amount:.3})", id.0);
        }
        Ok(id)
    }

    pub fn remove_routing(&mut self, id: RoutingId) -> Result<Routing> {
        let removed = self
            .routings
            .remove(id)
            .ok_or(EngineError::UnknownRouting(id.0))?;
        log::debug!(
            "routing {} removed: {} -> {}",
            id.0,
            removed.source,
            removed.destination
        );
        Ok(removed)
    }

    pub fn update_amount(&mut self, id: RoutingId, amount: f32) -> Result<()> {
        if !amount.is_finite() {
            return Err(EngineError::NonFinite("routing amount"));
        }
        let routing = self
            .routings
            .get_mut(id)
            .ok_or(EngineError::UnknownRouting(id.0))?;
        routing.amount = amount.clamp(-1.0, 1.0);
        Ok(())
    }

    pub fn set_enabled(&mut self, id: RoutingId, enabled: bool) -> Result<()> {
        let routing = self
            .routings
            .get_mut(id)
            .ok_or(EngineError::UnknownRouting(id.0))?;
        routing.enabled = enabled;
        Ok(())
    }

    pub fn routing(&self, id: RoutingId) -> Option<&Routing> {
        self.routings.get(id)
    }

    pub fn routings(&self) -> Vec<RoutingView> {
        self.routings
            .iter()
            .map(|r| RoutingView {
                id: r.id,
                source: r.source.clone(),
                source_name: self
                    .source(&r.source)
                    .map_or_else(|| r.source.clone(), |s| s.name.clone()),
                destination: r.destination.clone(),
                destination_name: self
                    .destination(&r.destination)
                    .map_or_else(|| r.destination.clone(), |d| d.name.clone()),
                amount: r.amount,
                enabled: r.enabled,
            })
            .collect()
    }

    pub fn routing_count(&self) -> usize {
        self.routings.len()
    }

    pub fn clear(&mut self) {
        let n = self.routings.len();
        self.routings.clear();
        log::debug!("cleared {n} routings");
    }

    /// Replace every routing with `specs`. Invalid entries are skipped and
    /// returned alongside the reason.
    pub fn load_routings(&mut self, specs: &[RoutingSpec]) -> Vec<(RoutingSpec, EngineError)> {
        self.routings.clear();
        specs
            .iter()
            .filter_map(|spec| {
                self.add_routing(&spec.source, &spec.destination, spec.amount)
                    .err()
                    .map(|e| (spec.clone(), e))
            })
            .collect()
    }

    pub fn save_routings(&self) -> Vec<RoutingSpec> {
        self.routings
            .iter()
            .map(|r| RoutingSpec::new(&r.source, &r.destination, r.amount))
            .collect()
    }

    pub fn set_lfo(&mut self, id: &str, patch: &LfoPatch) -> Result<()> {
        let source = self
            .source_mut(id)
            .ok_or_else(|| EngineError::UnknownSource(id.to_string()))?;
        let state = source
            .lfo_state_mut()
            .ok_or_else(|| EngineError::InvalidParameterValue {
                name: id.to_string(),
                reason: "source is not an LFO".into(),
            })?;
        patch.apply(state);
        Ok(())
    }

    pub fn lfo(&self, id: &str) -> Option<&LfoState> {
        self.source(id)?.lfo_state()
    }

    /// Current settings of every LFO, keyed by source id.
    pub fn lfo_patches(&self) -> BTreeMap<String, LfoPatch> {
        self.sources
            .iter()
            .filter_map(|s| s.lfo_state().map(|st| (s.id.clone(), LfoPatch::from_state(st))))
            .collect()
    }

    /// Set a performance or envelope source. LFOs are computed, not set.
    pub fn update_source(&mut self, id: &str, value: f32) -> Result<()> {
        if !value.is_finite() {
            return Err(EngineError::NonFinite("source value"));
        }
        let source = self
            .source_mut(id)
            .ok_or_else(|| EngineError::UnknownSource(id.to_string()))?;
        if source.is_lfo() {
            return Err(EngineError::InvalidParameterValue {
                name: id.to_string(),
                reason: "LFO values are computed each tick".into(),
            });
        }
        source.current_value = value.clamp(-1.0, 1.0);
        Ok(())
    }

    /// Mirror the newest voice's envelope and velocity into the shared sources.
    pub(crate) fn mirror_voice(&mut self, voice: &VoiceSources) {
        for (id, value) in [(ENV1, voice.filter_env), (ENV2, voice.amp_env), (VELOCITY, voice.velocity)] {
            if let Some(source) = self.source_mut(id) {
                source.current_value = if value.is_finite() { value } else { 0.0 };
            }
        }
    }

    /// Last stored value of a source.
    pub fn source_value(&self, id: &str) -> Option<f32> {
        self.source(id).map(|s| s.current_value)
    }

    /// Modulated value of one destination at time `t`.
    ///
    /// LFOs are evaluated at `t`, except per-sample random ones which keep
    /// the value drawn by the last [`sample`](Self::sample). Other sources
    /// use their stored value.
    pub fn get_modulated_value(&self, destination: &str, base: f32, t: f64) -> f32 {
        let Some(dest) = self.destination(destination) else {
            log::warn!("modulation requested for unknown destination '{destination}'");
            return base;
        };

        let sum: f32 = self
            .routings
            .iter()
            .filter(|r| r.enabled && r.destination == destination)
            .map(|r| {
                let value = self.source(&r.source).map_or(0.0, |s| s.observed_at(t));
                contribution(value, r.amount)
            })
            .sum();

        dest.clamp(base + sum * dest.span())
    }

    /// Advance every LFO to `t` and capture the enabled routings.
    pub fn sample(&mut self, t: f64) -> ModFrame {
        for source in &mut self.sources {
            if source.is_lfo() {
                source.advance(t);
            }
        }

        let mut targets: HashMap<String, FrameTarget> = self
            .destinations
            .iter()
            .map(|d| {
                (
                    d.id.clone(),
                    FrameTarget {
                        min: d.min,
                        max: d.max,
                        routes: Vec::new(),
                    },
                )
            })
            .collect();

        for routing in self.routings.iter().filter(|r| r.enabled) {
            let Some(target) = targets.get_mut(&routing.destination) else {
                continue;
            };
            let value = self
                .source(&routing.source)
                .map_or(0.0, |s| if s.current_value.is_finite() { s.current_value } else { 0.0 });
            target.routes.push(FrameRoute {
                value,
                slot: VoiceSlot::for_source(&routing.source),
                amount: routing.amount,
            });
        }

        ModFrame { time: t, targets }
    }

    /// Restart retriggering LFOs; called on note-on.
    pub fn retrigger(&mut self, now: f64) {
        for source in &mut self.sources {
            source.retrigger(now);
        }
    }

    pub fn stats(&self) -> MatrixStats {
        let active: Vec<&Routing> = self.routings.iter().filter(|r| r.enabled).collect();
        let sources: HashSet<&str> = active.iter().map(|r| r.source.as_str()).collect();
        let destinations: HashSet<&str> = active.iter().map(|r| r.destination.as_str()).collect();
        MatrixStats {
            total_routings: self.routings.len(),
            active_routings: active.len(),
            sources_used: sources.len(),
            destinations_used: destinations.len(),
            lfo_count: self
                .sources
                .iter()
                .filter(|s| matches!(s.kind, SourceKind::Lfo(_)))
                .count(),
        }
    }
}

impl Default for ModulationMatrix {
    fn default() -> Self {
        Self::new(0)
    }
}
