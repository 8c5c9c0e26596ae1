//! Routing table: ordered, unique per (source, destination) pair.

use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoutingId(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub struct Routing {
    pub id: RoutingId,
    pub source: String,
    pub destination: String,
    /// Always within [-1, 1].
    pub amount: f32,
    pub enabled: bool,
}

/// Serializable routing without identity, as stored in presets.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingSpec {
    pub source: String,
    pub destination: String,
    pub amount: f32,
}

impl RoutingSpec {
    pub fn new(source: &str, destination: &str, amount: f32) -> Self {
        Self {
            source: source.to_string(),
            destination: destination.to_string(),
            amount,
        }
    }
}

/// Routings in insertion order with O(1) pair and id lookup.
#[derive(Debug, Default)]
pub struct RoutingTable {
    routings: Vec<Routing>,
    by_pair: HashMap<(String, String), usize>,
    by_id: HashMap<RoutingId, usize>,
    next_id: u64,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Default::default()
        }
    }

    /// Insert a routing, or update the amount of the existing one for the pair.
    ///
    /// Returns the routing id and whether a new entry was created.
    pub fn upsert(&mut self, source: &str, destination: &str, amount: f32) -> (RoutingId, bool) {
        let amount = amount.clamp(-1.0, 1.0);
        let key = (source.to_string(), destination.to_string());
        if let Some(&index) = self.by_pair.get(&key) {
            let routing = &mut self.routings[index];
            routing.amount = amount;
            return (routing.id, false);
        }

        let id = RoutingId(self.next_id.max(1));
        self.next_id = id.0 + 1;
        let index = self.routings.len();
        self.routings.push(Routing {
            id,
            source: key.0.clone(),
            destination: key.1.clone(),
            amount,
            enabled: true,
        });
        self.by_pair.insert(key, index);
        self.by_id.insert(id, index);
        (id, true)
    }

    pub fn remove(&mut self, id: RoutingId) -> Option<Routing> {
        let index = self.by_id.get(&id).copied()?;
        let removed = self.routings.remove(index);
        self.reindex();
        Some(removed)
    }

    pub fn get(&self, id: RoutingId) -> Option<&Routing> {
        self.by_id.get(&id).map(|&i| &self.routings[i])
    }

    pub fn get_mut(&mut self, id: RoutingId) -> Option<&mut Routing> {
        let index = self.by_id.get(&id).copied()?;
        self.routings.get_mut(index)
    }

    pub fn find(&self, source: &str, destination: &str) -> Option<&Routing> {
        self.by_pair
            .get(&(source.to_string(), destination.to_string()))
            .map(|&i| &self.routings[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Routing> {
        self.routings.iter()
    }

    pub fn len(&self) -> usize {
        self.routings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routings.is_empty()
    }

    pub fn clear(&mut self) {
        self.routings.clear();
        self.by_pair.clear();
        self.by_id.clear();
    }

    fn reindex(&mut self) {
        self.by_pair.clear();
        self.by_id.clear();
        for (index, routing) in self.routings.iter().enumerate() {
            self.by_pair
                .insert((routing.source.clone(), routing.destination.clone()), index);
            self.by_id.insert(routing.id, index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_updates_existing_pair() {
        let mut table = RoutingTable::new();
        let (first, created) = table.upsert("lfo1", "filterCutoff", 0.2);
        assert!(created);
        let (second, created) = table.upsert("lfo1", "filterCutoff", -0.7);
        assert!(!created);
        assert_eq!(first, second);
        assert_eq!(table.len(), 1);
        assert!((table.get(first).unwrap().amount + 0.7).abs() < 1e-6);
    }

    #[test]
    fn amounts_are_clamped() {
        let mut table = RoutingTable::new();
        let (id, _) = table.upsert("a", "b", 5.0);
        assert_eq!(table.get(id).unwrap().amount, 1.0);
    }

    #[test]
    fn remove_keeps_order_and_index_consistent() {
        let mut table = RoutingTable::new();
        let (a, _) = table.upsert("s1", "d", 0.1);
        let (b, _) = table.upsert("s2", "d", 0.2);
        let (c, _) = table.upsert("s3", "d", 0.3);

        assert!(table.remove(a).is_some());
        let order: Vec<RoutingId> = table.iter().map(|r| r.id).collect();
        assert_eq!(order, vec![b, c]);
        assert_eq!(table.find("s3", "d").unwrap().id, c);
        assert!(table.find("s1", "d").is_none());
        assert!(table.remove(a).is_none());
    }

    #[test]
    fn ids_are_not_reused_after_removal() {
        let mut table = RoutingTable::new();
        let (a, _) = table.upsert("s1", "d", 0.1);
        table.remove(a);
        let (b, _) = table.upsert("s1", "d", 0.1);
        assert_ne!(a, b);
    }
}
