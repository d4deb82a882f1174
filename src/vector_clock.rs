//! Vector clocks for causal ordering across metadata nodes.
//!
//! A vector clock tracks the happens-before relationship between events
//! across multiple nodes. Each node maintains a monotonic counter for
//! itself; the clock is merged and incremented on every mutation.
use crate::ids::MetadataNodeId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Mapping from metadata-node identifier to a monotonic integer, default
/// zero for any node not yet present in the map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorClock {
    clocks: HashMap<MetadataNodeId, u64>,
}

/// Result of comparing two vector clocks (§4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockOrdering {
    /// `self` happened strictly before `other`.
    Before,
    /// `self` happened strictly after `other`.
    After,
    /// The clocks are identical.
    Equal,
    /// Neither dominates: a genuine conflict.
    Concurrent,
}

impl VectorClock {
    /// An empty vector clock.
    pub fn new() -> Self {
        Self {
            clocks: HashMap::new(),
        }
    }

    /// Read the logical timestamp for one node (zero if absent).
    pub fn get(&self, node: &MetadataNodeId) -> u64 {
        self.clocks.get(node).copied().unwrap_or(0)
    }

    /// A new clock equal to `self` except `node`'s entry is one larger.
    pub fn increment(&self, node: &MetadataNodeId) -> Self {
        let mut next = self.clocks.clone();
        let entry = next.entry(node.clone()).or_insert(0);
        *entry += 1;
        Self { clocks: next }
    }

    /// Pointwise maximum of two clocks.
    pub fn merge(&self, other: &Self) -> Self {
        let mut merged = self.clocks.clone();
        for (node, ts) in &other.clocks {
            let entry = merged.entry(node.clone()).or_insert(0);
            *entry = (*entry).max(*ts);
        }
        Self { clocks: merged }
    }

    /// Compare two vector clocks per §4.1: `a < b` iff every entry of `a`
    /// is `<=` the corresponding entry of `b` and at least one is strictly
    /// less; `concurrent` iff neither direction dominates and the maps
    /// are unequal.
    pub fn compare(&self, other: &Self) -> ClockOrdering {
        let all_nodes = self.clocks.keys().chain(other.clocks.keys());
        let mut has_less = false;
        let mut has_greater = false;

        for node in all_nodes {
            let a = self.get(node);
            let b = other.get(node);
            match a.cmp(&b) {
                std::cmp::Ordering::Less => has_less = true,
                std::cmp::Ordering::Greater => has_greater = true,
                std::cmp::Ordering::Equal => {}
            }
        }

        match (has_less, has_greater) {
            (false, false) => ClockOrdering::Equal,
            (true, false) => ClockOrdering::Before,
            (false, true) => ClockOrdering::After,
            (true, true) => ClockOrdering::Concurrent,
        }
    }

    /// `true` iff `self` happened strictly after `other`.
    pub fn dominates(&self, other: &Self) -> bool {
        matches!(self.compare(other), ClockOrdering::After)
    }

    /// `true` iff `self` happened strictly before `other`.
    pub fn is_dominated_by(&self, other: &Self) -> bool {
        matches!(self.compare(other), ClockOrdering::Before)
    }

    /// `true` iff the two clocks are concurrent (a genuine conflict).
    pub fn is_concurrent_with(&self, other: &Self) -> bool {
        matches!(self.compare(other), ClockOrdering::Concurrent)
    }

    /// A stable digest of this clock suitable for anti-entropy state
    /// summaries: sorted `(node, timestamp)` pairs so two equal clocks
    /// always hash identically regardless of `HashMap` iteration order.
    pub fn digest(&self) -> Vec<(MetadataNodeId, u64)> {
        let mut pairs: Vec<_> = self.clocks.iter().map(|(k, v)| (k.clone(), *v)).collect();
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str) -> MetadataNodeId {
        MetadataNodeId::new(id, 0)
    }

    #[test]
    fn fresh_clocks_are_equal() {
        assert_eq!(
            VectorClock::new().compare(&VectorClock::new()),
            ClockOrdering::Equal
        );
    }

    #[test]
    fn increment_strictly_advances() {
        let a = VectorClock::new();
        let b = a.increment(&node("m1"));
        assert_eq!(a.compare(&b), ClockOrdering::Before);
        assert_eq!(b.compare(&a), ClockOrdering::After);
    }

    #[test]
    fn independent_increments_are_concurrent() {
        let base = VectorClock::new();
        let a = base.increment(&node("m1"));
        let b = base.increment(&node("m2"));
        assert_eq!(a.compare(&b), ClockOrdering::Concurrent);
        assert_eq!(b.compare(&a), ClockOrdering::Concurrent);
    }

    #[test]
    fn merge_dominates_both_inputs() {
        let base = VectorClock::new();
        let a = base.increment(&node("m1"));
        let b = base.increment(&node("m2"));
        let merged = a.merge(&b);
        assert!(merged.dominates(&a));
        assert!(merged.dominates(&b));
    }

    #[test]
    fn compare_is_a_strict_partial_order() {
        // Reflexivity via equality, antisymmetry via Before/After duality,
        // and transitivity along a causal chain.
        let base = VectorClock::new();
        let step1 = base.increment(&node("m1"));
        let step2 = step1.increment(&node("m1"));
        assert_eq!(base.compare(&step2), ClockOrdering::Before);
        assert_eq!(step2.compare(&base), ClockOrdering::After);
    }

    #[test]
    fn digest_is_order_independent() {
        let mut a = VectorClock::new();
        a = a.increment(&node("m1"));
        a = a.increment(&node("m2"));

        let mut b = VectorClock::new();
        b = b.increment(&node("m2"));
        b = b.increment(&node("m1"));

        assert_eq!(a.digest(), b.digest());
    }
}
