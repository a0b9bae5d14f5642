//! Idle-power baselines and power ceilings per node.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::analysis::ReshapeError;

/// Nodes of the cluster the compiled baselines describe.
pub fn builtin_nodes() -> Vec<u32> {
    (1..=18).chain(50..=61).collect()
}

/// Idle watts in the order of [`builtin_nodes`].
const IDLE_WATTS: [f64; 30] = [
    115.0, 115.0, 115.0, 115.0, 115.0, 115.0, 115.0, 115.0, // basic
    120.0, 120.0, 120.0, 120.0, 120.0, // medium
    135.0, 135.0, // large
    425.0, // ML
    850.0, 850.0, // sci
    115.0, 135.0, 135.0, 120.0, 115.0, // faculty
    120.0, 120.0, 120.0, 120.0, // parish
    135.0, 115.0, 115.0,
];

/// One node's baseline, as it appears in the `tare_table` config key.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TareEntry {
    pub node: u32,
    pub idle_watts: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_watts: Option<f64>,
}

/// Static node → baseline mapping used by the reshaper.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TareTable {
    entries: BTreeMap<u32, TareEntry>,
}

impl TareTable {
    /// The compiled-in table. No ceilings are known for it.
    pub fn builtin() -> Self {
        Self::from_entries(builtin_nodes().into_iter().zip(IDLE_WATTS).map(
            |(node, idle_watts)| TareEntry {
                node,
                idle_watts,
                max_watts: None,
            },
        ))
    }

    pub fn from_entries(entries: impl IntoIterator<Item = TareEntry>) -> Self {
        Self {
            entries: entries.into_iter().map(|e| (e.node, e)).collect(),
        }
    }

    /// Replace or add entries.
    pub fn with_overrides(mut self, overrides: &[TareEntry]) -> Self {
        for e in overrides {
            self.entries.insert(e.node, *e);
        }
        self
    }

    /// Known node numbers, ascending.
    pub fn nodes(&self) -> Vec<u32> {
        self.entries.keys().copied().collect()
    }

    /// Idle watts; unknown nodes have a zero baseline.
    pub fn idle(&self, node: u32) -> f64 {
        self.entries.get(&node).map_or(0.0, |e| e.idle_watts)
    }

    pub fn max(&self, node: u32) -> Option<f64> {
        self.entries.get(&node).and_then(|e| e.max_watts)
    }

    /// Sum of the ceilings of `nodes`. Every node must have one.
    pub fn cluster_max(&self, nodes: &[u32]) -> Result<f64, ReshapeError> {
        nodes.iter().try_fold(0.0, |acc, node| {
            self.max(*node)
                .map(|m| acc + m)
                .ok_or(ReshapeError::MissingCeiling { node: *node })
        })
    }

    pub fn entries(&self) -> impl Iterator<Item = &TareEntry> {
        self.entries.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_table() {
        let tare = TareTable::builtin();
        assert_eq!(tare.nodes().len(), 30);
        assert_eq!(tare.idle(1), 115.0);
        assert_eq!(tare.idle(16), 425.0);
        assert_eq!(tare.idle(17), 850.0);
        assert_eq!(tare.idle(50), 115.0);
        assert_eq!(tare.idle(51), 135.0);
        assert_eq!(tare.idle(61), 115.0);
        assert_eq!(tare.idle(99), 0.0);
        assert_eq!(tare.max(1), None);
    }

    #[test]
    fn test_cluster_max_needs_every_ceiling() {
        let tare = TareTable::from_entries([
            TareEntry {
                node: 1,
                idle_watts: 115.0,
                max_watts: Some(600.0),
            },
            TareEntry {
                node: 2,
                idle_watts: 120.0,
                max_watts: Some(700.0),
            },
            TareEntry {
                node: 3,
                idle_watts: 120.0,
                max_watts: None,
            },
        ]);
        assert_eq!(tare.cluster_max(&[1, 2]).unwrap(), 1300.0);
        assert!(matches!(
            tare.cluster_max(&[1, 3]),
            Err(ReshapeError::MissingCeiling { node: 3 })
        ));
    }

    #[test]
    fn test_overrides_replace_entries() {
        let tare = TareTable::builtin().with_overrides(&[TareEntry {
            node: 1,
            idle_watts: 100.0,
            max_watts: Some(500.0),
        }]);
        assert_eq!(tare.idle(1), 100.0);
        assert_eq!(tare.max(1), Some(500.0));
        assert_eq!(tare.idle(2), 115.0);
    }
}
