//! Declarative allow-list and rename tables for stats blobs.
//!
//! A stats blob maps dotted metric keys to per-node value mappings:
//!
//! ```json
//! { "power.node_watts": { "node01": 512.0, "node02": 498.5 },
//!   "_timestamp":       { "node01": 1700000000, ... } }
//! ```
//!
//! Only keys selected by a [`MetricTable`] survive; everything else is
//! filtered out on purpose. All readings of one blob share the timestamp the
//! caller passes in (wall clock at normalization time).

use serde_json::Value;
use tracing::debug;

use crate::collectors::nodes::NodeRegistry;
use crate::error::CollectError;
use crate::reading::Reading;

/// How a rule selects a blob key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySelector {
    /// The key must equal this string.
    Exact(&'static str),
    /// The key must contain `metric`, and the text between its first `=`
    /// and the following `,` must equal `label`.
    Labelled {
        metric: &'static str,
        label: &'static str,
    },
}

impl KeySelector {
    pub fn matches(&self, key: &str) -> bool {
        match self {
            KeySelector::Exact(k) => key == *k,
            KeySelector::Labelled { metric, label } => {
                key.contains(metric) && key_label(key) == Some(*label)
            }
        }
    }
}

/// Label embedded in a key such as `ipmi.temperature_value=air_in,unit=C`.
pub fn key_label(key: &str) -> Option<&str> {
    let (_, rest) = key.split_once('=')?;
    Some(rest.split_once(',').map_or(rest, |(label, _)| label))
}

/// A blob key selector and the canonical point code it is renamed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricRule {
    pub selector: KeySelector,
    pub code: &'static str,
}

/// Ordered set of rules; the first matching rule wins.
#[derive(Debug, Clone, Copy)]
pub struct MetricTable {
    pub rules: &'static [MetricRule],
}

impl MetricTable {
    /// Canonical code for a blob key, or `None` if the key is not wanted.
    pub fn code_for(&self, key: &str) -> Option<&'static str> {
        self.rules
            .iter()
            .find(|r| r.selector.matches(key))
            .map(|r| r.code)
    }
}

/// Turns stats blobs into readings according to a metric table.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    table: &'static MetricTable,
}

impl Normalizer {
    pub fn new(table: &'static MetricTable) -> Self {
        Self { table }
    }

    /// One reading per (selected key, node) pair in the blob.
    ///
    /// Cells without a numeric value are skipped. Only a blob that is not an
    /// object or a node name the registry cannot number is an error.
    pub fn normalize(
        &self,
        blob: &Value,
        registry: &NodeRegistry,
        t: i64,
    ) -> Result<Vec<Reading>, CollectError> {
        let entries = blob
            .as_object()
            .ok_or_else(|| CollectError::Parse("stats blob is not a JSON object".into()))?;

        let mut readings = Vec::new();
        for (key, per_node) in entries {
            let Some(code) = self.table.code_for(key) else {
                continue;
            };
            let Some(per_node) = per_node.as_object() else {
                debug!(key = %key, "Metric is not a per-node mapping, skipped");
                continue;
            };
            for (node_name, raw) in per_node {
                // A node that is down reports null; the rest of the batch stands.
                let Some(value) = numeric_value(raw) else {
                    debug!(key = %key, node = %node_name, value = %raw, "Non-numeric cell skipped");
                    continue;
                };
                let node = registry.number_of(node_name)?;
                readings.push(Reading::new(t, node, code, value));
            }
        }
        Ok(readings)
    }
}

/// Numeric reading from a number, a numeric string, or the first entry of
/// a nested object/array.
pub fn numeric_value(raw: &Value) -> Option<f64> {
    match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Object(map) => map.values().next().and_then(numeric_value),
        Value::Array(items) => items.first().and_then(numeric_value),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::nodes::NodeNaming;
    use crate::collectors::power::POWER_TABLE;
    use serde_json::json;

    #[test]
    fn test_key_label() {
        assert_eq!(key_label("ipmi.temperature_value=air_in,unit=C"), Some("air_in"));
        assert_eq!(key_label("temperature_value=air_out"), Some("air_out"));
        assert_eq!(key_label("power.node_watts"), None);
    }

    #[test]
    fn test_null_cell_skips_only_that_node() {
        let registry =
            NodeRegistry::from_names(["node01", "node02"], NodeNaming::default()).unwrap();
        let blob = json!({
            "power.node_watts": {"node01": 500.0, "node02": null},
            "power.cpu_watts": {"node01": "n/a", "node02": 210.0},
            "power.memory_watts": "offline"
        });
        let mut readings = Normalizer::new(&POWER_TABLE)
            .normalize(&blob, &registry, 10)
            .unwrap();
        readings.sort_by(|a, b| a.point.cmp(&b.point));

        assert_eq!(
            readings,
            vec![Reading::new(10, 2, "c", 210.0), Reading::new(10, 1, "t", 500.0)]
        );
    }

    #[test]
    fn test_unknown_node_is_still_an_error() {
        let registry = NodeRegistry::from_names(["node01"], NodeNaming::default()).unwrap();
        let blob = json!({"power.node_watts": {"login": 1.0}});
        let err = Normalizer::new(&POWER_TABLE)
            .normalize(&blob, &registry, 0)
            .unwrap_err();
        assert!(matches!(err, CollectError::Parse(_)));
    }

    #[test]
    fn test_numeric_value_shapes() {
        assert_eq!(numeric_value(&json!(12.5)), Some(12.5));
        assert_eq!(numeric_value(&json!("40")), Some(40.0));
        assert_eq!(numeric_value(&json!({"C": 23})), Some(23.0));
        assert_eq!(numeric_value(&json!([7, 8])), Some(7.0));
        assert_eq!(numeric_value(&json!(null)), None);
        assert_eq!(numeric_value(&json!("n/a")), None);
    }
}
