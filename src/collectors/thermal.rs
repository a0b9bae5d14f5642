//! Heat family: inlet and outlet air temperature probes.

use ahash::AHashMap as HashMap;

use crate::collectors::normalize::{KeySelector, MetricRule, MetricTable};
use crate::reading::{AirRow, Reading};

pub const TEMPERATURE_METRIC: &str = "temperature_value";
pub const AIR_IN: &str = "ai";
pub const AIR_OUT: &str = "ao";

pub static THERMAL_TABLE: MetricTable = MetricTable {
    rules: &[
        MetricRule {
            selector: KeySelector::Labelled {
                metric: TEMPERATURE_METRIC,
                label: "air_in",
            },
            code: AIR_IN,
        },
        MetricRule {
            selector: KeySelector::Labelled {
                metric: TEMPERATURE_METRIC,
                label: "air_out",
            },
            code: AIR_OUT,
        },
    ],
};

/// One `air` row per node that reported both probes, ordered by node.
pub fn pair_air_rows(facts: &[Reading]) -> Vec<AirRow> {
    let mut probes: HashMap<u32, (i64, Option<f64>, Option<f64>)> = HashMap::new();
    for r in facts {
        let entry = probes.entry(r.node).or_insert((r.t, None, None));
        match r.point.as_str() {
            AIR_IN => entry.1 = Some(r.value),
            AIR_OUT => entry.2 = Some(r.value),
            _ => {}
        }
    }

    let mut rows: Vec<AirRow> = probes
        .into_iter()
        .filter_map(|(node, (t, air_in, air_out))| {
            Some(AirRow {
                t,
                node,
                air_in: air_in?,
                air_out: air_out?,
            })
        })
        .collect();
    rows.sort_by_key(|r| r.node);
    rows
}
