//! Power family: CPU, memory and whole-node wattage.

use crate::collectors::normalize::{KeySelector, MetricRule, MetricTable};

pub const CPU_WATTS: &str = "power.cpu_watts";
pub const MEMORY_WATTS: &str = "power.memory_watts";
pub const NODE_WATTS: &str = "power.node_watts";

/// `power.cpu_watts → c`, `power.memory_watts → m`, `power.node_watts → t`.
pub static POWER_TABLE: MetricTable = MetricTable {
    rules: &[
        MetricRule {
            selector: KeySelector::Exact(CPU_WATTS),
            code: "c",
        },
        MetricRule {
            selector: KeySelector::Exact(MEMORY_WATTS),
            code: "m",
        },
        MetricRule {
            selector: KeySelector::Exact(NODE_WATTS),
            code: "t",
        },
    ],
};
