//! Row types shared by the collectors and the report pipeline.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// One measurement of one node at one poll cycle.
///
/// `(t, node, point)` is not unique: every cycle appends a fresh set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Unix epoch seconds, shared by all readings of one cycle.
    pub t: i64,
    pub node: u32,
    /// Short canonical code (`c`, `m`, `t`, or a probe code such as `ai`).
    pub point: String,
    pub value: f64,
}

impl Reading {
    pub fn new(t: i64, node: u32, point: impl Into<String>, value: f64) -> Self {
        Self {
            t,
            node,
            point: point.into(),
            value,
        }
    }
}

/// Power measurement points that the report can filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
pub enum Point {
    /// CPU package watts
    #[value(name = "c")]
    #[serde(rename = "c")]
    Cpu,
    /// Memory watts
    #[value(name = "m")]
    #[serde(rename = "m")]
    Memory,
    /// Whole-node watts
    #[value(name = "t")]
    #[serde(rename = "t")]
    Total,
}

impl Point {
    pub fn code(self) -> &'static str {
        match self {
            Point::Cpu => "c",
            Point::Memory => "m",
            Point::Total => "t",
        }
    }
}

/// Paired inlet/outlet air temperature of a node.
#[derive(Debug, Clone, PartialEq)]
pub struct AirRow {
    pub t: i64,
    pub node: u32,
    pub air_in: f64,
    pub air_out: f64,
}

/// System load averages as reported by `w`.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadSample {
    pub t: i64,
    pub one_minute: f64,
    pub five_minutes: f64,
    pub fifteen_minutes: f64,
}

/// Everything one poll cycle produced; persisted under a single commit.
#[derive(Debug, Clone, PartialEq)]
pub enum Batch {
    Facts(Vec<Reading>),
    Thermal { facts: Vec<Reading>, air: Vec<AirRow> },
    Load(LoadSample),
}

impl Batch {
    /// Number of rows the batch will insert.
    pub fn row_count(&self) -> usize {
        match self {
            Batch::Facts(facts) => facts.len(),
            Batch::Thermal { facts, air } => facts.len() + air.len(),
            Batch::Load(_) => 1,
        }
    }
}
