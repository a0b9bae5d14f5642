//! Collectors for the monitored metric families.
//!
//! This module contains the pieces one poll cycle is built from:
//! - `nodes`: node enumeration and the name → number registry
//! - `command`: running external commands and capturing their output
//! - `normalize`: allow-list/rename tables applied to stats blobs
//! - `power`, `thermal`, `load`: the three metric families

pub mod command;
pub mod load;
pub mod nodes;
pub mod normalize;
pub mod power;
pub mod thermal;

use std::future::Future;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::CollectError;
use crate::reading::Batch;

pub use command::{run_capture, CommandTemplate, StatsFetcher};
pub use load::LoadCollector;
pub use nodes::{enumerate_nodes, parse_node_listing, NodeNaming, NodeRegistry};
pub use normalize::{KeySelector, MetricRule, MetricTable, Normalizer};
pub use power::POWER_TABLE;
pub use thermal::THERMAL_TABLE;

/// The metric family a collector process is responsible for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Family {
    /// CPU, memory and node wattage from the stats command
    Power,
    /// Air inlet/outlet temperatures from the stats command
    Heat,
    /// Load averages from `w`
    Load,
}

impl Family {
    pub fn name(self) -> &'static str {
        match self {
            Family::Power => "power",
            Family::Heat => "heat",
            Family::Load => "load",
        }
    }

    /// Store file used when neither config nor CLI name one.
    pub fn default_db(self) -> &'static str {
        match self {
            Family::Power => "power.db",
            Family::Heat => "temps.db",
            Family::Load => "webpower.db",
        }
    }

    /// Tables the collector appends to.
    pub fn tables(self) -> &'static [&'static str] {
        match self {
            Family::Power => &["facts"],
            Family::Heat => &["facts", "air"],
            Family::Load => &["w_facts"],
        }
    }
}

/// One poll cycle's worth of work: fetch, then normalize into a [`Batch`].
pub trait Collector: Send {
    fn family(&self) -> Family;

    fn collect(&mut self) -> impl Future<Output = Result<Batch, CollectError>> + Send;
}

/// Collector for the families fed by the cluster stats command.
pub struct StatsCollector {
    family: Family,
    fetcher: StatsFetcher,
    registry: NodeRegistry,
    normalizer: Normalizer,
}

impl StatsCollector {
    pub fn new(family: Family, fetcher: StatsFetcher, registry: NodeRegistry) -> Self {
        let table = match family {
            Family::Heat => &THERMAL_TABLE,
            _ => &POWER_TABLE,
        };
        Self {
            family,
            fetcher,
            registry,
            normalizer: Normalizer::new(table),
        }
    }
}

impl Collector for StatsCollector {
    fn family(&self) -> Family {
        self.family
    }

    async fn collect(&mut self) -> Result<Batch, CollectError> {
        let blob = self.fetcher.fetch().await?;
        let t = chrono::Utc::now().timestamp();
        let facts = self.normalizer.normalize(&blob, &self.registry, t)?;
        Ok(match self.family {
            Family::Heat => {
                let air = thermal::pair_air_rows(&facts);
                Batch::Thermal { facts, air }
            }
            _ => Batch::Facts(facts),
        })
    }
}
