//! Collector commands (`power`, `heat`, `load`).
//!
//! Each run validates its requirements, builds the node registry (stats
//! families only), then hands the sampler to the shutdown supervisor.

use std::io::IsTerminal;

use tokio::sync::watch;
use tracing::{error, info, warn};

use clusterwatch::collectors::{
    enumerate_nodes, Collector, Family, LoadCollector, StatsCollector, StatsFetcher,
};
use clusterwatch::sampler::{Sampler, SamplerConfig};
use clusterwatch::shutdown::{supervise, SignalSet};
use clusterwatch::store::{FactStore, SharedStore};
use clusterwatch::CollectError;

use crate::cli::CollectArgs;
use crate::config::{CollectSettings, Config};
use crate::startup_checks::validate_requirements;

/// Run one collector until it is stopped. Returns the process exit status.
pub async fn command_collect(family: Family, args: &CollectArgs, config: &Config) -> i32 {
    let settings = CollectSettings::resolve(config, family, args);
    info!(
        family = family.name(),
        db = %settings.db.display(),
        interval_s = settings.sampler.interval_secs,
        "Starting collector"
    );

    match run(&settings, config).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "Collector could not start");
            eprintln!("❌ {}", e);
            e.exit_code()
        }
    }
}

async fn run(settings: &CollectSettings, config: &Config) -> Result<i32, CollectError> {
    settings.sampler.validate()?;
    match settings.family {
        Family::Power | Family::Heat => {
            let node_list = config.node_list_template()?;
            let stats = config.stats_template()?;
            if let Err(e) = validate_requirements(settings.family, &settings.db, &[&node_list, &stats])
            {
                eprintln!("❌ {}", e);
                return Ok(e.exit_code());
            }

            let registry = enumerate_nodes(&node_list, config.node_naming).await?;
            if registry.is_empty() {
                warn!("Node listing returned no nodes; every cycle will be empty");
            }
            info!(nodes = registry.len(), "Node registry ready");

            let fetcher = StatsFetcher::new(stats, registry.node_list());
            let collector = StatsCollector::new(settings.family, fetcher, registry);
            let store = open_store(settings)?;
            Ok(supervise_collector(collector, store, settings.sampler).await)
        }
        Family::Load => {
            let command = config.load_template()?;
            if let Err(e) = validate_requirements(settings.family, &settings.db, &[&command]) {
                eprintln!("❌ {}", e);
                return Ok(e.exit_code());
            }
            let store = open_store(settings)?;
            Ok(supervise_collector(LoadCollector::new(command), store, settings.sampler).await)
        }
    }
}

fn open_store(settings: &CollectSettings) -> Result<FactStore, CollectError> {
    FactStore::open(&settings.db).map_err(CollectError::Write)
}

async fn supervise_collector<C>(collector: C, store: FactStore, config: SamplerConfig) -> i32
where
    C: Collector + 'static,
{
    let shared = SharedStore::new(store);
    let mut sampler = Sampler::new(collector, shared.clone(), config);
    let stats = sampler.stats();

    let (stop_tx, stop_rx) = watch::channel(false);
    let signals = SignalSet::install(std::io::stdin().is_terminal());
    let handle = tokio::spawn(async move { sampler.run(stop_rx).await });

    let code = supervise(handle, stop_tx, shared, signals.recv()).await;
    stats.log_summary();
    code
}
