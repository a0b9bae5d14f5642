//! Report command: read → reshape → export.

use anyhow::Context;
use chrono::Utc;
use tracing::{debug, info, warn};

use clusterwatch::analysis::{
    export, reshape, summarize, summary, will_pivot, ExportError, ExportFormat, FactQuery,
    NodeFilter, ReshapeError, ReshapeOptions, TareTable,
};
use clusterwatch::reading::Point;
use clusterwatch::store::{FactStore, StoreError};
use clusterwatch::sysexits;

use crate::cli::ReportArgs;
use crate::config::{Config, ReportSettings};

/// Nodes and point the report reads, after `--totals` and defaults.
pub fn select_nodes(args: &ReportArgs, all_nodes: &[u32]) -> (Vec<u32>, Point) {
    if args.totals {
        return (all_nodes.to_vec(), Point::Total);
    }
    let nodes = if args.node.is_empty() {
        all_nodes.to_vec()
    } else {
        let mut seen = Vec::with_capacity(args.node.len());
        for n in &args.node {
            if !seen.contains(n) {
                seen.push(*n);
            }
        }
        seen
    };
    (nodes, args.point)
}

pub fn command_report(args: &ReportArgs, config: &Config) -> anyhow::Result<()> {
    let settings = ReportSettings::resolve(config, args);
    let formats: Vec<&str> = ExportFormat::available_formats()
        .into_iter()
        .map(ExportFormat::name)
        .collect();
    debug!(formats = %formats.join(","), "Export formats available");
    if !ExportFormat::Feather.available() {
        info!("feather export not built in (cargo feature 'feather')");
    }

    let tare = TareTable::builtin().with_overrides(&config.tare_table);
    let all_nodes = tare.nodes();
    let (nodes, point) = select_nodes(args, &all_nodes);

    if args.bias && point != Point::Total {
        warn!("--bias only makes sense when the total (point t) is read; continuing");
    }

    let opts = ReshapeOptions {
        pivot: args.pivot,
        bias: args.bias,
        cluster_total: args.cluster,
        percent: args.percent,
    };
    if !will_pivot(Some(point), &opts, &nodes) && (args.bias || args.cluster || args.percent) {
        warn!("--bias, --cluster and --percent apply to the pivoted table only; ignoring them");
    }

    let query = FactQuery {
        since: FactQuery::window_start(settings.window_days, Utc::now().timestamp()),
        nodes: if nodes == all_nodes {
            NodeFilter::All
        } else {
            NodeFilter::Only(nodes.clone())
        },
        point: Some(point),
    };

    let store = FactStore::open_read_only(&settings.db)
        .with_context(|| format!("cannot open store {}", settings.db.display()))?;
    let rows = query
        .fetch(&store)
        .with_context(|| format!("cannot read facts from {}", settings.db.display()))?;
    info!(rows = rows.len(), nodes = nodes.len(), point = point.code(), "Facts read");

    let table = reshape(&rows, &nodes, Some(point), &opts, &tare).context("cannot reshape facts")?;

    if args.summarize {
        print!("{}", summary::render(&summarize(&table)));
    }

    let path = export(&table, settings.format, &settings.output)
        .with_context(|| format!("cannot write {} report", settings.format.name()))?;
    store.close().context("cannot close store")?;

    println!("✅ Report written to: {}", path.display());
    Ok(())
}

/// Exit status for a failed report.
pub fn report_exit_code(err: &anyhow::Error) -> i32 {
    for cause in err.chain() {
        if cause.is::<ReshapeError>() {
            return sysexits::EX_DATAERR;
        }
        if cause.is::<StoreError>() || cause.is::<ExportError>() {
            return sysexits::EX_IOERR;
        }
    }
    sysexits::EX_SOFTWARE
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn args() -> ReportArgs {
        ReportArgs {
            db: Some(PathBuf::from("power.db")),
            output: None,
            format: None,
            time: None,
            node: vec![],
            point: Point::Cpu,
            pivot: false,
            bias: false,
            cluster: false,
            percent: false,
            summarize: false,
            totals: false,
        }
    }

    #[test]
    fn test_totals_selects_all_nodes_and_total() {
        let mut a = args();
        a.totals = true;
        a.node = vec![3];
        let (nodes, point) = select_nodes(&a, &[1, 2, 3]);
        assert_eq!(nodes, vec![1, 2, 3]);
        assert_eq!(point, Point::Total);
    }

    #[test]
    fn test_repeated_nodes_deduplicated() {
        let mut a = args();
        a.node = vec![5, 1, 5];
        let (nodes, point) = select_nodes(&a, &[1, 5]);
        assert_eq!(nodes, vec![5, 1]);
        assert_eq!(point, Point::Cpu);
    }

    #[test]
    fn test_exit_code_from_cause() {
        let err = anyhow::Error::new(ReshapeError::MissingCeiling { node: 2 }).context("reshape");
        assert_eq!(report_exit_code(&err), 65);
        let err = anyhow::Error::new(StoreError::Closed).context("read");
        assert_eq!(report_exit_code(&err), 74);
        assert_eq!(report_exit_code(&anyhow::anyhow!("other")), 70);
    }
}
