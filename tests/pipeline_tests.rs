//! End-to-end tests: collector → store → query → reshape.

use std::fs;

use clusterwatch::analysis::{
    export, reshape, ExportFormat, FactQuery, NodeFilter, ReshapeError, ReshapeOptions, TareEntry,
    TareTable, CLUSTER_COLUMN,
};
use clusterwatch::collectors::{
    CommandTemplate, Family, NodeNaming, NodeRegistry, StatsCollector, StatsFetcher,
};
use clusterwatch::reading::{Batch, Point, Reading};
use clusterwatch::sampler::{LoopOutcome, Sampler, SamplerConfig};
use clusterwatch::store::{FactStore, SharedStore};
use serde_json::json;
use tokio::sync::watch;

fn two_node_tare() -> TareTable {
    TareTable::from_entries([
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
    ])
}

fn scenario_rows() -> Vec<Reading> {
    vec![
        Reading::new(100, 1, "t", 500.0),
        Reading::new(100, 2, "t", 600.0),
    ]
}

#[test]
fn test_query_returns_rows_in_time_then_node_order() {
    let mut store = FactStore::open_in_memory().unwrap();
    store.ensure_schema(Family::Power).unwrap();
    store
        .write_batch(&Batch::Facts(vec![
            Reading::new(200, 2, "t", 2.0),
            Reading::new(100, 2, "c", 1.0),
            Reading::new(200, 1, "t", 3.0),
            Reading::new(100, 1, "t", 4.0),
        ]))
        .unwrap();

    let rows = FactQuery::all().fetch(&store).unwrap();
    let keys: Vec<(i64, u32)> = rows.iter().map(|r| (r.t, r.node)).collect();
    assert_eq!(keys, vec![(100, 1), (100, 2), (200, 1), (200, 2)]);

    let totals = FactQuery {
        since: Some(100),
        nodes: NodeFilter::Only(vec![2]),
        point: Some(Point::Total),
    }
    .fetch(&store)
    .unwrap();
    assert_eq!(totals, vec![Reading::new(200, 2, "t", 2.0)]);
}

#[test]
fn test_bias_and_cluster_total() {
    let opts = ReshapeOptions {
        pivot: true,
        bias: true,
        cluster_total: true,
        percent: false,
    };
    let table = reshape(&scenario_rows(), &[1, 2], Some(Point::Total), &opts, &two_node_tare())
        .unwrap();

    assert_eq!(table.len(), 1);
    assert_eq!(table.column_names(), vec!["1", "2", CLUSTER_COLUMN]);
    assert_eq!(table.float_at("1", 0), Some(385.0));
    assert_eq!(table.float_at("2", 0), Some(480.0));
    assert_eq!(table.float_at(CLUSTER_COLUMN, 0), Some(865.0));
}

#[test]
fn test_percent_of_half_summed_ceiling() {
    let opts = ReshapeOptions {
        pivot: true,
        bias: true,
        cluster_total: true,
        percent: true,
    };
    let table = reshape(&scenario_rows(), &[1, 2], Some(Point::Total), &opts, &two_node_tare())
        .unwrap();

    let cluster = table.float_at(CLUSTER_COLUMN, 0).unwrap();
    assert!((cluster - 133.0769).abs() < 1e-3);
    let node1 = table.float_at("1", 0).unwrap();
    assert!((node1 - 385.0 / 6.5).abs() < 1e-9);
}

#[test]
fn test_reshape_is_repeatable() {
    let rows = vec![
        Reading::new(400, 2, "t", 640.0),
        Reading::new(100, 1, "t", 500.0),
        Reading::new(400, 1, "t", 90.0),
        Reading::new(100, 2, "t", 600.0),
        Reading::new(100, 1, "t", 510.0),
    ];
    let opts = ReshapeOptions {
        pivot: true,
        bias: true,
        cluster_total: true,
        percent: true,
    };
    let first = reshape(&rows, &[1, 2], Some(Point::Total), &opts, &two_node_tare()).unwrap();
    let second = reshape(&rows, &[1, 2], Some(Point::Total), &opts, &two_node_tare()).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
    // The later of the two (100, node 1) readings wins: (510 - 115) / 6.5.
    assert!((first.float_at("1", 0).unwrap() - 395.0 / 6.5).abs() < 1e-9);

    let dir = tempfile::tempdir().unwrap();
    let a = export(&first, ExportFormat::Csv, &dir.path().join("a")).unwrap();
    let b = export(&second, ExportFormat::Csv, &dir.path().join("b")).unwrap();
    assert_eq!(fs::read(a).unwrap(), fs::read(b).unwrap());
}

#[test]
fn test_bias_clips_at_zero() {
    let rows = vec![
        Reading::new(100, 1, "t", 100.0),
        Reading::new(100, 2, "t", 600.0),
    ];
    let opts = ReshapeOptions {
        pivot: true,
        bias: true,
        ..Default::default()
    };
    let table = reshape(&rows, &[1, 2], Some(Point::Total), &opts, &two_node_tare()).unwrap();
    assert_eq!(table.float_at("1", 0), Some(0.0));
}

#[test]
fn test_percent_with_builtin_table_needs_ceilings() {
    let opts = ReshapeOptions {
        pivot: true,
        percent: true,
        ..Default::default()
    };
    let err = reshape(&scenario_rows(), &[1, 2], Some(Point::Total), &opts, &TareTable::builtin())
        .unwrap_err();
    assert!(matches!(err, ReshapeError::MissingCeiling { node: 1 }));
}

#[tokio::test]
async fn test_power_collector_cycle_lands_in_store() {
    let dir = tempfile::tempdir().unwrap();
    let blob_path = dir.path().join("stats.json");
    fs::write(
        &blob_path,
        json!({
            "_timestamp": 1_700_000_000,
            "power.cpu_watts": {"node01": 120.5, "node02": "98"},
            "power.memory_watts": {"node01": 20.0, "node02": 18.5},
            "power.node_watts": {"node01": 250.0, "node02": 230.0},
            "power.fan_watts": {"node01": 12.0}
        })
        .to_string(),
    )
    .unwrap();

    let db = dir.path().join("power.db");
    let store = FactStore::open(&db).unwrap();
    store.ensure_schema(Family::Power).unwrap();
    let shared = SharedStore::new(store);

    let registry = NodeRegistry::from_names(["node01", "node02"], NodeNaming::default()).unwrap();
    let template =
        CommandTemplate::from_argv(&["cat", blob_path.to_str().unwrap()]).unwrap();
    let collector = StatsCollector::new(
        Family::Power,
        StatsFetcher::new(template, registry.node_list()),
        registry,
    );
    let mut sampler = Sampler::new(
        collector,
        shared.clone(),
        SamplerConfig {
            interval_secs: 1,
            max_cycles: Some(1),
        },
    );
    let (_tx, rx) = watch::channel(false);
    let outcome = sampler.run(rx).await.unwrap();
    assert_eq!(outcome, LoopOutcome::Completed { cycles: 1 });
    shared.close().unwrap();

    let store = FactStore::open_read_only(&db).unwrap();
    let rows = FactQuery::all().fetch(&store).unwrap();
    assert_eq!(rows.len(), 6);
    // Wall clock, not the blob's _timestamp.
    assert!(rows.iter().all(|r| r.t != 1_700_000_000));
    assert!(rows.iter().all(|r| r.t == rows[0].t));

    let node2_cpu = rows
        .iter()
        .find(|r| r.node == 2 && r.point == "c")
        .unwrap();
    assert_eq!(node2_cpu.value, 98.0);

    let totals = FactQuery {
        point: Some(Point::Total),
        ..FactQuery::all()
    }
    .fetch(&store)
    .unwrap();
    let table = reshape(
        &totals,
        &[1, 2],
        Some(Point::Total),
        &ReshapeOptions {
            pivot: true,
            ..Default::default()
        },
        &TareTable::builtin(),
    )
    .unwrap();
    assert_eq!(table.len(), 1);
    assert_eq!(table.float_at("1", 0), Some(250.0));
    assert_eq!(table.float_at("2", 0), Some(230.0));
}

#[tokio::test]
async fn test_heat_collector_writes_air_rows() {
    let dir = tempfile::tempdir().unwrap();
    let blob_path = dir.path().join("stats.json");
    fs::write(
        &blob_path,
        json!({
            "ipmi.temperature_value=air_in,unit=C": {"node05": {"C": 21.0}, "node06": {"C": 22.0}},
            "ipmi.temperature_value=air_out,unit=C": {"node05": {"C": 33.0}},
            "ipmi.temperature_value=cpu0,unit=C": {"node05": {"C": 61.0}}
        })
        .to_string(),
    )
    .unwrap();

    let db = dir.path().join("temps.db");
    let store = FactStore::open(&db).unwrap();
    store.ensure_schema(Family::Heat).unwrap();
    let shared = SharedStore::new(store);

    let registry = NodeRegistry::from_names(["node05", "node06"], NodeNaming::default()).unwrap();
    let template =
        CommandTemplate::from_argv(&["cat", blob_path.to_str().unwrap()]).unwrap();
    let collector = StatsCollector::new(
        Family::Heat,
        StatsFetcher::new(template, registry.node_list()),
        registry,
    );
    let mut sampler = Sampler::new(
        collector,
        shared.clone(),
        SamplerConfig {
            interval_secs: 1,
            max_cycles: Some(1),
        },
    );
    let (_tx, rx) = watch::channel(false);
    sampler.run(rx).await.unwrap();

    let facts = shared.with_store(|s| s.fact_count()).unwrap();
    assert_eq!(facts, 3);
    shared.close().unwrap();

    let conn = rusqlite::Connection::open(&db).unwrap();
    let air: Vec<(u32, f64, f64)> = conn
        .prepare("SELECT node, air_in, air_out FROM air")
        .unwrap()
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    // node06 has no outlet probe, so only node05 pairs up.
    assert_eq!(air, vec![(5, 21.0, 33.0)]);
}
