//! Generate testdata command implementation.
//!
//! Writes a synthetic stats blob in the shape the stats command emits, so
//! the collectors can be pointed at `cat <file>` on a machine without the
//! cluster tooling.

use std::fs;
use std::path::PathBuf;

use chrono::Utc;
use rand::Rng;
use serde_json::{json, Map, Value};
use tracing::info;

use clusterwatch::collectors::power::{CPU_WATTS, MEMORY_WATTS, NODE_WATTS};
use clusterwatch::collectors::thermal::TEMPERATURE_METRIC;

// Ranges for generated readings
const CPU_WATTS_RANGE: (f64, f64) = (40.0, 260.0);
const MEMORY_WATTS_RANGE: (f64, f64) = (8.0, 45.0);
const IDLE_OVERHEAD_WATTS: f64 = 90.0;
const AIR_IN_RANGE: (f64, f64) = (18.0, 26.0);
const AIR_RISE_RANGE: (f64, f64) = (6.0, 18.0);

/// Hostnames `prefix01`, `prefix02`, ...
pub fn node_names(prefix: &str, count: u32) -> Vec<String> {
    (1..=count).map(|n| format!("{}{:02}", prefix, n)).collect()
}

fn sample<R: Rng + ?Sized>(rng: &mut R, (lo, hi): (f64, f64)) -> f64 {
    (rng.gen_range(lo..hi) * 10.0).round() / 10.0
}

/// Build a blob holding power and air temperature readings for `names`,
/// plus a CPU temperature and a fan metric the collectors must skip.
pub fn generate_stats_blob<R: Rng + ?Sized>(names: &[String], rng: &mut R) -> Value {
    let mut cpu = Map::new();
    let mut memory = Map::new();
    let mut node = Map::new();
    let mut air_in = Map::new();
    let mut air_out = Map::new();
    let mut cpu_temp = Map::new();
    let mut fans = Map::new();

    for name in names {
        let c = sample(rng, CPU_WATTS_RANGE);
        let m = sample(rng, MEMORY_WATTS_RANGE);
        cpu.insert(name.clone(), json!(c));
        memory.insert(name.clone(), json!(m));
        node.insert(
            name.clone(),
            json!(((c + m + IDLE_OVERHEAD_WATTS) * 10.0).round() / 10.0),
        );

        let inlet = sample(rng, AIR_IN_RANGE);
        air_in.insert(name.clone(), json!({ "C": inlet }));
        air_out.insert(
            name.clone(),
            json!({ "C": inlet + sample(rng, AIR_RISE_RANGE) }),
        );
        cpu_temp.insert(name.clone(), json!({ "C": sample(rng, (40.0, 85.0)) }));
        fans.insert(name.clone(), json!(rng.gen_range(4000..12000)));
    }

    let mut blob = Map::new();
    blob.insert("_timestamp".into(), json!(Utc::now().timestamp()));
    blob.insert(CPU_WATTS.into(), Value::Object(cpu));
    blob.insert(MEMORY_WATTS.into(), Value::Object(memory));
    blob.insert(NODE_WATTS.into(), Value::Object(node));
    blob.insert(
        format!("ipmi.{}=air_in,unit=C", TEMPERATURE_METRIC),
        Value::Object(air_in),
    );
    blob.insert(
        format!("ipmi.{}=air_out,unit=C", TEMPERATURE_METRIC),
        Value::Object(air_out),
    );
    blob.insert(
        format!("ipmi.{}=cpu0,unit=C", TEMPERATURE_METRIC),
        Value::Object(cpu_temp),
    );
    blob.insert("ipmi.fan_speed=fan1".into(), Value::Object(fans));
    Value::Object(blob)
}

/// Generates a synthetic stats blob file.
pub fn command_generate_testdata(
    output: PathBuf,
    nodes: u32,
    prefix: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let names = node_names(prefix, nodes);
    let blob = generate_stats_blob(&names, &mut rand::thread_rng());
    let content = serde_json::to_string_pretty(&blob)?;

    if output.to_string_lossy() == "-" {
        println!("{}", content);
    } else {
        fs::write(&output, content)?;
        info!(nodes, path = %output.display(), "Test data written");
        println!("✅ Test data written to: {}", output.display());
        println!("   Nodes: {}", names.join(","));
    }
    Ok(())
}
