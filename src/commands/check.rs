//! Check command implementation.
//!
//! Validates configuration, external commands and stores.

use clusterwatch::collectors::{enumerate_nodes, CommandTemplate, Family};

use crate::config::{validate_effective_config, Config};
use crate::startup_checks::{check_command, check_store};

/// Commands a family runs each cycle or at startup.
fn family_commands(family: Family, config: &Config) -> Vec<Result<CommandTemplate, String>> {
    let wrap = |r: Result<CommandTemplate, clusterwatch::CollectError>| r.map_err(|e| e.to_string());
    match family {
        Family::Power | Family::Heat => vec![
            wrap(config.node_list_template()),
            wrap(config.stats_template()),
        ],
        Family::Load => vec![wrap(config.load_template())],
    }
}

/// Validates requirements of one or all families. Returns whether every
/// check passed.
pub async fn command_check(family: Option<Family>, live: bool, config: &Config) -> bool {
    println!("🔍 clusterwatch - System Check");
    println!("==============================");

    let mut all_ok = true;

    println!("\n⚙️  Checking configuration...");
    match validate_effective_config(config) {
        Ok(_) => println!("   ✅ Configuration is valid"),
        Err(e) => {
            println!("   ❌ Configuration invalid: {}", e);
            all_ok = false;
        }
    }

    let families = match family {
        Some(f) => vec![f],
        None => vec![Family::Power, Family::Heat, Family::Load],
    };

    for family in families {
        println!("\n📊 Checking {} collector...", family.name());

        for command in family_commands(family, config) {
            match command {
                Ok(command) => match check_command(&command) {
                    Ok(()) => println!("   ✅ '{}' found", command.program()),
                    Err(e) => {
                        println!("   ❌ {}", e);
                        all_ok = false;
                    }
                },
                Err(e) => {
                    println!("   ❌ {}", e);
                    all_ok = false;
                }
            }
        }

        let db = config.db_for(family);
        match check_store(&db, family) {
            Ok(()) => println!("   ✅ Store {} ready", db.display()),
            Err(e) => {
                println!("   ❌ {}", e);
                all_ok = false;
            }
        }

        if live && family != Family::Load {
            match config.node_list_template() {
                Ok(listing) => match enumerate_nodes(&listing, config.node_naming).await {
                    Ok(registry) if registry.is_empty() => {
                        println!("   ⚠️  Node listing returned no nodes");
                    }
                    Ok(registry) => println!(
                        "   ✅ {} nodes listed: {}",
                        registry.len(),
                        registry.node_list()
                    ),
                    Err(e) => {
                        println!("   ❌ Node listing failed: {}", e);
                        all_ok = false;
                    }
                },
                Err(e) => {
                    println!("   ❌ {}", e);
                    all_ok = false;
                }
            }
        }
    }

    println!("\n📋 Summary:");
    if all_ok {
        println!("   ✅ All checks passed - collectors are ready");
    } else {
        println!("   ❌ Some checks failed - please review the output above");
    }
    all_ok
}
