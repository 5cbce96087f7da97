//! millcache: operator tool for the response cache.
//!
//! `config` validates a configuration file and prints the effective tier
//! settings; `simulate` drives a synthetic dashboard workload through a
//! cache built from that configuration and prints the resulting stats.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde_json::{Value, json};
use tracing::info;
use tracing_subscriber::EnvFilter;

use millcache::{Config, DomainEvent, ResponseCache, Tier};

/// Operator tool for the millcache response cache.
#[derive(Parser)]
#[command(name = "millcache")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Inspect and exercise the dashboard response cache")]
struct Args {
    /// Path to configuration file.
    #[arg(short, long, global = true, env = "MILLCACHE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate the configuration and print effective tier settings.
    Config,
    /// Run a synthetic workload and print the stats snapshot.
    Simulate {
        /// Number of calls to issue.
        #[arg(long, default_value_t = 1_000)]
        requests: usize,
        /// Number of distinct parameter sets per operation.
        #[arg(long, default_value_t = 50)]
        keys: usize,
        /// Issue a forced refresh every N calls (0 disables).
        #[arg(long, default_value_t = 100)]
        refresh_every: usize,
    },
}

/// Synthetic read operations, one per tier.
const OPERATIONS: &[(&str, Tier)] = &[
    ("oee_query", Tier::Live),
    ("alert_check", Tier::Live),
    ("recommendations", Tier::Daily),
    ("line_comparison", Tier::Daily),
    ("equipment_catalogue", Tier::Static),
    ("memory_recall", Tier::None),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = Config::load(args.config.as_deref())?;
    config.cache.validate()?;

    match args.command {
        Command::Config => print_settings(&config),
        Command::Simulate {
            requests,
            keys,
            refresh_every,
        } => simulate(config, requests, keys.max(1), refresh_every).await?,
    }
    Ok(())
}

fn print_settings(config: &Config) {
    let tiers: serde_json::Map<String, Value> = Tier::ALL
        .iter()
        .map(|tier| {
            let settings = config.cache.settings_for(*tier);
            (
                tier.to_string(),
                json!({
                    "ttl_secs": settings.ttl.as_secs(),
                    "max_entries": settings.max_entries,
                }),
            )
        })
        .collect();
    let report = json!({
        "enabled": config.cache.enabled,
        "tiers": tiers,
    });
    println!("{report:#}");
}

async fn simulate(
    config: Config,
    requests: usize,
    keys: usize,
    refresh_every: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let cache: ResponseCache = ResponseCache::new(config.cache)?;
    info!(requests, keys, "starting synthetic workload");

    for i in 0..requests {
        let (operation, tier) = OPERATIONS[i % OPERATIONS.len()];
        let slot = (i * 7919) % keys;
        let params = json!({"line_id": format!("L{}", slot % 8), "slot": slot});
        let caller = format!("user{}", slot % 5);
        let force_refresh = refresh_every > 0 && i > 0 && i % refresh_every == 0;

        cache
            .get_or_fetch(operation, tier, Some(caller.as_str()), &params, force_refresh, || async {
                tokio::time::sleep(Duration::from_micros(50)).await;
                Ok::<Value, std::convert::Infallible>(json!({
                    "operation": operation,
                    "slot": slot,
                }))
            })
            .await?;

        if i > 0 && i % (requests / 4).max(1) == 0 {
            let removed = cache.on_event(&DomainEvent::SafetyIncidentRecorded);
            info!(removed, "simulated safety incident");
        }
    }

    println!("{:#}", serde_json::to_value(cache.stats())?);
    Ok(())
}
