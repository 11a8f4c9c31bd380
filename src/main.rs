//! Chainlog demo host
//!
//! Simulates a benchmarking run: one producer task per route records request
//! latencies while the chain scheduler flushes them to disk, then the chains
//! are read back through the read-only path.
//!
//! `CHAINLOG_CONFIG` points at a TOML config file; otherwise the default
//! config locations are searched, with `CHAINLOG_*` environment overrides.

use chainlog::config::Config;
use chainlog::storage::*;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

const ROUTES: [&str; 3] = ["api_users", "api_orders", "health"];
const SAMPLES_PER_ROUTE: usize = 50;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match std::env::var("CHAINLOG_CONFIG") {
        Ok(path) => Config::load_with_env(Path::new(&path))?,
        Err(_) => Config::load_default(),
    };
    chainlog::logging::init(&config.logging);

    tracing::info!("Chainlog v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Data directory: {:?}", config.storage.data_dir);

    let set = Arc::new(ChainSet::from_config(&config.storage));

    // Register one chain per route, keyed by the name derived from its path
    let mut names = Vec::new();
    for route in ROUTES {
        let chain = Chain::open(chain_file_path(config.storage.data_path(), route)).await?;
        let name = chain.name().to_string();
        set.register(name.clone(), Arc::new(chain)).await;
        names.push(name);
    }

    let scheduler = set.run();
    if scheduler.is_none() {
        tracing::warn!(
            "No scheduler for flush type {}, blocks are persisted at shutdown only",
            set.flush_type()
        );
    }

    // Producers
    let mut producers = Vec::new();
    for name in names.clone() {
        let set = Arc::clone(&set);
        producers.push(tokio::spawn(async move {
            record_latencies(&set, &name).await
        }));
    }
    for producer in producers {
        producer.await??;
    }

    // Shutdown
    tracing::info!("Shutting down...");
    set.cancel();
    if let Some(handle) = scheduler {
        join_scheduler(handle).await?;
    }
    let remaining = set.flush().await?;
    tracing::info!("Final flush wrote {} blocks", remaining);

    report(&set, &names).await;

    tracing::info!("Chainlog shutdown complete");
    Ok(())
}

/// Append simulated `status|latency_ms` samples for one route
async fn record_latencies(set: &ChainSet, name: &str) -> ChainResult<()> {
    for _ in 0..SAMPLES_PER_ROUTE {
        let latency_ms = 5.0 + 300.0 * rand_simple();
        let status = if rand_simple() < 0.95 { "200" } else { "500" };

        let latency = format!("{:.2}", latency_ms);
        set.append(name, Block::composite("latency", [status, latency.as_str()]))
            .await?;

        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    Ok(())
}

/// Read every chain back from disk and summarize it
async fn report(set: &ChainSet, names: &[String]) {
    for name in names {
        let Some(chain) = set.get(name).await else {
            continue;
        };

        let mut reader = ChainReadOnly::new(chain.path());
        let blocks = reader.refresh().block_stream();

        let latencies: Vec<f64> = blocks
            .iter()
            .filter(|b| b.block_type() == "latency")
            .filter_map(|b| b.fields().get(1).and_then(|v| v.parse().ok()))
            .collect();

        if latencies.is_empty() {
            tracing::info!("{}: no samples", name);
            continue;
        }

        let avg = latencies.iter().sum::<f64>() / latencies.len() as f64;
        let max = latencies.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        tracing::info!(
            "{}: {} samples on disk, avg={:.1}ms, max={:.1}ms",
            name,
            blocks.len(),
            avg,
            max
        );
    }
}

/// Simple random number generator (0.0 to 1.0)
fn rand_simple() -> f64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    (nanos % 1000) as f64 / 1000.0
}
