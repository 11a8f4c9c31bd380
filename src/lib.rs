//! # Chainlog
//!
//! Embedded append-only time-series log. Each logical stream (for example
//! one benchmarked route) is a chain of timestamped blocks kept in memory and
//! periodically flushed to a JSON file by a background scheduler, without a
//! database dependency.
//!
//! ## Modules
//!
//! - [`storage`]: Blocks, chains, the chain set and its flush scheduler
//! - [`config`]: TOML and environment configuration
//! - [`logging`]: Tracing subscriber setup for the binaries
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chainlog::storage::*;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let set = Arc::new(ChainSet::new(FlushType::Time, Duration::from_secs(5)));
//!
//!     // One chain per route
//!     let path = chain_file_path("chainlog_data", "route_a");
//!     set.register("route_a", Arc::new(Chain::open(path).await?)).await;
//!
//!     // Flush in the background
//!     let scheduler = set.run();
//!
//!     set.append("route_a", Block::composite("latency", ["GET", "200", "12"])).await?;
//!
//!     // Stop the scheduler and persist whatever is left
//!     set.cancel();
//!     if let Some(handle) = scheduler {
//!         join_scheduler(handle).await?;
//!     }
//!     set.flush().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod logging;
pub mod storage;

// Re-export top-level types for convenience
pub use storage::{
    Block, Chain, ChainError, ChainReadOnly, ChainResult, ChainSet, FlushType,
    BLOCK_DATA_SEPARATOR, FILE_EXTENSION,
};

pub use config::{Config, ConfigError, LoggingConfig, StorageConfig};
