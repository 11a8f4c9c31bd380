//! Chainlog storage
//!
//! This module provides the chain subsystem:
//!
//! - **block**: The immutable sample type
//! - **chain**: Append-only, mutex-guarded block sequence bound to one file
//! - **chain_set**: Named chain registry and the background flush scheduler
//! - **read_only**: Reload-and-iterate view for readers
//! - **io**: Chain file helpers (JSON array encode/decode, path naming)
//! - **error**: Error types
//!
//! # Architecture
//!
//! ```text
//! Write Path:
//!   Block → ChainSet::append → Chain (memory) → flush tick → read-merge-rewrite file
//!
//! Read Path:
//!   ChainReadOnly::refresh → read file → decode → block_stream
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use chainlog::storage::{join_scheduler, Block, Chain, ChainReadOnly, ChainSet, FlushType};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let set = Arc::new(ChainSet::new(FlushType::Time, Duration::from_secs(5)));
//!     set.register("route_a", Arc::new(Chain::open("data/route_a.json").await?)).await;
//!
//!     let scheduler = set.run();
//!     set.append("route_a", Block::new("latency", "200")).await?;
//!
//!     set.cancel();
//!     if let Some(handle) = scheduler {
//!         join_scheduler(handle).await?;
//!     }
//!     set.flush().await?;
//!
//!     let mut reader = ChainReadOnly::new("data/route_a.json");
//!     println!("{} blocks", reader.refresh().block_stream().len());
//!     Ok(())
//! }
//! ```

pub mod block;
pub mod chain;
pub mod chain_set;
pub mod error;
pub mod io;
pub mod read_only;

// Re-export commonly used types
pub use block::{Block, BLOCK_DATA_SEPARATOR, FILE_EXTENSION};
pub use chain::Chain;
pub use chain_set::{join_scheduler, ChainSet, FlushType};
pub use error::{ChainError, ChainResult};
pub use io::{chain_file_path, chain_name_from_path, chain_path_exists};
pub use read_only::ChainReadOnly;
