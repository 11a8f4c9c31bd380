//! Chain: append-only block sequence bound to one chain file
//!
//! Appended blocks live in memory until the flush scheduler commits them.
//! A commit is a full read-merge-rewrite of the backing file:
//!
//! ```text
//! file blocks ++ in-memory blocks → encode → overwrite file → clear memory
//! ```
//!
//! All mutable state sits behind one async mutex, so at most one append or
//! commit is in flight per chain.

use crate::storage::block::Block;
use crate::storage::error::ChainResult;
use crate::storage::io::{
    chain_name_from_path, decode_blocks, encode_blocks, read_chain_file, save_to_disk,
};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Mutable part of a chain, guarded by the chain's mutex
#[derive(Debug)]
struct ChainState {
    /// Blocks not yet committed
    blocks: Vec<Block>,
    /// Cached `blocks.len()`
    length_elements: usize,
    /// True while appended blocks have not been committed
    contains_new_blocks: bool,
    /// Consecutive flush ticks without new blocks
    inactive_iterations: u32,
}

/// An append-only chain of blocks backed by a JSON file
#[derive(Debug)]
pub struct Chain {
    path: PathBuf,
    name: String,
    state: Mutex<ChainState>,
}

impl Chain {
    /// Create an empty in-memory chain for `path`
    ///
    /// The chain starts dirty so the first flush tick touches its file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            name: chain_name_from_path(&path),
            path,
            state: Mutex::new(ChainState {
                blocks: Vec::new(),
                length_elements: 0,
                contains_new_blocks: true,
                inactive_iterations: 0,
            }),
        }
    }

    /// Create and initialize a chain in one step
    pub async fn open(path: impl Into<PathBuf>) -> ChainResult<Self> {
        let chain = Self::new(path);
        chain.init().await?;
        Ok(chain)
    }

    /// Make sure the backing file exists
    ///
    /// A missing file is created holding an empty array. Existing contents
    /// are left on disk and are not loaded into memory; use
    /// [`ChainReadOnly`](crate::storage::ChainReadOnly) to read them.
    /// Any read failure other than a missing file is returned and the file
    /// is left untouched.
    pub async fn init(&self) -> ChainResult<()> {
        let mut state = self.state.lock().await;

        match std::fs::read(&self.path) {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!("creating in-memory chain: {}", self.name);
                save_to_disk(&self.path, b"[]")?;
            }
            Err(e) => return Err(e.into()),
        }

        state.blocks = Vec::new();
        state.length_elements = 0;
        Ok(())
    }

    /// Append a block to the in-memory sequence
    pub async fn append(&self, block: Block) {
        let mut state = self.state.lock().await;

        state.blocks.push(block);
        state.length_elements = state.blocks.len();
        state.contains_new_blocks = true;
        state.inactive_iterations = 0;
    }

    /// Merge in-memory blocks into the backing file and clear memory
    ///
    /// Returns the number of blocks written by this commit. On error the
    /// in-memory blocks stay in place and the chain stays dirty.
    pub(crate) async fn commit(&self) -> ChainResult<usize> {
        let mut state = self.state.lock().await;

        let raw = read_chain_file(&self.path)?;
        let mut merged = decode_blocks(&raw)?;
        let existing = merged.len();
        merged.extend(state.blocks.iter().cloned());

        save_to_disk(&self.path, &encode_blocks(&merged)?)?;

        let committed = state.blocks.len();
        tracing::debug!(
            "Committed {} blocks to chain {} ({} total)",
            committed,
            self.name,
            existing + committed
        );

        state.blocks = Vec::new();
        state.length_elements = 0;
        state.contains_new_blocks = false;
        Ok(committed)
    }

    /// Record one flush tick without new blocks
    ///
    /// Nothing reads the counter for eviction yet.
    pub(crate) async fn mark_inactive(&self) {
        let mut state = self.state.lock().await;
        state.inactive_iterations = state.inactive_iterations.saturating_add(1);
    }

    /// Get the backing file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the chain name derived from the path
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of uncommitted blocks
    pub async fn len(&self) -> usize {
        self.state.lock().await.length_elements
    }

    /// Check if there are no uncommitted blocks
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Check if the chain has blocks waiting for a commit
    pub async fn is_dirty(&self) -> bool {
        self.state.lock().await.contains_new_blocks
    }

    /// Consecutive flush ticks that found no new blocks
    pub async fn inactive_iterations(&self) -> u32 {
        self.state.lock().await.inactive_iterations
    }

    /// Copy of the uncommitted blocks
    pub async fn blocks(&self) -> Vec<Block> {
        self.state.lock().await.blocks.clone()
    }
}
