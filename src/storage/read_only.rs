//! Read-only view over a chain file
//!
//! Readers reload the committed snapshot independently of the write path.
//! Blocks still sitting in a [`Chain`](crate::storage::Chain)'s memory are
//! not visible here until the next commit.

use crate::storage::block::Block;
use crate::storage::io::{decode_blocks, read_chain_file};
use std::path::{Path, PathBuf};

/// Snapshot of the blocks persisted in one chain file
#[derive(Debug, Clone)]
pub struct ChainReadOnly {
    path: PathBuf,
    blocks: Vec<Block>,
}

impl ChainReadOnly {
    /// Create an empty view; call [`refresh`](Self::refresh) to load it
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            blocks: Vec::new(),
        }
    }

    /// Reload the blocks from disk
    ///
    /// Failures are logged and leave the previous snapshot in place.
    pub fn refresh(&mut self) -> &mut Self {
        let raw = match read_chain_file(&self.path) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!("error reading the chain {:?}: {}", self.path, e);
                return self;
            }
        };

        match decode_blocks(&raw) {
            Ok(blocks) => self.blocks = blocks,
            Err(e) => tracing::error!("error decoding the chain {:?}: {}", self.path, e),
        }
        self
    }

    /// Blocks loaded by the last successful refresh
    pub fn block_stream(&self) -> &[Block] {
        &self.blocks
    }

    /// Get the chain file path
    pub fn path(&self) -> &Path {
        &self.path
    }
}
