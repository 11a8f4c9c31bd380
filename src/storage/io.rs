//! Chain file helpers
//!
//! A chain file is a plain JSON array of blocks. There is no header,
//! checksum or version; every commit rewrites the whole file.

use crate::storage::block::{Block, FILE_EXTENSION};
use crate::storage::error::ChainResult;
use std::path::{Path, PathBuf};

/// Derive the logical chain name from its backing path
///
/// `.` becomes `___` and `/` becomes `_`. Paths that differ only in those
/// characters map to the same name.
pub fn chain_name_from_path(path: impl AsRef<Path>) -> String {
    path.as_ref()
        .to_string_lossy()
        .replace('.', "___")
        .replace('/', "_")
}

/// Path of the chain file for `route` under `data_dir`
pub fn chain_file_path(data_dir: impl AsRef<Path>, route: &str) -> PathBuf {
    data_dir.as_ref().join(format!("{}{}", route, FILE_EXTENSION))
}

/// Check whether a chain file exists at `path`
pub fn chain_path_exists(path: impl AsRef<Path>) -> bool {
    path.as_ref().exists()
}

/// Read the raw contents of a chain file
pub fn read_chain_file(path: impl AsRef<Path>) -> ChainResult<String> {
    Ok(std::fs::read_to_string(path)?)
}

/// Decode the JSON array stored in a chain file
pub fn decode_blocks(raw: &str) -> ChainResult<Vec<Block>> {
    Ok(serde_json::from_str(raw)?)
}

/// Encode blocks as a JSON array
pub fn encode_blocks(blocks: &[Block]) -> ChainResult<Vec<u8>> {
    Ok(serde_json::to_vec(blocks)?)
}

/// Overwrite the file at `path`, creating parent directories as needed
pub fn save_to_disk(path: impl AsRef<Path>, data: &[u8]) -> ChainResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }

    std::fs::write(path, data)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::error::ChainError;
    use tempfile::tempdir;

    #[test]
    fn test_chain_name_from_path() {
        assert_eq!(
            chain_name_from_path("data/route_a.json"),
            "data_route_a___json"
        );
        assert_eq!(chain_name_from_path("plain"), "plain");
    }

    #[test]
    fn test_chain_name_collision() {
        // Separator characters are not escaped, so these collide
        assert_eq!(chain_name_from_path("a/b"), chain_name_from_path("a_b"));
    }

    #[test]
    fn test_chain_file_path() {
        let path = chain_file_path("/var/lib/chainlog", "route_a");
        assert_eq!(path, PathBuf::from("/var/lib/chainlog/route_a.json"));
    }

    #[test]
    fn test_save_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("chain.json");

        assert!(!chain_path_exists(&path));
        save_to_disk(&path, b"[]").unwrap();

        assert!(chain_path_exists(&path));
        assert_eq!(read_chain_file(&path).unwrap(), "[]");
    }

    #[test]
    fn test_save_overwrites() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("chain.json");

        let blocks = vec![Block::new("latency", "1"), Block::new("latency", "2")];
        save_to_disk(&path, &encode_blocks(&blocks).unwrap()).unwrap();
        save_to_disk(&path, b"[]").unwrap();

        let restored = decode_blocks(&read_chain_file(&path).unwrap()).unwrap();
        assert!(restored.is_empty());
    }

    #[test]
    fn test_encode_decode_preserves_order() {
        let blocks: Vec<Block> = (0..5).map(|i| Block::new("seq", i.to_string())).collect();
        let bytes = encode_blocks(&blocks).unwrap();
        let restored = decode_blocks(std::str::from_utf8(&bytes).unwrap()).unwrap();

        assert_eq!(restored, blocks);
    }

    #[test]
    fn test_read_missing_file() {
        let dir = tempdir().unwrap();
        let err = read_chain_file(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, ChainError::Io(_)));
    }

    #[test]
    fn test_decode_corrupt() {
        let err = decode_blocks("[{\"datapoint\":").unwrap_err();
        assert!(matches!(err, ChainError::Serialization(_)));
    }
}
