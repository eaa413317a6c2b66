//! On-disk JSON persistence for [`ProtoBlock`], spec §6.6.
//!
//! Two formats are understood on read: a legacy single-object format, and
//! the versioned wrapper this implementation always writes. Writes are
//! append-only -- each save appends a snapshot to `versions` rather than
//! overwriting, so cyclic in-memory references between a block and its
//! prior versions never arise (REDESIGN FLAG, spec §9).

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{OrchestratorError, Result};
use crate::models::ProtoBlock;

/// One snapshot inside a versioned protoblock file.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct VersionedSnapshot {
    #[serde(flatten)]
    block: ProtoBlock,
    timestamp: DateTime<Utc>,
}

/// The on-disk shape written for every save after the first.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct VersionedFile {
    block_id: String,
    versions: Vec<VersionedSnapshot>,
}

fn protoblock_path(dir: &Path, block_id: &str) -> PathBuf {
    dir.join(format!(".tac_protoblock_{block_id}.json"))
}

/// Save `block` to `dir`, appending to the versioned wrapper (creating it
/// on first save, carrying forward any prior versions already on disk).
pub fn save(dir: &Path, block: &ProtoBlock) -> Result<()> {
    let path = protoblock_path(dir, &block.block_id);

    let mut file = if path.exists() {
        read_versioned_file(&path)?
    } else {
        VersionedFile { block_id: block.block_id.clone(), versions: Vec::new() }
    };

    file.versions.push(VersionedSnapshot { block: block.clone(), timestamp: Utc::now() });

    let json = serde_json::to_string_pretty(&file)
        .map_err(|e| OrchestratorError::persistence(format!("failed to serialise protoblock: {e}")))?;
    std::fs::write(&path, json)
        .map_err(|e| OrchestratorError::persistence(format!("failed to write {}: {e}", path.display())))?;
    Ok(())
}

/// Load the latest version of the protoblock identified by `block_id` from
/// `dir`, supporting both the legacy single-object format and the
/// versioned wrapper.
pub fn load(dir: &Path, block_id: &str) -> Result<ProtoBlock> {
    let path = protoblock_path(dir, block_id);
    let raw = std::fs::read_to_string(&path)
        .map_err(|e| OrchestratorError::persistence(format!("failed to read {}: {e}", path.display())))?;

    if let Ok(versioned) = serde_json::from_str::<VersionedFile>(&raw) {
        if !versioned.versions.is_empty() {
            return Ok(versioned.versions.last().unwrap().block.clone());
        }
    }

    serde_json::from_str::<ProtoBlock>(&raw)
        .map_err(|e| OrchestratorError::persistence(format!("unrecognised protoblock format in {}: {e}", path.display())))
}

fn read_versioned_file(path: &Path) -> Result<VersionedFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| OrchestratorError::persistence(format!("failed to read {}: {e}", path.display())))?;

    if let Ok(versioned) = serde_json::from_str::<VersionedFile>(&raw) {
        return Ok(versioned);
    }

    // Legacy single-object file: wrap it as the first version so the
    // append-only invariant holds from here on.
    let legacy: ProtoBlock = serde_json::from_str(&raw)
        .map_err(|e| OrchestratorError::persistence(format!("unrecognised protoblock format in {}: {e}", path.display())))?;
    Ok(VersionedFile {
        block_id: legacy.block_id.clone(),
        versions: vec![VersionedSnapshot { block: legacy, timestamp: Utc::now() }],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn sample_block(block_id: &str) -> ProtoBlock {
        ProtoBlock::new(
            block_id.to_string(),
            "add is_even".to_string(),
            vec!["mathutils.py".to_string()],
            vec![],
            "tac: add is_even".to_string(),
            "tac/feature/is-even".to_string(),
            vec!["pytest".to_string()],
            HashMap::new(),
            None,
            1,
        )
        .unwrap()
    }

    #[test]
    fn test_round_trip_is_stable_up_to_timestamps() {
        let dir = tempfile::tempdir().unwrap();
        let block = sample_block("blk0001");
        save(dir.path(), &block).unwrap();
        let loaded = load(dir.path(), "blk0001").unwrap();
        assert_eq!(loaded, block);
    }

    #[test]
    fn test_save_appends_versions_across_retries() {
        let dir = tempfile::tempdir().unwrap();
        let attempt1 = sample_block("blk0001");
        save(dir.path(), &attempt1).unwrap();

        let mut attempt2 = sample_block("blk0001");
        attempt2.attempt_number = 2;
        save(dir.path(), &attempt2).unwrap();

        let path = protoblock_path(dir.path(), "blk0001");
        let file = read_versioned_file(&path).unwrap();
        assert_eq!(file.versions.len(), 2);
        assert_eq!(file.versions.last().unwrap().block.attempt_number, 2);

        let loaded = load(dir.path(), "blk0001").unwrap();
        assert_eq!(loaded.attempt_number, 2);
    }

    #[test]
    fn test_reads_legacy_single_object_format() {
        let dir = tempfile::tempdir().unwrap();
        let block = sample_block("blk0002");
        let path = protoblock_path(dir.path(), "blk0002");
        std::fs::write(&path, serde_json::to_string(&block).unwrap()).unwrap();

        let loaded = load(dir.path(), "blk0002").unwrap();
        assert_eq!(loaded, block);
    }
}
