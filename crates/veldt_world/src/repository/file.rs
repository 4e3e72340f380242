//! File-backed repository, safe to share between processes.
//!
//! ## Layout
//!
//! ```text
//! <root>/chunks/<world>/<x>_<y>.vchk      chunk records
//! <root>/nodes/<world>/<node>/<version>   node state records
//! <root>/tmp/                             staging area
//! ```
//!
//! Every record is written to a unique file under `tmp/`, synced, and then
//! published with `hard_link`. Linking fails with `AlreadyExists` if the
//! target name is taken, which makes publication an atomic
//! insert-if-absent on any POSIX filesystem: a chunk record appears
//! complete or not at all, and exactly one writer can create node state
//! version `n + 1`.
//!
//! Once version `n + 1` is published, versions below `n` are deleted, so
//! a node directory holds at most two records. A writer that stalled
//! between its version check and its link could re-create a deleted
//! name; such a link is only accepted while it is within one version of
//! the newest record, which a re-created name never is.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use veldt_procedural::ChunkCoord;
use veldt_shared::{NodeId, WorldId};

use super::{ChunkRepository, InsertOutcome};
use crate::codec::{decode_chunk, decode_node_state, encode_chunk, encode_node_state};
use crate::error::{StorageError, StorageResult};
use crate::model::{Chunk, NodeRecord, NodeState};

/// How often a node-state read retries when its record is pruned under it.
const NODE_READ_ATTEMPTS: usize = 8;

/// Repository storing one file per chunk and per node-state version.
#[derive(Debug)]
pub struct FileRepository {
    root: PathBuf,
    staging_seq: AtomicU64,
}

impl FileRepository {
    /// Opens (creating if needed) a repository rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the directory tree cannot be created.
    pub fn open(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        for dir in ["chunks", "nodes", "tmp"] {
            let path = root.join(dir);
            fs::create_dir_all(&path).map_err(|e| StorageError::io("create_dir", &path, &e))?;
        }
        Ok(Self {
            root,
            staging_seq: AtomicU64::new(0),
        })
    }

    /// Root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn chunk_path(&self, world: WorldId, coord: ChunkCoord) -> PathBuf {
        self.root
            .join("chunks")
            .join(world.to_string())
            .join(format!("{}_{}.vchk", coord.x, coord.y))
    }

    fn node_dir(&self, world: WorldId, node: NodeId) -> PathBuf {
        self.root.join("nodes").join(world.to_string()).join(node.to_string())
    }

    /// Writes `bytes` to a fresh staging file and syncs it.
    fn stage(&self, bytes: &[u8]) -> StorageResult<PathBuf> {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_or(0, |d| d.as_nanos());
        let seq = self.staging_seq.fetch_add(1, Ordering::Relaxed);
        let path = self
            .root
            .join("tmp")
            .join(format!("{}-{nanos}-{seq}.tmp", std::process::id()));

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| StorageError::io("create", &path, &e))?;
        file.write_all(bytes)
            .map_err(|e| StorageError::io("write", &path, &e))?;
        file.sync_all()
            .map_err(|e| StorageError::io("sync", &path, &e))?;
        Ok(path)
    }

    /// Publishes a staged file under `target`. Returns false if `target`
    /// already exists. The staging file is always removed.
    fn publish(&self, staged: &Path, target: &Path) -> StorageResult<bool> {
        if let Some(parent) = target.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                let _ = fs::remove_file(staged);
                return Err(StorageError::io("create_dir", parent, &e));
            }
        }
        let linked = fs::hard_link(staged, target);
        let _ = fs::remove_file(staged);
        match linked {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(StorageError::io("link", target, &e)),
        }
    }

    /// Published versions of a node, unordered. Empty if none.
    fn versions(&self, dir: &Path) -> StorageResult<Vec<u64>> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::io("read_dir", dir, &e)),
        };
        let mut versions = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StorageError::io("read_dir", dir, &e))?;
            if let Some(version) = entry.file_name().to_str().and_then(|n| n.parse::<u64>().ok()) {
                versions.push(version);
            }
        }
        Ok(versions)
    }

    /// Highest published version of a node, 0 if none.
    fn latest_version(&self, dir: &Path) -> StorageResult<u64> {
        Ok(self.versions(dir)?.into_iter().max().unwrap_or(0))
    }

    /// Deletes every version below `keep_from`.
    fn prune_versions(&self, dir: &Path, keep_from: u64) -> StorageResult<()> {
        for version in self.versions(dir)? {
            if version >= keep_from {
                continue;
            }
            let path = dir.join(version.to_string());
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(StorageError::io("remove", &path, &e)),
            }
        }
        Ok(())
    }

    /// Links a staged node state as version `expected + 1` and prunes
    /// what it supersedes. False if the name was taken, or if the link
    /// re-created a pruned name.
    fn commit_version(&self, dir: &Path, node: NodeId, expected: u64, staged: &Path) -> StorageResult<bool> {
        let next = expected + 1;
        let target = dir.join(next.to_string());
        if !self.publish(staged, &target)? {
            return Ok(false);
        }
        if self.latest_version(dir)? > next + 1 {
            let _ = fs::remove_file(&target);
            tracing::warn!("Discarded stale state version {} of node {}", next, node);
            return Ok(false);
        }
        if let Err(e) = self.prune_versions(dir, expected) {
            tracing::warn!("Could not prune node {} below version {}: {}", node, expected, e);
        }
        Ok(true)
    }
}

impl ChunkRepository for FileRepository {
    fn load_chunk(&self, world: WorldId, coord: ChunkCoord) -> StorageResult<Option<Arc<Chunk>>> {
        let path = self.chunk_path(world, coord);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::io("read", &path, &e)),
        };
        let chunk = decode_chunk(&bytes).map_err(|e| {
            tracing::warn!("Corrupt chunk record at {}: {}", path.display(), e);
            e
        })?;
        if chunk.world_id != world || chunk.coord() != coord {
            return Err(StorageError::corrupt(
                path.display().to_string(),
                "record key does not match its path",
            ));
        }
        Ok(Some(Arc::new(chunk)))
    }

    fn insert_chunk_if_absent(&self, chunk: &Chunk) -> StorageResult<InsertOutcome> {
        let target = self.chunk_path(chunk.world_id, chunk.coord());
        let staged = self.stage(&encode_chunk(chunk))?;
        if self.publish(&staged, &target)? {
            Ok(InsertOutcome::Inserted)
        } else {
            Ok(InsertOutcome::AlreadyExists)
        }
    }

    fn node_state(&self, world: WorldId, node: NodeId) -> StorageResult<NodeRecord> {
        let dir = self.node_dir(world, node);
        for _ in 0..NODE_READ_ATTEMPTS {
            let version = self.latest_version(&dir)?;
            if version == 0 {
                return Ok(NodeRecord::default());
            }
            let path = dir.join(version.to_string());
            match fs::read(&path) {
                Ok(bytes) => {
                    return Ok(NodeRecord {
                        version,
                        state: decode_node_state(&bytes)?,
                    })
                }
                // Pruned by a newer writer between listing and reading.
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(StorageError::io("read", &path, &e)),
            }
        }
        Err(StorageError::io(
            "read",
            &dir,
            &std::io::Error::new(ErrorKind::Interrupted, "node state kept changing while being read"),
        ))
    }

    fn compare_and_swap_node(
        &self,
        world: WorldId,
        node: NodeId,
        expected_version: u64,
        state: NodeState,
    ) -> StorageResult<bool> {
        let dir = self.node_dir(world, node);
        if self.latest_version(&dir)? != expected_version {
            return Ok(false);
        }
        let staged = self.stage(&encode_node_state(state))?;
        self.commit_version(&dir, node, expected_version, &staged)
    }
}
