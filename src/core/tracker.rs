//! Staleness detection and the group content hash.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::PathBuf;
use std::time::SystemTime;
use tracing::debug;

use crate::core::graph::{FileSet, modified_time};

/// Digest over the canonical content of a group's files in discovery order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupHash(String);

impl GroupHash {
    /// Hashes every file's content, with line endings normalized.
    ///
    /// Each file is length-prefixed so moving text across a file boundary
    /// changes the digest. Paths are not part of the input.
    pub fn compute(files: &FileSet) -> Self {
        let mut hasher = Sha256::new();
        for file in files.iter() {
            let canonical = file.content.replace("\r\n", "\n");
            hasher.update((canonical.len() as u64).to_le_bytes());
            hasher.update(canonical.as_bytes());
        }
        Self(format!("sha256:{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedFile {
    pub path: PathBuf,
    pub modified: SystemTime,
}

/// Timestamps and hash captured from one read of the group's files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub hash: GroupHash,
    pub files: Vec<TrackedFile>,
}

impl Snapshot {
    pub fn capture(files: &FileSet) -> Self {
        Self {
            hash: GroupHash::compute(files),
            files: files
                .iter()
                .map(|file| TrackedFile {
                    path: file.path.clone(),
                    modified: file.last_modified,
                })
                .collect(),
        }
    }

    /// True while every tracked file still carries its recorded timestamp.
    /// A tracked file that can no longer be read counts as changed.
    pub fn is_current(&self) -> bool {
        self.files.iter().all(|tracked| match modified_time(&tracked.path) {
            Ok(current) if current == tracked.modified => true,
            Ok(_) => {
                debug!(path = %tracked.path.display(), "tracked file modified");
                false
            }
            Err(_) => {
                debug!(path = %tracked.path.display(), "tracked file disappeared");
                false
            }
        })
    }
}

/// Remembers the snapshot taken at the last hash and compares it to disk.
#[derive(Debug, Default)]
pub struct StalenessTracker {
    baseline: Option<Snapshot>,
}

impl StalenessTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if nothing has been recorded yet, or any tracked file's timestamp
    /// differs from the recorded one.
    pub fn is_stale(&self) -> bool {
        self.baseline
            .as_ref()
            .is_none_or(|baseline| !baseline.is_current())
    }

    pub fn record(&mut self, snapshot: Snapshot) {
        self.baseline = Some(snapshot);
    }

    pub fn baseline(&self) -> Option<&Snapshot> {
        self.baseline.as_ref()
    }
}
