use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::PathBuf;

use crate::core::tracker::Snapshot;

/// What a successful generation left behind for one group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupState {
    pub snapshot: Snapshot,
    pub artifacts: Vec<PathBuf>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StateFile {
    groups: BTreeMap<String, GroupState>,
}

/// Keeps group baselines between runs so regeneration stays incremental.
pub trait StateStorage {
    fn load_state(&self, group: &str) -> Result<Option<GroupState>>;
    fn store_state(&mut self, group: &str, state: GroupState) -> Result<()>;
    fn remove_state(&mut self, group: &str) -> Result<()>;
    fn cleanup(&mut self) -> Result<()>;
}

/// Stores every group's state in a single JSON file.
pub struct FileStateStorage {
    path: PathBuf,
}

impl FileStateStorage {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn read(&self) -> Result<StateFile> {
        if !self.path.exists() {
            return Ok(StateFile::default());
        }
        let content = fs::read_to_string(&self.path).context("Failed to read build state")?;
        serde_json::from_str(&content).context("Failed to deserialize build state")
    }

    fn write(&self, state: &StateFile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).context("Failed to create build state directory")?;
        }
        let serialized =
            serde_json::to_string_pretty(state).context("Failed to serialize build state")?;
        fs::write(&self.path, serialized).context("Failed to write build state")?;
        Ok(())
    }
}

impl StateStorage for FileStateStorage {
    fn load_state(&self, group: &str) -> Result<Option<GroupState>> {
        Ok(self.read()?.groups.remove(group))
    }

    fn store_state(&mut self, group: &str, state: GroupState) -> Result<()> {
        let mut file = self.read()?;
        file.groups.insert(group.to_string(), state);
        self.write(&file)
    }

    fn remove_state(&mut self, group: &str) -> Result<()> {
        let mut file = self.read()?;
        if file.groups.remove(group).is_some() {
            self.write(&file)?;
        }
        Ok(())
    }

    fn cleanup(&mut self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path).context("Failed to remove build state")?;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStateStorage {
    states: HashMap<String, GroupState>,
}

impl MemoryStateStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStorage for MemoryStateStorage {
    fn load_state(&self, group: &str) -> Result<Option<GroupState>> {
        Ok(self.states.get(group).cloned())
    }

    fn store_state(&mut self, group: &str, state: GroupState) -> Result<()> {
        self.states.insert(group.to_string(), state);
        Ok(())
    }

    fn remove_state(&mut self, group: &str) -> Result<()> {
        self.states.remove(group);
        Ok(())
    }

    fn cleanup(&mut self) -> Result<()> {
        self.states.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tracker::{GroupHash, TrackedFile};
    use std::time::{Duration, SystemTime};
    use tempfile::tempdir;

    fn state() -> GroupState {
        let mut snapshot: Snapshot = serde_json::from_value(serde_json::json!({
            "hash": "sha256:abc",
            "files": [],
        }))
        .unwrap();
        snapshot.files.push(TrackedFile {
            path: PathBuf::from("/src/app.js"),
            modified: SystemTime::UNIX_EPOCH + Duration::from_nanos(1_234_567_890_123),
        });
        GroupState {
            snapshot,
            artifacts: vec![PathBuf::from("/out/app_dev.js")],
        }
    }

    #[test]
    fn test_file_storage_round_trip() {
        let dir = tempdir().unwrap();
        let mut storage = FileStateStorage::new(dir.path().join("out/state.json"));
        assert_eq!(storage.load_state("app").unwrap(), None);

        storage.store_state("app", state()).unwrap();
        storage.store_state("other", state()).unwrap();
        let loaded = storage.load_state("app").unwrap().unwrap();
        assert_eq!(loaded, state());
        assert_eq!(loaded.snapshot.hash, serde_json::from_str::<GroupHash>("\"sha256:abc\"").unwrap());

        storage.remove_state("app").unwrap();
        assert_eq!(storage.load_state("app").unwrap(), None);
        assert!(storage.load_state("other").unwrap().is_some());

        storage.cleanup().unwrap();
        assert!(!dir.path().join("out/state.json").exists());
    }

    #[test]
    fn test_memory_storage() {
        let mut storage = MemoryStateStorage::new();
        storage.store_state("app", state()).unwrap();
        assert_eq!(storage.load_state("app").unwrap(), Some(state()));
        storage.cleanup().unwrap();
        assert_eq!(storage.load_state("app").unwrap(), None);
    }
}
