use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use crate::core::error::{BundleError, BundleResult};

/// Looks up named resources (runtime shims, framework files) for builders.
///
/// `Ok(None)` means the resource does not exist; errors are reserved for
/// resources that exist but cannot be read.
pub trait ResourceLoader: Send + Sync {
    fn load(&self, resource_id: &str) -> BundleResult<Option<String>>;
}

/// Resolves resource ids as paths below a root directory.
pub struct DirResourceLoader {
    root: PathBuf,
}

impl DirResourceLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ResourceLoader for DirResourceLoader {
    fn load(&self, resource_id: &str) -> BundleResult<Option<String>> {
        let path = self.root.join(resource_id.trim_start_matches('/'));
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(BundleError::io(path, e)),
        }
    }
}

/// Resources held in memory, keyed by id.
#[derive(Default)]
pub struct MemoryResourceLoader {
    resources: HashMap<String, String>,
}

impl MemoryResourceLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, resource_id: impl Into<String>, content: impl Into<String>) {
        self.resources.insert(resource_id.into(), content.into());
    }

    pub fn with(mut self, resource_id: impl Into<String>, content: impl Into<String>) -> Self {
        self.insert(resource_id, content);
        self
    }
}

impl ResourceLoader for MemoryResourceLoader {
    fn load(&self, resource_id: &str) -> BundleResult<Option<String>> {
        Ok(self.resources.get(resource_id).cloned())
    }
}
