//! Discovery of the files that make up a group.
//!
//! Starting from the start file, every include marker is resolved against the
//! group's base directory and followed depth-first, in the order the markers
//! appear in the text. A file already in the set is never read again, which
//! both deduplicates and breaks include cycles.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, trace};

use crate::builders::directives::{DirectiveMarker, DirectiveRegistry, include_target};
use crate::core::error::{BundleError, BundleResult};

/// One JavaScript source file as read for a single discovery pass.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Canonical absolute path; the file's identity within a group.
    pub path: PathBuf,
    pub content: String,
    pub last_modified: SystemTime,
    pub markers: Vec<DirectiveMarker>,
    /// Resolved include targets keyed by the 1-based line of their marker.
    pub includes: BTreeMap<usize, PathBuf>,
}

/// The files of a group in discovery order, unique by path.
#[derive(Debug, Clone, Default)]
pub struct FileSet {
    files: Vec<SourceFile>,
    index: HashMap<PathBuf, usize>,
}

impl FileSet {
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.index.contains_key(path)
    }

    pub fn get(&self, path: &Path) -> Option<&SourceFile> {
        self.index.get(path).map(|&i| &self.files[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &SourceFile> {
        self.files.iter()
    }

    /// The start file; `None` only for an empty set.
    pub fn start(&self) -> Option<&SourceFile> {
        self.files.first()
    }

    fn insert(&mut self, file: SourceFile) {
        self.index.insert(file.path.clone(), self.files.len());
        self.files.push(file);
    }
}

/// Resolves `path` to a canonical regular file.
pub fn resolve_file(path: &Path) -> BundleResult<PathBuf> {
    let metadata = fs::metadata(path).map_err(|e| {
        debug!(path = %path.display(), error = %e, "cannot stat file");
        BundleError::FileResolution {
            path: path.to_path_buf(),
        }
    })?;
    if !metadata.is_file() {
        return Err(BundleError::FileResolution {
            path: path.to_path_buf(),
        });
    }
    fs::canonicalize(path).map_err(|e| {
        debug!(path = %path.display(), error = %e, "cannot canonicalize file");
        BundleError::FileResolution {
            path: path.to_path_buf(),
        }
    })
}

/// Current modification time of a tracked file.
pub fn modified_time(path: &Path) -> BundleResult<SystemTime> {
    fs::metadata(path)
        .and_then(|metadata| metadata.modified())
        .map_err(|e| {
            debug!(path = %path.display(), error = %e, "cannot read modification time");
            BundleError::FileResolution {
                path: path.to_path_buf(),
            }
        })
}

pub struct GraphBuilder<'a> {
    base_dir: &'a Path,
    registry: &'a DirectiveRegistry,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(base_dir: &'a Path, registry: &'a DirectiveRegistry) -> Self {
        Self { base_dir, registry }
    }

    /// Builds the file set reachable from `start_file`.
    pub fn build(&self, start_file: &Path) -> BundleResult<FileSet> {
        let start = resolve_file(start_file)?;
        let mut files = FileSet::default();
        self.visit(&start, &mut files)?;
        debug!(files = files.len(), start = %start.display(), "discovered group files");
        Ok(files)
    }

    fn visit(&self, path: &Path, files: &mut FileSet) -> BundleResult<()> {
        if files.contains(path) {
            trace!(path = %path.display(), "already in group");
            return Ok(());
        }

        let file = self.read(path)?;
        let targets: Vec<PathBuf> = file.includes.values().cloned().collect();
        files.insert(file);

        for target in targets {
            self.visit(&target, files)?;
        }
        Ok(())
    }

    fn read(&self, path: &Path) -> BundleResult<SourceFile> {
        let last_modified = modified_time(path)?;
        let content = fs::read_to_string(path).map_err(|e| {
            debug!(path = %path.display(), error = %e, "cannot read source");
            BundleError::FileResolution {
                path: path.to_path_buf(),
            }
        })?;
        let markers = self.registry.scan(&content);

        let mut includes = BTreeMap::new();
        for marker in markers.iter().filter(|m| self.registry.is_include(m)) {
            let target = include_target(&marker.options).ok_or_else(|| {
                BundleError::MalformedDirective {
                    file: path.to_path_buf(),
                    line: marker.line,
                    message: "include directive requires a target".to_string(),
                }
            })?;
            let resolved = resolve_file(&self.base_dir.join(target))?;
            trace!(from = %path.display(), to = %resolved.display(), "include");
            includes.insert(marker.line, resolved);
        }

        Ok(SourceFile {
            path: path.to_path_buf(),
            content,
            last_modified,
            markers,
            includes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::directives::DirectiveType;
    use tempfile::tempdir;

    fn registry() -> DirectiveRegistry {
        DirectiveRegistry::with_defaults(vec![DirectiveType::include(), DirectiveType::mock()]).unwrap()
    }

    fn names(files: &FileSet) -> Vec<String> {
        files
            .iter()
            .map(|f| f.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_depth_first_discovery_order() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("main.js"), "// #include a\n// #include c\nmain();\n").unwrap();
        fs::write(dir.path().join("a.js"), "// #include b\na();\n").unwrap();
        fs::write(dir.path().join("b.js"), "b();\n").unwrap();
        fs::write(dir.path().join("c.js"), "// #include b\nc();\n").unwrap();

        let registry = registry();
        let files = GraphBuilder::new(dir.path(), &registry)
            .build(&dir.path().join("main.js"))
            .unwrap();
        assert_eq!(names(&files), vec!["main.js", "a.js", "b.js", "c.js"]);
    }

    #[test]
    fn test_cycles_are_broken() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.js"), "// #include b\n").unwrap();
        fs::write(dir.path().join("b.js"), "// #include a\n").unwrap();

        let registry = registry();
        let files = GraphBuilder::new(dir.path(), &registry)
            .build(&dir.path().join("a.js"))
            .unwrap();
        assert_eq!(names(&files), vec!["a.js", "b.js"]);
    }

    #[test]
    fn test_nested_dotted_include() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("util")).unwrap();
        fs::write(dir.path().join("main.js"), "// #include util.Json\n").unwrap();
        fs::write(dir.path().join("util/Json.js"), "json();\n").unwrap();

        let registry = registry();
        let files = GraphBuilder::new(dir.path(), &registry)
            .build(&dir.path().join("main.js"))
            .unwrap();
        assert_eq!(files.len(), 2);
        let start = files.start().unwrap();
        assert_eq!(start.includes.len(), 1);
        assert!(start.includes[&1].ends_with("util/Json.js"));
    }

    #[test]
    fn test_missing_include_target_fails() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("main.js"), "// #include missing\n").unwrap();

        let registry = registry();
        let err = GraphBuilder::new(dir.path(), &registry)
            .build(&dir.path().join("main.js"))
            .unwrap_err();
        assert!(matches!(err, BundleError::FileResolution { .. }));
    }

    #[test]
    fn test_directory_start_file_fails() {
        let dir = tempdir().unwrap();
        let registry = registry();
        let err = GraphBuilder::new(dir.path(), &registry)
            .build(dir.path())
            .unwrap_err();
        assert!(matches!(err, BundleError::FileResolution { .. }));
    }

    #[test]
    fn test_includes_ignored_when_not_registered() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("main.js"), "// #include missing\n").unwrap();

        let registry = DirectiveRegistry::with_defaults(vec![DirectiveType::mock()]).unwrap();
        let files = GraphBuilder::new(dir.path(), &registry)
            .build(&dir.path().join("main.js"))
            .unwrap();
        assert_eq!(files.len(), 1);
    }
}
