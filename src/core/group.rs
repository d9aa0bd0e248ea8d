use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info};

use crate::builders::directives::{DirectiveRegistry, DirectiveType};
use crate::builders::evaluator::DirectiveEvaluator;
use crate::builders::javascript::{JavascriptBuilder, run_pipeline};
use crate::core::error::{BundleError, BundleResult};
use crate::core::graph::{FileSet, GraphBuilder, resolve_file};
use crate::core::mode::GenerationMode;
use crate::core::tracker::{GroupHash, Snapshot, StalenessTracker};

/// Directive-evaluated text per mode, tied to the files it was built from.
#[derive(Debug)]
struct ParseCache {
    version: u64,
    merged: BTreeMap<GenerationMode, String>,
    snapshot: Snapshot,
}

/// A bundle target: every file reachable from a start file through include
/// directives, compiled into one output per requested mode.
///
/// A group owns mutable caches (parsed text, recorded timestamps), so a
/// single instance must not be driven from several threads at once.
pub struct JavascriptGroup {
    name: String,
    base_dir: PathBuf,
    start_file: PathBuf,
    registry: DirectiveRegistry,
    modes: BTreeSet<GenerationMode>,
    builders: Vec<Box<dyn JavascriptBuilder>>,
    tracker: StalenessTracker,
    files: FileSet,
    cache: Option<ParseCache>,
    next_version: u64,
}

impl JavascriptGroup {
    /// Creates a group using the default marker syntax.
    ///
    /// Fails with a file resolution error unless `base_dir/start_file` is a
    /// readable regular file.
    pub fn new(
        name: impl Into<String>,
        base_dir: impl AsRef<Path>,
        start_file: impl AsRef<Path>,
        directives: Vec<DirectiveType>,
        modes: impl IntoIterator<Item = GenerationMode>,
    ) -> BundleResult<Self> {
        let registry = DirectiveRegistry::with_defaults(directives)?;
        Self::with_registry(name, base_dir, start_file, registry, modes)
    }

    pub fn with_registry(
        name: impl Into<String>,
        base_dir: impl AsRef<Path>,
        start_file: impl AsRef<Path>,
        registry: DirectiveRegistry,
        modes: impl IntoIterator<Item = GenerationMode>,
    ) -> BundleResult<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let start_file = resolve_file(&base_dir.join(start_file.as_ref()))?;

        Ok(Self {
            name: name.into(),
            base_dir,
            start_file,
            registry,
            modes: modes.into_iter().collect(),
            builders: Vec::new(),
            tracker: StalenessTracker::new(),
            files: FileSet::default(),
            cache: None,
            next_version: 1,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn start_file(&self) -> &Path {
        &self.start_file
    }

    pub fn modes(&self) -> impl Iterator<Item = GenerationMode> + '_ {
        self.modes.iter().copied()
    }

    pub fn registry(&self) -> &DirectiveRegistry {
        &self.registry
    }

    /// Files found by the last discovery, in discovery order.
    pub fn files(&self) -> &FileSet {
        &self.files
    }

    /// Newest modification time among the files of the last discovery.
    pub fn last_modified(&self) -> Option<SystemTime> {
        self.files.iter().map(|file| file.last_modified).max()
    }

    pub fn set_builders(&mut self, builders: Vec<Box<dyn JavascriptBuilder>>) {
        self.builders = builders;
    }

    pub fn add_builder(&mut self, builder: Box<dyn JavascriptBuilder>) {
        self.builders.push(builder);
    }

    pub fn builder_names(&self) -> Vec<&str> {
        self.builders.iter().map(|builder| builder.name()).collect()
    }

    /// Whether any tracked file changed since the last recorded hash. A group
    /// that has never been hashed is stale.
    ///
    /// Only files reachable through includes are tracked: a new file that no
    /// tracked file includes does not make the group stale.
    pub fn is_stale(&self) -> bool {
        self.tracker.is_stale()
    }

    /// Returns the group hash, rediscovering and rehashing the files when the
    /// group is stale, and records the timestamps it used.
    pub fn group_hash(&mut self) -> BundleResult<GroupHash> {
        if !self.tracker.is_stale()
            && let Some(baseline) = self.tracker.baseline()
        {
            return Ok(baseline.hash.clone());
        }

        let files = self.discover()?;
        let snapshot = Snapshot::capture(&files);
        let hash = snapshot.hash.clone();
        self.replace_files(files, &snapshot);
        self.tracker.record(snapshot);
        debug!(group = %self.name, %hash, "hashed group");
        Ok(hash)
    }

    /// The recorded baseline, for persisting between runs.
    pub fn baseline(&self) -> Option<&Snapshot> {
        self.tracker.baseline()
    }

    pub fn restore_baseline(&mut self, snapshot: Snapshot) {
        self.tracker.record(snapshot);
    }

    /// Rediscovers the files and evaluates directives for every requested mode.
    ///
    /// Nothing is cached unless every mode evaluates; staleness is untouched.
    pub fn parse(&mut self) -> BundleResult<()> {
        let files = self.discover()?;
        let merged = self.evaluate_all(&files)?;

        let version = self.next_version;
        self.next_version += 1;
        self.cache = Some(ParseCache {
            version,
            merged,
            snapshot: Snapshot::capture(&files),
        });
        self.files = files;
        debug!(group = %self.name, version, "parsed group");
        Ok(())
    }

    /// Version of the current parse cache, if any.
    pub fn cache_version(&self) -> Option<u64> {
        self.cache.as_ref().map(|cache| cache.version)
    }

    /// Directive-evaluated text for `mode` from the last parse.
    pub fn merged_text(&self, mode: GenerationMode) -> Option<&str> {
        self.cache
            .as_ref()
            .and_then(|cache| cache.merged.get(&mode))
            .map(String::as_str)
    }

    /// Writes the artifacts of every requested mode when `force` is set or the
    /// group is stale. Parses first if nothing is cached or the cached text was
    /// built from files that changed since. Returns the files written.
    pub fn generate(&mut self, output_dir: &Path, force: bool) -> BundleResult<Vec<PathBuf>> {
        if !force && !self.is_stale() {
            debug!(group = %self.name, "up to date, skipping generation");
            return Ok(Vec::new());
        }
        let outdated = self
            .cache
            .as_ref()
            .is_some_and(|cache| !cache.snapshot.is_current());
        if outdated {
            debug!(group = %self.name, "sources changed since parse, dropping parse cache");
            self.cache = None;
        }
        if self.cache.is_none() {
            self.parse()?;
        }
        let Some(cache) = &self.cache else {
            return Ok(Vec::new());
        };

        fs::create_dir_all(output_dir).map_err(|e| BundleError::io(output_dir, e))?;
        let mut written = Vec::new();
        for mode in &self.modes {
            let text = cache
                .merged
                .get(mode)
                .ok_or(BundleError::ModeNotParsed(*mode))?;
            written.extend(self.emit(output_dir, *mode, text)?);
        }

        let snapshot = cache.snapshot.clone();
        self.tracker.record(snapshot);
        Ok(written)
    }

    /// Regenerates only when stale, returning `None` when the group is fresh.
    ///
    /// Modes are evaluated and written one at a time. A failing mode aborts
    /// the run without touching its artifacts; modes written before it keep
    /// their new output.
    pub fn regenerate(&mut self, output_dir: &Path) -> BundleResult<Option<Vec<PathBuf>>> {
        if !self.is_stale() {
            debug!(group = %self.name, "up to date, nothing to regenerate");
            return Ok(None);
        }

        let files = self.discover()?;
        fs::create_dir_all(output_dir).map_err(|e| BundleError::io(output_dir, e))?;

        let mut merged = BTreeMap::new();
        let mut written = Vec::new();
        {
            let evaluator = DirectiveEvaluator::new(&self.registry, &files);
            for mode in &self.modes {
                let text = evaluator.evaluate(*mode)?;
                written.extend(self.emit(output_dir, *mode, &text)?);
                merged.insert(*mode, text);
            }
        }

        let snapshot = Snapshot::capture(&files);
        let version = self.next_version;
        self.next_version += 1;
        self.cache = Some(ParseCache {
            version,
            merged,
            snapshot: snapshot.clone(),
        });
        self.files = files;
        self.tracker.record(snapshot);
        Ok(Some(written))
    }

    fn discover(&self) -> BundleResult<FileSet> {
        GraphBuilder::new(&self.base_dir, &self.registry).build(&self.start_file)
    }

    fn evaluate_all(&self, files: &FileSet) -> BundleResult<BTreeMap<GenerationMode, String>> {
        let evaluator = DirectiveEvaluator::new(&self.registry, files);
        self.modes
            .iter()
            .map(|mode| Ok((*mode, evaluator.evaluate(*mode)?)))
            .collect()
    }

    /// Swaps in a freshly discovered file set, dropping the parse cache if
    /// the files or their content changed.
    fn replace_files(&mut self, files: FileSet, snapshot: &Snapshot) {
        if let Some(cache) = &self.cache
            && cache.snapshot.hash != snapshot.hash
        {
            debug!(group = %self.name, version = cache.version, "file set changed, dropping parse cache");
            self.cache = None;
        }
        self.files = files;
    }

    /// Runs the builders over one mode's text and writes its artifacts.
    fn emit(&self, output_dir: &Path, mode: GenerationMode, text: &str) -> BundleResult<Vec<PathBuf>> {
        let Some(suffix) = mode.suffix() else {
            debug!(group = %self.name, %mode, "mode has no output suffix");
            return Ok(Vec::new());
        };

        let streams = run_pipeline(&self.builders, mode, text.to_string())?;

        let main_path = output_dir.join(format!("{}_{}.js", self.name, suffix));
        let compat_path = output_dir.join(format!("{}_{}_compat.js", self.name, suffix));
        let mut written = Vec::new();

        write_artifact(&main_path, &streams.main)?;
        written.push(main_path);

        match streams.compat {
            Some(compat) => {
                write_artifact(&compat_path, &compat)?;
                written.push(compat_path);
            }
            None if compat_path.exists() => {
                fs::remove_file(&compat_path).map_err(|e| BundleError::io(&compat_path, e))?;
                debug!(path = %compat_path.display(), "removed outdated compat artifact");
            }
            None => {}
        }
        Ok(written)
    }
}

/// Writes through a temporary sibling so a failed write never leaves a
/// truncated artifact behind.
fn write_artifact(path: &Path, content: &str) -> BundleResult<()> {
    let tmp = path.with_extension("js.tmp");
    fs::write(&tmp, content).map_err(|e| BundleError::io(&tmp, e))?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(BundleError::io(path, e));
    }
    info!(path = %path.display(), bytes = content.len(), "wrote artifact");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::javascript::{FRAMEWORK_BUILDER, FrameworkJavascriptBuilder};
    use crate::builders::resources::MemoryResourceLoader;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[test]
    fn test_new_resolves_start_file() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("main.js"), "main();\n").unwrap();
        let group = JavascriptGroup::new(
            "app",
            dir.path(),
            "main.js",
            vec![DirectiveType::include()],
            [GenerationMode::Development],
        )
        .unwrap();
        assert!(group.start_file().is_absolute());
        assert_eq!(group.name(), "app");
        assert_eq!(group.base_dir(), dir.path());
        assert!(group.files().is_empty());
        assert_eq!(group.cache_version(), None);
        assert!(group.builder_names().is_empty());
    }

    #[test]
    fn test_builders_run_in_the_order_added() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("main.js"), "main();\n").unwrap();
        let mut group =
            JavascriptGroup::new("app", dir.path(), "main.js", vec![], [GenerationMode::Development])
                .unwrap();
        let loader = Arc::new(MemoryResourceLoader::new().with("footer.js", "footer();\n"));
        group.add_builder(Box::new(FrameworkJavascriptBuilder::new(
            loader,
            vec!["footer.js".to_string()],
        )));
        assert_eq!(group.builder_names(), vec![FRAMEWORK_BUILDER]);

        let output = tempdir().unwrap();
        group.generate(output.path(), false).unwrap();
        assert_eq!(
            fs::read_to_string(output.path().join("app_dev.js")).unwrap(),
            "main();\nfooter();\n"
        );
    }

    #[test]
    fn test_failed_rename_leaves_no_temporary_file() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("app_dev.js");
        fs::create_dir_all(target.join("occupied")).unwrap();

        assert!(matches!(
            write_artifact(&target, "main();\n"),
            Err(BundleError::Io { .. })
        ));
        assert!(!dir.path().join("app_dev.js.tmp").exists());
        assert!(target.is_dir());
    }

    #[test]
    fn test_failed_parse_keeps_previous_cache() {
        let dir = tempdir().unwrap();
        let main = dir.path().join("main.js");
        fs::write(&main, "main();\n").unwrap();
        let mut group = JavascriptGroup::new(
            "app",
            dir.path(),
            "main.js",
            vec![DirectiveType::mock()],
            [GenerationMode::Development, GenerationMode::Testing],
        )
        .unwrap();

        group.parse().unwrap();
        assert_eq!(group.cache_version(), Some(1));

        fs::write(&main, "// #multilinemock\nx();\n// #end\n").unwrap();
        assert!(group.parse().unwrap_err().is_directive_mismatch());
        assert_eq!(group.cache_version(), Some(1));
        assert_eq!(group.merged_text(GenerationMode::Testing), Some("main();\n"));
    }

    #[test]
    fn test_parse_does_not_clear_staleness() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("main.js"), "main();\n").unwrap();
        let mut group = JavascriptGroup::new(
            "app",
            dir.path(),
            "main.js",
            vec![],
            [GenerationMode::Production],
        )
        .unwrap();
        group.parse().unwrap();
        assert!(group.is_stale());
        assert!(group.last_modified().is_some());
    }
}
