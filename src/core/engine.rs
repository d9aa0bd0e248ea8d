use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::builders::javascript::create_builder;
use crate::builders::reporter::{GroupOutcome, GroupStatus};
use crate::builders::resources::{DirResourceLoader, ResourceLoader};
use crate::builders::storage::{FileStateStorage, GroupState, StateStorage};
use crate::core::config::{BundlerConfig, ConfigManager, ConfigProvider, GroupConfig};
use crate::core::group::JavascriptGroup;
use crate::core::tracker::GroupHash;

/// Runs the configured groups: builds each `JavascriptGroup` from its
/// configuration, restores its baseline from the build state, and persists
/// the new baseline after a successful generation.
pub struct BundleEngine {
    config_manager: ConfigManager,
    config: BundlerConfig,
    storage: Box<dyn StateStorage>,
    loader: Arc<dyn ResourceLoader>,
}

impl BundleEngine {
    pub fn new(config_manager: ConfigManager) -> Result<Self> {
        let config = config_manager.load_config()?;
        let state_path = config_manager
            .resolve(&config.settings.output_dir)
            .join(&config.settings.state_file);
        let storage: Box<dyn StateStorage> = Box::new(FileStateStorage::new(state_path));
        let loader: Arc<dyn ResourceLoader> = Arc::new(DirResourceLoader::new(
            config_manager.resolve(&config.settings.resources_dir),
        ));

        Ok(Self {
            config_manager,
            config,
            storage,
            loader,
        })
    }

    /// Builds an engine with explicit storage and resources.
    pub fn with_parts(
        config_manager: ConfigManager,
        storage: Box<dyn StateStorage>,
        loader: Arc<dyn ResourceLoader>,
    ) -> Result<Self> {
        let config = config_manager.load_config()?;
        Ok(Self {
            config_manager,
            config,
            storage,
            loader,
        })
    }

    pub fn config(&self) -> &BundlerConfig {
        &self.config
    }

    pub fn output_dir(&self) -> PathBuf {
        self.config_manager.resolve(&self.config.settings.output_dir)
    }

    /// The groups to act on: all of them, or the one named by `filter`.
    fn selected(&self, filter: Option<&str>) -> Result<Vec<GroupConfig>> {
        match filter {
            Some(name) => {
                let group = self
                    .config
                    .group(name)
                    .with_context(|| format!("No group named '{name}' in configuration"))?;
                Ok(vec![group.clone()])
            }
            None => Ok(self.config.groups.clone()),
        }
    }

    /// Creates the group for `config` with its builders and persisted baseline.
    pub fn build_group(&self, config: &GroupConfig) -> Result<JavascriptGroup> {
        let registry = config.registry(&self.config.settings.markers)?;
        let mut group = JavascriptGroup::with_registry(
            config.name.clone(),
            self.config_manager.resolve(&config.base_dir),
            &config.start_file,
            registry,
            config.modes.iter().copied(),
        )
        .with_context(|| format!("Failed to set up group '{}'", config.name))?;

        for name in &config.builders {
            group.add_builder(create_builder(
                name,
                Arc::clone(&self.loader),
                config.compat,
                &config.framework_resources,
            )?);
        }

        if let Some(state) = self.storage.load_state(&config.name)? {
            group.restore_baseline(state.snapshot);
        }
        Ok(group)
    }

    /// Parses every selected group, failing on the first error.
    pub fn parse(&self, filter: Option<&str>) -> Result<Vec<String>> {
        let mut parsed = Vec::new();
        for config in self.selected(filter)? {
            let mut group = self.build_group(&config)?;
            group
                .parse()
                .with_context(|| format!("Failed to parse group '{}'", config.name))?;
            info!(group = %config.name, files = group.files().len(), "parsed");
            parsed.push(config.name);
        }
        Ok(parsed)
    }

    pub fn hash(&self, filter: Option<&str>) -> Result<Vec<(String, GroupHash)>> {
        let mut hashes = Vec::new();
        for config in self.selected(filter)? {
            let mut group = self.build_group(&config)?;
            let hash = group
                .group_hash()
                .with_context(|| format!("Failed to hash group '{}'", config.name))?;
            hashes.push((config.name, hash));
        }
        Ok(hashes)
    }

    pub fn generate(&mut self, filter: Option<&str>, force: bool) -> Result<Vec<GroupOutcome>> {
        let output_dir = self.output_dir();
        let mut outcomes = Vec::new();
        for config in self.selected(filter)? {
            let mut group = self.build_group(&config)?;
            let stale = group.is_stale();
            let written = group
                .generate(&output_dir, force)
                .with_context(|| format!("Failed to generate group '{}'", config.name))?;

            let skipped = !force && !stale;
            if !skipped {
                self.persist(&group, &written)?;
            }
            outcomes.push(GroupOutcome {
                name: config.name,
                skipped,
                written,
            });
        }
        Ok(outcomes)
    }

    pub fn regenerate(&mut self, filter: Option<&str>) -> Result<Vec<GroupOutcome>> {
        let output_dir = self.output_dir();
        let mut outcomes = Vec::new();
        for config in self.selected(filter)? {
            let mut group = self.build_group(&config)?;
            let result = group
                .regenerate(&output_dir)
                .with_context(|| format!("Failed to regenerate group '{}'", config.name))?;

            let outcome = match result {
                Some(written) => {
                    self.persist(&group, &written)?;
                    GroupOutcome {
                        name: config.name,
                        skipped: false,
                        written,
                    }
                }
                None => GroupOutcome {
                    name: config.name,
                    skipped: true,
                    written: Vec::new(),
                },
            };
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    /// Status of every selected group. Groups that cannot be resolved are
    /// reported rather than failing the whole report.
    pub fn status(&self, filter: Option<&str>) -> Result<Vec<GroupStatus>> {
        let mut statuses = Vec::new();
        for config in self.selected(filter)? {
            let resolved = self.build_group(&config).and_then(|mut group| {
                let stale = group.is_stale();
                let hash = group.group_hash()?;
                // A restored baseline answers the hash without rediscovering files.
                let file_count = group
                    .baseline()
                    .map_or(group.files().len(), |baseline| baseline.files.len());
                Ok((stale, hash, file_count))
            });

            let status = match resolved {
                Ok((stale, hash, file_count)) => GroupStatus {
                    name: config.name.clone(),
                    resolvable: true,
                    stale,
                    file_count,
                    hash: Some(hash.to_string()),
                    modes: config.modes.clone(),
                    error: None,
                },
                Err(e) => {
                    warn!(group = %config.name, error = %e, "group cannot be resolved");
                    GroupStatus {
                        name: config.name.clone(),
                        resolvable: false,
                        stale: true,
                        file_count: 0,
                        hash: None,
                        modes: config.modes.clone(),
                        error: Some(format!("{e:#}")),
                    }
                }
            };
            statuses.push(status);
        }
        Ok(statuses)
    }

    /// Forgets every persisted baseline so the next run regenerates everything.
    pub fn clean_state(&mut self) -> Result<()> {
        self.storage.cleanup()
    }

    fn persist(&mut self, group: &JavascriptGroup, written: &[PathBuf]) -> Result<()> {
        if let Some(snapshot) = group.baseline() {
            self.storage.store_state(
                group.name(),
                GroupState {
                    snapshot: snapshot.clone(),
                    artifacts: written.to_vec(),
                },
            )?;
        }
        Ok(())
    }
}
