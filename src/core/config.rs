use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::builders::directives::{DirectiveKind, DirectiveRegistry, DirectiveType, MarkerSyntax};
use crate::builders::javascript::{ENGINE_BUILDER, FRAMEWORK_BUILDER};
use crate::builders::validator::{ConfigValidator, StandardValidator};
use crate::core::mode::GenerationMode;

pub const CONFIG_FILE_NAME: &str = "bundler.toml";
pub const CONFIG_VERSION: &str = "1.0";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GlobalSettings {
    /// Where generated bundles are written, relative to the project root.
    pub output_dir: PathBuf,
    /// Root directory for builder resources (runtime shims, framework files).
    pub resources_dir: PathBuf,
    /// File name of the persisted build state inside `output_dir`.
    pub state_file: String,
    pub verbose: bool,
    #[serde(default)]
    pub markers: MarkerSyntax,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("generated"),
            resources_dir: PathBuf::from("resources"),
            state_file: ".bundle-state.json".to_string(),
            verbose: false,
            markers: MarkerSyntax::default(),
        }
    }
}

/// One bundle target.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GroupConfig {
    pub name: String,
    /// Directory include targets are resolved against, relative to the project root.
    pub base_dir: PathBuf,
    /// Start file, relative to `base_dir`.
    pub start_file: PathBuf,
    pub directives: Vec<DirectiveKind>,
    pub modes: Vec<GenerationMode>,
    #[serde(default)]
    pub builders: Vec<String>,
    #[serde(default)]
    pub compat: bool,
    #[serde(default)]
    pub framework_resources: Vec<String>,
    /// Label overrides keyed by directive kind name (e.g. `multi-line-mock = "mockblock"`).
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl GroupConfig {
    pub fn new(name: impl Into<String>, base_dir: impl Into<PathBuf>, start_file: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            base_dir: base_dir.into(),
            start_file: start_file.into(),
            directives: DirectiveKind::ALL.to_vec(),
            modes: vec![GenerationMode::Development, GenerationMode::Production],
            builders: vec![ENGINE_BUILDER.to_string(), FRAMEWORK_BUILDER.to_string()],
            compat: true,
            framework_resources: Vec::new(),
            labels: BTreeMap::new(),
        }
    }

    /// The registered directive types, with label overrides applied.
    pub fn directive_types(&self) -> Vec<DirectiveType> {
        self.directives
            .iter()
            .map(|kind| match self.labels.get(&kind.to_string()) {
                Some(label) => DirectiveType::with_label(*kind, label.clone()),
                None => DirectiveType::new(*kind),
            })
            .collect()
    }

    pub fn registry(&self, markers: &MarkerSyntax) -> Result<DirectiveRegistry> {
        DirectiveRegistry::new(self.directive_types(), markers)
            .with_context(|| format!("Invalid directive setup for group '{}'", self.name))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BundlerConfig {
    pub version: String,
    pub settings: GlobalSettings,
    #[serde(default)]
    pub groups: Vec<GroupConfig>,
}

impl Default for BundlerConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION.to_string(),
            settings: GlobalSettings::default(),
            groups: Vec::new(),
        }
    }
}

impl BundlerConfig {
    pub fn group(&self, name: &str) -> Option<&GroupConfig> {
        self.groups.iter().find(|group| group.name == name)
    }
}

pub struct ConfigManager {
    config_path: PathBuf,
    project_root: PathBuf,
}

impl ConfigManager {
    /// Locates the project by walking up from the current directory to the
    /// nearest `bundler.toml`; falls back to the current directory.
    pub fn new() -> Result<Self> {
        let current_dir = std::env::current_dir().context("Failed to read current directory")?;
        let project_root = find_project_root(&current_dir).unwrap_or(current_dir);
        Ok(Self::new_at(project_root))
    }

    pub fn new_at(project_root: PathBuf) -> Self {
        Self {
            config_path: project_root.join(CONFIG_FILE_NAME),
            project_root,
        }
    }

    /// Uses an explicit config file; its directory is the project root.
    pub fn from_config_path(config_path: PathBuf) -> Result<Self> {
        let config_path = if config_path.is_absolute() {
            config_path
        } else {
            std::env::current_dir()
                .context("Failed to read current directory")?
                .join(config_path)
        };
        let project_root = config_path
            .parent()
            .map(Path::to_path_buf)
            .context("Config path has no parent directory")?;
        Ok(Self {
            config_path,
            project_root,
        })
    }

    pub fn initialize(&self) -> Result<()> {
        if self.config_path.exists() {
            return Ok(());
        }

        let default_config = BundlerConfig::default();
        self.save_config(&default_config)?;
        Ok(())
    }

    /// Validates the configuration and prints every issue found.
    pub fn validate_config(&self) -> Result<()> {
        let config = self.load_config()?;
        let validator = StandardValidator::new(self.project_root.clone());
        let issues = validator.validate_config(&config)?;

        if issues.is_empty() {
            println!("✓ Configuration is valid.");
            Ok(())
        } else {
            println!("⚠️  Found issues in configuration:");
            for issue in issues {
                println!("  - {issue}");
            }
            anyhow::bail!("Configuration validation failed.");
        }
    }

    pub fn add_group(&mut self, group: GroupConfig) -> Result<()> {
        let mut config = self.load_config()?;
        if config.group(&group.name).is_some() {
            anyhow::bail!("Group '{}' already exists", group.name);
        }
        config.groups.push(group);
        self.save_config(&config)
    }

    pub fn remove_group(&mut self, name: &str) -> Result<()> {
        let mut config = self.load_config()?;
        config.groups.retain(|group| group.name != name);
        self.save_config(&config)
    }

    pub fn export_config(&self, file_path: &Path, format: &str) -> Result<()> {
        let config = self.load_config()?;

        let content = match format {
            "json" => {
                serde_json::to_string_pretty(&config).context("Failed to serialize to JSON")?
            }
            "yaml" => serde_yaml::to_string(&config).context("Failed to serialize to YAML")?,
            "toml" => toml::to_string_pretty(&config).context("Failed to serialize to TOML")?,
            other => anyhow::bail!("Unsupported export format: {other}"),
        };

        fs::write(file_path, content).context("Failed to write export file")?;

        Ok(())
    }

    pub fn get_project_root(&self) -> &Path {
        &self.project_root
    }

    /// Resolves a configured path against the project root.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.project_root.join(path)
    }
}

pub trait ConfigProvider {
    fn load_config(&self) -> Result<BundlerConfig>;
    fn save_config(&self, config: &BundlerConfig) -> Result<()>;
    fn get_config_path(&self) -> Result<PathBuf>;
}

impl ConfigProvider for ConfigManager {
    fn load_config(&self) -> Result<BundlerConfig> {
        if !self.config_path.exists() {
            return Ok(BundlerConfig::default());
        }

        let content =
            fs::read_to_string(&self.config_path).context("Failed to read config file")?;

        toml::from_str(&content).context("Failed to parse config file")
    }

    fn save_config(&self, config: &BundlerConfig) -> Result<()> {
        let content = toml::to_string_pretty(config).context("Failed to serialize config")?;

        fs::write(&self.config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    fn get_config_path(&self) -> Result<PathBuf> {
        Ok(self.config_path.clone())
    }
}

fn find_project_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(CONFIG_FILE_NAME).exists())
        .map(Path::to_path_buf)
}
