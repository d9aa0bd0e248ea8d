use anyhow::Result;
use std::collections::HashSet;
use std::path::PathBuf;

use crate::builders::javascript::{ENGINE_BUILDER, FRAMEWORK_BUILDER};
use crate::core::config::{self, CONFIG_VERSION};

/// The `ConfigValidator` trait defines the public interface for validating the
/// bundler configuration.
pub trait ConfigValidator {
    /// Performs a full validation of the `BundlerConfig` and returns a list
    /// of issues found. An empty list means the configuration is usable.
    fn validate_config(&self, config: &config::BundlerConfig) -> Result<Vec<String>>;

    /// Validates a single group definition and returns its issues.
    fn validate_group(&self, group: &config::GroupConfig) -> Result<Vec<String>>;
}

/// The `StandardValidator` checks that every group can actually be built:
/// its start file exists, it asks for at least one mode and directive, its
/// builders are known and its labels are unambiguous.
pub struct StandardValidator {
    project_root: PathBuf,
}

impl StandardValidator {
    /// Creates a validator resolving relative paths against `project_root`.
    pub fn new(project_root: PathBuf) -> Self {
        Self { project_root }
    }

    fn check_start_file(&self, group: &config::GroupConfig) -> Option<String> {
        let path = self
            .project_root
            .join(&group.base_dir)
            .join(&group.start_file);
        if path.is_file() {
            None
        } else {
            Some(format!(
                "Group '{}': start file not found: {}",
                group.name,
                path.display()
            ))
        }
    }

    /// Two directive kinds sharing a label would make markers ambiguous.
    fn check_label_conflicts(&self, group: &config::GroupConfig) -> Vec<String> {
        let mut warnings = Vec::new();
        let mut labels = HashSet::new();

        for directive in group.directive_types() {
            if !labels.insert(directive.label.clone()) {
                warnings.push(format!(
                    "Group '{}': label '{}' is used by more than one directive",
                    group.name, directive.label
                ));
            }
        }
        warnings
    }

    /// A directive labelled like the end marker would swallow every block end.
    fn check_end_label(&self, group: &config::GroupConfig, end_label: &str) -> Option<String> {
        group
            .directive_types()
            .into_iter()
            .find(|directive| directive.label == end_label)
            .map(|directive| {
                format!(
                    "Group '{}': {} directive uses the end marker label '{}'",
                    group.name, directive.kind, end_label
                )
            })
    }
}

impl ConfigValidator for StandardValidator {
    fn validate_config(&self, config: &config::BundlerConfig) -> Result<Vec<String>> {
        let mut issues = Vec::new();

        if config.version != CONFIG_VERSION {
            issues.push(format!("Unsupported config version: {}", config.version));
        }

        if let Err(e) = config.settings.markers.compile() {
            issues.push(format!("Invalid marker prefix: {e}"));
        }

        let mut names = HashSet::new();
        for group in &config.groups {
            if !names.insert(group.name.as_str()) {
                issues.push(format!("Duplicate group name: {}", group.name));
            }
            issues.extend(self.validate_group(group)?);
            issues.extend(self.check_end_label(group, &config.settings.markers.end_label));
        }

        Ok(issues)
    }

    fn validate_group(&self, group: &config::GroupConfig) -> Result<Vec<String>> {
        let mut issues = Vec::new();

        if group.name.trim().is_empty() {
            issues.push("Group name cannot be empty".to_string());
        }
        if group.modes.is_empty() {
            issues.push(format!("Group '{}': no generation modes requested", group.name));
        }
        if group.directives.is_empty() {
            issues.push(format!("Group '{}': no directives registered", group.name));
        }
        if let Some(issue) = self.check_start_file(group) {
            issues.push(issue);
        }

        for builder in &group.builders {
            if builder != ENGINE_BUILDER && builder != FRAMEWORK_BUILDER {
                issues.push(format!("Group '{}': unknown builder '{}'", group.name, builder));
            }
        }
        if group.compat && !group.builders.iter().any(|b| b == ENGINE_BUILDER) {
            issues.push(format!(
                "Group '{}': compat is enabled but no engine builder produces compat output",
                group.name
            ));
        }

        issues.extend(self.check_label_conflicts(group));
        Ok(issues)
    }
}
