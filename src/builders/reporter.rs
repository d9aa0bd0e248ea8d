use anyhow::Result;
use std::path::PathBuf;

use crate::core::config::BundlerConfig;
use crate::core::mode::GenerationMode;

/// Status summary for a single group, gathered by the `BundleEngine`.
#[derive(Debug)]
pub struct GroupStatus {
    pub name: String,
    /// Whether the group could be resolved (start file and includes present).
    pub resolvable: bool,
    pub stale: bool,
    pub file_count: usize,
    pub hash: Option<String>,
    pub modes: Vec<GenerationMode>,
    /// Why the group could not be resolved, if it could not.
    pub error: Option<String>,
}

/// The result of running generation for one group.
#[derive(Debug)]
pub struct GroupOutcome {
    pub name: String,
    /// `true` when the group was up to date and nothing was written.
    pub skipped: bool,
    pub written: Vec<PathBuf>,
}

pub trait StatusReporter {
    fn generate_status_report(&self, config: &BundlerConfig, statuses: &[GroupStatus]) -> Result<()>;
    fn report_outcomes(&self, outcomes: &[GroupOutcome]) -> Result<()>;
}

/// Prints reports to the console. This is the reporter behind `status`,
/// `generate` and `regenerate`.
pub struct ConsoleReporter;

impl ConsoleReporter {
    pub fn new() -> Self {
        Self
    }

    /// One status line per group.
    ///
    /// 🔴: group cannot be resolved.
    /// 🟡: group is stale and needs regeneration.
    /// 🟢: group is up to date.
    fn format_group_status(&self, status: &GroupStatus) -> String {
        let status_icon = if !status.resolvable {
            "🔴"
        } else if status.stale {
            "🟡"
        } else {
            "🟢"
        };

        let modes = status
            .modes
            .iter()
            .map(|mode| mode.name())
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "{} {} ({} files, modes: {}, {})",
            status_icon,
            status.name,
            status.file_count,
            modes,
            if status.stale { "stale" } else { "up to date" }
        )
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusReporter for ConsoleReporter {
    fn generate_status_report(&self, config: &BundlerConfig, statuses: &[GroupStatus]) -> Result<()> {
        println!("📊 Directive Bundler Status Report");
        println!("==================================");

        if statuses.is_empty() {
            println!("No groups configured.");
            return Ok(());
        }

        let mut stale_groups = 0;
        let mut broken_groups = 0;
        let mut total_files = 0;

        for status in statuses {
            total_files += status.file_count;
            if !status.resolvable {
                broken_groups += 1;
            } else if status.stale {
                stale_groups += 1;
            }

            println!("{}", self.format_group_status(status));

            if let Some(error) = &status.error {
                println!("  └─ {error}");
            } else if config.settings.verbose
                && let Some(hash) = &status.hash
            {
                println!("  └─ {hash}");
            }
        }

        println!("\n📈 Summary:");
        println!("  Total groups: {}", statuses.len());
        println!("  Total files: {total_files}");
        println!("  Stale groups: {stale_groups}");
        println!("  Groups with errors: {broken_groups}");

        Ok(())
    }

    fn report_outcomes(&self, outcomes: &[GroupOutcome]) -> Result<()> {
        for outcome in outcomes {
            if outcome.skipped {
                println!("✓ {} is up to date", outcome.name);
                continue;
            }
            println!("✓ Generated {} ({} files)", outcome.name, outcome.written.len());
            for path in &outcome.written {
                println!("  └─ {}", path.display());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_group_status() {
        let reporter = ConsoleReporter::new();
        let status = GroupStatus {
            name: "app".to_string(),
            resolvable: true,
            stale: true,
            file_count: 3,
            hash: None,
            modes: vec![GenerationMode::Development, GenerationMode::Production],
            error: None,
        };
        assert_eq!(
            reporter.format_group_status(&status),
            "🟡 app (3 files, modes: DEVELOPMENT, PRODUCTION, stale)"
        );
    }
}
