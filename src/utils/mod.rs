use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::builders::reporter::{ConsoleReporter, StatusReporter};
use crate::core::config::{ConfigManager, ConfigProvider};
use crate::core::engine::BundleEngine;

/// Installs the tracing subscriber. `RUST_LOG` wins over the `verbose` flag.
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let fmt_layer = fmt::layer().with_target(verbose).without_time();
    tracing_subscriber::registry().with(filter).with(fmt_layer).init();
}

pub fn initialize_project(config: Option<PathBuf>) -> Result<()> {
    let config_manager = get_config_manager(config)?;
    config_manager.initialize()?;
    println!(
        "✓ Initialized bundler configuration at {}",
        config_manager.get_config_path()?.display()
    );
    println!("Add [[groups]] entries, then run 'directive-bundler generate'");
    Ok(())
}

pub fn validate(config: Option<PathBuf>) -> Result<()> {
    get_config_manager(config)?.validate_config()
}

pub fn show_status(config: Option<PathBuf>, group: Option<&str>) -> Result<()> {
    let engine = get_engine(config)?;
    let statuses = engine.status(group)?;
    ConsoleReporter::new().generate_status_report(engine.config(), &statuses)
}

pub fn print_hashes(config: Option<PathBuf>, group: Option<&str>) -> Result<()> {
    let engine = get_engine(config)?;
    for (name, hash) in engine.hash(group)? {
        println!("{name}: {hash}");
    }
    Ok(())
}

pub fn parse_groups(config: Option<PathBuf>, group: Option<&str>) -> Result<()> {
    let engine = get_engine(config)?;
    for name in engine.parse(group)? {
        println!("✓ Parsed {name}");
    }
    Ok(())
}

pub fn generate(config: Option<PathBuf>, group: Option<&str>, force: bool) -> Result<()> {
    let mut engine = get_engine(config)?;
    let outcomes = engine.generate(group, force)?;
    ConsoleReporter::new().report_outcomes(&outcomes)
}

pub fn regenerate(config: Option<PathBuf>, group: Option<&str>) -> Result<()> {
    let mut engine = get_engine(config)?;
    let outcomes = engine.regenerate(group)?;
    ConsoleReporter::new().report_outcomes(&outcomes)
}

pub fn clean(config: Option<PathBuf>) -> Result<()> {
    let mut engine = get_engine(config)?;
    engine.clean_state()?;
    println!("✓ Cleared build state; the next run regenerates every group");
    Ok(())
}

pub fn export(config: Option<PathBuf>, path: &Path, format: &str) -> Result<()> {
    get_config_manager(config)?.export_config(path, format)?;
    println!("✓ Exported configuration to {}", path.display());
    Ok(())
}

// Helper function to create a ConfigManager, honoring an explicit --config path
fn get_config_manager(config: Option<PathBuf>) -> Result<ConfigManager> {
    match config {
        Some(path) => ConfigManager::from_config_path(path),
        None => ConfigManager::new(),
    }
}

fn get_engine(config: Option<PathBuf>) -> Result<BundleEngine> {
    BundleEngine::new(get_config_manager(config)?)
}
