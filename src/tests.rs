use crate::builders::resources::{MemoryResourceLoader, ResourceLoader};
use crate::builders::storage::{FileStateStorage, MemoryStateStorage, StateStorage};
use crate::core::config::{ConfigManager, GroupConfig};
use crate::core::engine::BundleEngine;
use crate::core::mode::GenerationMode;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tempfile::tempdir;

fn loader() -> Arc<dyn ResourceLoader> {
    Arc::new(
        MemoryResourceLoader::new()
            .with("lwc/engine/es2017/engine.js", "engine();")
            .with("lwc/wire-service/es2017/wire.js", "wire();")
            .with("lwc/proxy-compat/compat.js", "compat();")
            .with("lwc/engine/es5/engine.js", "engineEs5();")
            .with("lwc/wire-service/es5/wire.js", "wireEs5();"),
    )
}

fn setup_project() -> (tempfile::TempDir, PathBuf) {
    let dir = tempdir().unwrap();
    let root = dir.path().to_path_buf();
    fs::create_dir_all(root.join("src")).unwrap();
    fs::write(root.join("src/app.js"), "// #include util\napp();\n").unwrap();
    fs::write(root.join("src/util.js"), "util();\n").unwrap();

    let mut config_manager = ConfigManager::new_at(root.clone());
    config_manager.initialize().unwrap();
    let mut group = GroupConfig::new("app", "src", "app.js");
    group.modes = vec![GenerationMode::Development];
    group.builders = vec!["engine".to_string()];
    config_manager.add_group(group).unwrap();
    (dir, root)
}

fn touch(path: &Path, offset_secs: u64) {
    let file = fs::File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() + Duration::from_secs(offset_secs))
        .unwrap();
}

fn engine(root: &Path, storage: Box<dyn StateStorage>) -> BundleEngine {
    BundleEngine::with_parts(ConfigManager::new_at(root.to_path_buf()), storage, loader()).unwrap()
}

#[test]
fn test_engine_generates_main_and_compat() {
    let (_dir, root) = setup_project();
    let mut engine = engine(&root, Box::new(MemoryStateStorage::new()));

    let outcomes = engine.generate(None, false).unwrap();
    assert_eq!(outcomes.len(), 1);
    assert!(!outcomes[0].skipped);
    assert_eq!(outcomes[0].written.len(), 2);

    let main = fs::read_to_string(root.join("generated/app_dev.js")).unwrap();
    let compat = fs::read_to_string(root.join("generated/app_dev_compat.js")).unwrap();
    assert_eq!(main, "engine();\nwire();\nutil();\napp();\n");
    assert_eq!(compat, "compat();\nengineEs5();\nwireEs5();\nutil();\napp();\n");
}

#[test]
fn test_engine_regenerate_is_incremental() {
    let (_dir, root) = setup_project();
    let mut engine = engine(&root, Box::new(MemoryStateStorage::new()));

    let first = engine.regenerate(None).unwrap();
    assert!(!first[0].skipped);

    let second = engine.regenerate(None).unwrap();
    assert!(second[0].skipped);

    fs::write(root.join("src/util.js"), "util2();\n").unwrap();
    touch(&root.join("src/util.js"), 60);
    let third = engine.regenerate(None).unwrap();
    assert!(!third[0].skipped);
    let main = fs::read_to_string(root.join("generated/app_dev.js")).unwrap();
    assert!(main.contains("util2();"));
}

#[test]
fn test_state_survives_new_engine() {
    let (_dir, root) = setup_project();
    let state_path = root.join("generated/.bundle-state.json");

    let mut first = engine(&root, Box::new(FileStateStorage::new(state_path.clone())));
    first.generate(None, false).unwrap();
    assert!(state_path.exists());

    let mut second = engine(&root, Box::new(FileStateStorage::new(state_path.clone())));
    let outcomes = second.regenerate(None).unwrap();
    assert!(outcomes[0].skipped);

    let forced = second.generate(Some("app"), true).unwrap();
    assert!(!forced[0].skipped);

    second.clean_state().unwrap();
    assert!(!state_path.exists());
}

#[test]
fn test_status_counts_files_of_a_restored_group() {
    let (_dir, root) = setup_project();
    let state_path = root.join("generated/.bundle-state.json");

    let mut first = engine(&root, Box::new(FileStateStorage::new(state_path.clone())));
    first.generate(None, false).unwrap();

    let second = engine(&root, Box::new(FileStateStorage::new(state_path)));
    let statuses = second.status(None).unwrap();
    assert!(!statuses[0].stale);
    assert_eq!(statuses[0].file_count, 2);
    assert!(statuses[0].hash.is_some());
}

#[test]
fn test_status_reports_unresolvable_group() {
    let (_dir, root) = setup_project();
    let mut config_manager = ConfigManager::new_at(root.clone());
    config_manager
        .add_group(GroupConfig::new("broken", "src", "missing.js"))
        .unwrap();

    let engine = engine(&root, Box::new(MemoryStateStorage::new()));
    let statuses = engine.status(None).unwrap();
    assert_eq!(statuses.len(), 2);

    let app = &statuses[0];
    assert!(app.resolvable);
    assert!(app.stale);
    assert_eq!(app.file_count, 2);

    let broken = &statuses[1];
    assert!(!broken.resolvable);
    assert!(
        broken
            .error
            .as_deref()
            .unwrap()
            .contains("not a valid, acceptable file")
    );
}

#[test]
fn test_unknown_group_filter_fails() {
    let (_dir, root) = setup_project();
    let engine = engine(&root, Box::new(MemoryStateStorage::new()));
    assert!(engine.parse(Some("nope")).is_err());
    assert_eq!(engine.parse(Some("app")).unwrap(), vec!["app".to_string()]);
}

#[test]
fn test_hash_is_stable_across_calls() {
    let (_dir, root) = setup_project();
    let engine = engine(&root, Box::new(MemoryStateStorage::new()));
    let first = engine.hash(None).unwrap();
    let second = engine.hash(None).unwrap();
    assert_eq!(first, second);
}
