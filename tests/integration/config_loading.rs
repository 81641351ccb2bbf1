//! Configuration layering and validation

use branchstack::config::{BranchstackConfig, ConfigLoader, WORKSPACE_CONFIG_FILE};
use branchstack::manager::StackManager;
use branchstack::store::MemoryPersistence;
use std::sync::Arc;
use tempfile::TempDir;

#[test]
fn test_environment_overrides_workspace_file() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(
        temp_dir.path().join(WORKSPACE_CONFIG_FILE),
        r#"
[engine]
max_stack_depth = 3
max_active_frames = 4

[logging]
level = "debug"
"#,
    )
    .unwrap();

    std::env::set_var("BRANCHSTACK__ENGINE__MAX_ACTIVE_FRAMES", "7");
    let loaded = ConfigLoader::load(temp_dir.path());
    std::env::remove_var("BRANCHSTACK__ENGINE__MAX_ACTIVE_FRAMES");

    let config = loaded.unwrap();
    assert_eq!(config.engine.max_stack_depth, 3);
    assert_eq!(config.engine.max_active_frames, 7);
    assert_eq!(config.logging.level, "debug");
    assert!(config.validate().is_ok());
}

#[test]
fn test_invalid_file_values_fail_validation() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("bad.toml");
    std::fs::write(
        &path,
        r#"
[engine]
max_stack_depth = 0

[completion]
base_url = "ftp://example.com"
"#,
    )
    .unwrap();

    let config = ConfigLoader::load_from_file(&path).unwrap();
    let errors = config.validate().unwrap_err();
    assert_eq!(errors.len(), 2);
    assert!(config.ensure_valid().is_err());
}

#[tokio::test]
async fn test_engine_settings_drive_the_manager() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("tight.toml");
    std::fs::write(&path, "[engine]\nmax_stack_depth = 1\n").unwrap();
    let config = ConfigLoader::load_from_file(&path).unwrap();

    let manager = StackManager::new(Arc::new(MemoryPersistence::new()), config.engine.clone());
    let main = manager
        .create_main(
            &branchstack::types::SessionId::generate(),
            "Shallow",
            branchstack::metadata::Metadata::new(),
        )
        .await
        .unwrap();
    let child = manager
        .create_branch(
            &main,
            "One deep",
            &branchstack::types::MessageId::generate(),
            branchstack::frame::InheritanceMode::None,
        )
        .await
        .unwrap();
    assert!(manager
        .create_branch(
            &child,
            "Two deep",
            &branchstack::types::MessageId::generate(),
            branchstack::frame::InheritanceMode::None,
        )
        .await
        .is_err());
}

#[test]
fn test_default_config_round_trips_through_toml() {
    let config = BranchstackConfig::default();
    let text = toml::to_string_pretty(&config).unwrap();
    let parsed: BranchstackConfig = toml::from_str(&text).unwrap();
    assert_eq!(parsed, config);
}
