use dagpilot::config::{DagpilotConfig, EpicPaths};

#[test]
fn test_default_config() {
    let config = DagpilotConfig::default();

    assert_eq!(config.scheduler.scan_interval_secs, 300);
    assert_eq!(config.executor.program, "dagpilot-run");
    assert!(config.executor.base_args.is_empty());

    assert!(config.validate().is_ok());
}

#[test]
fn test_validate_rejects_zero_interval() {
    let mut config = DagpilotConfig::default();
    config.scheduler.scan_interval_secs = 0;

    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("scan_interval_secs"));
}

#[test]
fn test_validate_rejects_empty_program() {
    let mut config = DagpilotConfig::default();
    config.executor.program = String::new();

    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("executor.program"));
}

#[test]
fn test_config_toml_round_trip() {
    let mut config = DagpilotConfig::default();
    config.scheduler.scan_interval_secs = 60;
    config.executor.program = "/usr/local/bin/agent-run".to_string();
    config.executor.base_args = vec!["run".to_string()];

    let toml = toml::to_string_pretty(&config).unwrap();
    let parsed: DagpilotConfig = toml::from_str(&toml).unwrap();

    assert_eq!(parsed.scheduler.scan_interval_secs, 60);
    assert_eq!(parsed.executor.program, "/usr/local/bin/agent-run");
    assert_eq!(parsed.executor.base_args, vec!["run".to_string()]);
}

#[tokio::test]
async fn test_load_missing_config_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();

    let config = DagpilotConfig::load(dir.path()).await.unwrap();
    assert_eq!(config.scheduler.scan_interval_secs, 300);
}

#[tokio::test]
async fn test_save_and_load() {
    let dir = tempfile::tempdir().unwrap();

    let mut config = DagpilotConfig::default();
    config.scheduler.scan_interval_secs = 42;
    config.save(dir.path()).await.unwrap();

    let loaded = DagpilotConfig::load(dir.path()).await.unwrap();
    assert_eq!(loaded.scheduler.scan_interval_secs, 42);
}

#[test]
fn test_epic_paths_layout() {
    let paths = EpicPaths::new("/tmp/project".into());

    assert_eq!(
        paths.manifest_path("my-epic"),
        std::path::PathBuf::from("/tmp/project/.claude/epics/my-epic/manifest.yaml")
    );
    assert_eq!(
        paths.oplog_path(),
        std::path::PathBuf::from("/tmp/project/.claude/dagpilot/orchestrator.log")
    );
}
