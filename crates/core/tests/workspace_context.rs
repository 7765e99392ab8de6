use std::path::PathBuf;

use codescan_core::db::{
    config_file, load_workspace_config, save_workspace_config, WorkspaceConfig,
    WorkspaceContext, WorkspaceLayout,
};
use tempfile::tempdir;

#[test]
fn layout_paths_are_derived_from_root() {
    let layout = WorkspaceLayout::new("/work/space");
    assert_eq!(layout.meta_dir, PathBuf::from("/work/space/.codescan"));
    assert_eq!(layout.config_path, PathBuf::from("/work/space/.codescan/config.json"));
    assert_eq!(layout.db_path_relative_string(), ".codescan/results.db");
    assert_eq!(layout.recordings_relative_string(), ".codescan/recordings");
    assert_eq!(layout.report_path("ls"), PathBuf::from("/work/space/reports/ls.json"));
    assert_eq!(layout.resolve("/abs/tool"), PathBuf::from("/abs/tool"));
}

#[test]
fn context_loads_json_config_and_opens_db() {
    let tmp = tempdir().expect("tempdir");
    let layout = WorkspaceLayout::new(tmp.path());
    let mut config = WorkspaceConfig::new("demo", layout.db_path_relative_string());
    config.scanner.backend = "replay".to_string();
    config.scanner.replay_dir = Some(layout.recordings_relative_string());
    save_workspace_config(&config, &layout.config_path).expect("save config");

    let ctx = WorkspaceContext::from_root(tmp.path()).expect("context");
    assert_eq!(ctx.config, config);
    assert_eq!(ctx.db_path, layout.db_path);
    assert!(ctx.db_path.exists());
    assert_eq!(ctx.scanner_config().replay_dir, Some(layout.recordings_dir.clone()));
}

#[test]
fn yaml_config_is_used_when_json_is_absent() {
    let tmp = tempdir().expect("tempdir");
    let layout = WorkspaceLayout::new(tmp.path());
    std::fs::create_dir_all(&layout.meta_dir).expect("meta dir");
    std::fs::write(
        &layout.yaml_config_paths[1],
        "name: yaml-space\nconfig_version: 0.1.0\ndb:\n  path: results.db\n\
         analysis:\n  aggressive: true\n",
    )
    .expect("write yaml");

    assert_eq!(config_file(&layout), Some(layout.yaml_config_paths[1].clone()));
    let config = load_workspace_config(&layout).expect("load yaml");
    assert_eq!(config.name, "yaml-space");
    assert!(config.analysis.aggressive);
    assert_eq!(config.scanner.backend, "codescan");
}

#[test]
fn missing_config_reports_init_hint() {
    let tmp = tempdir().expect("tempdir");
    let err = WorkspaceContext::from_root(tmp.path()).unwrap_err();
    assert!(format!("{err:#}").contains("codescan init"));
}
