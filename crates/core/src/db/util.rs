use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use crate::db::{ResultsDb, WorkspaceConfig, WorkspaceLayout};

/// Config file that exists for this layout: JSON first, then YAML.
pub fn config_file(layout: &WorkspaceLayout) -> Option<PathBuf> {
    std::iter::once(&layout.config_path)
        .chain(layout.yaml_config_paths.iter())
        .find(|p| p.is_file())
        .cloned()
}

/// Load the workspace config from disk for a given layout.
pub fn load_workspace_config(layout: &WorkspaceLayout) -> Result<WorkspaceConfig> {
    let path = config_file(layout).with_context(|| {
        format!(
            "No workspace config found under {} (run `codescan init` first)",
            layout.meta_dir.display()
        )
    })?;
    load_config_file(&path)
}

/// Parse one config file, YAML or JSON by extension.
pub fn load_config_file(path: &Path) -> Result<WorkspaceConfig> {
    let body = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read workspace config at {}", path.display()))?;
    let config = WorkspaceConfig::from_str_for_path(&body, path)
        .map_err(anyhow::Error::msg)
        .with_context(|| format!("Failed to parse workspace config at {}", path.display()))?;
    debug!(path = %path.display(), backend = %config.scanner.backend, "loaded workspace config");
    Ok(config)
}

/// Write `config` to `path`, creating parent directories.
pub fn save_workspace_config(config: &WorkspaceConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let body = config.to_string_for_path(path).map_err(anyhow::Error::msg)?;
    std::fs::write(path, body)
        .with_context(|| format!("Failed to write workspace config to {}", path.display()))
}

/// Resolve the DB path (respecting relative/absolute config) and open the results database.
pub fn open_results_db(layout: &WorkspaceLayout) -> Result<(WorkspaceConfig, PathBuf, ResultsDb)> {
    let config = load_workspace_config(layout)?;
    let db_path = layout.resolve(&config.db.path);
    let db = ResultsDb::open(&db_path)
        .with_context(|| format!("Failed to open results database at {}", db_path.display()))?;
    Ok((config, db_path, db))
}
