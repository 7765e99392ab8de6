use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::db::{open_results_db, ResultsDb, WorkspaceConfig, WorkspaceLayout};
use crate::services::ScannerConfig;

/// Layout, config and an open results database for one workspace.
#[derive(Debug)]
pub struct WorkspaceContext {
    pub layout: WorkspaceLayout,
    pub config: WorkspaceConfig,
    pub db_path: PathBuf,
    pub db: ResultsDb,
}

impl WorkspaceContext {
    /// Load the workspace config and open the database for a given root.
    pub fn from_root(root: impl AsRef<Path>) -> Result<Self> {
        let layout = WorkspaceLayout::new(root);
        let (config, db_path, db) = open_results_db(&layout)?;
        Ok(Self { layout, config, db_path, db })
    }

    pub fn scanner_config(&self) -> ScannerConfig {
        self.config.scanner.to_scanner_config(&self.layout)
    }
}
