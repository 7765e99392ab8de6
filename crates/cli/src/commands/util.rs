use std::path::Path;

use anyhow::{Context, Result};
use codescan_core::db::{
    config_file, AnalysisSettings, ResultsDb, ScannerSettings, WorkspaceContext, WorkspaceLayout,
};
use codescan_core::services::{ScannerHandle, ScannerRegistry};
use tracing::debug;

use crate::canonicalize_or_current;

/// Scanner and analysis settings for one command, plus the loaded workspace
/// when the root is an initialized one.
#[derive(Debug)]
pub struct ScanSetup {
    pub layout: WorkspaceLayout,
    pub scanner: ScannerSettings,
    pub analysis: AnalysisSettings,
    pub workspace: Option<WorkspaceContext>,
}

impl ScanSetup {
    /// Use the workspace at `root` if it has a config; otherwise run with
    /// defaults and without recording results.
    pub fn load(root: &str, backend_override: Option<&str>) -> Result<Self> {
        let root_path = canonicalize_or_current(root)?;
        let layout = WorkspaceLayout::new(&root_path);

        let mut setup = if config_file(&layout).is_some() {
            let ctx = WorkspaceContext::from_root(&root_path)?;
            Self {
                layout,
                scanner: ctx.config.scanner.clone(),
                analysis: ctx.config.analysis.clone(),
                workspace: Some(ctx),
            }
        } else {
            debug!(root = %layout.root.display(), "no workspace config, using defaults");
            Self {
                layout,
                scanner: ScannerSettings::default(),
                analysis: AnalysisSettings::default(),
                workspace: None,
            }
        };
        if let Some(name) = backend_override {
            setup.scanner.backend = name.to_string();
        }
        Ok(setup)
    }

    /// Results database of the workspace, if any.
    pub fn db(&self) -> Option<&ResultsDb> {
        self.workspace.as_ref().map(|ctx| &ctx.db)
    }

    /// Initialize the configured backend from `registry`.
    pub fn open_scanner<'r>(&self, registry: &'r ScannerRegistry) -> Result<ScannerHandle<'r>> {
        let backend = registry.require(&self.scanner.backend)?;
        let config = self.scanner.to_scanner_config(&self.layout);
        ScannerHandle::init(backend, config)
            .with_context(|| format!("Failed to initialize scanner backend '{}'", backend.name()))
    }
}

/// Helper to print whether a directory exists.
pub fn print_dir_status(label: &str, path: &Path) {
    let exists = path.is_dir();
    println!("- {label}: {} ({})", if exists { "OK" } else { "MISSING" }, path.display());
}

/// Human-readable byte count with hex, e.g. `4096 (0x1000)`.
pub fn format_bytes(value: u64) -> String {
    format!("{value} ({value:#x})")
}
