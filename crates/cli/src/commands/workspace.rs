use std::fs;

use anyhow::{anyhow, Context, Result};
use codescan_core::db::{
    config_file, save_workspace_config, ResultsDb, WorkspaceConfig, WorkspaceContext,
    WorkspaceLayout,
};
use codescan_core::services::default_scanner_registry;
use serde::Serialize;

use crate::commands::print_dir_status;
use crate::{canonicalize_or_current, infer_workspace_name};

#[derive(Serialize)]
pub struct WorkspaceInfoSnapshot {
    pub name: String,
    pub root: String,
    pub config_file: String,
    pub config: WorkspaceConfig,
    pub db_path: String,
    pub schema_version: i32,
    pub available_backends: Vec<String>,
    pub scans: usize,
    pub comparisons: usize,
}

/// Options for `codescan init`.
#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    pub name: Option<String>,
    pub backend: Option<String>,
    /// Write `config.yaml` instead of `config.json`.
    pub yaml: bool,
}

/// Initialize a new workspace at `root`.
pub fn init_command(root: &str, options: InitOptions) -> Result<()> {
    let root_path = canonicalize_or_current(root)?;
    let layout = WorkspaceLayout::new(&root_path);

    if let Some(existing) = config_file(&layout) {
        return Err(anyhow!("Workspace already initialized ({})", existing.display()));
    }

    let name = options.name.unwrap_or_else(|| infer_workspace_name(&root_path));
    let mut config = WorkspaceConfig::new(&name, layout.db_path_relative_string());
    config.scanner.replay_dir = Some(layout.recordings_relative_string());
    if let Some(backend) = options.backend {
        // Unknown names are caught here rather than on the first scan.
        default_scanner_registry().require(&backend)?;
        config.scanner.backend = backend;
    }

    for dir in [&layout.meta_dir, &layout.recordings_dir, &layout.reports_dir] {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
    }

    let config_path =
        if options.yaml { layout.yaml_config_paths[0].clone() } else { layout.config_path.clone() };
    save_workspace_config(&config, &config_path)?;

    // Create the database up front so later commands can rely on it.
    ResultsDb::open(&layout.db_path).with_context(|| {
        format!("Failed to initialize results database at {}", layout.db_path.display())
    })?;

    println!("Initialized codescan workspace:");
    println!("  Name: {}", name);
    println!("  Root: {}", layout.root.display());
    println!("  Config: {}", config_path.display());
    println!("  DB path (relative): {}", config.db.path);
    println!("  Backend: {}", config.scanner.backend);
    println!("  Recordings dir: {}", layout.recordings_dir.display());
    println!("  Reports dir: {}", layout.reports_dir.display());

    Ok(())
}

/// Show information about an existing workspace.
pub fn info_command(root: &str, json: bool) -> Result<()> {
    let root_path = canonicalize_or_current(root)?;
    let WorkspaceContext { layout, config, db_path, db } = WorkspaceContext::from_root(&root_path)?;
    let config_path = config_file(&layout).unwrap_or_else(|| layout.config_path.clone());
    let scans = db.list_scans(None).context("Failed to list scans")?.len();
    let comparisons = db.list_comparisons(None).context("Failed to list comparisons")?.len();
    let schema_version = db.schema_version()?;
    let available_backends = default_scanner_registry().names();

    if json {
        let snapshot = WorkspaceInfoSnapshot {
            name: config.name.clone(),
            root: layout.root.display().to_string(),
            config_file: config_path.display().to_string(),
            db_path: db_path.display().to_string(),
            config,
            schema_version,
            available_backends,
            scans,
            comparisons,
        };
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    println!("codescan Workspace Info");
    println!("=======================");
    println!("Name: {}", config.name);
    println!("Root: {}", layout.root.display());
    println!("Config file: {}", config_path.display());
    println!("Config version: {}", config.config_version);
    println!("DB path: {} (schema v{})", db_path.display(), schema_version);
    println!("Backend: {}", config.scanner.backend);
    println!("Available backends: {}", available_backends.join(", "));
    println!("Aggressive scans: {}", config.analysis.aggressive);
    println!("Batch window cap: {} bytes", config.analysis.max_window);
    println!();

    println!("Directories:");
    print_dir_status("Meta dir (.codescan)", &layout.meta_dir);
    print_dir_status("Recordings dir", &layout.recordings_dir);
    print_dir_status("Reports dir", &layout.reports_dir);
    println!();
    println!("Stored scans: {}", scans);
    println!("Stored comparisons: {}", comparisons);

    Ok(())
}
