//! Workspace configuration, layout and the results database.
//!
//! A workspace is a directory holding `.codescan/` with:
//! - `config.json` (or `config.yaml`): scanner backend and analysis defaults.
//! - `results.db`: SQLite history of scans and alien-code comparisons.
//! - `recordings/`: JSON scanner output consumed by the replay backend.

mod config;
mod context;
mod layout;
mod models;
mod results_db;
mod util;

pub use config::{
    AnalysisSettings, DbConfig, ScannerSettings, WorkspaceConfig, DEFAULT_MAX_WINDOW,
};
pub use context::WorkspaceContext;
pub use layout::WorkspaceLayout;
pub use models::{ComparisonRecord, ScanRecord};
pub use results_db::{DbError, DbResult, ResultsDb, CURRENT_SCHEMA_VERSION};
pub use util::{
    config_file, load_config_file, load_workspace_config, open_results_db, save_workspace_config,
};
