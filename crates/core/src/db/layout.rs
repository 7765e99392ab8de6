use std::path::{Path, PathBuf};

/// Logical layout of a codescan workspace on disk.
///
/// This is derived from a chosen root path. It does *not* perform any IO itself.
/// The CLI or other frontends are responsible for actually creating directories
/// and files based on this layout.
#[derive(Debug, Clone)]
pub struct WorkspaceLayout {
    /// Root directory of the workspace.
    pub root: PathBuf,
    /// Directory for internal metadata (.codescan).
    pub meta_dir: PathBuf,
    /// Path to the workspace config file (JSON).
    pub config_path: PathBuf,
    /// Alternative YAML config files, checked when the JSON one is absent.
    pub yaml_config_paths: [PathBuf; 2],
    /// Path to the results database file.
    pub db_path: PathBuf,
    /// Directory for exported reports (reports).
    pub reports_dir: PathBuf,
    /// Directory for recorded scanner output used by the replay backend.
    pub recordings_dir: PathBuf,
}

impl WorkspaceLayout {
    /// Compute the default layout for a workspace rooted at `root`.
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        let meta_dir = root.join(".codescan");
        let config_path = meta_dir.join("config.json");
        let yaml_config_paths = [meta_dir.join("config.yaml"), meta_dir.join("config.yml")];
        let db_path = meta_dir.join("results.db");
        let reports_dir = root.join("reports");
        let recordings_dir = meta_dir.join("recordings");

        Self {
            root,
            meta_dir,
            config_path,
            yaml_config_paths,
            db_path,
            reports_dir,
            recordings_dir,
        }
    }

    /// Database path string suitable for storing in `WorkspaceConfig`,
    /// relative to `root` when possible.
    pub fn db_path_relative_string(&self) -> String {
        relative_string(&self.root, &self.db_path)
    }

    /// Recordings directory string for the default config.
    pub fn recordings_relative_string(&self) -> String {
        relative_string(&self.root, &self.recordings_dir)
    }

    /// Resolve a path from the config: absolute paths stay, relative ones are
    /// joined to `root`.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Report file for a scanned binary, e.g. `reports/ls.json`.
    pub fn report_path(&self, binary_name: &str) -> PathBuf {
        self.reports_dir.join(format!("{binary_name}.json"))
    }
}

fn relative_string(root: &Path, path: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(rel) => rel.to_string_lossy().to_string(),
        Err(_) => path.to_string_lossy().to_string(),
    }
}
