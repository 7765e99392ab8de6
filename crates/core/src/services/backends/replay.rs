use std::path::PathBuf;

use crate::model::RegionSet;
use crate::services::scanner::{
    read_scan_output, ScanError, ScanRequest, ScannerBackend, ScannerConfig,
};

/// Serves previously recorded scanner output from
/// `<replay_dir>/<file name>.json`, so analyses can be reproduced without the
/// native engine. Recordings are returned as stored; the request window is
/// not applied.
pub struct ReplayBackend;

impl ReplayBackend {
    fn replay_dir(config: &ScannerConfig) -> Result<PathBuf, ScanError> {
        config
            .replay_dir
            .clone()
            .ok_or_else(|| ScanError::Backend("replay directory not configured".to_string()))
    }
}

impl ScannerBackend for ReplayBackend {
    fn name(&self) -> &'static str {
        "replay"
    }

    fn prepare(&self, config: &ScannerConfig) -> Result<String, ScanError> {
        let dir = Self::replay_dir(config)?;
        if !dir.is_dir() {
            return Err(ScanError::Backend(format!(
                "replay directory does not exist: {}",
                dir.display()
            )));
        }
        Ok(format!("replay ({})", dir.display()))
    }

    fn scan(&self, config: &ScannerConfig, request: &ScanRequest) -> Result<RegionSet, ScanError> {
        let file_name = request
            .path
            .file_name()
            .ok_or_else(|| ScanError::MissingBinary(request.path.clone()))?;
        let mut recording = file_name.to_os_string();
        recording.push(".json");
        let path = Self::replay_dir(config)?.join(recording);
        if !path.is_file() {
            return Err(ScanError::Backend(format!("no recording at {}", path.display())));
        }
        read_scan_output(&path)
    }
}
