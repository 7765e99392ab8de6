use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::model::{Architecture, Category, Endianness, Interval, Region, RegionSet};

/// Status codes reported by the native scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanStatus {
    Success,
    FileError,
    EngineError,
    PathLength,
    UserInput,
    OutOfMemory,
    Unsupported,
}

impl ScanStatus {
    pub fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            0 => ScanStatus::Success,
            1 => ScanStatus::FileError,
            2 => ScanStatus::EngineError,
            3 => ScanStatus::PathLength,
            4 => ScanStatus::UserInput,
            5 => ScanStatus::OutOfMemory,
            6 => ScanStatus::Unsupported,
            _ => return None,
        })
    }

    /// Symbolic name as printed by the scanner.
    pub fn name(self) -> &'static str {
        match self {
            ScanStatus::Success => "STATUS_SUCCESS",
            ScanStatus::FileError => "ERROR_FILE",
            ScanStatus::EngineError => "ERROR_IN_ENGINE",
            ScanStatus::PathLength => "ERROR_CODESCANNER_PATH_TOO_LONG_OR_SHORT",
            ScanStatus::UserInput => "ERROR_USERINPUT_WRONG",
            ScanStatus::OutOfMemory => "ERROR_OUT_OF_MEMORY",
            ScanStatus::Unsupported => "ERROR_UNSUPPORTED_OPERATION",
        }
    }
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Binary not found at {0}")]
    MissingBinary(PathBuf),
    #[error("Binary is empty: {0}")]
    EmptyBinary(PathBuf),
    #[error("Scanner backend not found: {name} (available: {available})")]
    MissingBackend { name: String, available: String },
    #[error("Scanner failed with status {code} ({name})")]
    Status { code: i32, name: &'static str },
    #[error("Scanner backend error: {0}")]
    Backend(String),
}

/// Tool locations handed to backends; all optional, backends fall back to
/// environment variables and defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannerConfig {
    pub tool_path: Option<PathBuf>,
    /// Directory holding the scanner's language (ISA model) files.
    pub lang_path: Option<PathBuf>,
    /// Directory with recorded scanner output for the replay backend.
    pub replay_dir: Option<PathBuf>,
}

/// One scan of `[start, end)` of a file; `(0, 0)` scans the whole file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRequest {
    pub path: PathBuf,
    pub start: u64,
    pub end: u64,
    pub aggressive: bool,
}

impl ScanRequest {
    pub fn whole_file(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), start: 0, end: 0, aggressive: false }
    }
}

/// Trait implemented by scanner backends (the native helper, recorded output).
pub trait ScannerBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Verify the backend is usable and return a version string.
    fn prepare(&self, config: &ScannerConfig) -> Result<String, ScanError>;

    fn scan(&self, config: &ScannerConfig, request: &ScanRequest) -> Result<RegionSet, ScanError>;
}

/// Registry for scanner backends; callers select by name.
#[derive(Default)]
pub struct ScannerRegistry {
    backends: HashMap<String, Box<dyn ScannerBackend>>,
}

impl ScannerRegistry {
    pub fn new() -> Self {
        Self { backends: HashMap::new() }
    }

    pub fn register<B: ScannerBackend + 'static>(&mut self, backend: B) -> &mut Self {
        self.backends.insert(backend.name().to_string(), Box::new(backend));
        self
    }

    pub fn get(&self, name: &str) -> Option<&dyn ScannerBackend> {
        self.backends.get(name).map(|b| &**b)
    }

    /// Like [`get`](Self::get) but with an error listing what is available.
    pub fn require(&self, name: &str) -> Result<&dyn ScannerBackend, ScanError> {
        self.get(name).ok_or_else(|| ScanError::MissingBackend {
            name: name.to_string(),
            available: self.names().join(", "),
        })
    }

    /// Sorted list of registered backend names for error messages/help.
    pub fn names(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.backends.keys().cloned().collect();
        keys.sort();
        keys
    }
}

/// Registry populated with every backend compiled into this build.
pub fn default_scanner_registry() -> ScannerRegistry {
    #[allow(unused_mut)]
    let mut registry = ScannerRegistry::new();
    #[cfg(feature = "codescan-backend")]
    {
        registry.register(crate::services::backends::CodescanBackend);
    }
    #[cfg(feature = "replay-backend")]
    {
        registry.register(crate::services::backends::ReplayBackend);
    }
    registry
}

/// An initialized scanner. Scanning needs `&mut self`, so one handle never
/// runs two scans at once; use separate handles for parallel work.
pub struct ScannerHandle<'a> {
    backend: &'a dyn ScannerBackend,
    config: ScannerConfig,
    version: String,
    scans: usize,
}

impl<'a> ScannerHandle<'a> {
    pub fn init(backend: &'a dyn ScannerBackend, config: ScannerConfig) -> Result<Self, ScanError> {
        let version = backend.prepare(&config)?;
        info!(backend = backend.name(), %version, "scanner initialized");
        Ok(Self { backend, config, version, scans: 0 })
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Scan a file window. Missing and zero-length files are rejected before
    /// the backend runs.
    pub fn scan(&mut self, request: &ScanRequest) -> Result<RegionSet, ScanError> {
        let meta = fs::metadata(&request.path)
            .ok()
            .filter(|m| m.is_file())
            .ok_or_else(|| ScanError::MissingBinary(request.path.clone()))?;
        if meta.len() == 0 {
            return Err(ScanError::EmptyBinary(request.path.clone()));
        }

        debug!(
            backend = self.backend.name(),
            path = %request.path.display(),
            start = request.start,
            end = request.end,
            aggressive = request.aggressive,
            "running scanner"
        );
        let regions = self.backend.scan(&self.config, request)?;
        self.scans += 1;
        debug!(regions = regions.region_count(), "scanner returned");
        Ok(regions)
    }

    /// Release the handle; returns the number of completed scans.
    pub fn shutdown(self) -> usize {
        info!(backend = self.backend.name(), scans = self.scans, "scanner shut down");
        self.scans
    }
}

/// One interval as emitted by the scanner: `[start, end]` for plain
/// categories, `[start, end, isa, bitness, endianness]` for code. Older
/// recordings carry only the ISA label as third field.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawInterval {
    Typed(u64, u64, String, u32, u32),
    Labelled(u64, u64, String),
    Plain(u64, u64),
}

#[derive(Debug, Deserialize)]
struct RawScanOutput {
    status: i32,
    #[serde(default)]
    regions: BTreeMap<String, Vec<RawInterval>>,
}

/// Parse the scanner's JSON envelope into a tagged region set.
///
/// A non-zero status becomes [`ScanError::Status`]. Unknown categories and
/// empty or inverted intervals are dropped with a warning.
pub fn parse_scan_output(body: &str) -> Result<RegionSet, ScanError> {
    let raw: RawScanOutput = serde_json::from_str(body)
        .map_err(|e| ScanError::Backend(format!("failed to parse scanner JSON: {e}")))?;

    match ScanStatus::from_code(raw.status) {
        Some(ScanStatus::Success) => {}
        Some(status) => return Err(ScanError::Status { code: raw.status, name: status.name() }),
        None => return Err(ScanError::Status { code: raw.status, name: "UNKNOWN_STATUS" }),
    }

    let mut set = RegionSet::new();
    for (name, intervals) in raw.regions {
        let category: Category = match name.parse() {
            Ok(c) => c,
            Err(_) => {
                warn!(category = %name, "ignoring unknown scanner category");
                continue;
            }
        };
        let mut regions = Vec::with_capacity(intervals.len());
        for raw in intervals {
            let (start, end, architecture) = match raw {
                RawInterval::Plain(s, e) => (s, e, None),
                RawInterval::Labelled(s, e, isa) => {
                    (s, e, Some(Architecture::new(isa, 0, Endianness::Unknown)))
                }
                RawInterval::Typed(s, e, isa, bitness, endian) => {
                    (s, e, Some(Architecture::new(isa, bitness, Endianness::from_code(endian))))
                }
            };
            let Some(interval) = Interval::checked(start, end) else {
                warn!(%category, start, end, "dropping empty scanner interval");
                continue;
            };
            let architecture = if category.is_code() { architecture } else { None };
            regions.push(Region { interval, architecture });
        }
        set.insert(category, regions);
    }
    Ok(set)
}

/// Read a scanner JSON document from disk.
pub fn read_scan_output(path: &Path) -> Result<RegionSet, ScanError> {
    let body = fs::read_to_string(path).map_err(|e| {
        ScanError::Backend(format!("failed to read scanner output {}: {e}", path.display()))
    })?;
    parse_scan_output(&body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_typed_intervals() {
        let body = r#"{
            "status": 0,
            "regions": {
                "Code": [[4096, 7680, "Intel", 64, 1]],
                "Data": [[0, 512], [1024, 2048]],
                "Zero": [[8704, 11776]]
            }
        }"#;
        let set = parse_scan_output(body).unwrap();
        assert_eq!(
            set.get(Category::Code),
            &[Region::code(4096, 7680, Architecture::new("Intel", 64, Endianness::Little))]
        );
        assert_eq!(set.get(Category::Data), &[Region::plain(0, 512), Region::plain(1024, 2048)]);
        assert_eq!(set.get(Category::Zero).len(), 1);
    }

    #[test]
    fn labelled_code_keeps_isa_only() {
        let body = r#"{"status":0,"regions":{"Code":[[0,16,"Intel-32"]]}}"#;
        let set = parse_scan_output(body).unwrap();
        let arch = set.get(Category::Code)[0].architecture.clone().unwrap();
        assert_eq!(arch.full_label(), "Intel-32");
    }

    #[test]
    fn non_success_status_maps_to_symbolic_name() {
        let err = parse_scan_output(r#"{"status":5}"#).unwrap_err();
        match err {
            ScanError::Status { code, name } => {
                assert_eq!(code, 5);
                assert_eq!(name, "ERROR_OUT_OF_MEMORY");
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(matches!(
            parse_scan_output(r#"{"status":42}"#),
            Err(ScanError::Status { code: 42, .. })
        ));
    }

    #[test]
    fn drops_unknown_categories_and_empty_intervals() {
        let body = r#"{"status":0,"regions":{"Dump":[[0,4]],"Ascii":[[8,8],[8,12]]}}"#;
        let set = parse_scan_output(body).unwrap();
        assert_eq!(set.categories().collect::<Vec<_>>(), vec![Category::Ascii]);
        assert_eq!(set.get(Category::Ascii), &[Region::plain(8, 12)]);
    }

    #[test]
    fn garbage_is_a_backend_error() {
        assert!(matches!(parse_scan_output("not json"), Err(ScanError::Backend(_))));
    }

    #[test]
    fn status_codes_round_trip() {
        for code in 0..=6 {
            assert!(ScanStatus::from_code(code).is_some());
        }
        assert_eq!(ScanStatus::from_code(7), None);
        assert_eq!(
            ScanStatus::from_code(3).unwrap().name(),
            "ERROR_CODESCANNER_PATH_TOO_LONG_OR_SHORT"
        );
    }

    #[test]
    fn registry_lists_sorted_names_and_reports_missing() {
        let registry = default_scanner_registry();
        let names = registry.names();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        match registry.require("nope") {
            Err(ScanError::MissingBackend { name, .. }) => assert_eq!(name, "nope"),
            Err(other) => panic!("unexpected error {other:?}"),
            Ok(_) => panic!("nope should not be registered"),
        }
    }
}
