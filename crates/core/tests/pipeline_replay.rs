use std::fs;
use std::path::{Path, PathBuf};

use codescan_core::analysis::{analyze, compare, AnalysisError, FileVerdict, ReconcileOutcome};
use codescan_core::model::Category;
use codescan_core::services::backends::ReplayBackend;
use codescan_core::services::{executable_sections, ScannerConfig, ScannerHandle};
use object::write::Object;
use object::{Architecture, BinaryFormat, Endianness, SectionKind};
use tempfile::TempDir;

struct Fixture {
    dir: TempDir,
    recordings: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let recordings = dir.path().join("recordings");
        fs::create_dir_all(&recordings).unwrap();
        Self { dir, recordings }
    }

    fn binary(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, bytes).unwrap();
        path
    }

    fn record(&self, binary: &Path, json: &str) {
        let name = binary.file_name().unwrap().to_string_lossy();
        fs::write(self.recordings.join(format!("{name}.json")), json).unwrap();
    }

    fn config(&self) -> ScannerConfig {
        ScannerConfig { replay_dir: Some(self.recordings.clone()), ..ScannerConfig::default() }
    }
}

#[test]
fn high_entropy_file_with_little_code_is_packed() {
    let fx = Fixture::new();
    let bin = fx.binary("packed.bin", &vec![0xAA; 61_440]);
    fx.record(
        &bin,
        r#"{"status":0,"regions":{
            "Code":[[0,1024,"Intel",64,1],[1024,2048,"Intel",64,1]],
            "HighEntropy":[[2048,61440]]
        }}"#,
    );

    let mut handle = ScannerHandle::init(&ReplayBackend, fx.config()).unwrap();
    let report = analyze(&mut handle, &bin, 0, 0, false).unwrap();

    assert_eq!(report.header, None);
    assert_eq!(report.verdict, FileVerdict::Packed);
    // Adjacent code regions are merged.
    assert_eq!(report.regions.get(Category::Code).len(), 1);
    let sizes = report.sizes.unwrap();
    assert_eq!((sizes.code, sizes.high_entropy, sizes.file_size), (2048, 59_392, 61_440));
    let decision = report.decision.as_ref().unwrap();
    assert!(decision.code_exists && !decision.code_sufficient && decision.veto_i);
    assert_eq!(report.code_label.as_deref(), Some("Intel-64"));
    assert_eq!(report.architecture.unwrap().isa, "Intel");
    assert_eq!(handle.shutdown(), 1);
}

#[test]
fn empty_scan_yields_no_evaluation() {
    let fx = Fixture::new();
    let bin = fx.binary("blank.bin", &[1u8; 4096]);
    fx.record(&bin, r#"{"status":0,"regions":{}}"#);

    let mut handle = ScannerHandle::init(&ReplayBackend, fx.config()).unwrap();
    let report = analyze(&mut handle, &bin, 0, 0, false).unwrap();
    assert_eq!(report.verdict, FileVerdict::NoEvaluationPossible);
    assert!(report.sizes.is_none());
    assert!(report.decision.is_none());
    assert!(report.regions.is_empty());
}

#[test]
fn invalid_inputs_are_rejected_before_scanning() {
    let fx = Fixture::new();
    let bin = fx.binary("small.bin", &[0u8; 100]);
    let mut handle = ScannerHandle::init(&ReplayBackend, fx.config()).unwrap();

    let err = analyze(&mut handle, &bin, 50, 10, false).unwrap_err();
    assert!(err.is_invalid_input());
    let err = analyze(&mut handle, &fx.dir.path().join("missing"), 0, 0, false).unwrap_err();
    assert!(matches!(err, AnalysisError::MissingBinary(_)));
    assert!(err.is_invalid_input());

    let empty = fx.binary("empty.bin", b"");
    let err = analyze(&mut handle, &empty, 0, 0, false).unwrap_err();
    assert!(matches!(err, AnalysisError::EmptyBinary(_)));
    assert_eq!(handle.shutdown(), 0);
}

#[test]
fn scanner_status_errors_surface_as_external() {
    let fx = Fixture::new();
    let bin = fx.binary("bad.bin", &[7u8; 2048]);
    fx.record(&bin, r#"{"status":2}"#);

    let mut handle = ScannerHandle::init(&ReplayBackend, fx.config()).unwrap();
    let err = analyze(&mut handle, &bin, 0, 0, false).unwrap_err();
    assert!(matches!(err, AnalysisError::External(_)));
    assert!(!err.is_invalid_input());
}

#[test]
fn compare_splits_code_into_declared_and_alien() {
    let fx = Fixture::new();
    let mut obj = Object::new(BinaryFormat::Elf, Architecture::X86_64, Endianness::Little);
    let text = obj.add_section(Vec::new(), b".text".to_vec(), SectionKind::Text);
    obj.section_mut(text).set_data(vec![0x90; 64], 16);
    let bin = fx.binary("fixture_elf", &obj.write().unwrap());
    let file_size = fs::metadata(&bin).unwrap().len();

    fx.record(
        &bin,
        &format!(r#"{{"status":0,"regions":{{"Code":[[0,{file_size},"Intel",64,1]]}}}}"#),
    );

    let mut handle = ScannerHandle::init(&ReplayBackend, fx.config()).unwrap();
    let report = compare(&mut handle, &bin).unwrap();

    let declared = executable_sections(&bin).unwrap()[".text"][0];
    assert!(report.sections_within_file);
    assert_eq!(report.reconciliation.outcome, ReconcileOutcome::Reconciled);
    assert_eq!(report.confirmed_bytes, declared.len());
    assert_eq!(report.alien_bytes, file_size - declared.len());
    assert_eq!(report.reconciliation.alien_label, "Intel-64");

    let confirmed = report.reconciliation.regions.get(Category::Code);
    assert_eq!(confirmed.len(), 1);
    assert_eq!((confirmed[0].start(), confirmed[0].end()), (declared.start, declared.end));
}

#[test]
fn compare_without_sections_is_skipped() {
    let fx = Fixture::new();
    let bin = fx.binary("raw.bin", &[0x90; 4096]);
    fx.record(&bin, r#"{"status":0,"regions":{"Code":[[0,4096,"Intel",32,1]]}}"#);

    let mut handle = ScannerHandle::init(&ReplayBackend, fx.config()).unwrap();
    let report = compare(&mut handle, &bin).unwrap();
    assert!(!report.reconciliation.is_reconciled());
    assert_eq!(report.alien_bytes, 0);
    assert_eq!(report.confirmed_bytes, 4096);
}

#[test]
fn sub_window_pads_and_sizes_by_window_length() {
    let fx = Fixture::new();
    let bin = fx.binary("windowed.bin", &vec![0x90; 8192]);
    // Recorded offsets are relative to the window start.
    fx.record(&bin, r#"{"status":0,"regions":{"Code":[[0,3584,"Intel",32,1]]}}"#);

    let mut handle = ScannerHandle::init(&ReplayBackend, fx.config()).unwrap();
    let report = analyze(&mut handle, &bin, 0x100, 0x1000, false).unwrap();

    assert_eq!(report.file_size, 8192);
    assert_eq!((report.window.start, report.window.end), (0x100, 0x1000));
    let data = report.regions.get(Category::Data);
    assert_eq!(data.len(), 1);
    assert_eq!((data[0].start(), data[0].end()), (3584, 3840));

    let sizes = report.sizes.unwrap();
    assert_eq!((sizes.code, sizes.data, sizes.file_size), (3584, 256, 3840));
    // 3584 of 3840 bytes is above the 90% code share.
    assert_eq!(report.verdict, FileVerdict::Corrupt);
}
