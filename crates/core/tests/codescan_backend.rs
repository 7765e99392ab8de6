#![cfg(feature = "codescan-backend")]

use codescan_core::model::Category;
use codescan_core::services::backends::CodescanBackend;
use codescan_core::services::{ScanError, ScanRequest, ScannerConfig, ScannerHandle};

#[test]
fn codescan_backend_errors_for_missing_binary() {
    std::env::set_var("CODESCAN_FAKE_VERSION", "codescanner 0.0-fake");
    let mut handle = ScannerHandle::init(&CodescanBackend, ScannerConfig::default()).unwrap();
    let err = handle.scan(&ScanRequest::whole_file("does_not_exist.bin")).unwrap_err();
    assert!(matches!(err, ScanError::MissingBinary(_)));
}

#[test]
fn codescan_backend_parses_fake_json_without_engine_installed() {
    let temp = tempfile::tempdir().unwrap();
    let bin = temp.path().join("bin");
    std::fs::write(&bin, vec![0u8; 8192]).unwrap();

    let fake_json = temp.path().join("scan.json");
    std::fs::write(
        &fake_json,
        r#"{"status":0,"regions":{
            "Code":[[0,4096,"Mips",32,2]],
            "Zero":[[4096,8192]],
            "Bogus":[[1,2]]
        }}"#,
    )
    .unwrap();
    std::env::set_var("CODESCAN_FAKE_JSON", &fake_json);
    std::env::set_var("CODESCAN_FAKE_VERSION", "codescanner 0.0-fake");

    let mut handle = ScannerHandle::init(&CodescanBackend, ScannerConfig::default()).unwrap();
    assert_eq!(handle.version(), "codescanner 0.0-fake");
    let regions = handle.scan(&ScanRequest::whole_file(&bin)).unwrap();
    assert_eq!(regions.categories().collect::<Vec<_>>(), vec![Category::Code, Category::Zero]);
    assert_eq!(regions.code_label().as_deref(), Some("Mips-32-be"));

    std::env::remove_var("CODESCAN_FAKE_JSON");
}
