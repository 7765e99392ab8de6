use std::fs;
use std::path::Path;

use codescan_cli::{canonicalize_or_current, infer_workspace_name, parse_offset_arg, sha256_file};
use tempfile::tempdir;

#[test]
fn canonicalize_or_current_handles_dot_and_relative_paths() {
    let original = std::env::current_dir().expect("cwd");
    let tmp = tempdir().expect("tempdir");
    let subdir = tmp.path().join("nested");
    fs::create_dir_all(&subdir).expect("create nested");
    std::env::set_current_dir(tmp.path()).expect("chdir tmp");

    let dot = canonicalize_or_current(".").expect("canonicalize").canonicalize().expect("canon");
    assert_eq!(dot, tmp.path().canonicalize().expect("canon tmp"));

    let nested = canonicalize_or_current("nested").expect("canonicalize nested");
    assert_eq!(nested, subdir.canonicalize().expect("canonicalize subdir"));

    let missing = canonicalize_or_current("not-yet").expect("missing path");
    assert!(missing.ends_with("not-yet"));
    assert!(missing.is_absolute());

    std::env::set_current_dir(original).expect("restore cwd");
}

#[test]
fn infer_workspace_name_uses_last_path_component() {
    assert_eq!(infer_workspace_name(Path::new("/tmp/samples")), "samples");
    assert_eq!(infer_workspace_name(Path::new("/")), "unnamed-workspace");
}

#[test]
fn sha256_of_known_content() {
    let tmp = tempdir().expect("tempdir");
    let path = tmp.path().join("abc");
    fs::write(&path, b"abc").expect("write");
    assert_eq!(
        sha256_file(&path).expect("hash"),
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
    assert!(sha256_file(&tmp.path().join("missing")).is_err());
}

#[test]
fn offsets_accept_decimal_and_hex() {
    assert_eq!(parse_offset_arg("4096"), Ok(4096));
    assert_eq!(parse_offset_arg("0x1000"), Ok(4096));
    assert!(parse_offset_arg("4k").is_err());
}
