use codescan_core::analysis::SizeSummary;
use codescan_core::db::{
    ComparisonRecord, ResultsDb, ScanRecord, WorkspaceLayout, CURRENT_SCHEMA_VERSION,
};
use tempfile::tempdir;

fn scan(path: &str, verdict: &str) -> ScanRecord {
    ScanRecord {
        path: path.to_string(),
        sha256: Some("ab".repeat(32)),
        file_size: 61_440,
        window_start: 0,
        window_end: 0,
        header: Some("ELF".to_string()),
        backend: "replay".to_string(),
        verdict: verdict.to_string(),
        architecture: Some("Intel-64".to_string()),
        sizes: Some(SizeSummary {
            code: 2048,
            high_entropy: 59_392,
            file_size: 61_440,
            ..SizeSummary::default()
        }),
        scanned_at: "2026-10-16T10:00:00Z".to_string(),
    }
}

#[test]
fn results_db_initializes_and_persists_scans() {
    let dir = tempdir().expect("tempdir");
    let db_path = dir.path().join("results.db");

    {
        let db = ResultsDb::open(&db_path).expect("open db");
        assert_eq!(db.schema_version().expect("schema version"), CURRENT_SCHEMA_VERSION);

        let id = db.insert_scan(&scan("/bin/packed", "(P)")).expect("insert scan");
        assert!(id > 0);
        db.insert_scan(&scan("/bin/normal", "(N)")).expect("insert scan");
    }

    // Re-open sees the existing schema and data.
    let db = ResultsDb::open(&db_path).expect("re-open db");
    let all = db.list_scans(None).expect("list scans");
    assert_eq!(all.len(), 2);
    assert_eq!(all[0], scan("/bin/packed", "(P)"));

    let filtered = db.list_scans(Some("/bin/normal")).expect("filter scans");
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].verdict, "(N)");
    assert!(db.list_scans(Some("/bin/other")).expect("filter scans").is_empty());
}

#[test]
fn scans_without_sizes_round_trip_as_none() {
    let db = ResultsDb::open_in_memory().expect("open in-memory db");
    let mut record = scan("/bin/empty-scan", "(X)");
    record.sizes = None;
    record.architecture = None;
    db.insert_scan(&record).expect("insert");
    assert_eq!(db.list_scans(None).expect("list"), vec![record]);
}

#[test]
fn comparisons_are_listed_per_path() {
    let db = ResultsDb::open_in_memory().expect("open in-memory db");
    let record = ComparisonRecord {
        path: "/bin/ls".to_string(),
        confirmed_bytes: 3116,
        alien_bytes: 476,
        alien_label: "Intel-64".to_string(),
        outcome: "reconciled".to_string(),
        compared_at: "2026-10-16T10:00:00Z".to_string(),
    };
    db.insert_comparison(&record).expect("insert comparison");
    db.insert_comparison(&ComparisonRecord { path: "/bin/cat".into(), ..record.clone() })
        .expect("insert comparison");

    assert_eq!(db.list_comparisons(None).expect("list").len(), 2);
    assert_eq!(db.list_comparisons(Some("/bin/ls")).expect("list"), vec![record]);
}

#[test]
fn version_one_database_is_upgraded() {
    let dir = tempdir().expect("tempdir");
    let db_path = dir.path().join("results.db");
    {
        let conn = rusqlite::Connection::open(&db_path).expect("open raw sqlite db");
        conn.execute_batch(
            r#"
            CREATE TABLE scans (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                path TEXT NOT NULL, sha256 TEXT, file_size INTEGER NOT NULL,
                window_start INTEGER NOT NULL, window_end INTEGER NOT NULL,
                header TEXT, backend TEXT NOT NULL, verdict TEXT NOT NULL,
                architecture TEXT, sizes_json TEXT, scanned_at TEXT NOT NULL
            );
            PRAGMA user_version = 1;
            "#,
        )
        .expect("create v1 schema");
    }

    let db = ResultsDb::open(&db_path).expect("open v1 db");
    assert_eq!(db.schema_version().expect("version"), 2);
    assert!(db.list_comparisons(None).expect("comparisons table exists").is_empty());
}

#[test]
fn results_db_open_errors_on_unsupported_schema_version() {
    let tmp = tempdir().expect("temp dir");
    let layout = WorkspaceLayout::new(tmp.path());
    std::fs::create_dir_all(&layout.meta_dir).expect("create .codescan dir");

    {
        let conn = rusqlite::Connection::open(&layout.db_path).expect("open raw sqlite db");
        conn.pragma_update(None, "user_version", 99_i32).expect("set user_version pragma");
    }

    match ResultsDb::open(&layout.db_path) {
        Err(codescan_core::db::DbError::UnsupportedSchemaVersion {
            found,
            min_supported,
            max_supported,
        }) => {
            assert_eq!(found, 99);
            assert_eq!(min_supported, 0);
            assert_eq!(max_supported, 2);
        }
        Err(err) => panic!("expected UnsupportedSchemaVersion, got: {err}"),
        Ok(_) => panic!("expected UnsupportedSchemaVersion error, got Ok(_)"),
    }
}
