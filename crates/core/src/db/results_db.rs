use std::path::Path;

use rusqlite::{params, Connection};
use thiserror::Error;

use crate::analysis::SizeSummary;
use crate::db::{ComparisonRecord, ScanRecord};

/// Minimum schema version we know how to handle.
///
/// `0` means "no schema yet" (fresh DB).
const MIN_SUPPORTED_SCHEMA_VERSION: i32 = 0;

/// Latest schema version this crate knows about.
pub const CURRENT_SCHEMA_VERSION: i32 = 2;

/// Error type for results database operations.
#[derive(Debug, Error)]
pub enum DbError {
    /// Underlying SQLite error.
    #[error("SQLite error: {0}")]
    Sql(#[from] rusqlite::Error),

    /// A stored size summary could not be encoded or decoded.
    #[error("Stored size summary is malformed: {0}")]
    Sizes(#[from] serde_json::Error),

    /// The database was created with a newer schema version than we support.
    #[error(
        "Unsupported schema version {found}; supported range is {min_supported}..={max_supported}"
    )]
    UnsupportedSchemaVersion { found: i32, min_supported: i32, max_supported: i32 },
}

/// Convenience result type for DB operations.
pub type DbResult<T> = Result<T, DbError>;

/// SQLite store of past scans and comparisons.
#[derive(Debug)]
pub struct ResultsDb {
    conn: Connection,
}

impl ResultsDb {
    /// Open (or create) a results database and bring its schema up to date.
    pub fn open(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        apply_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// In-memory database, used by tests and dry runs.
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        apply_migrations(&conn)?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn schema_version(&self) -> DbResult<i32> {
        current_schema_version(&self.conn)
    }

    /// Insert a scan record and return its row id.
    pub fn insert_scan(&self, record: &ScanRecord) -> DbResult<i64> {
        let sizes_json = record.sizes.as_ref().map(serde_json::to_string).transpose()?;
        self.conn.execute(
            r#"
            INSERT INTO scans (path, sha256, file_size, window_start, window_end, header,
                               backend, verdict, architecture, sizes_json, scanned_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                record.path,
                record.sha256,
                record.file_size as i64,
                record.window_start as i64,
                record.window_end as i64,
                record.header,
                record.backend,
                record.verdict,
                record.architecture,
                sizes_json,
                record.scanned_at,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// List scans in insertion order, optionally only those of one path.
    pub fn list_scans(&self, path: Option<&str>) -> DbResult<Vec<ScanRecord>> {
        let sql = match path {
            Some(_) => {
                r#"
                SELECT path, sha256, file_size, window_start, window_end, header,
                       backend, verdict, architecture, sizes_json, scanned_at
                FROM scans
                WHERE path = ?1
                ORDER BY id
                "#
            }
            None => {
                r#"
                SELECT path, sha256, file_size, window_start, window_end, header,
                       backend, verdict, architecture, sizes_json, scanned_at
                FROM scans
                ORDER BY id
                "#
            }
        };
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = match path {
            Some(p) => stmt.query(params![p])?,
            None => stmt.query([])?,
        };

        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let sizes_json: Option<String> = row.get(9)?;
            let sizes: Option<SizeSummary> =
                sizes_json.as_deref().map(serde_json::from_str).transpose()?;
            out.push(ScanRecord {
                path: row.get(0)?,
                sha256: row.get(1)?,
                file_size: row.get::<_, i64>(2)? as u64,
                window_start: row.get::<_, i64>(3)? as u64,
                window_end: row.get::<_, i64>(4)? as u64,
                header: row.get(5)?,
                backend: row.get(6)?,
                verdict: row.get(7)?,
                architecture: row.get(8)?,
                sizes,
                scanned_at: row.get(10)?,
            });
        }
        Ok(out)
    }

    /// Insert a comparison record and return its row id.
    pub fn insert_comparison(&self, record: &ComparisonRecord) -> DbResult<i64> {
        self.conn.execute(
            r#"
            INSERT INTO comparisons
                (path, confirmed_bytes, alien_bytes, alien_label, outcome, compared_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                record.path,
                record.confirmed_bytes as i64,
                record.alien_bytes as i64,
                record.alien_label,
                record.outcome,
                record.compared_at,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// List comparisons, optionally filtered by path.
    pub fn list_comparisons(&self, path: Option<&str>) -> DbResult<Vec<ComparisonRecord>> {
        fn map_comparison(row: &rusqlite::Row<'_>) -> rusqlite::Result<ComparisonRecord> {
            Ok(ComparisonRecord {
                path: row.get(0)?,
                confirmed_bytes: row.get::<_, i64>(1)? as u64,
                alien_bytes: row.get::<_, i64>(2)? as u64,
                alien_label: row.get(3)?,
                outcome: row.get(4)?,
                compared_at: row.get(5)?,
            })
        }

        let mut stmt = if path.is_some() {
            self.conn.prepare(
                r#"
                SELECT path, confirmed_bytes, alien_bytes, alien_label, outcome, compared_at
                FROM comparisons
                WHERE path = ?1
                ORDER BY id
                "#,
            )?
        } else {
            self.conn.prepare(
                r#"
                SELECT path, confirmed_bytes, alien_bytes, alien_label, outcome, compared_at
                FROM comparisons
                ORDER BY id
                "#,
            )?
        };

        let rows = if let Some(p) = path {
            stmt.query_map(params![p], map_comparison)?
        } else {
            stmt.query_map([], map_comparison)?
        };

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

/// Bring the database to [`CURRENT_SCHEMA_VERSION`] using `PRAGMA user_version`.
///
/// Version map:
/// - 0: no schema
/// - 1: scans
/// - 2: comparisons
fn apply_migrations(conn: &Connection) -> DbResult<()> {
    let current_version = current_schema_version(conn)?;

    if current_version > CURRENT_SCHEMA_VERSION {
        return Err(DbError::UnsupportedSchemaVersion {
            found: current_version,
            min_supported: MIN_SUPPORTED_SCHEMA_VERSION,
            max_supported: CURRENT_SCHEMA_VERSION,
        });
    }

    if current_version == 0 {
        conn.execute_batch(
            r#"
            BEGIN;
            CREATE TABLE IF NOT EXISTS scans (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                path         TEXT NOT NULL,
                sha256       TEXT,
                file_size    INTEGER NOT NULL,
                window_start INTEGER NOT NULL,
                window_end   INTEGER NOT NULL,
                header       TEXT,
                backend      TEXT NOT NULL,
                verdict      TEXT NOT NULL,
                architecture TEXT,
                sizes_json   TEXT,
                scanned_at   TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS scans_path ON scans (path);

            PRAGMA user_version = 1;
            COMMIT;
            "#,
        )?;
    }

    if current_version < 2 {
        conn.execute_batch(
            r#"
            BEGIN;
            CREATE TABLE IF NOT EXISTS comparisons (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                path            TEXT NOT NULL,
                confirmed_bytes INTEGER NOT NULL,
                alien_bytes     INTEGER NOT NULL,
                alien_label     TEXT NOT NULL,
                outcome         TEXT NOT NULL,
                compared_at     TEXT NOT NULL
            );

            PRAGMA user_version = 2;
            COMMIT;
            "#,
        )?;
    }

    Ok(())
}

fn current_schema_version(conn: &Connection) -> DbResult<i32> {
    let version: i32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    Ok(version)
}
