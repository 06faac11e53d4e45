//! SQLite persistence for review findings.
//!
//! Every decoded record is stored with the commit hash and branch it was
//! produced for. Databases created before those columns existed are migrated
//! in place on open.

use std::path::Path;

use chrono::Utc;
use preflight_core::{LineRange, PreflightError, Record};
use rusqlite::{params, Connection};
use tracing::{debug, info};

/// SQLite-backed store of review findings.
///
/// # Examples
///
/// ```
/// use preflight_review::store::ReviewStore;
///
/// let store = ReviewStore::in_memory().unwrap();
/// assert_eq!(store.count().unwrap(), 0);
/// ```
pub struct ReviewStore {
    conn: Connection,
}

impl ReviewStore {
    /// Open or create a store at the given path.
    ///
    /// Missing parent directories are created.
    ///
    /// # Errors
    ///
    /// Returns [`PreflightError::Database`] if the database cannot be opened
    /// or migrated.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::path::Path;
    /// use preflight_review::store::ReviewStore;
    ///
    /// let store = ReviewStore::open(Path::new("/tmp/preflight/reviews.db")).unwrap();
    /// ```
    pub fn open(path: &Path) -> Result<Self, PreflightError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                PreflightError::Database(format!("failed to create database directory: {e}"))
            })?;
        }
        let conn = Connection::open(path)
            .map_err(|e| PreflightError::Database(format!("failed to open database: {e}")))?;

        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store.
    ///
    /// # Errors
    ///
    /// Returns [`PreflightError::Database`] if schema creation fails.
    pub fn in_memory() -> Result<Self, PreflightError> {
        let conn = Connection::open_in_memory().map_err(|e| {
            PreflightError::Database(format!("failed to create in-memory database: {e}"))
        })?;

        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), PreflightError> {
        self.conn
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS issues (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    file TEXT NOT NULL,
                    start_line INTEGER NOT NULL,
                    end_line INTEGER NOT NULL,
                    severity TEXT NOT NULL,
                    description TEXT NOT NULL,
                    suggestion TEXT NOT NULL,
                    code_snippet TEXT,
                    created_at TEXT NOT NULL
                );
                ",
            )
            .map_err(|e| PreflightError::Database(format!("failed to create schema: {e}")))?;

        self.migrate()
    }

    fn migrate(&self) -> Result<(), PreflightError> {
        let columns = self.columns("issues")?;
        for column in ["commit_hash", "branch"] {
            if !columns.iter().any(|c| c == column) {
                info!(column, "migrating issues table");
                self.conn
                    .execute(&format!("ALTER TABLE issues ADD COLUMN {column} TEXT"), [])
                    .map_err(|e| {
                        PreflightError::Database(format!("failed to add column {column}: {e}"))
                    })?;
            }
        }
        Ok(())
    }

    fn columns(&self, table: &str) -> Result<Vec<String>, PreflightError> {
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info({table})"))
            .map_err(|e| PreflightError::Database(format!("failed to inspect {table}: {e}")))?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .map_err(|e| PreflightError::Database(format!("failed to inspect {table}: {e}")))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| PreflightError::Database(format!("failed to read columns: {e}")))?;
        Ok(names)
    }

    /// Persist one record for the given change.
    ///
    /// # Errors
    ///
    /// Returns [`PreflightError::Database`] if the insert fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use preflight_core::{LineRange, Record};
    /// use preflight_review::store::ReviewStore;
    ///
    /// let store = ReviewStore::in_memory().unwrap();
    /// let record = Record {
    ///     file: "src/lib.rs".into(),
    ///     line: LineRange { start: 3, end: 4 },
    ///     severity: "HIGH".into(),
    ///     description: "unchecked index".into(),
    ///     suggestion: "use get()".into(),
    ///     code_snippet: None,
    /// };
    /// store.save(&record, "abc1234", "main").unwrap();
    /// assert_eq!(store.count().unwrap(), 1);
    /// ```
    pub fn save(&self, record: &Record, change_id: &str, branch: &str) -> Result<(), PreflightError> {
        self.conn
            .execute(
                "INSERT INTO issues
                    (file, start_line, end_line, severity, description, suggestion,
                     code_snippet, commit_hash, branch, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    record.file,
                    record.line.start,
                    record.line.end,
                    record.severity,
                    record.description,
                    record.suggestion,
                    record.code_snippet,
                    change_id,
                    branch,
                    Utc::now().to_rfc3339(),
                ],
            )
            .map_err(|e| PreflightError::Database(format!("failed to save issue: {e}")))?;
        debug!(file = %record.file, change_id, "saved issue");
        Ok(())
    }

    /// Total number of stored issues.
    ///
    /// # Errors
    ///
    /// Returns [`PreflightError::Database`] on query failure.
    pub fn count(&self) -> Result<usize, PreflightError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM issues", [], |row| row.get(0))
            .map_err(|e| PreflightError::Database(format!("failed to count issues: {e}")))?;
        Ok(count as usize)
    }

    /// Records stored for a change, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`PreflightError::Database`] on query failure.
    pub fn records_for(&self, change_id: &str) -> Result<Vec<Record>, PreflightError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT file, start_line, end_line, severity, description, suggestion, code_snippet
                 FROM issues WHERE commit_hash = ?1 ORDER BY id",
            )
            .map_err(|e| PreflightError::Database(format!("failed to prepare query: {e}")))?;

        let records = stmt
            .query_map(params![change_id], |row| {
                Ok(Record {
                    file: row.get(0)?,
                    line: LineRange {
                        start: row.get(1)?,
                        end: row.get(2)?,
                    },
                    severity: row.get(3)?,
                    description: row.get(4)?,
                    suggestion: row.get(5)?,
                    code_snippet: row.get(6)?,
                })
            })
            .map_err(|e| PreflightError::Database(format!("failed to query issues: {e}")))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| PreflightError::Database(format!("failed to read issue: {e}")))?;

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(file: &str, severity: &str) -> Record {
        Record {
            file: file.into(),
            line: LineRange { start: 10, end: 12 },
            severity: severity.into(),
            description: "something is off".into(),
            suggestion: "fix it".into(),
            code_snippet: Some("let x = y;".into()),
        }
    }

    #[test]
    fn save_and_read_back_by_change() {
        let store = ReviewStore::in_memory().unwrap();
        store.save(&sample("a.rs", "HIGH"), "c1", "main").unwrap();
        store.save(&sample("b.rs", "LOW"), "c2", "main").unwrap();
        store.save(&sample("c.rs", "INFO"), "c1", "main").unwrap();

        assert_eq!(store.count().unwrap(), 3);
        let records = store.records_for("c1").unwrap();
        let files: Vec<&str> = records.iter().map(|r| r.file.as_str()).collect();
        assert_eq!(files, vec!["a.rs", "c.rs"]);
        assert_eq!(records[0], sample("a.rs", "HIGH"));
    }

    #[test]
    fn missing_snippet_round_trips_as_none() {
        let store = ReviewStore::in_memory().unwrap();
        let mut record = sample("a.rs", "MEDIUM");
        record.code_snippet = None;
        store.save(&record, "c1", "dev").unwrap();
        assert!(store.records_for("c1").unwrap()[0].code_snippet.is_none());
    }

    #[test]
    fn unknown_change_has_no_records() {
        let store = ReviewStore::in_memory().unwrap();
        assert!(store.records_for("nope").unwrap().is_empty());
    }

    #[test]
    fn legacy_database_gains_new_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reviews.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE issues (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    file TEXT NOT NULL,
                    start_line INTEGER NOT NULL,
                    end_line INTEGER NOT NULL,
                    severity TEXT NOT NULL,
                    description TEXT NOT NULL,
                    suggestion TEXT NOT NULL,
                    code_snippet TEXT,
                    created_at TEXT NOT NULL
                );
                INSERT INTO issues (file, start_line, end_line, severity, description, suggestion, created_at)
                VALUES ('old.rs', 1, 1, 'LOW', 'd', 's', '2024-01-01T00:00:00Z');",
            )
            .unwrap();
        }

        let store = ReviewStore::open(&path).unwrap();
        let columns = store.columns("issues").unwrap();
        assert!(columns.iter().any(|c| c == "commit_hash"));
        assert!(columns.iter().any(|c| c == "branch"));
        assert_eq!(store.count().unwrap(), 1);

        store.save(&sample("new.rs", "HIGH"), "c9", "main").unwrap();
        drop(store);

        // Reopening an already-migrated database is a no-op.
        let store = ReviewStore::open(&path).unwrap();
        assert_eq!(store.count().unwrap(), 2);
        assert_eq!(store.records_for("c9").unwrap().len(), 1);
    }
}
