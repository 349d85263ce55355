//! SQLite-backed reference store.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use logadvisor_core::{SuccessPattern, SuccessSample, WorkflowSequence};
use rusqlite::{params, Connection, OptionalExtension};

use crate::records::{Application, LogSettings};
use crate::{ReferenceStore, StoreError};

/// SQLite-backed storage for reference data, solutions and analysis history.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (or creates) the database at `path`.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Creates an in-memory store (for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    pub(crate) fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Lock)
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS applications (
                app_id INTEGER PRIMARY KEY,
                app_name TEXT NOT NULL,
                log_source TEXT NOT NULL,
                description TEXT
            );

            CREATE TABLE IF NOT EXISTS log_settings (
                app_id INTEGER PRIMARY KEY,
                index_pattern TEXT NOT NULL,
                transaction_field TEXT NOT NULL,
                timestamp_field TEXT NOT NULL DEFAULT 'timestamp'
            );

            CREATE TABLE IF NOT EXISTS success_patterns (
                app_id INTEGER NOT NULL,
                order_type TEXT NOT NULL,
                workflow_sequence TEXT NOT NULL,
                PRIMARY KEY (app_id, order_type)
            );

            CREATE TABLE IF NOT EXISTS success_samples (
                sample_id INTEGER PRIMARY KEY AUTOINCREMENT,
                app_id INTEGER NOT NULL,
                order_type TEXT NOT NULL,
                wf_task_name TEXT NOT NULL,
                domain TEXT,
                expected_status TEXT,
                expected_response_code TEXT,
                expected_response_desc TEXT,
                task_sequence INTEGER NOT NULL,
                is_critical INTEGER NOT NULL DEFAULT 0,
                notes TEXT
            );

            CREATE TABLE IF NOT EXISTS solutions (
                solution_id INTEGER PRIMARY KEY AUTOINCREMENT,
                error_message TEXT NOT NULL,
                solution TEXT NOT NULL,
                solution_confidence REAL NOT NULL DEFAULT 0,
                solution_steps TEXT,
                severity TEXT
            );

            CREATE TABLE IF NOT EXISTS analyses (
                analysis_id TEXT PRIMARY KEY,
                app_id INTEGER NOT NULL,
                order_number TEXT NOT NULL,
                order_type TEXT,
                status TEXT NOT NULL,
                summary TEXT NOT NULL,
                result TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_samples_order ON success_samples(app_id, order_type, task_sequence);
            CREATE INDEX IF NOT EXISTS idx_solutions_confidence ON solutions(solution_confidence DESC);
            CREATE INDEX IF NOT EXISTS idx_analyses_created ON analyses(created_at DESC);
            CREATE INDEX IF NOT EXISTS idx_analyses_app ON analyses(app_id);
            "#,
        )?;

        Ok(())
    }

    /// Inserts or replaces an application.
    pub fn upsert_application(&self, app: &Application) -> Result<(), StoreError> {
        write_application(&*self.conn()?, app)
    }

    /// Inserts or replaces an application's log search settings.
    pub fn upsert_log_settings(&self, settings: &LogSettings) -> Result<(), StoreError> {
        write_log_settings(&*self.conn()?, settings)
    }

    /// Stores the success pattern for an application/order-type pair,
    /// replacing any previous one. Already-encoded sequences are kept as is.
    pub fn save_success_pattern(
        &self,
        app_id: i64,
        order_type: &str,
        pattern: &SuccessPattern,
    ) -> Result<(), StoreError> {
        write_success_pattern(&*self.conn()?, app_id, order_type, pattern)
    }

    /// Appends a success sample for an application/order-type pair.
    pub fn insert_success_sample(
        &self,
        app_id: i64,
        order_type: &str,
        sample: &SuccessSample,
    ) -> Result<(), StoreError> {
        write_success_sample(&*self.conn()?, app_id, order_type, sample)
    }
}

// Writers take a bare connection so that several of them can share one
// transaction.

pub(crate) fn write_application(conn: &Connection, app: &Application) -> Result<(), StoreError> {
    conn.execute(
        r#"INSERT OR REPLACE INTO applications (app_id, app_name, log_source, description)
           VALUES (?1, ?2, ?3, ?4)"#,
        params![app.app_id, app.app_name, app.log_source, app.description],
    )?;

    Ok(())
}

pub(crate) fn write_log_settings(
    conn: &Connection,
    settings: &LogSettings,
) -> Result<(), StoreError> {
    conn.execute(
        r#"INSERT OR REPLACE INTO log_settings
           (app_id, index_pattern, transaction_field, timestamp_field)
           VALUES (?1, ?2, ?3, ?4)"#,
        params![
            settings.app_id,
            settings.index_pattern,
            settings.transaction_field,
            settings.timestamp_field,
        ],
    )?;

    Ok(())
}

pub(crate) fn write_success_pattern(
    conn: &Connection,
    app_id: i64,
    order_type: &str,
    pattern: &SuccessPattern,
) -> Result<(), StoreError> {
    let encoded = match &pattern.workflow_sequence {
        WorkflowSequence::Steps(steps) => serde_json::to_string(steps)?,
        WorkflowSequence::Encoded(text) => text.clone(),
    };

    conn.execute(
        r#"INSERT OR REPLACE INTO success_patterns (app_id, order_type, workflow_sequence)
           VALUES (?1, ?2, ?3)"#,
        params![app_id, order_type, encoded],
    )?;

    Ok(())
}

pub(crate) fn write_success_sample(
    conn: &Connection,
    app_id: i64,
    order_type: &str,
    sample: &SuccessSample,
) -> Result<(), StoreError> {
    conn.execute(
        r#"INSERT INTO success_samples
           (app_id, order_type, wf_task_name, domain, expected_status,
            expected_response_code, expected_response_desc, task_sequence,
            is_critical, notes)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"#,
        params![
            app_id,
            order_type,
            sample.task_name,
            sample.domain,
            sample.expected_status,
            sample.expected_response_code,
            sample.expected_response_desc,
            sample.task_sequence,
            sample.is_critical,
            sample.notes,
        ],
    )?;

    Ok(())
}

impl ReferenceStore for SqliteStore {
    fn list_applications(&self) -> Result<Vec<Application>, StoreError> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT app_id, app_name, log_source, description FROM applications ORDER BY app_name",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(Application {
                app_id: row.get(0)?,
                app_name: row.get(1)?,
                log_source: row.get(2)?,
                description: row.get(3)?,
            })
        })?;

        let mut apps = Vec::new();
        for row in rows {
            apps.push(row?);
        }

        Ok(apps)
    }

    fn get_log_settings(&self, app_id: i64) -> Result<Option<LogSettings>, StoreError> {
        let conn = self.conn()?;

        let settings = conn
            .query_row(
                r#"SELECT app_id, index_pattern, transaction_field, timestamp_field
                   FROM log_settings WHERE app_id = ?1"#,
                params![app_id],
                |row| {
                    Ok(LogSettings {
                        app_id: row.get(0)?,
                        index_pattern: row.get(1)?,
                        transaction_field: row.get(2)?,
                        timestamp_field: row.get(3)?,
                    })
                },
            )
            .optional()?;

        Ok(settings)
    }

    fn get_success_pattern(
        &self,
        app_id: i64,
        order_type: &str,
    ) -> Result<Option<SuccessPattern>, StoreError> {
        let conn = self.conn()?;

        let result = conn.query_row(
            r#"SELECT workflow_sequence FROM success_patterns
               WHERE app_id = ?1 AND order_type = ?2"#,
            params![app_id, order_type],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(text) => Ok(Some(SuccessPattern::encoded(text).for_order(app_id, order_type))),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn get_success_samples(
        &self,
        app_id: i64,
        order_type: &str,
    ) -> Result<Vec<SuccessSample>, StoreError> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT wf_task_name, domain, expected_status, expected_response_code,
               expected_response_desc, task_sequence, is_critical, notes
               FROM success_samples WHERE app_id = ?1 AND order_type = ?2
               ORDER BY task_sequence, sample_id"#,
        )?;

        let rows = stmt.query_map(params![app_id, order_type], |row| {
            Ok(SuccessSample {
                task_name: row.get(0)?,
                domain: row.get(1)?,
                expected_status: row.get(2)?,
                expected_response_code: row.get(3)?,
                expected_response_desc: row.get(4)?,
                task_sequence: row.get(5)?,
                is_critical: row.get(6)?,
                notes: row.get(7)?,
            })
        })?;

        let mut samples = Vec::new();
        for row in rows {
            samples.push(row?);
        }

        Ok(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logadvisor_core::ExpectedPatternStep;

    fn billing_app() -> Application {
        Application {
            app_id: 7,
            app_name: "Billing".to_string(),
            log_source: "billing-logs".to_string(),
            description: None,
        }
    }

    #[test]
    fn test_applications_and_settings() {
        let store = SqliteStore::in_memory().unwrap();
        store.upsert_application(&billing_app()).unwrap();
        store
            .upsert_application(&Application {
                app_id: 3,
                app_name: "Activation".to_string(),
                log_source: "act-logs".to_string(),
                description: Some("mobile activation".to_string()),
            })
            .unwrap();

        let apps = store.list_applications().unwrap();
        assert_eq!(apps.len(), 2);
        assert_eq!(apps[0].app_name, "Activation");

        assert!(store.get_log_settings(7).unwrap().is_none());
        store
            .upsert_log_settings(&LogSettings {
                app_id: 7,
                index_pattern: "billing-*".to_string(),
                transaction_field: "work_order".to_string(),
                timestamp_field: "timestamp".to_string(),
            })
            .unwrap();
        let settings = store.get_log_settings(7).unwrap().unwrap();
        assert_eq!(settings.index_pattern, "billing-*");
    }

    #[test]
    fn test_success_pattern_round_trip() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.get_success_pattern(7, "NEW").unwrap().is_none());

        let pattern = SuccessPattern::new(vec![
            ExpectedPatternStep::new("Create").critical(),
            ExpectedPatternStep::new("Ship"),
        ]);
        store.save_success_pattern(7, "NEW", &pattern).unwrap();

        let loaded = store.get_success_pattern(7, "NEW").unwrap().unwrap();
        assert_eq!(loaded.app_id, Some(7));
        assert_eq!(loaded.order_type.as_deref(), Some("NEW"));
        assert_eq!(loaded.steps().unwrap(), pattern.steps().unwrap());
    }

    #[test]
    fn test_samples_ordered_by_sequence() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .insert_success_sample(7, "NEW", &SuccessSample::new("Ship", 3))
            .unwrap();
        store
            .insert_success_sample(
                7,
                "NEW",
                &SuccessSample::new("Create", 1)
                    .expect_status("Completed")
                    .critical(),
            )
            .unwrap();
        store
            .insert_success_sample(7, "CHANGE", &SuccessSample::new("Modify", 1))
            .unwrap();

        let samples = store.get_success_samples(7, "NEW").unwrap();
        let names: Vec<_> = samples.iter().map(|s| s.task_name.as_str()).collect();
        assert_eq!(names, vec!["Create", "Ship"]);
        assert!(samples[0].is_critical);
        assert_eq!(samples[0].expected_status.as_deref(), Some("Completed"));
    }
}
