//! Persisted workflow analysis results.

use logadvisor_core::{now_rfc3339, AnalysisResult};
use rusqlite::params;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::sqlite::SqliteStore;
use crate::StoreError;

/// A stored analysis of one order's workflow trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub analysis_id: String,
    pub app_id: i64,
    pub order_number: String,
    pub order_type: Option<String>,
    pub result: AnalysisResult,
    pub created_at: String,
}

impl AnalysisRecord {
    /// Wraps a result with a fresh id and creation time.
    pub fn new(
        app_id: i64,
        order_number: impl Into<String>,
        order_type: Option<String>,
        result: AnalysisResult,
    ) -> Self {
        Self {
            analysis_id: Uuid::new_v4().to_string(),
            app_id,
            order_number: order_number.into(),
            order_type,
            result,
            created_at: now_rfc3339(),
        }
    }
}

/// Query parameters for listing analyses.
#[derive(Debug, Clone, Default)]
pub struct AnalysisQuery {
    /// Filter by application.
    pub app_id: Option<i64>,
    /// Filter by order number.
    pub order_number: Option<String>,
    /// Maximum number of records to return.
    pub limit: Option<u32>,
}

impl SqliteStore {
    /// Inserts or replaces an analysis record.
    pub fn save_analysis(&self, record: &AnalysisRecord) -> Result<(), StoreError> {
        let result = serde_json::to_string(&record.result)?;
        let conn = self.conn()?;

        conn.execute(
            r#"INSERT OR REPLACE INTO analyses
               (analysis_id, app_id, order_number, order_type, status, summary, result, created_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"#,
            params![
                record.analysis_id,
                record.app_id,
                record.order_number,
                record.order_type,
                record.result.status.as_str(),
                record.result.summary,
                result,
                record.created_at,
            ],
        )?;

        Ok(())
    }

    /// Retrieves an analysis by id.
    pub fn get_analysis(&self, analysis_id: &str) -> Result<Option<AnalysisRecord>, StoreError> {
        let conn = self.conn()?;

        let row = conn.query_row(
            r#"SELECT analysis_id, app_id, order_number, order_type, result, created_at
               FROM analyses WHERE analysis_id = ?1"#,
            params![analysis_id],
            read_row,
        );

        match row {
            Ok(raw) => Ok(Some(raw.into_record()?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Lists analyses, newest first.
    pub fn list_analyses(&self, query: &AnalysisQuery) -> Result<Vec<AnalysisRecord>, StoreError> {
        let conn = self.conn()?;

        let mut sql = String::from(
            r#"SELECT analysis_id, app_id, order_number, order_type, result, created_at
               FROM analyses WHERE 1=1"#,
        );

        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(app_id) = query.app_id {
            sql.push_str(" AND app_id = ?");
            params_vec.push(Box::new(app_id));
        }

        if let Some(ref order_number) = query.order_number {
            sql.push_str(" AND order_number = ?");
            params_vec.push(Box::new(order_number.clone()));
        }

        sql.push_str(" ORDER BY created_at DESC, rowid DESC");

        if let Some(limit) = query.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        let mut stmt = conn.prepare(&sql)?;
        let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
        let rows = stmt.query_map(params_refs.as_slice(), read_row)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?.into_record()?);
        }

        Ok(records)
    }
}

struct RawRecord {
    analysis_id: String,
    app_id: i64,
    order_number: String,
    order_type: Option<String>,
    result: String,
    created_at: String,
}

impl RawRecord {
    fn into_record(self) -> Result<AnalysisRecord, StoreError> {
        Ok(AnalysisRecord {
            analysis_id: self.analysis_id,
            app_id: self.app_id,
            order_number: self.order_number,
            order_type: self.order_type,
            result: serde_json::from_str(&self.result)?,
            created_at: self.created_at,
        })
    }
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRecord> {
    Ok(RawRecord {
        analysis_id: row.get(0)?,
        app_id: row.get(1)?,
        order_number: row.get(2)?,
        order_type: row.get(3)?,
        result: row.get(4)?,
        created_at: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use logadvisor_core::AnalysisStatus;

    #[test]
    fn test_analysis_history_crud() {
        let store = SqliteStore::in_memory().unwrap();

        let record = AnalysisRecord::new(
            7,
            "WO-1001",
            Some("NEW".to_string()),
            AnalysisResult::error("Cannot analyze workflow without reference data"),
        );
        store.save_analysis(&record).unwrap();

        let loaded = store.get_analysis(&record.analysis_id).unwrap().unwrap();
        assert_eq!(loaded, record);
        assert_eq!(loaded.result.status, AnalysisStatus::Error);

        assert!(store.get_analysis("missing").unwrap().is_none());
    }

    #[test]
    fn test_list_analyses_filters() {
        let store = SqliteStore::in_memory().unwrap();
        for (app, order) in [(7, "WO-1"), (7, "WO-2"), (9, "WO-3")] {
            let record = AnalysisRecord::new(app, order, None, AnalysisResult::error("x"));
            store.save_analysis(&record).unwrap();
        }

        let all = store.list_analyses(&AnalysisQuery::default()).unwrap();
        assert_eq!(all.len(), 3);

        let app7 = store
            .list_analyses(&AnalysisQuery {
                app_id: Some(7),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(app7.len(), 2);

        let limited = store
            .list_analyses(&AnalysisQuery {
                limit: Some(1),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].order_number, "WO-3");
    }
}
