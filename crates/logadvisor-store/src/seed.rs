//! Bulk loading of reference data from JSON.

use logadvisor_core::{SuccessPattern, SuccessSample, WorkflowSequence};
use rusqlite::params;
use serde::Deserialize;
use tracing::info;

use crate::records::{Application, LogSettings};
use crate::solutions::{write_solution, StoredSolution};
use crate::sqlite::{
    write_application, write_log_settings, write_success_pattern, write_success_sample,
    SqliteStore,
};
use crate::StoreError;

#[derive(Debug, Clone, Deserialize)]
pub struct PatternSeed {
    pub app_id: i64,
    pub order_type: String,
    pub workflow_sequence: WorkflowSequence,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SampleSeed {
    pub app_id: i64,
    pub order_type: String,
    #[serde(flatten)]
    pub sample: SuccessSample,
}

/// Reference data set as read from a seed file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReferenceSeed {
    pub applications: Vec<Application>,
    pub log_settings: Vec<LogSettings>,
    pub patterns: Vec<PatternSeed>,
    pub samples: Vec<SampleSeed>,
    pub solutions: Vec<StoredSolution>,
}

impl ReferenceSeed {
    pub fn from_json(text: &str) -> Result<Self, StoreError> {
        Ok(serde_json::from_str(text)?)
    }
}

impl SqliteStore {
    /// Loads `seed` unless the store already has applications.
    /// Returns whether anything was written. The seed is applied in one
    /// transaction, so a failed row leaves the store empty.
    pub fn seed_if_empty(&self, seed: &ReferenceSeed) -> Result<bool, StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let count: i64 =
            tx.query_row("SELECT COUNT(*) FROM applications", params![], |r| r.get(0))?;
        if count > 0 {
            info!("Store already has {} applications, skipping seed", count);
            return Ok(false);
        }

        for app in &seed.applications {
            write_application(&tx, app)?;
        }
        for settings in &seed.log_settings {
            write_log_settings(&tx, settings)?;
        }
        for p in &seed.patterns {
            let pattern = SuccessPattern {
                app_id: Some(p.app_id),
                order_type: Some(p.order_type.clone()),
                workflow_sequence: p.workflow_sequence.clone(),
            };
            write_success_pattern(&tx, p.app_id, &p.order_type, &pattern)?;
        }
        for s in &seed.samples {
            write_success_sample(&tx, s.app_id, &s.order_type, &s.sample)?;
        }
        for solution in &seed.solutions {
            write_solution(&tx, solution)?;
        }

        tx.commit()?;

        info!(
            applications = seed.applications.len(),
            patterns = seed.patterns.len(),
            samples = seed.samples.len(),
            solutions = seed.solutions.len(),
            "Seeded reference data"
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ReferenceStore, SolutionStore};

    const SEED: &str = r#"{
        "applications": [{"app_id": 1, "app_name": "OMS", "log_source": "oms-logs"}],
        "log_settings": [{"app_id": 1, "index_pattern": "oms-*", "transaction_field": "work_order"}],
        "patterns": [{"app_id": 1, "order_type": "NEW",
                      "workflow_sequence": [{"task": "Create", "critical": true}, {"task": "Ship"}]}],
        "samples": [{"app_id": 1, "order_type": "NEW", "wf_task_name": "Create",
                     "expected_status": "Completed", "expected_response_code": 200,
                     "task_sequence": 1, "is_critical": "Y"}],
        "solutions": [{"error_message": "Inventory lock timeout", "solution": "Release stale locks",
                       "confidence": 0.8, "steps": "Find lock\nRelease lock"}]
    }"#;

    #[test]
    fn test_seed_if_empty() {
        let store = SqliteStore::in_memory().unwrap();
        let seed = ReferenceSeed::from_json(SEED).unwrap();

        assert!(store.seed_if_empty(&seed).unwrap());
        assert!(!store.seed_if_empty(&seed).unwrap());

        assert_eq!(store.list_applications().unwrap().len(), 1);
        assert_eq!(
            store.get_log_settings(1).unwrap().unwrap().timestamp_field,
            "timestamp"
        );

        let pattern = store.get_success_pattern(1, "NEW").unwrap().unwrap();
        assert_eq!(pattern.steps().unwrap().len(), 2);

        let samples = store.get_success_samples(1, "NEW").unwrap();
        assert_eq!(samples[0].expected_response_code.as_deref(), Some("200"));
        assert!(samples[0].is_critical);

        let report = store.find_solutions(&["inventory lock timeout on SKU 42".to_string()]);
        assert_eq!(report.recommendations[0].solution, crate::NO_SOLUTION_FOUND);
        let report = store.find_solutions(&["Inventory lock".to_string()]);
        assert_eq!(report.recommendations[0].steps, vec!["Find lock", "Release lock"]);
    }

    #[test]
    fn test_failed_seed_writes_nothing() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .conn()
            .unwrap()
            .execute_batch(
                "CREATE TRIGGER reject_solutions BEFORE INSERT ON solutions
                 BEGIN SELECT RAISE(ABORT, 'solutions are read-only'); END;",
            )
            .unwrap();
        let seed = ReferenceSeed::from_json(SEED).unwrap();

        assert!(store.seed_if_empty(&seed).is_err());
        assert!(store.list_applications().unwrap().is_empty());
        assert!(store.get_log_settings(1).unwrap().is_none());
        assert!(store.get_success_pattern(1, "NEW").unwrap().is_none());
        assert!(store.get_success_samples(1, "NEW").unwrap().is_empty());

        store
            .conn()
            .unwrap()
            .execute_batch("DROP TRIGGER reject_solutions;")
            .unwrap();
        assert!(store.seed_if_empty(&seed).unwrap());
        assert_eq!(store.list_applications().unwrap().len(), 1);
    }
}
