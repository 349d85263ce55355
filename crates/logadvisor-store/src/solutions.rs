//! Solution knowledge base lookups.

use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::sqlite::SqliteStore;
use crate::StoreError;

pub const NO_ERRORS_SUMMARY: &str = "No errors to find solutions for.";
pub const NO_SOLUTION_FOUND: &str = "No solution found in the knowledge base.";

/// Number of leading message characters matched against stored errors.
const MATCH_PREFIX_CHARS: usize = 50;

/// A stored known-error resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSolution {
    #[serde(default)]
    pub id: Option<i64>,
    pub error_message: String,
    pub solution: String,
    #[serde(default)]
    pub confidence: f64,
    /// Either a JSON array of steps or newline-separated text.
    #[serde(default)]
    pub steps: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
}

/// A suggested fix for one identified error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub error: String,
    pub solution: String,
    pub confidence: f64,
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
}

impl Recommendation {
    fn unresolved(error: &str, solution: String) -> Self {
        Self {
            error: error.to_string(),
            solution,
            confidence: 0.0,
            steps: Vec::new(),
            id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolutionReport {
    pub recommendations: Vec<Recommendation>,
    pub summary: String,
}

/// Lookup of known resolutions by error message.
pub trait SolutionStore: Send + Sync {
    /// Highest-confidence solution whose stored message contains the
    /// leading part of `error_message`, case-insensitively.
    fn best_solution(&self, error_message: &str) -> Result<Option<StoredSolution>, StoreError>;

    /// Resolves each non-empty error message to a recommendation. Lookup
    /// failures are reported inside the recommendation, never returned.
    fn find_solutions(&self, errors: &[String]) -> SolutionReport {
        if errors.is_empty() {
            return SolutionReport {
                recommendations: Vec::new(),
                summary: NO_ERRORS_SUMMARY.to_string(),
            };
        }

        let mut recommendations = Vec::new();
        for error in errors.iter().filter(|e| !e.is_empty()) {
            let rec = match self.best_solution(error) {
                Ok(Some(found)) => Recommendation {
                    error: error.clone(),
                    steps: found.steps.as_deref().map(parse_steps).unwrap_or_default(),
                    solution: found.solution,
                    confidence: found.confidence,
                    id: found.id,
                },
                Ok(None) => Recommendation::unresolved(error, NO_SOLUTION_FOUND.to_string()),
                Err(e) => {
                    warn!("Failed to look up solution: {}", e);
                    Recommendation::unresolved(error, format!("Error retrieving solution: {}", e))
                }
            };
            recommendations.push(rec);
        }

        let found = recommendations.iter().filter(|r| r.confidence > 0.0).count();
        SolutionReport {
            summary: format!(
                "Found {} solution(s) for {} identified errors.",
                found,
                errors.len()
            ),
            recommendations,
        }
    }
}

/// Splits stored solution steps. Accepts a JSON array of strings or
/// newline-separated text; blank lines are dropped.
pub fn parse_steps(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    if trimmed.starts_with('[') {
        return match serde_json::from_str::<Vec<serde_json::Value>>(trimmed) {
            Ok(items) => items
                .into_iter()
                .map(|v| match v {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                })
                .collect(),
            Err(_) => vec![trimmed.to_string()],
        };
    }

    trimmed
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect()
}

fn like_pattern(message: &str) -> String {
    let prefix: String = message.chars().take(MATCH_PREFIX_CHARS).collect();
    let mut escaped = String::with_capacity(prefix.len() + 2);
    escaped.push('%');
    for c in prefix.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

impl SqliteStore {
    /// Adds a solution to the knowledge base, returning its id.
    pub fn insert_solution(&self, solution: &StoredSolution) -> Result<i64, StoreError> {
        write_solution(&*self.conn()?, solution)
    }
}

pub(crate) fn write_solution(
    conn: &Connection,
    solution: &StoredSolution,
) -> Result<i64, StoreError> {
    conn.execute(
        r#"INSERT INTO solutions
           (error_message, solution, solution_confidence, solution_steps, severity)
           VALUES (?1, ?2, ?3, ?4, ?5)"#,
        params![
            solution.error_message,
            solution.solution,
            solution.confidence,
            solution.steps,
            solution.severity,
        ],
    )?;

    Ok(conn.last_insert_rowid())
}

impl SolutionStore for SqliteStore {
    fn best_solution(&self, error_message: &str) -> Result<Option<StoredSolution>, StoreError> {
        let conn = self.conn()?;

        let result = conn.query_row(
            r#"SELECT solution_id, error_message, solution, solution_confidence,
               solution_steps, severity
               FROM solutions WHERE error_message LIKE ?1 ESCAPE '\'
               ORDER BY solution_confidence DESC LIMIT 1"#,
            params![like_pattern(error_message)],
            |row| {
                Ok(StoredSolution {
                    id: row.get(0)?,
                    error_message: row.get(1)?,
                    solution: row.get(2)?,
                    confidence: row.get(3)?,
                    steps: row.get(4)?,
                    severity: row.get(5)?,
                })
            },
        );

        match result {
            Ok(solution) => Ok(Some(solution)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solution(message: &str, fix: &str, confidence: f64, steps: Option<&str>) -> StoredSolution {
        StoredSolution {
            id: None,
            error_message: message.to_string(),
            solution: fix.to_string(),
            confidence,
            steps: steps.map(String::from),
            severity: Some("High".to_string()),
        }
    }

    #[test]
    fn test_parse_steps() {
        assert_eq!(parse_steps(r#"["restart", "verify"]"#), vec!["restart", "verify"]);
        assert_eq!(parse_steps("restart\n\n  verify  \n"), vec!["restart", "verify"]);
        assert_eq!(parse_steps("[not json"), vec!["[not json"]);
        assert!(parse_steps("   ").is_empty());
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("100% done_now"), r"%100\% done\_now%");
        let long = "x".repeat(80);
        assert_eq!(like_pattern(&long).len(), MATCH_PREFIX_CHARS + 2);
    }

    #[test]
    fn test_find_solutions_empty_input() {
        let store = SqliteStore::in_memory().unwrap();
        let report = store.find_solutions(&[]);
        assert!(report.recommendations.is_empty());
        assert_eq!(report.summary, NO_ERRORS_SUMMARY);
    }

    #[test]
    fn test_find_solutions_prefers_highest_confidence() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .insert_solution(&solution(
                "Connection timeout to payment gateway",
                "Retry later",
                0.4,
                None,
            ))
            .unwrap();
        let best = store
            .insert_solution(&solution(
                "CONNECTION TIMEOUT to payment gateway after 30s",
                "Raise the gateway timeout",
                0.9,
                Some(r#"["Edit gateway.yaml", "Restart service"]"#),
            ))
            .unwrap();

        let report = store.find_solutions(&[
            "connection timeout to payment gateway".to_string(),
            "Disk full on /var".to_string(),
            String::new(),
        ]);

        assert_eq!(report.recommendations.len(), 2);
        let first = &report.recommendations[0];
        assert_eq!(first.solution, "Raise the gateway timeout");
        assert_eq!(first.id, Some(best));
        assert_eq!(first.steps, vec!["Edit gateway.yaml", "Restart service"]);

        let second = &report.recommendations[1];
        assert_eq!(second.solution, NO_SOLUTION_FOUND);
        assert_eq!(second.confidence, 0.0);

        assert_eq!(report.summary, "Found 1 solution(s) for 3 identified errors.");
    }
}
