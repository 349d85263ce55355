//! Expected task sequence derived from reference data.

use std::collections::{HashMap, HashSet};

use logadvisor_core::{CoreError, SuccessPattern, SuccessSample};

/// Where the expected sequence came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceSource {
    Pattern,
    Samples,
}

/// Expected execution order plus the set of critical task names.
#[derive(Debug, Clone)]
pub struct ExpectedSequence {
    tasks: Vec<String>,
    critical: HashSet<String>,
    positions: HashMap<String, usize>,
    source: ReferenceSource,
}

impl ExpectedSequence {
    /// Builds the expected sequence, preferring the ordered pattern and
    /// falling back to samples sorted by `task_sequence`. Returns `None` when
    /// neither source has any steps.
    pub fn build(
        pattern: Option<&SuccessPattern>,
        samples: &[SuccessSample],
    ) -> Result<Option<Self>, CoreError> {
        if let Some(pattern) = pattern {
            let steps = pattern.steps()?;
            if !steps.is_empty() {
                let critical = steps
                    .iter()
                    .filter(|s| s.critical)
                    .map(|s| s.task_name.clone())
                    .collect();
                let tasks = steps.into_iter().map(|s| s.task_name).collect();
                return Ok(Some(Self::new(tasks, critical, ReferenceSource::Pattern)));
            }
        }

        if samples.is_empty() {
            return Ok(None);
        }

        let mut ordered: Vec<&SuccessSample> = samples.iter().collect();
        ordered.sort_by_key(|s| s.task_sequence);

        let critical = ordered
            .iter()
            .filter(|s| s.is_critical)
            .map(|s| s.task_name.clone())
            .collect();
        let tasks = ordered.into_iter().map(|s| s.task_name.clone()).collect();
        Ok(Some(Self::new(tasks, critical, ReferenceSource::Samples)))
    }

    fn new(tasks: Vec<String>, critical: HashSet<String>, source: ReferenceSource) -> Self {
        // Later duplicates overwrite earlier ones.
        let positions = tasks
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.clone(), idx))
            .collect();
        Self {
            tasks,
            critical,
            positions,
            source,
        }
    }

    pub fn tasks(&self) -> &[String] {
        &self.tasks
    }

    pub fn source(&self) -> ReferenceSource {
        self.source
    }

    /// Expected index of the named task.
    pub fn position(&self, task_name: &str) -> Option<usize> {
        self.positions.get(task_name).copied()
    }

    pub fn contains(&self, task_name: &str) -> bool {
        self.positions.contains_key(task_name)
    }

    pub fn is_critical(&self, task_name: &str) -> bool {
        self.critical.contains(task_name)
    }
}
