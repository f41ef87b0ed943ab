//! Evaluation records and objective direction.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Whether we are maximizing or minimizing the objective.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectiveDirection {
    Maximize,
    #[default]
    Minimize,
}

impl ObjectiveDirection {
    /// `true` if `candidate` strictly improves on `incumbent`.
    pub fn improves(self, candidate: f64, incumbent: f64) -> bool {
        match self {
            Self::Maximize => candidate > incumbent,
            Self::Minimize => candidate < incumbent,
        }
    }

    /// Index of the best value; the earliest one wins ties.
    pub fn best_index(self, values: &[f64]) -> Option<usize> {
        let mut best: Option<usize> = None;
        for (idx, value) in values.iter().enumerate() {
            match best {
                None => best = Some(idx),
                Some(b) if self.improves(*value, values[b]) => best = Some(idx),
                _ => {}
            }
        }
        best
    }

    /// Ordering under which the better value compares as `Greater`.
    pub fn compare(self, a: f64, b: f64) -> Ordering {
        let ord = a.partial_cmp(&b).unwrap_or(Ordering::Equal);
        match self {
            Self::Maximize => ord,
            Self::Minimize => ord.reverse(),
        }
    }
}

/// One objective query: the input point and the value observed there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    point: Vec<f64>,
    value: f64,
}

impl EvaluationRecord {
    pub fn new(point: Vec<f64>, value: f64) -> Self {
        Self { point, value }
    }

    pub fn point(&self) -> &[f64] {
        &self.point
    }

    pub fn value(&self) -> f64 {
        self.value
    }
}

/// Best record among `records`, or `None` when empty.
pub fn best_record(
    records: &[EvaluationRecord],
    direction: ObjectiveDirection,
) -> Option<&EvaluationRecord> {
    let values: Vec<f64> = records.iter().map(EvaluationRecord::value).collect();
    direction.best_index(&values).map(|idx| &records[idx])
}
