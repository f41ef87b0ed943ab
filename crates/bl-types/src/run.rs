//! Run bookkeeping for a single optimization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::evaluation::{EvaluationRecord, ObjectiveDirection};

/// Unique optimization run identifier.
pub type RunId = Uuid;

/// Lifecycle state for an optimization run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Aggregate status of an optimization run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStatus {
    pub id: RunId,
    pub direction: ObjectiveDirection,
    pub state: RunState,
    pub evaluations: usize,
    pub best: Option<EvaluationRecord>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl RunStatus {
    pub fn new(direction: ObjectiveDirection) -> Self {
        Self {
            id: Uuid::new_v4(),
            direction,
            state: RunState::Pending,
            evaluations: 0,
            best: None,
            started_at: None,
            finished_at: None,
            error: None,
        }
    }

    pub fn mark_running(&mut self) {
        self.state = RunState::Running;
        if self.started_at.is_none() {
            self.started_at = Some(Utc::now());
        }
    }

    pub fn mark_completed(&mut self) {
        self.state = RunState::Completed;
        self.finished_at = Some(Utc::now());
    }

    pub fn mark_failed(&mut self, error: String) {
        self.state = RunState::Failed;
        self.finished_at = Some(Utc::now());
        self.error = Some(error);
    }

    /// Count `record` and keep it if it improves on the current best.
    ///
    /// Returns `true` when the record became the new best.
    pub fn record(&mut self, record: &EvaluationRecord) -> bool {
        self.evaluations += 1;
        let improved = match &self.best {
            None => true,
            Some(current) => self.direction.improves(record.value(), current.value()),
        };
        if improved {
            self.best = Some(record.clone());
        }
        improved
    }
}
