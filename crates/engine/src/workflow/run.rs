use chrono::{DateTime, Utc};
use serde::Serialize;

use super::state::RunStatus;

/// One execution of a graph against one state instance.
///
/// Only the engine mutates a record; callers receive clones.
#[derive(Debug, Clone, Serialize)]
pub struct RunRecord<S> {
    pub id: String,
    pub graph_id: String,
    /// `None` until the run starts executing.
    pub state: Option<S>,
    pub log: Vec<String>,
    pub status: RunStatus,
    pub steps_taken: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<S> RunRecord<S> {
    pub fn placeholder(id: impl Into<String>, graph_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            graph_id: graph_id.into(),
            state: None,
            log: Vec::new(),
            status: RunStatus::Created,
            steps_taken: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move to `next`, refusing transitions that go backwards.
    pub(crate) fn advance(&mut self, next: RunStatus) -> bool {
        if !self.status.can_transition_to(next) {
            return false;
        }
        self.status = next;
        self.updated_at = Utc::now();
        true
    }

    pub(crate) fn snapshot(&mut self, state: &S, log: &[String], steps_taken: usize)
    where
        S: Clone,
    {
        self.state = Some(state.clone());
        self.log = log.to_vec();
        self.steps_taken = steps_taken;
        self.updated_at = Utc::now();
    }
}
