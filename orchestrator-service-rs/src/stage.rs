use serde::{Deserialize, Serialize};
use std::fmt;

/// Pipeline states. Transitions only move forward and `Done` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PipelineStage {
    Executing,
    Logging,
    Retrieving,
    Diagnosing,
    Done,
}

impl PipelineStage {
    pub fn next(self) -> Option<Self> {
        match self {
            PipelineStage::Executing => Some(PipelineStage::Logging),
            PipelineStage::Logging => Some(PipelineStage::Retrieving),
            PipelineStage::Retrieving => Some(PipelineStage::Diagnosing),
            PipelineStage::Diagnosing => Some(PipelineStage::Done),
            PipelineStage::Done => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == PipelineStage::Done
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PipelineStage::Executing => "executing",
            PipelineStage::Logging => "logging",
            PipelineStage::Retrieving => "retrieving",
            PipelineStage::Diagnosing => "diagnosing",
            PipelineStage::Done => "done",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Records the stages a run passed through.
#[derive(Debug, Clone)]
pub(crate) struct StageTracker {
    run_id: String,
    current: PipelineStage,
    visited: Vec<PipelineStage>,
}

impl StageTracker {
    pub(crate) fn start(run_id: &str) -> Self {
        tracing::info!(run_id = %run_id, stage = %PipelineStage::Executing, "Pipeline stage");
        Self {
            run_id: run_id.to_string(),
            current: PipelineStage::Executing,
            visited: vec![PipelineStage::Executing],
        }
    }

    pub(crate) fn current(&self) -> PipelineStage {
        self.current
    }

    /// Move to the next stage. Stays put once `Done`.
    pub(crate) fn advance(&mut self) -> PipelineStage {
        if let Some(next) = self.current.next() {
            tracing::info!(run_id = %self.run_id, stage = %next, from = %self.current, "Pipeline stage");
            self.current = next;
            self.visited.push(next);
        }
        self.current
    }

    pub(crate) fn into_visited(self) -> Vec<PipelineStage> {
        self.visited
    }
}
