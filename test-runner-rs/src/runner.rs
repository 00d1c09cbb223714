//! Stop-on-first-failure run loop.

use std::time::Duration;

use shared_types::{TestFailure, TestRunResult, TestSuite};
use tracing::{debug, info, warn};

use crate::assertions::check_record;
use crate::probe::{ProbeError, ProbeExecutor};
use crate::recorder::InteractionRecorder;

/// Runs a suite case by case, in declaration order.
#[derive(Debug, Clone)]
pub struct TestRunner {
    executor: ProbeExecutor,
}

impl TestRunner {
    pub fn new(timeout: Duration) -> Result<Self, ProbeError> {
        Ok(Self {
            executor: ProbeExecutor::new(timeout)?,
        })
    }

    pub fn with_executor(executor: ProbeExecutor) -> Self {
        Self { executor }
    }

    /// Execute `suite` against `base_url`.
    ///
    /// Every probe is recorded before it is judged. The first failing case
    /// ends the run; later cases are never sent.
    pub async fn run(&self, suite: &TestSuite, base_url: &str) -> TestRunResult {
        let mut recorder = InteractionRecorder::new();

        for case in suite {
            let record = self.executor.execute(case, base_url).await;
            let record = recorder.record(record);

            if let Some(reason) = check_record(case, record) {
                warn!(test = case.name(), reason = %reason, "Test failed, stopping run");
                let failure = TestFailure {
                    test_name: case.name().to_string(),
                    reason,
                    failed_record: record.clone(),
                };
                return TestRunResult::failed(recorder.into_history(), failure);
            }

            debug!(test = case.name(), status = record.status_code, "Test passed");
        }

        info!(tests = recorder.len(), "All tests passed");
        TestRunResult::passed(recorder.into_history())
    }
}
