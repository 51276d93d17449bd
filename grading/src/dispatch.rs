//! Multi-grader dispatch — concurrent fan-out with per-call isolation.
//!
//! The panel invokes every grader with the identical request, awaits all of
//! them together, and converts each outcome (response, error, or timeout)
//! into its own `GraderInvocationResult`. One grader failing or stalling
//! never disturbs its siblings. Retries, if wanted, belong to the outer
//! orchestration loop, not this layer.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, warn};

use crate::config::GradingConfig;
use crate::grader::{Grader, GradingRequest, HttpGrader};
use crate::types::GraderInvocationResult;

/// A fixed panel of independent graders.
///
/// The consensus algorithm is defined for a panel of 3 (with degraded
/// handling when one drops out), which is what `from_config` builds.
pub struct GraderPanel {
    graders: Vec<Arc<dyn Grader>>,
    call_timeout: Duration,
}

impl GraderPanel {
    /// Build a panel from explicit graders.
    pub fn new(graders: Vec<Arc<dyn Grader>>, call_timeout: Duration) -> Self {
        Self {
            graders,
            call_timeout,
        }
    }

    /// Build the standard 3-grader panel against the configured endpoint.
    ///
    /// All three slots run the same model; independence comes from separate
    /// sampled invocations, mirroring how the grading product deploys it.
    pub fn from_config(config: &GradingConfig) -> Result<Self, crate::grader::GraderError> {
        let grader = HttpGrader::from_config(config)?;
        let graders: Vec<Arc<dyn Grader>> = (0..config.fan_out)
            .map(|_| Arc::new(grader.clone()) as Arc<dyn Grader>)
            .collect();
        Ok(Self::new(
            graders,
            Duration::from_secs(config.grader_timeout_secs),
        ))
    }

    /// Number of graders in the panel.
    pub fn size(&self) -> usize {
        self.graders.len()
    }

    /// Invoke every grader concurrently with the identical request.
    ///
    /// Returns exactly one `GraderInvocationResult` per grader, labeled
    /// `"grader_1"`.. in panel order regardless of completion order or
    /// success/failure mix. A call that outlives the timeout is recorded as
    /// a failure so it cannot block the rest of the job.
    pub async fn dispatch(&self, request: &GradingRequest) -> Vec<GraderInvocationResult> {
        let calls = self.graders.iter().enumerate().map(|(i, grader)| {
            let grader_id = format!("grader_{}", i + 1);
            let grader = Arc::clone(grader);
            async move {
                match tokio::time::timeout(self.call_timeout, grader.grade(request)).await {
                    Ok(Ok(raw_text)) => {
                        debug!(grader_id = %grader_id, "grader call succeeded");
                        GraderInvocationResult::success(grader_id, raw_text)
                    }
                    Ok(Err(e)) => {
                        warn!(grader_id = %grader_id, error = %e, "grader call failed");
                        GraderInvocationResult::failure(grader_id, e.to_string())
                    }
                    Err(_) => {
                        warn!(
                            grader_id = %grader_id,
                            timeout_secs = self.call_timeout.as_secs(),
                            "grader call timed out"
                        );
                        let message =
                            format!("timed out after {}s", self.call_timeout.as_secs());
                        GraderInvocationResult::failure(grader_id, message)
                    }
                }
            }
        });

        join_all(calls).await
    }
}
