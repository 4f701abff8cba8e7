//! Ordered candidate fallback
//!
//! Candidates are tried strictly in declared order, one at a time, each with
//! its own timeout. The first candidate whose output parses into an accepted
//! value ends the traversal; every earlier attempt leaves exactly one
//! failure record.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::errors::{CandidateError, CandidateFailure};
use crate::models::{ProcessResult, ResolveCandidate};
use crate::services::process_runner::{CommandSpec, ProcessRunner};

const FAILURE_STDERR_LINES: usize = 5;

/// Traversal state
#[derive(Debug)]
pub enum FallbackState<T> {
    /// Candidates from `next` onward have not been tried
    Pending { next: usize },
    /// Candidate at `index` is running
    Trying { index: usize },
    Resolved { index: usize, value: T },
    Exhausted,
}

/// Successful traversal: the value, who produced it, and who failed before
#[derive(Debug)]
pub struct Resolution<T> {
    pub value: T,
    pub candidate: String,
    pub failures: Vec<CandidateFailure>,
}

/// Drives `FallbackState` over a candidate list using a `ProcessRunner`
#[derive(Clone)]
pub struct CandidateTraversal {
    runner: Arc<dyn ProcessRunner>,
    timeout: Duration,
}

impl CandidateTraversal {
    pub fn new(runner: Arc<dyn ProcessRunner>, timeout: Duration) -> Self {
        Self { runner, timeout }
    }

    /// Try `candidates` in order until `parse` accepts one's stdout.
    ///
    /// Returns every failure record when all candidates fail.
    pub async fn traverse<T, F>(
        &self,
        operation: &str,
        candidates: &[ResolveCandidate],
        input: &str,
        limit: usize,
        parse: F,
    ) -> Result<Resolution<T>, Vec<CandidateFailure>>
    where
        F: Fn(&ResolveCandidate, &str) -> Result<T, CandidateError>,
    {
        let mut failures = Vec::new();
        let mut state = FallbackState::Pending { next: 0 };

        loop {
            state = match state {
                FallbackState::Pending { next } => {
                    if next < candidates.len() {
                        FallbackState::Trying { index: next }
                    } else {
                        FallbackState::Exhausted
                    }
                }
                FallbackState::Trying { index } => {
                    let Some(candidate) = candidates.get(index) else {
                        break Err(failures);
                    };
                    debug!(
                        "operation={} candidate={} attempt={}/{}",
                        operation,
                        candidate.name,
                        index + 1,
                        candidates.len()
                    );

                    match self.attempt(candidate, input, limit, &parse).await {
                        Ok(value) => FallbackState::Resolved { index, value },
                        Err(error) => {
                            warn!(
                                "operation={} candidate={} status=failed error={}",
                                operation, candidate.name, error
                            );
                            failures.push(CandidateFailure {
                                candidate: candidate.name.clone(),
                                error,
                            });
                            FallbackState::Pending { next: index + 1 }
                        }
                    }
                }
                FallbackState::Resolved { index, value } => {
                    let candidate = candidates
                        .get(index)
                        .map(|c| c.name.clone())
                        .unwrap_or_default();
                    info!(
                        "operation={} candidate={} status=resolved failed_before={}",
                        operation,
                        candidate,
                        failures.len()
                    );
                    break Ok(Resolution {
                        value,
                        candidate,
                        failures,
                    });
                }
                FallbackState::Exhausted => {
                    warn!(
                        "operation={} status=exhausted attempts={}",
                        operation,
                        failures.len()
                    );
                    break Err(failures);
                }
            };
        }
    }

    async fn attempt<T, F>(
        &self,
        candidate: &ResolveCandidate,
        input: &str,
        limit: usize,
        parse: &F,
    ) -> Result<T, CandidateError>
    where
        F: Fn(&ResolveCandidate, &str) -> Result<T, CandidateError>,
    {
        let spec = CommandSpec::new(&candidate.command, candidate.render_args(input, limit));
        let result = self.runner.run(&spec, self.timeout).await?;
        let stdout = checked_stdout(&result)?;
        parse(candidate, &stdout)
    }
}

/// Apply the exit-code and empty-output rules shared by every candidate
fn checked_stdout(result: &ProcessResult) -> Result<String, CandidateError> {
    if !result.success() {
        return Err(CandidateError::NonZeroExit {
            code: result.exit_code,
            stderr: result.stderr_tail(FAILURE_STDERR_LINES),
        });
    }

    let stdout = result.stdout_text();
    if stdout.trim().is_empty() {
        return Err(CandidateError::EmptyOutput);
    }
    Ok(stdout.into_owned())
}
