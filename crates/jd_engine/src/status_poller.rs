use crate::{PollFailure, ServiceError, StatusResponse};

/// What the status task does after one status check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusStep {
    /// Not done yet; sleep one period and check again.
    Pending {
        attempt: u32,
        failure: Option<PollFailure>,
    },
    Complete(StatusResponse),
    /// The attempt budget is spent.
    TimedOut { attempts: u32 },
}

/// Attempt-bounded status checking.
///
/// Only `complete` ends the job. Every other check consumes one attempt,
/// whatever status the service answered and whether or not the call failed.
/// Once `max_attempts` checks have been consumed the job times out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusPoller {
    attempts: u32,
    max_attempts: u32,
}

impl StatusPoller {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            attempts: 0,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// The budget in use; at least one attempt.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }

    pub fn observe(&mut self, outcome: Result<StatusResponse, ServiceError>) -> StatusStep {
        if self.is_exhausted() {
            return StatusStep::TimedOut {
                attempts: self.attempts,
            };
        }
        let failure = match outcome {
            Ok(response) if response.is_complete() => return StatusStep::Complete(response),
            Ok(_) => None,
            Err(err) => Some(err.poll_failure()),
        };
        self.attempts += 1;
        if self.is_exhausted() {
            StatusStep::TimedOut {
                attempts: self.attempts,
            }
        } else {
            StatusStep::Pending {
                attempt: self.attempts,
                failure,
            }
        }
    }
}
