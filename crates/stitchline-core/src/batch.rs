use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One item of a batch that could not be processed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ItemFailure {
    pub subject: String,
    pub message: String,
}

impl fmt::Display for ItemFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.subject, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct BatchFailure {
    pub failures: Vec<ItemFailure>,
    message: String,
}

/// Aggregate of a best-effort loop: items keep being processed after a
/// failure and both sides are reported.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchOutcome<T> {
    pub succeeded: Vec<T>,
    pub failures: Vec<ItemFailure>,
}

impl<T> Default for BatchOutcome<T> {
    fn default() -> Self {
        Self {
            succeeded: Vec::new(),
            failures: Vec::new(),
        }
    }
}

impl<T> BatchOutcome<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self, item: T) {
        self.succeeded.push(item);
    }

    pub fn record_failure(&mut self, subject: impl Into<String>, err: impl fmt::Display) {
        self.failures.push(ItemFailure {
            subject: subject.into(),
            message: err.to_string(),
        });
    }

    pub fn succeeded_count(&self) -> usize {
        self.succeeded.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failures.len()
    }

    /// True when at least one item went through or nothing failed.
    pub fn success(&self) -> bool {
        !self.succeeded.is_empty() || self.failures.is_empty()
    }

    pub fn error_message(&self) -> Option<String> {
        if self.failures.is_empty() {
            return None;
        }

        Some(
            self.failures
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    pub fn into_result(self) -> Result<Vec<T>, BatchFailure> {
        if self.success() {
            return Ok(self.succeeded);
        }

        let message = self.error_message().unwrap_or_default();
        Err(BatchFailure {
            failures: self.failures,
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_batch_counts_as_success() {
        let outcome: BatchOutcome<u32> = BatchOutcome::new();
        assert!(outcome.success());
        assert_eq!(outcome.error_message(), None);
    }

    #[test]
    fn partial_failure_is_still_success_with_messages() {
        let mut outcome = BatchOutcome::new();
        outcome.record_success(1);
        outcome.record_failure("Zipper tape", "write timed out");

        assert!(outcome.success());
        assert_eq!(
            outcome.error_message().as_deref(),
            Some("Zipper tape: write timed out")
        );
        assert_eq!(outcome.into_result(), Ok(vec![1]));
    }

    #[test]
    fn total_failure_joins_every_message() {
        let mut outcome: BatchOutcome<u32> = BatchOutcome::new();
        outcome.record_failure("A", "boom");
        outcome.record_failure("B", "bang");

        assert!(!outcome.success());
        let err = outcome.into_result().expect_err("all failed");
        assert_eq!(err.to_string(), "A: boom; B: bang");
        assert_eq!(err.failures.len(), 2);
    }
}
