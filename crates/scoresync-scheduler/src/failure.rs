//! Failure classification and retry policy (spec.md §4.F).

use crate::error::StageError;
use std::time::Duration;

/// How a stage failure should be treated by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Worth retrying: timeouts, spawn races, transient I/O.
    Transient,
    /// The stage itself rejected the input; retrying won't help without a change upstream.
    Persistent,
    /// Structural problem (cyclic DAG, open circuit breaker) — retrying is meaningless.
    Fatal,
}

pub fn classify(err: &StageError) -> FailureKind {
    match err {
        StageError::Timeout { .. } => FailureKind::Transient,
        StageError::SpawnFailed { .. } => FailureKind::Transient,
        StageError::Io(_) => FailureKind::Transient,
        StageError::NonZeroExit { .. } => FailureKind::Persistent,
        StageError::ManifestMissing { .. } => FailureKind::Persistent,
        StageError::ManifestInvalid { .. } => FailureKind::Persistent,
        StageError::HashMismatch { .. } => FailureKind::Persistent,
        StageError::ArtifactMissing { .. } => FailureKind::Persistent,
        StageError::CyclicDag { .. } => FailureKind::Fatal,
        StageError::CircuitOpen { .. } => FailureKind::Fatal,
    }
}

/// Exponential backoff schedule: `base * 2^attempt`, capped at `max_delay`.
#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub max_delay: Duration,
    pub max_attempts: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(200),
            max_delay: Duration::from_secs(10),
            max_attempts: 3,
        }
    }
}

impl BackoffPolicy {
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let scaled = self.base.saturating_mul(1u32.checked_shl(attempt).unwrap_or(u32::MAX));
        scaled.min(self.max_delay)
    }
}

/// Runs `op` up to `policy.max_attempts` times, sleeping per [`BackoffPolicy`]
/// between attempts, retrying only [`FailureKind::Transient`] failures.
pub fn retry_with_backoff<T>(
    policy: &BackoffPolicy,
    mut op: impl FnMut() -> Result<T, StageError>,
) -> Result<T, StageError> {
    let mut attempt = 0;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(err) => {
                let kind = classify(&err);
                if kind != FailureKind::Transient || attempt + 1 >= policy.max_attempts {
                    return Err(err);
                }
                std::thread::sleep(policy.delay_for(attempt));
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_is_transient_but_non_zero_exit_is_persistent() {
        let timeout = StageError::Timeout {
            stage: "match".into(),
            timeout_secs: 30,
        };
        let exit = StageError::NonZeroExit {
            stage: "match".into(),
            code: 1,
            stderr: String::new(),
        };
        assert_eq!(classify(&timeout), FailureKind::Transient);
        assert_eq!(classify(&exit), FailureKind::Persistent);
    }

    #[test]
    fn cyclic_dag_is_fatal() {
        let err = StageError::CyclicDag {
            stage: "render".into(),
        };
        assert_eq!(classify(&err), FailureKind::Fatal);
    }

    #[test]
    fn retry_gives_up_after_max_attempts_on_persistent_transient_failures() {
        let policy = BackoffPolicy {
            base: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            max_attempts: 3,
        };
        let mut calls = 0;
        let result: Result<(), StageError> = retry_with_backoff(&policy, || {
            calls += 1;
            Err(StageError::Timeout {
                stage: "render".into(),
                timeout_secs: 1,
            })
        });
        assert!(result.is_err());
        assert_eq!(calls, 3);
    }

    #[test]
    fn retry_stops_immediately_on_persistent_failure() {
        let policy = BackoffPolicy::default();
        let mut calls = 0;
        let result: Result<(), StageError> = retry_with_backoff(&policy, || {
            calls += 1;
            Err(StageError::NonZeroExit {
                stage: "render".into(),
                code: 2,
                stderr: String::new(),
            })
        });
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn retry_succeeds_once_op_recovers() {
        let policy = BackoffPolicy {
            base: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            max_attempts: 5,
        };
        let mut calls = 0;
        let result = retry_with_backoff(&policy, || {
            calls += 1;
            if calls < 2 {
                Err(StageError::Timeout {
                    stage: "render".into(),
                    timeout_secs: 1,
                })
            } else {
                Ok(42)
            }
        });
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls, 2);
    }
}
