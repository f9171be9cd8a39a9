use super::{ConflictClass, ConflictClassifier, RetryPolicy, RetryStats};
use crate::core::{StoreError, ToggleError};
use std::future::Future;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{Level, event};

/// Verdict of a single attempt, as seen by the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptVerdict {
    Success,
    Retryable,
    Fatal,
}

/// Retry lifecycle
///
/// ```text
/// Pending ──start──> Attempting(1) ──success──> Succeeded
///                      │  ▲   └──────fatal────> Fatal
///                      │  └─retryable, n < max
///                      └────retryable, n = max──> Exhausted
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    Pending,
    Attempting { attempt: u32 },
    Succeeded { attempts: u32 },
    Fatal { attempts: u32 },
    Exhausted { attempts: u32 },
}

impl RetryState {
    pub fn start(self) -> Self {
        match self {
            Self::Pending => Self::Attempting { attempt: 1 },
            other => other,
        }
    }

    pub fn advance(self, verdict: AttemptVerdict, max_attempts: u32) -> Self {
        let Self::Attempting { attempt } = self else {
            return self;
        };
        match verdict {
            AttemptVerdict::Success => Self::Succeeded { attempts: attempt },
            AttemptVerdict::Fatal => Self::Fatal { attempts: attempt },
            AttemptVerdict::Retryable if attempt < max_attempts => Self::Attempting {
                attempt: attempt + 1,
            },
            AttemptVerdict::Retryable => Self::Exhausted { attempts: attempt },
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Succeeded { .. } | Self::Fatal { .. } | Self::Exhausted { .. }
        )
    }

    pub fn attempts(&self) -> u32 {
        match self {
            Self::Pending => 0,
            Self::Attempting { attempt } => *attempt,
            Self::Succeeded { attempts } | Self::Fatal { attempts } | Self::Exhausted { attempts } => {
                *attempts
            }
        }
    }
}

impl std::fmt::Display for RetryState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Attempting { attempt } => write!(f, "ATTEMPTING({attempt})"),
            Self::Succeeded { attempts } => write!(f, "SUCCEEDED after {attempts}"),
            Self::Fatal { attempts } => write!(f, "FATAL after {attempts}"),
            Self::Exhausted { attempts } => write!(f, "EXHAUSTED after {attempts}"),
        }
    }
}

/// Runs a transactional unit of work until it succeeds, hits a fatal error,
/// or runs out of attempts.
///
/// The orchestrator holds no locks and keeps no per-call state outside the
/// future it returns, so any number of callers may share one instance.
#[derive(Debug, Clone)]
pub struct RetryOrchestrator {
    policy: RetryPolicy,
    stats: Arc<RetryStats>,
}

impl RetryOrchestrator {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            stats: Arc::new(RetryStats::new()),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn stats(&self) -> &Arc<RetryStats> {
        &self.stats
    }

    /// Drives `operation` (called with the 1-based attempt number) under the policy.
    pub async fn run<T, F, Fut>(&self, operation: F) -> Result<T, ToggleError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        self.run_until(None, operation).await
    }

    /// Like [`run`](Self::run), but gives up early when the next backoff would
    /// end at or after `deadline`.
    pub async fn run_until<T, F, Fut>(
        &self,
        deadline: Option<Instant>,
        mut operation: F,
    ) -> Result<T, ToggleError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut state = RetryState::Pending.start();

        while let RetryState::Attempting { attempt } = state {
            self.stats.record_attempt();

            let err = match operation(attempt).await {
                Ok(value) => {
                    state = state.advance(AttemptVerdict::Success, max_attempts);
                    self.stats.record_success();
                    event!(Level::DEBUG, attempt, %state, "attempt succeeded");
                    return Ok(value);
                }
                Err(err) => err,
            };

            let reason = match ConflictClassifier::classify(&err) {
                ConflictClass::Fatal(reason) => {
                    state = state.advance(AttemptVerdict::Fatal, max_attempts);
                    self.stats.record_fatal();
                    event!(Level::WARN, attempt, %state, error = %err, "attempt failed fatally");
                    return Err(reason.into());
                }
                ConflictClass::Retryable(reason) => reason,
            };

            state = state.advance(AttemptVerdict::Retryable, max_attempts);
            if let RetryState::Exhausted { attempts } = state {
                return Err(self.exhausted(attempts, err));
            }

            let delay = self.policy.backoff(attempt, &mut rand::thread_rng());
            if deadline.is_some_and(|deadline| Instant::now() + delay >= deadline) {
                event!(
                    Level::DEBUG,
                    attempt,
                    backoff_ms = delay.as_millis() as u64,
                    "deadline reached before next attempt"
                );
                return Err(self.exhausted(attempt, err));
            }

            self.stats.record_retry();
            event!(
                Level::DEBUG,
                attempt,
                max_attempts,
                %reason,
                error = %err,
                backoff_ms = delay.as_millis() as u64,
                "attempt conflicted, backing off"
            );
            tokio::time::sleep(delay).await;
        }

        Err(self.exhausted(
            state.attempts(),
            StoreError::ExecutionError(format!("retry loop stopped in state {state}")),
        ))
    }

    fn exhausted(&self, attempts: u32, last_error: StoreError) -> ToggleError {
        self.stats.record_exhausted();
        event!(Level::ERROR, attempts, error = %last_error, "retry budget exhausted");
        ToggleError::Exhausted {
            attempts,
            last_error,
        }
    }
}
