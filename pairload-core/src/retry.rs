use crate::{
    Connection, Driver, ErrorClass, Executor, OrderId, OrderRequest, TableNames, WorkloadError,
    insert_pair,
};
use rand::Rng;
use std::{fmt, time::Duration};
use tokio::time::sleep;

/// Bounded exponential backoff with jitter.
///
/// After the `n`-th failed attempt (from 1) the policy waits
/// `base_delay * 2^n + uniform(0, jitter)` before the next one. At most
/// `max_attempts` attempts are made in total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            jitter: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single attempt, retryable failures are reported as exhausted right away.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Attempts are at least one.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// Deterministic part of the wait after `attempts` failed attempts.
    pub fn backoff(&self, attempts: u32) -> Duration {
        let multiplier = 1u32.checked_shl(attempts.min(31)).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(multiplier)
    }

    /// Wait after `attempts` failed attempts, jitter included.
    pub fn delay(&self, attempts: u32) -> Duration {
        let jitter = if self.jitter.is_zero() {
            Duration::ZERO
        } else {
            rand::thread_rng().gen_range(Duration::ZERO..=self.jitter)
        };
        self.backoff(attempts).saturating_add(jitter)
    }
}

/// States of one retried operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    /// Running attempt number `attempt` (from 1).
    Attempting { attempt: u32 },
    /// Attempt `attempt` hit a retryable conflict, waiting `delay`.
    Retrying { attempt: u32, delay: Duration },
    Success { attempts: u32 },
    Exhausted { attempts: u32 },
    FatalError { attempts: u32 },
}

impl AttemptState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AttemptState::Success { .. }
                | AttemptState::Exhausted { .. }
                | AttemptState::FatalError { .. }
        )
    }

    /// State after the current attempt failed with `class`.
    pub fn failed(self, class: ErrorClass, policy: &RetryPolicy) -> AttemptState {
        let AttemptState::Attempting { attempt } = self else {
            return self;
        };
        match class {
            ErrorClass::Fatal => AttemptState::FatalError { attempts: attempt },
            ErrorClass::Retryable if attempt >= policy.max_attempts => {
                AttemptState::Exhausted { attempts: attempt }
            }
            ErrorClass::Retryable => AttemptState::Retrying {
                attempt,
                delay: policy.delay(attempt),
            },
        }
    }

    /// State after the current attempt succeeded.
    pub fn succeeded(self) -> AttemptState {
        match self {
            AttemptState::Attempting { attempt } => AttemptState::Success { attempts: attempt },
            other => other,
        }
    }

    /// State once the backoff elapsed.
    pub fn resumed(self) -> AttemptState {
        match self {
            AttemptState::Retrying { attempt, .. } => AttemptState::Attempting {
                attempt: attempt + 1,
            },
            other => other,
        }
    }
}

impl fmt::Display for AttemptState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptState::Attempting { attempt } => write!(f, "attempting ({})", attempt),
            AttemptState::Retrying { attempt, delay } => {
                write!(f, "retrying after attempt {} in {:?}", attempt, delay)
            }
            AttemptState::Success { attempts } => write!(f, "succeeded ({} attempts)", attempts),
            AttemptState::Exhausted { attempts } => write!(f, "exhausted ({} attempts)", attempts),
            AttemptState::FatalError { attempts } => write!(f, "failed ({} attempts)", attempts),
        }
    }
}

/// Run [`insert_pair`] under `policy`.
///
/// Only failures the driver classifies as retryable are retried, each time in
/// a fresh transaction. Everything else is returned as soon as it happens.
pub async fn insert_with_retry<C: Connection>(
    connection: &mut C,
    tables: &TableNames,
    policy: &RetryPolicy,
    order: &OrderRequest,
) -> Result<OrderId, WorkloadError> {
    order.validate()?;
    let mut state = AttemptState::Attempting { attempt: 1 };
    loop {
        let failure = match insert_pair(connection, tables, order).await {
            Ok(order_id) => {
                log::debug!("Order #{} {}", order_id, state.succeeded());
                return Ok(order_id);
            }
            Err(failure) => failure,
        };
        let class = connection.driver().classify(&failure.error);
        state = state.failed(class, policy);
        log::debug!("Order of {} {} {}", order.shares, order.symbol, state);
        match state {
            AttemptState::Retrying { attempt, delay } => {
                log::warn!(
                    "Retrying after a conflict (attempt {}/{}, waiting {:?}): {}",
                    attempt,
                    policy.max_attempts,
                    delay,
                    failure
                );
                sleep(delay).await;
                state = state.resumed();
            }
            AttemptState::Exhausted { attempts } => {
                log::error!("Max retries reached ({} attempts): {}", attempts, failure);
                return Err(WorkloadError::RetriesExhausted {
                    attempts,
                    last: failure,
                });
            }
            _ => {
                log::error!("Could not insert the order: {}", failure);
                return Err(WorkloadError::fatal(failure));
            }
        }
    }
}
