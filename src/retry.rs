//! Bounded retry for git data transfers.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use backon::{ConstantBuilder, Retryable};
use tracing::{debug, warn};

use crate::error::{MigrateError, TransferOp};
use crate::git::GitError;

pub const DEFAULT_ATTEMPTS: usize = 3;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    /// Pause between attempts. Zero retries immediately.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: DEFAULT_ATTEMPTS,
            delay: Duration::ZERO,
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Constant backoff. The first attempt is not a retry, so a policy of
    /// `max_attempts` allows `max_attempts - 1` retries.
    #[must_use]
    pub fn backoff(&self) -> ConstantBuilder {
        ConstantBuilder::default()
            .with_delay(self.delay)
            .with_max_times(self.max_attempts.max(1) - 1)
    }
}

/// Runs `attempt` until it succeeds, `is_retryable` rejects the error, or the
/// policy's attempt bound is reached. Attempts never overlap.
pub async fn retry_when<T, F, Fut, P>(
    policy: &RetryPolicy,
    operation: TransferOp,
    repository: &str,
    mut attempt: F,
    is_retryable: P,
) -> Result<T, MigrateError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GitError>>,
    P: Fn(&GitError) -> bool,
{
    let max_attempts = policy.max_attempts.max(1);
    let tries = AtomicUsize::new(0);

    let counted = || {
        tries.fetch_add(1, Ordering::SeqCst);
        attempt()
    };

    let result = counted
        .retry(policy.backoff())
        .when(|e| is_retryable(e))
        .notify(|e, delay| {
            warn!(
                %operation,
                repository,
                attempt = tries.load(Ordering::SeqCst),
                max_attempts,
                ?delay,
                error = %e,
                "git transfer failed, retrying"
            );
        })
        .await;

    let tries = tries.load(Ordering::SeqCst);
    match result {
        Ok(value) => {
            if tries > 1 {
                debug!(%operation, repository, tries, "succeeded after retrying");
            }
            Ok(value)
        }
        Err(source) => {
            warn!(%operation, repository, attempts = tries, error = %source, "git transfer failed");
            Err(MigrateError::TransferFailed {
                operation,
                repository: repository.to_string(),
                attempts: tries,
                source,
            })
        }
    }
}

/// [`retry_when`] with the standard predicate: only failures of a command
/// that actually ran are retried.
pub async fn retry<T, F, Fut>(
    policy: &RetryPolicy,
    operation: TransferOp,
    repository: &str,
    attempt: F,
) -> Result<T, MigrateError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GitError>>,
{
    retry_when(policy, operation, repository, attempt, GitError::is_transient).await
}
