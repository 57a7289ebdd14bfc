//! Bounded retry for transient backend failures
//!
//! [`RetryingBackend`] wraps any [`Backend`] and re-issues an operation that
//! failed with [`StorageError::Unavailable`], sleeping with exponential
//! backoff between attempts. Permanent failures surface immediately, and the
//! last transient failure surfaces once the attempt budget is spent.

use crate::backend::{Backend, Write};
use flowmuse_core::{Key, StorageError, StorageResult};
use std::time::Duration;
use tracing::warn;

/// Retry budget and backoff shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included (minimum 1)
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub base_delay: Duration,
    /// Upper bound on any single delay
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Never retry
    pub fn none() -> Self {
        RetryPolicy {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Set the attempt budget
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Set the base delay
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Delay to sleep after the given failed attempt (1-based)
    ///
    /// Doubles per attempt, capped at `max_delay`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(200),
        }
    }
}

/// Backend wrapper adding bounded retries
#[derive(Debug)]
pub struct RetryingBackend<B> {
    inner: B,
    policy: RetryPolicy,
}

impl<B: Backend> RetryingBackend<B> {
    /// Wrap `inner` with `policy`
    pub fn new(inner: B, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    /// The wrapped backend
    pub fn inner(&self) -> &B {
        &self.inner
    }

    /// The active policy
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Decide whether to go again after `err` on `attempt`, sleeping if so.
    async fn backoff(&self, op: &'static str, key: &Key, attempt: u32, err: &StorageError) -> bool {
        if !err.is_transient() || attempt >= self.policy.max_attempts {
            return false;
        }
        let delay = self.policy.delay_after(attempt);
        warn!(
            op,
            key = %key,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "transient backend failure, retrying"
        );
        tokio::time::sleep(delay).await;
        true
    }
}

impl<B: Backend> Backend for RetryingBackend<B> {
    async fn get(&self, key: &Key) -> StorageResult<Option<Vec<u8>>> {
        let mut attempt = 1;
        loop {
            let err = match self.inner.get(key).await {
                Err(e) => e,
                done => return done,
            };
            if !self.backoff("get", key, attempt, &err).await {
                return Err(err);
            }
            attempt += 1;
        }
    }

    async fn put(&self, key: &Key, value: Vec<u8>) -> StorageResult<()> {
        let mut attempt = 1;
        loop {
            let err = match self.inner.put(key, value.clone()).await {
                Err(e) => e,
                done => return done,
            };
            if !self.backoff("put", key, attempt, &err).await {
                return Err(err);
            }
            attempt += 1;
        }
    }

    async fn delete(&self, key: &Key) -> StorageResult<bool> {
        let mut attempt = 1;
        loop {
            let err = match self.inner.delete(key).await {
                Err(e) => e,
                done => return done,
            };
            if !self.backoff("delete", key, attempt, &err).await {
                return Err(err);
            }
            attempt += 1;
        }
    }

    async fn update<F, R>(&self, key: &Key, mut f: F) -> StorageResult<R>
    where
        F: FnMut(Option<&[u8]>) -> (Write, R) + Send,
        R: Send,
    {
        let mut attempt = 1;
        loop {
            let err = match self.inner.update(key, &mut f).await {
                Err(e) => e,
                done => return done,
            };
            if !self.backoff("update", key, attempt, &err).await {
                return Err(err);
            }
            attempt += 1;
        }
    }
}
