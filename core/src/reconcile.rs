//! Read-after-write reconciliation for an eventually consistent backend.
//!
//! # Design
//! The server replicates writes across nodes asynchronously, so a read issued
//! right after a mutation may still see the old state. After a create or
//! update the poller re-reads the resource until the observation matches the
//! intended state; after a delete it re-reads until the server answers 404.
//! Delays start at `initial_delay` and double after every miss.
//!
//! Only HTTP-level misses (non-2xx, or 2xx with a stale body) are retried.
//! Transport, decode and cancellation errors end the loop immediately.

use std::fmt::Display;
use std::time::Duration;

use tracing::{debug, instrument, warn};

use crate::cancel::{CancelToken, Sleeper};
use crate::dispatch::Response;
use crate::error::{ApiError, Result};

/// Attempt budgets and backoff for the poller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilePolicy {
    /// Delay before the second read; doubles after each further miss.
    pub initial_delay: Duration,
    /// Total reads allowed after a create or update. `None` polls until the
    /// write becomes visible or the caller cancels.
    pub mutation_max_attempts: Option<u32>,
    /// Total reads allowed after a delete.
    pub delete_max_attempts: u32,
}

impl Default for ReconcilePolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            mutation_max_attempts: None,
            delete_max_attempts: 5,
        }
    }
}

/// Polls a resource until a mutation becomes visible.
pub struct Reconciler<'a> {
    policy: &'a ReconcilePolicy,
    sleeper: &'a dyn Sleeper,
    cancel: &'a CancelToken,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        policy: &'a ReconcilePolicy,
        sleeper: &'a dyn Sleeper,
        cancel: &'a CancelToken,
    ) -> Self {
        Self { policy, sleeper, cancel }
    }

    /// Re-reads `id` until `fetch` succeeds with 200 and `equivalent` accepts
    /// the observation, then returns that observation.
    #[instrument(skip_all, fields(id = %id))]
    pub fn after_mutation<I, T, F, E>(
        &self,
        id: &I,
        intended: &T,
        mut fetch: F,
        equivalent: E,
    ) -> Result<(T, Response)>
    where
        I: Display + ?Sized,
        F: FnMut(&I) -> Result<(T, Response)>,
        E: Fn(&T, Option<&T>) -> bool,
    {
        let mut delay = self.policy.initial_delay;
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match fetch(id) {
                Ok((observed, response)) => {
                    if response.status == 200 && equivalent(intended, Some(&observed)) {
                        debug!(attempts, "write is visible");
                        return Ok((observed, response));
                    }
                    debug!(attempts, status = response.status, "observed state is stale");
                }
                Err(err @ ApiError::Http { .. }) => {
                    debug!(attempts, error = %err, "resource not yet readable");
                }
                Err(err) => return Err(err),
            }

            if self.policy.mutation_max_attempts.is_some_and(|max| attempts >= max) {
                warn!(attempts, "write never became visible");
                return Err(ApiError::ReconciliationExhausted { id: id.to_string(), attempts });
            }
            self.sleeper.sleep(delay, self.cancel)?;
            delay = delay.saturating_mul(2);
        }
    }

    /// Re-reads `id` until `fetch` reports 404, giving up after
    /// `delete_max_attempts` reads.
    #[instrument(skip_all, fields(id = %id))]
    pub fn after_delete<I, T, F>(&self, id: &I, mut fetch: F) -> Result<()>
    where
        I: Display + ?Sized,
        F: FnMut(&I) -> Result<(T, Response)>,
    {
        let max_attempts = self.policy.delete_max_attempts.max(1);
        let mut delay = self.policy.initial_delay;
        for attempt in 1..=max_attempts {
            match fetch(id) {
                Err(err) if err.is_not_found() => {
                    debug!(attempts = attempt, "deletion is visible");
                    return Ok(());
                }
                Err(err @ ApiError::Http { .. }) => {
                    debug!(attempts = attempt, error = %err, "deletion not yet confirmed");
                }
                Err(err) => return Err(err),
                Ok(_) => debug!(attempts = attempt, "resource still readable"),
            }
            if attempt < max_attempts {
                self.sleeper.sleep(delay, self.cancel)?;
                delay = delay.saturating_mul(2);
            }
        }
        warn!(attempts = max_attempts, "deletion never became visible");
        Err(ApiError::DeletionNotConfirmed { id: id.to_string(), attempts: max_attempts })
    }
}
