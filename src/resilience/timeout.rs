use crate::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::{timeout, Instant};
use tracing::{debug, warn};

/// Extension trait to add timeout functionality to futures
#[allow(async_fn_in_trait)]
pub trait TimeoutExt<T> {
    /// Add timeout to a future with custom duration
    async fn with_timeout_duration(self, duration: Duration) -> Result<T>;
}

impl<F, T> TimeoutExt<T> for F
where
    F: Future<Output = T>,
{
    async fn with_timeout_duration(self, duration: Duration) -> Result<T> {
        timeout(duration, self)
            .await
            .map_err(|_| Error::Timeout { timeout: duration })
    }
}

/// Run a fallible operation under a timeout, logging how it ended
pub async fn run_logged<Fut, T, E>(
    operation_name: &str,
    duration: Duration,
    operation: Fut,
) -> std::result::Result<T, Option<E>>
where
    Fut: Future<Output = std::result::Result<T, E>>,
    E: std::fmt::Display,
{
    let start_time = Instant::now();
    match timeout(duration, operation).await {
        Ok(Ok(value)) => {
            debug!(
                "Operation '{}' completed in {:?}",
                operation_name,
                start_time.elapsed()
            );
            Ok(value)
        }
        Ok(Err(error)) => {
            debug!(
                "Operation '{}' failed after {:?}: {}",
                operation_name,
                start_time.elapsed(),
                error
            );
            Err(Some(error))
        }
        Err(_) => {
            warn!("Operation '{}' timed out after {:?}", operation_name, duration);
            Err(None)
        }
    }
}

/// Point in time by which a whole request must finish.
///
/// Individual calls made under a deadline get the smaller of their own budget
/// and whatever is left of the deadline.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    /// Deadline `budget` from now
    #[must_use]
    pub fn after(budget: Duration) -> Self {
        Self {
            at: Instant::now() + budget,
        }
    }

    /// Time left, zero once expired
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.remaining().is_zero()
    }

    /// Shrink a per-call budget so it never outlives the deadline
    #[must_use]
    pub fn clamp(&self, budget: Duration) -> Duration {
        budget.min(self.remaining())
    }
}
