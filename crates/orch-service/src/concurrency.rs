//! Concurrency governor
//!
//! A counting semaphore bounding simultaneously in-flight provider calls
//! across all callers. Permits are RAII values, so a slot is released on
//! every exit path of the holding call, including panics and early returns.

use crate::error::{Result, ServiceError};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Hard cap on simultaneous outbound provider calls
pub struct ConcurrencyGovernor {
    semaphore: Arc<Semaphore>,
    limit: usize,
    in_flight: Arc<AtomicUsize>,
}

/// RAII slot; dropping it frees the slot
pub struct SlotPermit {
    _permit: OwnedSemaphorePermit,
    in_flight: Arc<AtomicUsize>,
}

impl Drop for SlotPermit {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ConcurrencyGovernor {
    /// Create a governor with `limit` slots
    pub fn new(limit: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            limit,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Wait for a free slot
    ///
    /// Suspends cooperatively until one frees up. Fails only after
    /// [`ConcurrencyGovernor::close`], when the service is shutting down.
    pub async fn acquire(&self) -> Result<SlotPermit> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ServiceError::ShuttingDown)?;
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        Ok(SlotPermit {
            _permit: permit,
            in_flight: self.in_flight.clone(),
        })
    }

    /// Currently held slots
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Configured slot count
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Wait for in-flight work to drain, then refuse further acquisition
    pub async fn close(&self) {
        // Holding every permit means nothing is in flight.
        let drained = self.semaphore.acquire_many(self.limit as u32).await;
        self.semaphore.close();
        drop(drained);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_release_on_drop() {
        let governor = ConcurrencyGovernor::new(1);

        let permit = governor.acquire().await.unwrap();
        assert_eq!(governor.in_flight(), 1);
        drop(permit);
        assert_eq!(governor.in_flight(), 0);

        // The freed slot is reusable
        let _again = governor.acquire().await.unwrap();
    }

    #[tokio::test]
    async fn test_bound_holds_under_load() {
        let governor = Arc::new(ConcurrencyGovernor::new(3));
        let observed_max = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..12 {
            let governor = governor.clone();
            let observed_max = observed_max.clone();
            handles.push(tokio::spawn(async move {
                let _permit = governor.acquire().await.unwrap();
                observed_max.fetch_max(governor.in_flight(), Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert!(observed_max.load(Ordering::SeqCst) <= 3);
        assert_eq!(governor.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_close_rejects_new_acquisition() {
        let governor = ConcurrencyGovernor::new(2);
        governor.close().await;

        let result = governor.acquire().await;
        assert!(matches!(result, Err(ServiceError::ShuttingDown)));
    }

    #[tokio::test]
    async fn test_close_waits_for_drain() {
        let governor = Arc::new(ConcurrencyGovernor::new(2));
        let permit = governor.acquire().await.unwrap();

        let closer = {
            let governor = governor.clone();
            tokio::spawn(async move { governor.close().await })
        };

        // close() cannot finish while a permit is held
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!closer.is_finished());

        drop(permit);
        closer.await.unwrap();
        assert!(governor.acquire().await.is_err());
    }
}
