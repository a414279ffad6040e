//! Counting permit pool for the scarce ingredient resource.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::error::DispatchError;
use crate::metrics::PERMITS_IN_USE;

/// Fixed-capacity permit pool.
///
/// Outstanding permits never exceed the capacity given at construction.
#[derive(Debug)]
pub struct ResourcePermits {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    in_use: Arc<AtomicUsize>,
    high_water: AtomicUsize,
}

/// A held permit. Returned to the pool when dropped.
///
/// [`IngredientPermit::release`] consumes the guard, so releasing the same
/// acquisition twice does not compile.
#[derive(Debug)]
pub struct IngredientPermit {
    in_use: Arc<AtomicUsize>,
    _permit: OwnedSemaphorePermit,
}

impl ResourcePermits {
    pub fn new(capacity: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            in_use: Arc::new(AtomicUsize::new(0)),
            high_water: AtomicUsize::new(0),
        }
    }

    /// Waits for a free permit, or fails with `Canceled` when `cancel` fires.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<IngredientPermit, DispatchError> {
        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(DispatchError::Canceled),
            permit = Arc::clone(&self.semaphore).acquire_owned() => {
                permit.map_err(|_| DispatchError::Closed)?
            }
        };

        let now = self.in_use.fetch_add(1, Ordering::SeqCst) + 1;
        self.high_water.fetch_max(now, Ordering::SeqCst);
        PERMITS_IN_USE.inc();

        Ok(IngredientPermit {
            in_use: Arc::clone(&self.in_use),
            _permit: permit,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permits currently held.
    pub fn in_use(&self) -> usize {
        self.in_use.load(Ordering::SeqCst)
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Largest number of permits ever held at once.
    pub fn high_water_mark(&self) -> usize {
        self.high_water.load(Ordering::SeqCst)
    }
}

impl IngredientPermit {
    /// Returns the permit to the pool.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for IngredientPermit {
    fn drop(&mut self) {
        // Runs before the semaphore permit field is dropped, so `in_use`
        // never reads above capacity.
        self.in_use.fetch_sub(1, Ordering::SeqCst);
        PERMITS_IN_USE.dec();
    }
}
