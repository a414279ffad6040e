//! The single shared execution slot ("the oven").

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::error::DispatchError;
use crate::job::JobId;
use crate::metrics::STATION_BUSY;

/// Occupancy of the station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "job_id", rename_all = "snake_case")]
pub enum StationState {
    Free,
    Busy(JobId),
}

/// Mutual exclusion over one execution slot.
///
/// Waiters are served in arrival order by the underlying semaphore. Not
/// reentrant: a job that already holds the station cannot acquire it again.
#[derive(Debug)]
pub struct ExclusiveStation {
    slot: Arc<Semaphore>,
    occupant: Arc<Mutex<StationState>>,
}

/// Held station. Frees the slot when dropped.
#[derive(Debug)]
pub struct StationGuard {
    job_id: JobId,
    occupant: Arc<Mutex<StationState>>,
    _permit: OwnedSemaphorePermit,
}

fn lock_state(state: &Mutex<StationState>) -> MutexGuard<'_, StationState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Default for ExclusiveStation {
    fn default() -> Self {
        Self::new()
    }
}

impl ExclusiveStation {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Semaphore::new(1)),
            occupant: Arc::new(Mutex::new(StationState::Free)),
        }
    }

    /// Waits for the station on behalf of `job_id`.
    pub async fn acquire(
        &self,
        job_id: JobId,
        cancel: &CancellationToken,
    ) -> Result<StationGuard, DispatchError> {
        if self.state() == StationState::Busy(job_id) {
            return Err(DispatchError::StationReentry(job_id));
        }

        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(DispatchError::Canceled),
            permit = Arc::clone(&self.slot).acquire_owned() => {
                permit.map_err(|_| DispatchError::Closed)?
            }
        };

        *lock_state(&self.occupant) = StationState::Busy(job_id);
        STATION_BUSY.set(1);

        Ok(StationGuard {
            job_id,
            occupant: Arc::clone(&self.occupant),
            _permit: permit,
        })
    }

    pub fn state(&self) -> StationState {
        *lock_state(&self.occupant)
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.state(), StationState::Busy(_))
    }
}

impl StationGuard {
    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    /// Frees the station.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for StationGuard {
    fn drop(&mut self) {
        *lock_state(&self.occupant) = StationState::Free;
        STATION_BUSY.set(0);
    }
}
