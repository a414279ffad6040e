//! Priority-aware blocking job queue.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::error::DispatchError;
use crate::job::{Job, JobId, PriorityClass};

/// Number of jobs waiting in each priority buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueDepths {
    pub high: usize,
    pub normal: usize,
}

impl QueueDepths {
    pub fn total(&self) -> usize {
        self.high + self.normal
    }
}

#[derive(Debug, Default)]
struct QueueState {
    high: VecDeque<Job>,
    normal: VecDeque<Job>,
    closed: bool,
}

impl QueueState {
    fn pop(&mut self) -> Option<Job> {
        self.high.pop_front().or_else(|| self.normal.pop_front())
    }

    fn is_empty(&self) -> bool {
        self.high.is_empty() && self.normal.is_empty()
    }
}

/// Unbounded two-class queue.
///
/// High jobs always leave before Normal jobs; each class is FIFO. Every
/// submit and dequeue goes through the same mutex, so concurrent callers
/// observe one global order.
#[derive(Debug, Default)]
pub struct JobQueue {
    state: Mutex<QueueState>,
    notify: Notify,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        // Nothing panics while the lock is held; a poisoned guard is still consistent.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enqueues a job. Never blocks; fails only once the queue is closed.
    pub fn submit(&self, job: Job) -> Result<JobId, DispatchError> {
        let id = job.id();
        {
            let mut state = self.lock();
            if state.closed {
                return Err(DispatchError::Closed);
            }
            match job.priority() {
                PriorityClass::High => state.high.push_back(job),
                PriorityClass::Normal => state.normal.push_back(job),
            }
        }
        self.notify.notify_one();
        Ok(id)
    }

    /// Removes the next ready job without waiting.
    pub fn try_dequeue(&self) -> Option<Job> {
        self.lock().pop()
    }

    /// Waits for the next job.
    ///
    /// Returns `Ok(None)` once the queue is closed and empty, and
    /// `Err(Canceled)` if `cancel` fires first.
    pub async fn dequeue(&self, cancel: &CancellationToken) -> Result<Option<Job>, DispatchError> {
        loop {
            // Register interest before inspecting state so a close or submit
            // racing with the check still wakes us.
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.lock();
                if let Some(job) = state.pop() {
                    let more = !state.is_empty();
                    drop(state);
                    if more {
                        self.notify.notify_one();
                    }
                    return Ok(Some(job));
                }
                if state.closed {
                    return Ok(None);
                }
            }

            tokio::select! {
                _ = &mut notified => {}
                _ = cancel.cancelled() => {
                    // Hand a possibly consumed wakeup to another waiter.
                    if !self.is_empty() {
                        self.notify.notify_one();
                    }
                    return Err(DispatchError::Canceled);
                }
            }
        }
    }

    /// Closes the queue and wakes every blocked `dequeue`.
    ///
    /// Jobs already queued can still be dequeued; waiters return `Ok(None)`
    /// once the queue is empty.
    pub fn close(&self) {
        self.lock().closed = true;
        self.notify.notify_waiters();
    }

    /// Removes every remaining job, in dequeue order.
    pub fn drain(&self) -> Vec<Job> {
        Self::take_jobs(&mut self.lock())
    }

    /// Closes the queue and removes every remaining job under one lock.
    ///
    /// No worker can dequeue between the two, so the returned jobs are
    /// exactly those still waiting when the queue closed.
    pub fn close_and_drain(&self) -> Vec<Job> {
        let drained = {
            let mut state = self.lock();
            state.closed = true;
            Self::take_jobs(&mut state)
        };
        self.notify.notify_waiters();
        drained
    }

    fn take_jobs(state: &mut QueueState) -> Vec<Job> {
        let mut drained = Vec::with_capacity(state.high.len() + state.normal.len());
        drained.extend(state.high.drain(..));
        drained.extend(state.normal.drain(..));
        drained
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn len(&self) -> usize {
        self.depths().total()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn depths(&self) -> QueueDepths {
        let state = self.lock();
        QueueDepths {
            high: state.high.len(),
            normal: state.normal.len(),
        }
    }
}
