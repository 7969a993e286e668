use std::sync::{Mutex, MutexGuard, PoisonError, TryLockError};

/// Advisory mutual exclusion attached to a stream.
///
/// Holding the lock does not stop anyone from calling read/write
/// operations on the stream. It only serializes accessors that agree
/// to take it around their whole seek/read/write sequence.
#[derive(Debug, Default)]
pub struct AdvisoryLock {
    mutex: Mutex<()>,
}

/// Held advisory lock. Dropping it (or calling [`StreamGuard::unlock`])
/// releases the lock.
#[must_use = "the advisory lock is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct StreamGuard<'a> {
    _guard: MutexGuard<'a, ()>,
}

impl AdvisoryLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until the lock is acquired.
    pub fn lock(&self) -> StreamGuard<'_> {
        // The mutex guards no data, so a panic while it was held
        // leaves nothing inconsistent behind.
        let guard = self
            .mutex
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        StreamGuard { _guard: guard }
    }

    /// Acquire the lock only if nobody else holds it.
    pub fn try_lock(&self) -> Option<StreamGuard<'_>> {
        match self.mutex.try_lock() {
            Ok(guard) => Some(StreamGuard { _guard: guard }),
            Err(TryLockError::Poisoned(poisoned)) => Some(StreamGuard {
                _guard: poisoned.into_inner(),
            }),
            Err(TryLockError::WouldBlock) => None,
        }
    }
}

impl StreamGuard<'_> {
    pub fn unlock(self) {
        drop(self)
    }
}
