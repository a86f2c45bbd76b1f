use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Non-blocking mutual exclusion for a single periodic task.
///
/// Acquisition either succeeds immediately or reports that a run is already
/// in progress; callers never wait.
#[derive(Debug, Clone, Default)]
pub struct SkipLock {
    inner: Arc<Mutex<()>>,
}

/// Proof that the holder owns the run. Released on drop, including unwinding.
#[derive(Debug)]
pub struct SkipGuard {
    _guard: OwnedMutexGuard<()>,
}

impl SkipLock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to take the lock without waiting.
    #[must_use]
    pub fn try_acquire(&self) -> Option<SkipGuard> {
        Arc::clone(&self.inner)
            .try_lock_owned()
            .ok()
            .map(|guard| SkipGuard { _guard: guard })
    }

    #[must_use]
    pub fn is_held(&self) -> bool {
        self.inner.try_lock().is_err()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_while_held() {
        let lock = SkipLock::new();
        let guard = lock.try_acquire();
        assert!(guard.is_some());
        assert!(lock.is_held());
        assert!(lock.try_acquire().is_none());

        drop(guard);
        assert!(!lock.is_held());
        assert!(lock.try_acquire().is_some());
    }

    #[test]
    fn clones_share_state() {
        let lock = SkipLock::new();
        let other = lock.clone();
        let _guard = lock.try_acquire().unwrap();
        assert!(other.try_acquire().is_none());
    }

    #[tokio::test]
    async fn guard_released_when_task_panics() {
        let lock = SkipLock::new();
        let guard = lock.try_acquire().unwrap();
        let handle = tokio::spawn(async move {
            let _guard = guard;
            panic!("boom");
        });
        assert!(handle.await.is_err());
        assert!(lock.try_acquire().is_some());
    }
}
