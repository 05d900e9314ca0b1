//! The runtime-wide lock
//!
//! One recursive lock guards the managed heap and the object graph. Every call
//! into host code releases it completely through [`DropAllLocks`] and takes it
//! back, at the same recursion depth, when the host returns.
//!
//! # Usage
//!
//! ```
//! use otter_callback_object::RuntimeLock;
//!
//! let lock = RuntimeLock::new();
//! let _outer = lock.lock();
//! let _inner = lock.lock(); // recursive
//! assert_eq!(lock.depth(), 2);
//! {
//!     let _unlocked = lock.drop_all_locks();
//!     assert!(!lock.is_held_by_current_thread());
//! }
//! assert_eq!(lock.depth(), 2);
//! ```

use parking_lot::{Condvar, Mutex};
use std::marker::PhantomData;
use std::sync::Arc;
use std::thread::{self, ThreadId};

#[derive(Debug, Default)]
struct LockState {
    owner: Option<ThreadId>,
    depth: usize,
}

#[derive(Debug, Default)]
struct LockInner {
    state: Mutex<LockState>,
    released: Condvar,
}

/// Recursive runtime lock with scoped full release
#[derive(Clone, Debug, Default)]
pub struct RuntimeLock {
    inner: Arc<LockInner>,
}

impl RuntimeLock {
    /// Create an unlocked lock
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire one level of the lock, blocking while another thread holds it
    pub fn lock(&self) -> RuntimeLockGuard {
        self.acquire(1);
        RuntimeLockGuard {
            lock: self.clone(),
            _not_send: PhantomData,
        }
    }

    /// Release every level held by the current thread until the guard drops
    ///
    /// A thread that does not hold the lock gets a no-op guard.
    pub fn drop_all_locks(&self) -> DropAllLocks {
        let dropped_depth = self.release_all();
        DropAllLocks {
            lock: self.clone(),
            dropped_depth,
            _not_send: PhantomData,
        }
    }

    /// Check whether the current thread owns the lock
    pub fn is_held_by_current_thread(&self) -> bool {
        self.inner.state.lock().owner == Some(thread::current().id())
    }

    /// Recursion depth held by the current thread (0 if not the owner)
    pub fn depth(&self) -> usize {
        let state = self.inner.state.lock();
        if state.owner == Some(thread::current().id()) {
            state.depth
        } else {
            0
        }
    }

    fn acquire(&self, depth: usize) {
        let me = thread::current().id();
        let mut state = self.inner.state.lock();
        if state.owner == Some(me) {
            state.depth += depth;
            return;
        }
        while state.owner.is_some() {
            self.inner.released.wait(&mut state);
        }
        state.owner = Some(me);
        state.depth = depth;
    }

    fn release_one(&self) {
        let mut state = self.inner.state.lock();
        debug_assert_eq!(state.owner, Some(thread::current().id()));
        state.depth = state.depth.saturating_sub(1);
        if state.depth == 0 {
            state.owner = None;
            self.inner.released.notify_one();
        }
    }

    fn release_all(&self) -> usize {
        let mut state = self.inner.state.lock();
        if state.owner != Some(thread::current().id()) {
            return 0;
        }
        let depth = std::mem::take(&mut state.depth);
        state.owner = None;
        self.inner.released.notify_one();
        depth
    }
}

/// One level of the runtime lock; released on drop
///
/// Tied to the acquiring thread, so it is `!Send`.
pub struct RuntimeLockGuard {
    lock: RuntimeLock,
    _not_send: PhantomData<*mut ()>,
}

impl RuntimeLockGuard {
    /// The lock this guard holds
    pub fn lock(&self) -> &RuntimeLock {
        &self.lock
    }
}

impl Drop for RuntimeLockGuard {
    fn drop(&mut self) {
        self.lock.release_one();
    }
}

impl std::fmt::Debug for RuntimeLockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeLockGuard").finish_non_exhaustive()
    }
}

/// Scoped full release of the runtime lock
///
/// Reacquires the lock at the released depth on drop.
pub struct DropAllLocks {
    lock: RuntimeLock,
    dropped_depth: usize,
    _not_send: PhantomData<*mut ()>,
}

impl DropAllLocks {
    /// Depth that will be restored on drop
    pub fn dropped_depth(&self) -> usize {
        self.dropped_depth
    }
}

impl Drop for DropAllLocks {
    fn drop(&mut self) {
        if self.dropped_depth > 0 {
            self.lock.acquire(self.dropped_depth);
        }
    }
}

impl std::fmt::Debug for DropAllLocks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DropAllLocks")
            .field("dropped_depth", &self.dropped_depth)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn test_recursive_lock() {
        let lock = RuntimeLock::new();
        let a = lock.lock();
        let b = lock.lock();
        assert_eq!(lock.depth(), 2);
        drop(b);
        assert_eq!(lock.depth(), 1);
        drop(a);
        assert!(!lock.is_held_by_current_thread());
    }

    #[test]
    fn test_drop_all_locks_restores_depth() {
        let lock = RuntimeLock::new();
        let _a = lock.lock();
        let _b = lock.lock();
        {
            let unlocked = lock.drop_all_locks();
            assert_eq!(unlocked.dropped_depth(), 2);
            assert_eq!(lock.depth(), 0);
        }
        assert_eq!(lock.depth(), 2);
    }

    #[test]
    fn test_drop_all_locks_without_holding_is_noop() {
        let lock = RuntimeLock::new();
        let unlocked = lock.drop_all_locks();
        assert_eq!(unlocked.dropped_depth(), 0);
        drop(unlocked);
        assert!(!lock.is_held_by_current_thread());
    }

    #[test]
    fn test_other_thread_runs_while_dropped() {
        let lock = RuntimeLock::new();
        let _guard = lock.lock();

        let (tx, rx) = mpsc::channel();
        let _unlocked = lock.drop_all_locks();
        let remote = lock.clone();
        let handle = thread::spawn(move || {
            let _g = remote.lock();
            tx.send(()).unwrap();
        });
        rx.recv_timeout(Duration::from_secs(5))
            .expect("other thread should acquire the released lock");
        handle.join().unwrap();
    }

    #[test]
    fn test_other_thread_blocks_while_held() {
        let lock = RuntimeLock::new();
        let guard = lock.lock();

        let (tx, rx) = mpsc::channel();
        let remote = lock.clone();
        let handle = thread::spawn(move || {
            let _g = remote.lock();
            tx.send(()).unwrap();
        });
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
        drop(guard);
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        handle.join().unwrap();
    }
}
