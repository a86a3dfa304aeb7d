//! Reentrant try-lock owned by a cooperative thread.
//!
//! The lock guards a resource across yield points: a thread that claimed the
//! display keeps it while other threads run, and those threads see
//! `acquire` fail until it is released.
//!
//! Contract: release only what you acquired, exactly as often as you
//! acquired it. Debug builds assert this; release builds trust the caller.
//!
//! The reentrant path bumps the count without the atomic claim. That is only
//! sound because threads switch cooperatively on a single core: while the
//! owner runs nobody else can be halfway through claiming the word. Under
//! preemption or on several cores this path would race.

use super::exclusive::try_claim;
use crate::thread::ThreadId;
use portable_atomic::{AtomicU32, AtomicUsize, Ordering};

/// Lock word value of a free lock.
const UNLOCKED: u32 = 1;
/// Lock word value of a held lock.
const LOCKED: u32 = 0;

const NO_OWNER: usize = usize::MAX;

/// Observable state of a [`ReentrantLock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Free,
    Held,
}

/// Reentrant lock with owner and nesting depth.
#[derive(Debug)]
pub struct ReentrantLock {
    state: AtomicU32,
    count: AtomicU32,
    owner: AtomicUsize,
}

impl ReentrantLock {
    /// A free lock, usable in a `static`.
    pub const fn new() -> Self {
        Self {
            state: AtomicU32::new(UNLOCKED),
            count: AtomicU32::new(0),
            owner: AtomicUsize::new(NO_OWNER),
        }
    }

    /// Reset to free with no owner.
    pub fn init(&self) {
        self.state.store(UNLOCKED, Ordering::Relaxed);
        self.count.store(0, Ordering::Relaxed);
        self.owner.store(NO_OWNER, Ordering::Release);
    }

    /// Try to take the lock for `me`.
    ///
    /// Succeeds immediately when `me` already owns it, adding one level of
    /// nesting. Otherwise makes a single attempt to claim the lock word;
    /// `false` means "held by someone else, try later" and leaves the lock
    /// untouched.
    pub fn acquire(&self, me: ThreadId) -> bool {
        if self.owner.load(Ordering::Acquire) == me.index() {
            self.count.fetch_add(1, Ordering::Relaxed);
            return true;
        }

        if !try_claim(&self.state, UNLOCKED, LOCKED) {
            return false;
        }

        self.count.store(1, Ordering::Relaxed);
        self.owner.store(me.index(), Ordering::Release);
        true
    }

    /// Drop one level of nesting; the last one frees the lock.
    pub fn release(&self, me: ThreadId) {
        debug_assert_eq!(
            self.owner.load(Ordering::Acquire),
            me.index(),
            "lock released by thread {} which does not own it",
            me
        );

        let before = self.count.fetch_sub(1, Ordering::Relaxed);
        debug_assert!(before > 0, "lock released more often than acquired");

        if before == 1 {
            self.owner.store(NO_OWNER, Ordering::Relaxed);
            self.state.store(UNLOCKED, Ordering::Release);
        }
    }

    pub fn state(&self) -> LockState {
        if self.state.load(Ordering::Acquire) == LOCKED {
            LockState::Held
        } else {
            LockState::Free
        }
    }

    pub fn is_held(&self) -> bool {
        self.state() == LockState::Held
    }

    /// Current nesting depth.
    pub fn count(&self) -> u32 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn owner(&self) -> Option<ThreadId> {
        match self.owner.load(Ordering::Acquire) {
            NO_OWNER => None,
            index => Some(ThreadId::new(index)),
        }
    }
}

impl Default for ReentrantLock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: ThreadId = ThreadId::new(0);
    const T1: ThreadId = ThreadId::new(1);

    #[test]
    fn test_new_lock_is_free() {
        let lock = ReentrantLock::new();
        assert_eq!(lock.state(), LockState::Free);
        assert_eq!(lock.count(), 0);
        assert_eq!(lock.owner(), None);
    }

    #[test]
    fn test_acquire_takes_ownership() {
        let lock = ReentrantLock::new();
        assert!(lock.acquire(T0));
        assert_eq!(lock.state(), LockState::Held);
        assert_eq!(lock.count(), 1);
        assert_eq!(lock.owner(), Some(T0));
    }

    #[test]
    fn test_reentrant_acquire_nests() {
        let lock = ReentrantLock::new();
        assert!(lock.acquire(T0));
        assert!(lock.acquire(T0));
        assert_eq!(lock.count(), 2);

        lock.release(T0);
        assert!(lock.is_held());
        assert_eq!(lock.owner(), Some(T0));

        lock.release(T0);
        assert!(!lock.is_held());
        assert_eq!(lock.owner(), None);
    }

    #[test]
    fn test_other_thread_fails_while_held() {
        let lock = ReentrantLock::new();
        assert!(lock.acquire(T0));
        assert!(!lock.acquire(T1));
        assert_eq!(lock.count(), 1);
        assert_eq!(lock.owner(), Some(T0));
    }

    #[test]
    fn test_other_thread_succeeds_after_release() {
        let lock = ReentrantLock::new();
        assert!(lock.acquire(T0));
        lock.release(T0);
        assert!(lock.acquire(T1));
        assert_eq!(lock.owner(), Some(T1));
        assert_eq!(lock.count(), 1);
    }

    #[test]
    fn test_init_resets_held_lock() {
        let lock = ReentrantLock::new();
        assert!(lock.acquire(T0));
        assert!(lock.acquire(T0));
        lock.init();
        assert_eq!(lock.state(), LockState::Free);
        assert_eq!(lock.count(), 0);
        assert_eq!(lock.owner(), None);
        assert!(lock.acquire(T1));
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "does not own it")]
    fn test_release_by_non_owner_asserts() {
        let lock = ReentrantLock::new();
        assert!(lock.acquire(T0));
        lock.release(T1);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic]
    fn test_release_of_free_lock_asserts() {
        let lock = ReentrantLock::new();
        lock.release(T0);
    }
}
