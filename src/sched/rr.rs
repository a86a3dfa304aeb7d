//! Round-robin slot selection over a fixed thread table.

use crate::thread::ThreadId;
use portable_atomic::{AtomicUsize, Ordering};

/// Value of the cursor before the first dispatch.
const NO_THREAD: usize = usize::MAX;

/// Round-robin cursor over `N` thread slots.
///
/// The cursor is the "current thread" of the kernel: it names the slot that
/// was dispatched last, or nothing before the first dispatch. Selection
/// always moves it forward by one slot, wrapping after `N - 1`, so each full
/// pass visits every slot exactly once in increasing order.
#[derive(Debug)]
pub struct RoundRobinScheduler<const N: usize> {
    current: AtomicUsize,
}

impl<const N: usize> RoundRobinScheduler<N> {
    pub const fn new() -> Self {
        Self {
            current: AtomicUsize::new(NO_THREAD),
        }
    }

    /// Slot dispatched last, `None` before the first dispatch.
    pub fn current(&self) -> Option<ThreadId> {
        match self.current.load(Ordering::Acquire) {
            NO_THREAD => None,
            index => Some(ThreadId::new(index)),
        }
    }

    /// Move the cursor to the next slot and return it.
    ///
    /// `N` must be non-zero.
    pub fn advance(&self) -> ThreadId {
        let next = match self.current.load(Ordering::Acquire) {
            NO_THREAD => 0,
            index if index + 1 == N => 0,
            index => index + 1,
        };
        self.current.store(next, Ordering::Release);
        ThreadId::new(next)
    }

    /// Run one dispatch pass.
    ///
    /// Advances slot by slot until `is_active` accepts one and returns it.
    /// After `N` consecutive rejections every thread is inactive and the
    /// pass returns `None`. The cursor is left on the last slot examined.
    pub fn pick_next(&self, is_active: impl Fn(ThreadId) -> bool) -> Option<ThreadId> {
        let mut remaining = N;
        while remaining > 0 {
            let id = self.advance();
            if is_active(id) {
                return Some(id);
            }
            remaining -= 1;
        }
        None
    }
}

impl<const N: usize> Default for RoundRobinScheduler<N> {
    fn default() -> Self {
        Self::new()
    }
}
