//! Thread control blocks and the per-thread view of the kernel.

use crate::arch::Arch;
use crate::mem::Stack;
use core::cell::UnsafeCell;
use core::fmt;
use portable_atomic::{AtomicBool, Ordering};

/// Index of a thread in the kernel's table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ThreadId(usize);

impl ThreadId {
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Slot in the thread table.
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Entry function of a thread.
///
/// Called once, on the thread's own stack, with that thread's context.
/// Returning ends the thread.
pub type ThreadEntry<'a> = &'a dyn Fn(&ThreadContext<'_>);

/// Way back into the scheduler, as seen from thread code.
pub(crate) trait Yielder {
    fn yield_from(&self, id: ThreadId);
}

/// Identity of the running thread and its handle on the scheduler.
///
/// Passed to every thread entry. Lock operations take [`id`](Self::id)
/// explicitly instead of reading a global "current thread".
pub struct ThreadContext<'k> {
    id: ThreadId,
    kernel: &'k dyn Yielder,
}

impl<'k> ThreadContext<'k> {
    pub(crate) fn new(id: ThreadId, kernel: &'k dyn Yielder) -> Self {
        Self { id, kernel }
    }

    pub fn id(&self) -> ThreadId {
        self.id
    }

    /// Hand the CPU back to the scheduler.
    ///
    /// Behaves like an ordinary call that returns once every other active
    /// thread had its turn.
    pub fn yield_now(&self) {
        self.kernel.yield_from(self.id);
    }
}

impl fmt::Debug for ThreadContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadContext").field("id", &self.id).finish()
    }
}

/// Thread control block.
///
/// `context` is written only while its thread suspends and read only when
/// the scheduler resumes it; neither happens while a reference into it is
/// alive, which is what makes the `UnsafeCell` access sound.
pub(crate) struct Tcb<A: Arch> {
    active: AtomicBool,
    stack: spin::Mutex<Option<Stack>>,
    context: UnsafeCell<A::SavedContext>,
}

impl<A: Arch> Tcb<A> {
    pub(crate) fn new() -> Self {
        Self {
            active: AtomicBool::new(false),
            stack: spin::Mutex::new(None),
            context: UnsafeCell::new(A::SavedContext::default()),
        }
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub(crate) fn activate(&self) {
        self.active.store(true, Ordering::Release);
    }

    /// Called by the thread itself once its entry returned. The stack stays
    /// in place: the thread is still running on it.
    pub(crate) fn mark_inactive(&self) {
        self.active.store(false, Ordering::Release);
    }

    pub(crate) fn install_stack(&self, stack: Stack) -> *mut u8 {
        let top = stack.top();
        *self.stack.lock() = Some(stack);
        top
    }

    /// Free the stack of a finished thread. Returns whether there was one,
    /// so a stack is never freed twice.
    pub(crate) fn reclaim_stack(&self) -> bool {
        debug_assert!(!self.is_active(), "reclaiming the stack of a live thread");
        self.stack.lock().take().is_some()
    }

    pub(crate) fn has_stack(&self) -> bool {
        self.stack.lock().is_some()
    }

    /// Whether the canary at the far end of the stack survived. A TCB
    /// without a stack has nothing to overflow.
    pub(crate) fn stack_intact(&self) -> bool {
        self.stack.lock().as_ref().map_or(true, Stack::check_canary)
    }

    #[cfg(test)]
    pub(crate) fn clobber_canary(&self) {
        if let Some(stack) = self.stack.lock().as_ref() {
            // Safety: the lowest word of a live stack, far below any frame.
            unsafe { (stack.bottom() as *mut u64).write(0) };
        }
    }

    pub(crate) fn context_ptr(&self) -> *mut A::SavedContext {
        self.context.get()
    }
}
