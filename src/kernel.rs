//! Kernel abstraction for running the thread table.
//!
//! This module provides the main `Kernel` struct: it owns the thread control
//! blocks, primes each of them at startup, and runs the round-robin dispatch
//! loop until every thread has returned from its entry function.

use crate::arch::{Arch, ContextEntry};
use crate::config::{KernelConfig, MIN_STACK_SIZE};
use crate::errors::{KernelError, KernelResult};
use crate::mem::Stack;
use crate::sched::RoundRobinScheduler;
use crate::thread::{Tcb, ThreadContext, ThreadEntry, ThreadId, Yielder};
use core::cell::UnsafeCell;
use portable_atomic::{AtomicBool, AtomicUsize, Ordering};

/// Main kernel handle that runs a fixed table of `N` threads.
///
/// # Type Parameters
///
/// * `A` - Architecture implementation
/// * `N` - Number of thread slots
///
/// The kernel is borrowed for the whole of [`run`](Self::run) and threads
/// reach it through the address primed into their contexts, so it must not
/// move while running. It is not `Sync`: everything happens on one core.
pub struct Kernel<'a, A: Arch, const N: usize> {
    /// Read-only entry table, indexed by thread id
    entries: [ThreadEntry<'a>; N],
    /// Stack sizing
    config: KernelConfig,
    /// Thread control blocks, indexed by thread id
    tcbs: [Tcb<A>; N],
    /// Round-robin cursor; doubles as the current-thread index
    scheduler: RoundRobinScheduler<N>,
    /// Where the dispatch loop continues when a thread yields
    scheduler_ctx: UnsafeCell<A::SavedContext>,
    /// Whether `run` has been called
    started: AtomicBool,
    stats: StatsCounters,
}

/// Counters describing what the dispatch loop did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KernelStats {
    /// Times a thread was resumed
    pub dispatches: usize,
    /// Times a thread yielded back, including the final yield after exit
    pub yields: usize,
    /// Stacks freed after their thread finished
    pub reclaimed: usize,
    /// Yields after which the thread's stack canary was found broken
    pub overflows: usize,
}

#[derive(Debug, Default)]
struct StatsCounters {
    dispatches: AtomicUsize,
    yields: AtomicUsize,
    reclaimed: AtomicUsize,
    overflows: AtomicUsize,
}

impl<'a, A: Arch, const N: usize> Kernel<'a, A, N> {
    /// Create a kernel for the given entry table.
    ///
    /// Nothing is allocated until [`run`](Self::run).
    pub fn new(entries: [ThreadEntry<'a>; N], config: KernelConfig) -> Self {
        Self {
            entries,
            config,
            tcbs: core::array::from_fn(|_| Tcb::new()),
            scheduler: RoundRobinScheduler::new(),
            scheduler_ctx: UnsafeCell::new(A::SavedContext::default()),
            started: AtomicBool::new(false),
            stats: StatsCounters::default(),
        }
    }

    /// Thread currently running or dispatched last, `None` before the first
    /// dispatch.
    pub fn current(&self) -> Option<ThreadId> {
        self.scheduler.current()
    }

    /// Whether thread `id` has not yet returned from its entry function.
    ///
    /// Panics if `id` is outside the table.
    pub fn is_active(&self, id: ThreadId) -> bool {
        self.tcbs[id.index()].is_active()
    }

    /// Whether thread `id` still owns its stack.
    pub fn has_stack(&self, id: ThreadId) -> bool {
        self.tcbs[id.index()].has_stack()
    }

    pub fn stats(&self) -> KernelStats {
        KernelStats {
            dispatches: self.stats.dispatches.load(Ordering::Relaxed),
            yields: self.stats.yields.load(Ordering::Relaxed),
            reclaimed: self.stats.reclaimed.load(Ordering::Relaxed),
            overflows: self.stats.overflows.load(Ordering::Relaxed),
        }
    }

    /// Start every thread and schedule them until all have finished.
    ///
    /// Returns `Ok(())` once no thread is active. Fails before any thread
    /// runs if the stacks cannot be set up.
    pub fn run(&self) -> KernelResult<()> {
        self.start()?;
        log::info!("Num of threads: {}", N);
        self.dispatch();
        Ok(())
    }

    /// [`run`](Self::run), reporting a startup failure on the log sink.
    ///
    /// Returns the process exit status: 0 after all threads finished, 1 when
    /// the kernel could not start.
    pub fn run_to_exit(&self) -> i32 {
        match self.run() {
            Ok(()) => 0,
            Err(e) => {
                log::error!("{}", e);
                e.exit_status()
            }
        }
    }

    /// Allocate one stack per thread and prime its context to enter the
    /// trampoline.
    ///
    /// All stacks are allocated before any TCB is touched, so a failed
    /// allocation leaves every thread inactive and stackless.
    fn start(&self) -> KernelResult<()> {
        if self
            .started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(KernelError::AlreadyStarted);
        }

        let stack_size = self.config.get_stack_size();
        if stack_size < MIN_STACK_SIZE {
            return Err(KernelError::InvalidStackSize(stack_size));
        }

        let entry: ContextEntry = thread_starter::<A, N>;
        let arg = self as *const Self as usize;

        let mut stacks: [Option<Stack>; N] = core::array::from_fn(|_| None);
        for slot in &mut stacks {
            *slot = Some(Stack::allocate(stack_size)?);
        }

        for (tcb, stack) in self.tcbs.iter().zip(stacks.into_iter().flatten()) {
            let top = tcb.install_stack(stack);
            // Safety: the stack was just installed and stays owned by this
            // TCB until the thread has finished; nothing else references the
            // context before the first dispatch.
            unsafe { A::prepare(&mut *tcb.context_ptr(), top, entry, arg) };
            tcb.activate();
        }

        Ok(())
    }

    /// The round-robin dispatch loop.
    ///
    /// Each iteration runs one dispatch pass; a pass that finds no active
    /// thread ends the loop.
    fn dispatch(&self) {
        while let Some(id) = self.scheduler.pick_next(|id| self.tcbs[id.index()].is_active()) {
            let tcb = &self.tcbs[id.index()];

            self.stats.dispatches.fetch_add(1, Ordering::Relaxed);
            log::trace!("dispatch thread {}", id);

            // Safety: the scheduler context is only ever captured here and
            // resumed from `yield_from`; the thread's context was primed at
            // startup or captured by its last yield.
            unsafe { A::context_switch(self.scheduler_ctx.get(), tcb.context_ptr()) };

            // Thread `id` yielded back.
            if !tcb.stack_intact() {
                self.stats.overflows.fetch_add(1, Ordering::Relaxed);
                log::error!("stack overflow in thread {}", id);
            }

            if !tcb.is_active() && tcb.reclaim_stack() {
                self.stats.reclaimed.fetch_add(1, Ordering::Relaxed);
                log::debug!("reclaimed stack of thread {}", id);
            }
        }

        log::info!("all threads finished");
    }

    /// Body of every thread, running on the thread's own stack.
    fn thread_main(&self) -> ! {
        let Some(id) = self.scheduler.current() else {
            unreachable!("thread entered before the first dispatch");
        };

        let entry = self.entries[id.index()];
        entry(&ThreadContext::new(id, self));

        // The stack is still in use; the scheduler frees it after the final
        // yield below.
        self.tcbs[id.index()].mark_inactive();
        log::debug!("thread {} finished", id);

        self.yield_from(id);
        unreachable!("finished thread {} was resumed", id)
    }
}

#[cfg(test)]
impl<A: Arch, const N: usize> Kernel<'_, A, N> {
    /// Overwrite the canary of thread `id`'s stack, as a runaway frame would.
    pub(crate) fn clobber_canary(&self, id: ThreadId) {
        self.tcbs[id.index()].clobber_canary();
    }
}

impl<A: Arch, const N: usize> Yielder for Kernel<'_, A, N> {
    fn yield_from(&self, id: ThreadId) {
        debug_assert_eq!(
            self.scheduler.current(),
            Some(id),
            "yield from a thread that is not running"
        );

        self.stats.yields.fetch_add(1, Ordering::Relaxed);
        log::trace!("In yield: thread {}", id);

        // Safety: `id` is running, so its context is free to be captured,
        // and the scheduler context holds the dispatch loop's continuation.
        unsafe { A::context_switch(self.tcbs[id.index()].context_ptr(), self.scheduler_ctx.get()) };
    }
}

/// Fixed entry point of every thread context.
///
/// `kernel` is the address `start` primed the context with.
extern "C" fn thread_starter<A: Arch, const N: usize>(kernel: usize) -> ! {
    // Safety: `run` borrows the kernel for as long as any thread can execute,
    // so the address stays valid and the entry references stay alive; only
    // the lifetime parameter is erased.
    let kernel = unsafe { &*(kernel as *const Kernel<'static, A, N>) };
    kernel.thread_main()
}
