//! Test helper utilities and common functionality.

use crate::config::KernelConfig;
use crate::thread::ThreadContext;
use alloc::vec::Vec;
use core::alloc::{GlobalAlloc, Layout};
use core::cell::Cell;
use std::alloc::System;

/// Stack size for hosted test threads. Formatting and the test harness'
/// panic machinery need more room than a microcontroller thread would.
pub const TEST_STACK_SIZE: usize = 64 * 1024;

pub fn test_config() -> KernelConfig {
    KernelConfig::new().stack_size(TEST_STACK_SIZE)
}

/// Pin a closure to the higher-ranked signature thread entries need.
pub fn entry<F: Fn(&ThreadContext<'_>)>(f: F) -> F {
    f
}

/// Ordered record of what the threads of one test did.
///
/// Threads never hold the lock across a yield, so recording is never
/// contended.
pub struct Trace<T> {
    events: spin::Mutex<Vec<T>>,
}

impl<T: Clone> Trace<T> {
    pub fn new() -> Self {
        Self {
            events: spin::Mutex::new(Vec::new()),
        }
    }

    pub fn record(&self, event: T) {
        self.events.lock().push(event);
    }

    pub fn events(&self) -> Vec<T> {
        self.events.lock().clone()
    }
}

/// Simple linear congruential generator for property testing.
pub struct SimpleRng {
    state: u64,
}

impl SimpleRng {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.state
    }

    pub fn gen_range(&mut self, min: u64, max: u64) -> u64 {
        min + (self.next_u64() >> 33) % (max - min)
    }

    pub fn gen_bool(&mut self) -> bool {
        (self.next_u64() >> 33) & 1 == 0
    }
}

/// Stack size whose allocations are subject to [`with_stack_budget`]. No
/// other allocation in the test binary has this size.
pub const BUDGETED_STACK_SIZE: usize = 40 * 1024 + 48;

std::thread_local! {
    static STACK_BUDGET: Cell<Option<usize>> = const { Cell::new(None) };
}

/// System allocator that fails allocations of [`BUDGETED_STACK_SIZE`] bytes
/// once the calling test thread's budget is used up.
pub struct BudgetedAlloc;

unsafe impl GlobalAlloc for BudgetedAlloc {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        if layout.size() == BUDGETED_STACK_SIZE && !take_from_budget() {
            return core::ptr::null_mut();
        }
        unsafe { System.alloc(layout) }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe { System.dealloc(ptr, layout) }
    }
}

#[global_allocator]
static ALLOCATOR: BudgetedAlloc = BudgetedAlloc;

fn take_from_budget() -> bool {
    STACK_BUDGET
        .try_with(|budget| match budget.get() {
            Some(0) => false,
            Some(n) => {
                budget.set(Some(n - 1));
                true
            }
            None => true,
        })
        .unwrap_or(true)
}

/// Run `f` with room for only `stacks` allocations of
/// [`BUDGETED_STACK_SIZE`] on this thread.
pub fn with_stack_budget<R>(stacks: usize, f: impl FnOnce() -> R) -> R {
    STACK_BUDGET.with(|budget| budget.set(Some(stacks)));
    let result = f();
    STACK_BUDGET.with(|budget| budget.set(None));
    result
}
