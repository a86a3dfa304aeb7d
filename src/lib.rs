#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]

//! Cooperative multithreading for single-core microcontrollers.
//!
//! A fixed table of threads, each with its own stack, shares one CPU. Threads
//! give the CPU back explicitly with [`yield_now`]; a round-robin scheduler
//! then resumes the next active thread. When every thread has returned from
//! its entry function the scheduler returns and the program ends.
//!
//! # Target Platform
//!
//! - **Hardware**: Cortex-M (Armv7-M) microcontrollers, e.g. the LM3S6965
//! - **Hosted**: x86_64 and AArch64, used for tests and the lock demo
//!
//! # Features
//!
//! - `std-shim`: console sink on stdout for hosted builds
//!
//! # Quick Start
//!
//! ```ignore
//! use coop_threads::{Kernel, KernelConfig, ReentrantLock, ThreadContext};
//!
//! static LED_LOCK: ReentrantLock = ReentrantLock::new();
//!
//! fn blink(cx: &ThreadContext<'_>) {
//!     for _ in 0..10 {
//!         if LED_LOCK.acquire(cx.id()) {
//!             cx.yield_now();
//!             LED_LOCK.release(cx.id());
//!         }
//!         cx.yield_now();
//!     }
//! }
//!
//! fn main() -> ! {
//!     let kernel: Kernel<'_, _, 2> = Kernel::new([&blink, &blink], KernelConfig::new());
//!     let status = kernel.run_to_exit();
//!     board::exit(status)
//! }
//! ```
//!
//! # Architecture
//!
//! - [`arch`]: register save/restore behind the [`Arch`] trait
//! - [`sync`]: exclusive-access claim and the [`ReentrantLock`]
//! - [`thread`]: thread control blocks and the per-thread [`ThreadContext`]
//! - [`sched`]: round-robin slot selection
//! - [`kernel`]: startup, dispatch loop and thread trampoline
//!
//! The lock's reentrant fast path relies on the cooperative, single-core
//! model. It is not sound under preemption or on more than one core.

pub mod arch;
pub mod config;
pub mod console;
pub mod errors;
pub mod kernel;
pub mod mem;
pub mod sched;
pub mod sync;
pub mod thread;

#[cfg(test)]
mod tests;

#[cfg(any(test, feature = "std-shim"))]
extern crate std;

extern crate alloc;

// ============================================================================
// Public API
// ============================================================================

// Architecture abstraction
pub use arch::{Arch, DefaultArch};

// Kernel
pub use kernel::{Kernel, KernelStats};

// Configuration
pub use config::KernelConfig;

// Threads
pub use thread::{ThreadContext, ThreadEntry, ThreadId};

// Locks
pub use sync::{LockState, ReentrantLock};

// Errors
pub use errors::{KernelError, KernelResult, MemoryError};

// ============================================================================
// Convenience Functions
// ============================================================================

/// Yield the calling thread back to the scheduler.
///
/// Returns once the scheduler has gone round the thread table and resumed
/// this thread again.
#[inline]
pub fn yield_now(cx: &ThreadContext<'_>) {
    cx.yield_now();
}
