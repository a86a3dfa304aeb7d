//! Architecture abstraction layer for context switching.
//!
//! The scheduler and trampoline only ever "capture the current execution
//! point" and "resume a captured point". Everything register-specific sits
//! behind [`Arch`], with one port per supported CPU:
//!
//! - `cortex_m`: the target. The switch is a supervisor call whose handler
//!   swaps MSP/PSP register sets.
//! - `x86_64` / `aarch64`: hosted ports that swap callee-saved registers with
//!   a plain call, used to run the kernel in tests.

/// Entry point installed into a freshly prepared context.
///
/// Receives the `arg` given to [`Arch::prepare`] and never returns.
pub type ContextEntry = extern "C" fn(usize) -> !;

/// Architecture abstraction trait.
///
/// # Safety
///
/// Implementations manipulate stack pointers and callee-saved registers with
/// inline assembly. All methods marked as unsafe have specific preconditions
/// that must be upheld by the caller.
pub trait Arch {
    /// Architecture-specific saved register set.
    ///
    /// Holds the stack pointer and every register the calling convention
    /// expects to survive a call.
    type SavedContext: Default;

    /// Prime `ctx` so that resuming it runs `entry(arg)` on a fresh stack.
    ///
    /// # Safety
    ///
    /// - `stack_top` must be the highest address of a writable region large
    ///   enough for the port's initial frame and the entry's own frames
    /// - The region must stay allocated until the context is never resumed
    ///   again
    unsafe fn prepare(ctx: &mut Self::SavedContext, stack_top: *mut u8, entry: ContextEntry, arg: usize);

    /// Capture the current execution point into `prev` and resume `next`.
    ///
    /// Returns when some later `context_switch(_, prev)` resumes the point
    /// captured here.
    ///
    /// # Safety
    ///
    /// - `prev` must point to a valid, properly aligned SavedContext
    /// - `next` must point to a context that was prepared or captured and has
    ///   not been resumed since
    /// - Both pointers must stay valid until `prev` is resumed
    unsafe fn context_switch(prev: *mut Self::SavedContext, next: *const Self::SavedContext);
}

#[cfg(all(target_arch = "arm", target_feature = "mclass", target_feature = "v7"))]
pub mod cortex_m;
#[cfg(target_arch = "x86_64")]
pub mod x86_64;
#[cfg(target_arch = "aarch64")]
pub mod aarch64;

#[cfg(all(target_arch = "arm", target_feature = "mclass", target_feature = "v7"))]
pub use cortex_m::CortexMArch as DefaultArch;
#[cfg(target_arch = "x86_64")]
pub use x86_64::X86_64Arch as DefaultArch;
#[cfg(target_arch = "aarch64")]
pub use aarch64::Aarch64Arch as DefaultArch;

// Armv6-M has no exclusive monitor and A-profile cores no SVCall model.
#[cfg(all(target_arch = "arm", not(all(target_feature = "mclass", target_feature = "v7"))))]
compile_error!("The Arm port needs an Armv7-M core (thumbv7m, thumbv7em).");

#[cfg(not(any(target_arch = "arm", target_arch = "x86_64", target_arch = "aarch64")))]
compile_error!("No context switch port for this architecture. Supported: arm (Cortex-M), x86_64 and aarch64 (hosted).");
