//! Error types for kernel startup.
//!
//! Once the scheduler is running nothing in the kernel can fail: a failed
//! [`acquire`](crate::ReentrantLock::acquire) is an ordinary "try later"
//! answer, not an error. The only fallible step is preparing the thread
//! table, which is what these types describe.

use core::fmt;

/// Result type for kernel operations.
pub type KernelResult<T> = Result<T, KernelError>;

/// Errors that can stop the kernel from starting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    /// Stack memory could not be provided
    Memory(MemoryError),
    /// `run` was called on a kernel that already ran
    AlreadyStarted,
    /// Configured stack size is below the supported minimum
    InvalidStackSize(usize),
}

/// Memory-related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryError {
    /// The allocator returned no memory for a thread stack
    OutOfMemory,
    /// The stack size does not form a valid allocation layout
    InvalidLayout,
}

impl KernelError {
    /// Process exit status for a kernel that failed to start.
    pub fn exit_status(&self) -> i32 {
        1
    }
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelError::Memory(e) => write!(f, "{}", e),
            KernelError::AlreadyStarted => write!(f, "Kernel already started"),
            KernelError::InvalidStackSize(size) => write!(f, "Invalid stack size: {}", size),
        }
    }
}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryError::OutOfMemory => write!(f, "Out of memory"),
            MemoryError::InvalidLayout => write!(f, "Invalid memory layout"),
        }
    }
}

impl From<MemoryError> for KernelError {
    fn from(error: MemoryError) -> Self {
        KernelError::Memory(error)
    }
}
