//! Kernel configuration.

/// Stack size used when none is configured: 16 KiB.
pub const DEFAULT_STACK_SIZE: usize = 16 * 1024;

/// Smallest stack the kernel accepts.
///
/// Must hold the initial frame a port writes on a fresh stack plus room for
/// the trampoline to call the entry function.
pub const MIN_STACK_SIZE: usize = 256;

/// Construction-time parameters of a [`Kernel`](crate::Kernel).
///
/// The thread count is a const generic on the kernel itself; everything
/// sized at startup lives here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelConfig {
    stack_size: usize,
}

impl KernelConfig {
    pub const fn new() -> Self {
        Self {
            stack_size: DEFAULT_STACK_SIZE,
        }
    }

    /// Set the size in bytes of every thread stack.
    pub const fn stack_size(mut self, size: usize) -> Self {
        self.stack_size = size;
        self
    }

    pub const fn get_stack_size(&self) -> usize {
        self.stack_size
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self::new()
    }
}
