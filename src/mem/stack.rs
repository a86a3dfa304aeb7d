//! Thread stacks.
//!
//! Every thread gets one stack of the configured size at startup. The stack
//! belongs to its TCB until the thread finishes; the scheduler then drops
//! it, which hands the memory back to the global allocator.

use crate::errors::MemoryError;
use alloc::alloc::{alloc, dealloc, Layout};
use core::ptr::NonNull;

/// Alignment of stack memory and of the initial stack pointer.
const STACK_ALIGN: usize = 16;

/// Pattern written at the lowest word of every stack.
const STACK_CANARY: u64 = 0xDEAD_BEEF_CAFE_BABE;

/// A thread stack allocated from the global allocator.
pub struct Stack {
    /// Lowest address of the stack memory
    memory: NonNull<u8>,
    layout: Layout,
}

impl Stack {
    /// Allocate a stack of `size` bytes with the canary installed.
    pub fn allocate(size: usize) -> Result<Self, MemoryError> {
        if size < core::mem::size_of::<u64>() {
            return Err(MemoryError::InvalidLayout);
        }

        let layout = Layout::from_size_align(size, STACK_ALIGN).map_err(|_| MemoryError::InvalidLayout)?;

        let memory = unsafe { alloc(layout) };
        let memory = NonNull::new(memory).ok_or(MemoryError::OutOfMemory)?;

        let stack = Self { memory, layout };
        stack.install_canary();
        Ok(stack)
    }

    /// Highest address of the stack, aligned down to 16 bytes. Stacks grow
    /// down from here.
    pub fn top(&self) -> *mut u8 {
        let top = unsafe { self.memory.as_ptr().add(self.layout.size()) } as usize;
        (top & !(STACK_ALIGN - 1)) as *mut u8
    }

    /// Lowest address of the stack.
    pub fn bottom(&self) -> *const u8 {
        self.memory.as_ptr()
    }

    fn install_canary(&self) {
        let canary_location = self.memory.as_ptr() as *mut u64;
        unsafe { canary_location.write(STACK_CANARY) };
    }

    /// Check if the stack canary is still intact.
    ///
    /// A clobbered canary means the thread ran past the end of its stack.
    pub fn check_canary(&self) -> bool {
        let canary_location = self.memory.as_ptr() as *const u64;
        unsafe { canary_location.read() == STACK_CANARY }
    }
}

impl Drop for Stack {
    fn drop(&mut self) {
        unsafe { dealloc(self.memory.as_ptr(), self.layout) };
    }
}

unsafe impl Send for Stack {}
