//! Hosted x86_64 context switching.
//!
//! There is no privilege transition on the host: a switch is a plain call
//! that swaps the System V callee-saved registers and the stack pointer.

use super::{Arch, ContextEntry};
use core::arch::naked_asm;

pub struct X86_64Arch;

/// Callee-saved register set of the System V ABI.
#[repr(C)]
#[derive(Debug, Default)]
pub struct X86_64Context {
    pub rsp: u64,
    pub rbp: u64,
    pub rbx: u64,
    pub r12: u64,
    pub r13: u64,
    pub r14: u64,
    pub r15: u64,
}

impl Arch for X86_64Arch {
    type SavedContext = X86_64Context;

    unsafe fn prepare(ctx: &mut Self::SavedContext, stack_top: *mut u8, entry: ContextEntry, arg: usize) {
        // `ret` pops the start shim, leaving rsp 16-byte aligned so the
        // shim's `call` enters `entry` with the alignment the ABI expects.
        let top = stack_top as usize & !0xF;
        let slot = (top - 8) as *mut u64;
        unsafe { slot.write(context_start as unsafe extern "C" fn() as usize as u64) };

        *ctx = X86_64Context {
            rsp: slot as u64,
            r12: arg as u64,
            r13: entry as usize as u64,
            ..Default::default()
        };
    }

    unsafe fn context_switch(prev: *mut Self::SavedContext, next: *const Self::SavedContext) {
        unsafe { switch_context(prev, next) }
    }
}

#[unsafe(naked)]
unsafe extern "C" fn switch_context(_prev: *mut X86_64Context, _next: *const X86_64Context) {
    naked_asm!(
        "mov [rdi + 0x00], rsp",
        "mov [rdi + 0x08], rbp",
        "mov [rdi + 0x10], rbx",
        "mov [rdi + 0x18], r12",
        "mov [rdi + 0x20], r13",
        "mov [rdi + 0x28], r14",
        "mov [rdi + 0x30], r15",

        "mov rsp, [rsi + 0x00]",
        "mov rbp, [rsi + 0x08]",
        "mov rbx, [rsi + 0x10]",
        "mov r12, [rsi + 0x18]",
        "mov r13, [rsi + 0x20]",
        "mov r14, [rsi + 0x28]",
        "mov r15, [rsi + 0x30]",

        // Captured point: back after the caller's `call`. Fresh context:
        // into `context_start`.
        "ret",
    );
}

/// First code a prepared context runs: `entry(arg)` from r13/r12.
#[unsafe(naked)]
unsafe extern "C" fn context_start() {
    naked_asm!("mov rdi, r12", "call r13", "ud2");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[repr(C, align(16))]
    struct TestStack([u64; 64]);

    #[test]
    fn test_prepare_aligns_and_installs_shim() {
        extern "C" fn never(_: usize) -> ! {
            loop {
                core::hint::spin_loop();
            }
        }

        let mut stack = TestStack([0; 64]);
        let top = unsafe { stack.0.as_mut_ptr().add(64) } as *mut u8;
        let mut ctx = X86_64Context::default();
        unsafe { X86_64Arch::prepare(&mut ctx, top, never, 0x1234) };

        assert_eq!((ctx.rsp + 8) % 16, 0);
        assert_eq!(ctx.r12, 0x1234);
        assert_eq!(ctx.r13, never as ContextEntry as usize as u64);
        assert_eq!(stack.0[63], context_start as unsafe extern "C" fn() as usize as u64);
    }
}
