//! Hosted AArch64 context switching.
//!
//! Swaps the AAPCS64 callee-saved set: x19-x28, the frame pointer, the link
//! register, sp and the low halves of v8-v15. Like the x86_64 port this is a
//! plain call; there is no exception level change on the host.

use super::{Arch, ContextEntry};
use core::arch::naked_asm;

pub struct Aarch64Arch;

#[repr(C)]
#[derive(Debug, Default)]
pub struct Aarch64Context {
    /// x19-x30
    pub x: [u64; 12],
    pub sp: u64,
    /// d8-d15
    pub d: [u64; 8],
}

impl Arch for Aarch64Arch {
    type SavedContext = Aarch64Context;

    unsafe fn prepare(ctx: &mut Self::SavedContext, stack_top: *mut u8, entry: ContextEntry, arg: usize) {
        let mut x = [0u64; 12];
        x[0] = arg as u64; // x19
        x[1] = entry as usize as u64; // x20
        x[11] = context_start as unsafe extern "C" fn() as usize as u64; // x30

        *ctx = Aarch64Context {
            x,
            sp: (stack_top as usize & !0xF) as u64,
            d: [0; 8],
        };
    }

    unsafe fn context_switch(prev: *mut Self::SavedContext, next: *const Self::SavedContext) {
        unsafe { switch_context(prev, next) }
    }
}

#[unsafe(naked)]
unsafe extern "C" fn switch_context(_prev: *mut Aarch64Context, _next: *const Aarch64Context) {
    naked_asm!(
        "stp x19, x20, [x0, #0]",
        "stp x21, x22, [x0, #16]",
        "stp x23, x24, [x0, #32]",
        "stp x25, x26, [x0, #48]",
        "stp x27, x28, [x0, #64]",
        "stp x29, x30, [x0, #80]",
        "mov x9, sp",
        "str x9, [x0, #96]",
        "stp d8, d9, [x0, #104]",
        "stp d10, d11, [x0, #120]",
        "stp d12, d13, [x0, #136]",
        "stp d14, d15, [x0, #152]",

        "ldp x19, x20, [x1, #0]",
        "ldp x21, x22, [x1, #16]",
        "ldp x23, x24, [x1, #32]",
        "ldp x25, x26, [x1, #48]",
        "ldp x27, x28, [x1, #64]",
        "ldp x29, x30, [x1, #80]",
        "ldr x9, [x1, #96]",
        "mov sp, x9",
        "ldp d8, d9, [x1, #104]",
        "ldp d10, d11, [x1, #120]",
        "ldp d12, d13, [x1, #136]",
        "ldp d14, d15, [x1, #152]",

        "ret",
    );
}

/// First code a prepared context runs: `entry(arg)` from x20/x19.
#[unsafe(naked)]
unsafe extern "C" fn context_start() {
    naked_asm!("mov x0, x19", "blr x20", "brk #1");
}
