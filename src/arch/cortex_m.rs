//! Cortex-M (Armv7-M) context switching through the supervisor call.
//!
//! The scheduler runs in privileged Thread mode on the main stack (MSP);
//! threads run in Thread mode on the process stack (PSP). Every switch, in
//! either direction, is an `svc #100`. The hardware stacks r0-r3, r12, lr,
//! pc and xPSR on the interrupted stack; [`SVCall`] stores the remaining
//! callee-saved registers, the stack pointer and EXC_RETURN into the context
//! named by `SWITCH_SAVE`, loads the one named by `SWITCH_LOAD`, and returns
//! from the exception into it.
//!
//! The vector table (cortex-m-rt or the board's startup code) must route the
//! SVCall exception to the `SVCall` symbol exported here. Threads must not
//! touch the FPU: the lazy floating-point frame is not handled.

use super::{Arch, ContextEntry};
use core::arch::{asm, naked_asm};
use core::ptr::null_mut;
use portable_atomic::{AtomicPtr, Ordering};

/// Context the next supervisor call saves into.
static SWITCH_SAVE: AtomicPtr<CortexMContext> = AtomicPtr::new(null_mut());

/// Context the next supervisor call resumes.
static SWITCH_LOAD: AtomicPtr<CortexMContext> = AtomicPtr::new(null_mut());

/// "Return to Thread mode; exception return gets state from the process
/// stack; on return execution uses the process stack."
const EXC_RETURN_THREAD_PSP: u32 = 0xffff_fffd;

/// xPSR with only the Thumb bit set.
const XPSR_THUMB: u32 = 0x0100_0000;

pub struct CortexMArch;

/// Register set saved by [`SVCall`].
///
/// Field order matches `stmia r0, {r3-r11, lr}` with r3 holding the stack
/// pointer of the interrupted context.
#[repr(C)]
#[derive(Debug, Default)]
pub struct CortexMContext {
    /// MSP or PSP, pointing at the hardware exception frame
    pub sp: u32,
    /// Callee-saved r4-r11
    pub r4_r11: [u32; 8],
    /// EXC_RETURN selecting the stack to return on
    pub exc_return: u32,
}

impl Arch for CortexMArch {
    type SavedContext = CortexMContext;

    unsafe fn prepare(ctx: &mut Self::SavedContext, stack_top: *mut u8, entry: ContextEntry, arg: usize) {
        // Exception frames are 8-byte aligned.
        let frame = ((stack_top as usize & !7) - 8 * 4) as *mut u32;

        // The stacked PC carries the exact address, so the Thumb bit of the
        // function pointer is cleared. LR is unused since `entry` never
        // returns.
        let initial = [
            arg as u32,                 // r0
            0,                          // r1
            0,                          // r2
            0,                          // r3
            0,                          // r12
            0,                          // lr
            entry as usize as u32 & !1, // pc
            XPSR_THUMB,                 // xPSR
        ];

        for (i, word) in initial.iter().enumerate() {
            unsafe { frame.add(i).write(*word) };
        }

        ctx.sp = frame as u32;
        ctx.r4_r11 = [0; 8];
        ctx.exc_return = EXC_RETURN_THREAD_PSP;
    }

    unsafe fn context_switch(prev: *mut Self::SavedContext, next: *const Self::SavedContext) {
        SWITCH_SAVE.store(prev, Ordering::Release);
        SWITCH_LOAD.store(next as *mut CortexMContext, Ordering::Release);

        // The handler restores every register this block could observe, so
        // nothing is clobbered; memory is, since other threads ran meanwhile.
        unsafe { asm!("svc #100") };
    }
}

/// The SVCall handler.
///
/// # Safety
///
/// Must be registered as the SVCall exception handler and only be entered
/// from Thread mode through [`CortexMArch::context_switch`].
#[allow(non_snake_case)]
#[no_mangle]
#[unsafe(naked)]
pub unsafe extern "C" fn SVCall() {
    naked_asm!(
        "movw r2, :lower16:{save}",
        "movt r2, :upper16:{save}",
        "ldr r0, [r2]",
        "movw r2, :lower16:{load}",
        "movt r2, :upper16:{load}",
        "ldr r1, [r2]",

        // Save the interrupted context. EXC_RETURN bit 2 tells which stack
        // the hardware frame went to.
        "tst lr, #4",
        "ite eq",
        "mrseq r3, msp",
        "mrsne r3, psp",
        "stmia r0, {{r3-r11, lr}}",

        // Resume the next one.
        "ldmia r1, {{r3-r11, lr}}",
        "tst lr, #4",
        "ite eq",
        "msreq msp, r3",
        "msrne psp, r3",
        "bx lr",
        save = sym SWITCH_SAVE,
        load = sym SWITCH_LOAD,
    );
}
