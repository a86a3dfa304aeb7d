//! Single-word atomic claim.
//!
//! On Armv7-M this is the `ldrex`/`strex` pair: the store only lands if no
//! other access broke the reservation since the load. Every failure path
//! ends in `clrex` so no reservation leaks into unrelated code. A failed
//! `strex` is reported as a failed claim rather than retried; callers of a
//! try-lock already handle "not now".
//!
//! Hosted builds use a plain `compare_exchange`.

use portable_atomic::AtomicU32;

/// Try to move `cell` from `free` to `claimed` in one indivisible step.
///
/// Returns `true` if this call made the transition. On `false` the cell is
/// left exactly as it was.
#[cfg(all(target_arch = "arm", target_feature = "mclass", target_feature = "v7"))]
#[inline]
pub fn try_claim(cell: &AtomicU32, free: u32, claimed: u32) -> bool {
    let won: u32;
    unsafe {
        core::arch::asm!(
            "ldrex {tmp}, [{cell}]",
            "cmp {tmp}, {free}",
            "bne 1f",
            "strex {tmp}, {claimed}, [{cell}]",
            "cmp {tmp}, #0",
            "bne 1f",
            "dmb",
            "movs {won}, #1",
            "b 2f",
            "1:",
            "clrex",
            "movs {won}, #0",
            "2:",
            cell = in(reg) cell.as_ptr(),
            free = in(reg) free,
            claimed = in(reg) claimed,
            tmp = out(reg) _,
            won = out(reg) won,
            options(nostack),
        );
    }
    won != 0
}

/// Try to move `cell` from `free` to `claimed` in one indivisible step.
///
/// Returns `true` if this call made the transition. On `false` the cell is
/// left exactly as it was.
#[cfg(not(all(target_arch = "arm", target_feature = "mclass", target_feature = "v7")))]
#[inline]
pub fn try_claim(cell: &AtomicU32, free: u32, claimed: u32) -> bool {
    use portable_atomic::Ordering;

    cell.compare_exchange(free, claimed, Ordering::Acquire, Ordering::Relaxed)
        .is_ok()
}
