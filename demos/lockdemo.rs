//! Lock demo on the host.
//!
//! Two threads share the UART0 text channel under a reentrant lock and print
//! their messages in fragments, yielding in the middle of each. Thread 1
//! takes the lock twice per section to show the nesting count. After each
//! section a thread updates its line on the display and toggles the LED,
//! each under its own lock.
//!
//! Run with `cargo run --example lockdemo --features std-shim [-- -v]`.

use coop_threads::console::{self, StdConsole};
use coop_threads::{console_print, console_println};
use coop_threads::{DefaultArch, Kernel, KernelConfig, ReentrantLock, ThreadContext};
use log::LevelFilter;
use portable_atomic::{AtomicBool, AtomicU32, Ordering};

/// Sections each thread runs before returning.
const ROUNDS: u32 = 4;

static OLED_LOCK: ReentrantLock = ReentrantLock::new();
static UART0_LOCK: ReentrantLock = ReentrantLock::new();
static UART1_LOCK: ReentrantLock = ReentrantLock::new();
static LED_LOCK: ReentrantLock = ReentrantLock::new();

static LED: AtomicBool = AtomicBool::new(false);
static SECTIONS: [AtomicU32; 2] = [AtomicU32::new(0), AtomicU32::new(0)];

fn thread1(cx: &ThreadContext<'_>) {
    let me = cx.id();
    while SECTIONS[me.index()].load(Ordering::Relaxed) < ROUNDS {
        if UART0_LOCK.acquire(me) {
            UART0_LOCK.acquire(me);
            console_print!("lock cnt: {}\n", UART0_LOCK.count());
            console_print!("THIS IS T");
            cx.yield_now();
            console_print!("HREAD NU");
            cx.yield_now();
            console_println!("MBER 1");
            console_print!("lock cnt: {}\n", UART0_LOCK.count());
            UART0_LOCK.release(me);
            UART0_LOCK.release(me);
            console_print!("lock cnt: {}\n", UART0_LOCK.count());
            section_done(cx);
        }
        cx.yield_now();
    }
}

fn thread2(cx: &ThreadContext<'_>) {
    let me = cx.id();
    while SECTIONS[me.index()].load(Ordering::Relaxed) < ROUNDS {
        if UART0_LOCK.acquire(me) {
            console_print!("this is t");
            cx.yield_now();
            console_println!("hread number 2");
            UART0_LOCK.release(me);
            section_done(cx);
        }
        cx.yield_now();
    }
}

/// Bookkeeping after a finished section: display line, LED, and a status
/// line on UART1.
fn section_done(cx: &ThreadContext<'_>) {
    let me = cx.id();
    let done = SECTIONS[me.index()].fetch_add(1, Ordering::Relaxed) + 1;

    if OLED_LOCK.acquire(me) {
        console_println!("[oled] thread {}: {}/{}", me, done, ROUNDS);
        OLED_LOCK.release(me);
    }

    if LED_LOCK.acquire(me) {
        let on = !LED.fetch_xor(true, Ordering::Relaxed);
        LED_LOCK.release(me);
        if UART1_LOCK.acquire(me) {
            console_println!("[uart1] led {}", if on { "on" } else { "off" });
            UART1_LOCK.release(me);
        }
    }
}

fn main() {
    let level = if std::env::args().any(|arg| arg == "-v") {
        LevelFilter::Trace
    } else {
        LevelFilter::Info
    };
    if let Err(e) = console::init(&StdConsole, level) {
        eprintln!("logger: {}", e);
    }

    for lock in [&OLED_LOCK, &UART0_LOCK, &UART1_LOCK, &LED_LOCK] {
        lock.init();
    }

    console_println!("Scheduler Demo");

    // Hosted formatting needs more stack than the firmware threads did.
    let config = KernelConfig::new().stack_size(64 * 1024);
    let kernel: Kernel<'_, DefaultArch, 2> = Kernel::new([&thread1, &thread2], config);
    std::process::exit(kernel.run_to_exit());
}
