//! Console text sink and `log` backend.
//!
//! The kernel never talks to a peripheral directly. Board code implements
//! [`Console`] over whatever it has (a UART, the OLED, semihosting) and
//! installs it once with [`init`]; kernel diagnostics then reach it through
//! the `log` facade and the `console_print!` macros.

use core::fmt::{self, Write};
use log::{LevelFilter, Log, Metadata, Record};

/// Narrow text output collaborator.
pub trait Console: Sync {
    fn write_str(&self, s: &str);
}

static CONSOLE: spin::Once<&'static dyn Console> = spin::Once::new();

static LOGGER: ConsoleLogger = ConsoleLogger;

/// Install `console` as the text sink and route `log` records to it.
///
/// The first installed console wins; later calls keep it and only fail if
/// another logger was already registered with `log`.
pub fn init(console: &'static dyn Console, level: LevelFilter) -> Result<(), log::SetLoggerError> {
    CONSOLE.call_once(|| console);

    #[cfg(target_has_atomic = "ptr")]
    log::set_logger(&LOGGER)?;

    // Targets without CAS atomics only offer the racy variant.
    // Safety: `init` runs during startup, before any thread exists.
    #[cfg(not(target_has_atomic = "ptr"))]
    unsafe {
        log::set_logger_racy(&LOGGER)?
    };

    log::set_max_level(level);
    Ok(())
}

/// Whether a console has been installed.
pub fn is_installed() -> bool {
    CONSOLE.get().is_some()
}

/// `core::fmt::Write` adapter over the installed console.
///
/// Output is dropped while no console is installed.
pub struct ConsoleWriter;

impl Write for ConsoleWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if let Some(console) = CONSOLE.get() {
            console.write_str(s);
        }
        Ok(())
    }
}

/// Print a formatted string to the console.
///
/// # Example
///
/// ```ignore
/// console_print!("lock cnt: {}\n", lock.count());
/// ```
#[macro_export]
macro_rules! console_print {
    ($($arg:tt)*) => {{
        use core::fmt::Write;
        let _ = write!($crate::console::ConsoleWriter, $($arg)*);
    }};
}

/// Print a formatted string to the console with a newline.
#[macro_export]
macro_rules! console_println {
    () => {
        $crate::console_print!("\r\n")
    };
    ($($arg:tt)*) => {{
        $crate::console_print!($($arg)*);
        $crate::console_print!("\r\n");
    }};
}

/// `log` backend writing `[LEVEL target] message` lines to the console.
pub struct ConsoleLogger;

impl Log for ConsoleLogger {
    fn enabled(&self, _: &Metadata<'_>) -> bool {
        is_installed()
    }

    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            let _ = write_record(&mut ConsoleWriter, record);
        }
    }

    fn flush(&self) {}
}

fn write_record(out: &mut impl Write, record: &Record<'_>) -> fmt::Result {
    write!(
        out,
        "[{level:5} {target}] {args}\r\n",
        level = record.level(),
        target = record.target(),
        args = record.args()
    )
}

/// Console sink on the host's standard output.
#[cfg(feature = "std-shim")]
pub struct StdConsole;

#[cfg(feature = "std-shim")]
impl Console for StdConsole {
    fn write_str(&self, s: &str) {
        use std::io::Write as _;
        let mut out = std::io::stdout().lock();
        let _ = out.write_all(s.as_bytes());
        let _ = out.flush();
    }
}
