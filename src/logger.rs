// Leveled, colored logging for the installer.
// Every message goes to stderr so that stdout stays free for output that
// other programs may want to consume (the `plan` command prints wrappers there).

use colored::*;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

/// `log_info!` reports normal installer progress.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => (eprintln!("{} {}", "[INFO]".bright_green(), format!($($arg)*)));
}

/// `log_warn!` reports recoverable conditions, e.g. a launcher that is not on PATH yet.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => (eprintln!("{} {}", "[WARN]".bright_yellow(), format!($($arg)*)));
}

/// `log_error!` reports failures of a tool, a stage or the whole run.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => (eprintln!("{} {}", "[ERROR]".bright_red(), format!($($arg)*)));
}

/// `log_debug!` prints only when `--debug` was passed. Subprocess output lands here.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if $crate::logger::is_debug_enabled() {
           eprintln!("{} {}", "[DEBUG]".dimmed(), format!($($arg)*));
        }
    };
}

// Process-wide debug switch, set once from the CLI.
static DEBUG_ENABLED: OnceLock<AtomicBool> = OnceLock::new();

/// Sets the global debug mode. Called once from `main` before any command runs.
pub fn init(debug: bool) {
    DEBUG_ENABLED
        .get_or_init(|| AtomicBool::new(debug))
        .store(debug, Ordering::Relaxed);

    log_debug!("[Logger] Debug output enabled");
}

/// Whether `log_debug!` output is currently printed.
pub fn is_debug_enabled() -> bool {
    DEBUG_ENABLED
        .get()
        .map(|f| f.load(Ordering::Relaxed))
        .unwrap_or(false)
}

/// Prints a horizontal rule that visually separates one tool's logs from the next.
pub fn separator() {
    eprintln!("{}", "=".repeat(78).bright_blue());
}
