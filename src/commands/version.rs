// This file prints the version of the `toolsuite` binary.

use crate::log_debug;
use colored::Colorize;

/// Prints `toolsuite <version>` to stdout.
pub fn run() -> i32 {
    log_debug!("[Version] Reporting build version");
    println!(
        "{} {}",
        env!("CARGO_PKG_NAME").bold(),
        env!("CARGO_PKG_VERSION")
    );
    0
}
