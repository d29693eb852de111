// Cooperative cancellation for an install run.
//
// Ctrl-C raises a shared flag instead of killing the installer outright, so the
// orchestrator can kill the in-flight subprocess, mark the current tool failed,
// leave the remaining tools pending and still print a summary. A second Ctrl-C
// exits immediately.

use crate::{log_error, log_warn};
use colored::Colorize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

/// Exit code used when a second interrupt forces the process down.
const FORCED_EXIT_CODE: i32 = 130;

/// Shared "stop as soon as possible" flag.
#[derive(Debug, Clone, Default)]
pub struct InterruptFlag(Arc<AtomicBool>);

impl InterruptFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Spawns a background thread that raises `flag` on the first Ctrl-C.
///
/// The signal is awaited on a single-threaded tokio runtime owned by that thread;
/// the rest of the installer stays synchronous.
pub fn listen_for_ctrl_c(flag: InterruptFlag) {
    let spawned = thread::Builder::new()
        .name("ctrl-c-listener".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    log_warn!("[Interrupt] Could not start signal listener: {}. Ctrl-C will terminate immediately.", e);
                    return;
                }
            };

            runtime.block_on(async {
                if tokio::signal::ctrl_c().await.is_err() {
                    return;
                }
                log_warn!(
                    "[Interrupt] {} Stopping after the current step. Press Ctrl-C again to abort immediately.",
                    "Interrupt received.".bold()
                );
                flag.raise();

                if tokio::signal::ctrl_c().await.is_ok() {
                    log_error!("[Interrupt] Aborting.");
                    std::process::exit(FORCED_EXIT_CODE);
                }
            });
        });

    if let Err(e) = spawned {
        log_warn!("[Interrupt] Could not spawn signal listener thread: {}", e);
    }
}
