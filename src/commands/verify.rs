// The `verify` command: checks an installation after the fact. Every command the
// catalog promises must exist in the bin directory and be executable; with
// `--run-help` the help command is also executed and must name the suite.

use crate::cli::cmd_enums::TargetArgs;
use crate::commands::load_target;
use crate::libs::command_runner::{CommandRunner, CommandSpec, SystemRunner};
use crate::libs::interrupt::InterruptFlag;
use crate::libs::paths::InstallLayout;
use crate::libs::utilities::file_operations::is_executable;
use crate::schema::Manifest;
use crate::{log_error, log_info};
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;

pub fn run(target: TargetArgs, run_help: bool) -> Result<i32> {
    let (manifest, _origin, layout) = load_target(&target)?;
    log_info!(
        "[Verify] Checking {} in {}",
        manifest.suite.display_name.bold(),
        layout.bin_dir.display().to_string().cyan()
    );

    let problems = check_commands(&manifest, &layout);
    for problem in &problems {
        log_error!("[Verify] {}", problem);
    }

    let mut help_ok = true;
    if run_help {
        let runner = SystemRunner::new(InterruptFlag::new());
        let help = layout.wrapper_path(&manifest.suite.name);
        help_ok = help_mentions_suite(&runner, &help, &manifest.suite.display_name)?;
        if !help_ok {
            log_error!(
                "[Verify] '{}' did not mention {}",
                help.display(),
                manifest.suite.display_name.bold()
            );
        }
    }

    if problems.is_empty() && help_ok {
        log_info!(
            "[Verify] All {} commands are installed",
            manifest.command_names().len().to_string().green()
        );
        Ok(0)
    } else {
        Ok(1)
    }
}

/// One message per expected command that is missing or not executable.
pub fn check_commands(manifest: &Manifest, layout: &InstallLayout) -> Vec<String> {
    manifest
        .command_names()
        .into_iter()
        .filter_map(|name| {
            let path = layout.wrapper_path(&name);
            if !path.exists() {
                Some(format!("{name}: missing ({})", path.display()))
            } else if !is_executable(&path) {
                Some(format!("{name}: not executable ({})", path.display()))
            } else {
                None
            }
        })
        .collect()
}

/// Runs the help command and reports whether its output contains `display_name`.
pub fn help_mentions_suite(runner: &dyn CommandRunner, help: &Path, display_name: &str) -> Result<bool> {
    let output = runner
        .run(&CommandSpec::new(help.display().to_string()))
        .with_context(|| format!("could not run {}", help.display()))?;
    Ok(output.success() && output.combined().contains(display_name))
}
