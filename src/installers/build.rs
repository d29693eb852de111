// Prepares build-based tools: runs their build commands in order inside the
// tool directory and resolves the launcher the wrapper will exec.
//
// Each build step is a shell command line (`npm install --production=false`)
// and is run through `sh -c` so quoting and `&&` behave as the author wrote them.

use crate::libs::command_runner::{CommandRunner, CommandSpec};
use crate::libs::paths::InstallLayout;
use crate::libs::utilities::path_helpers::normalize_path;
use crate::libs::wrapper_generator::FallbackLaunch;
use crate::schemas::errors::InstallError;
use crate::schemas::install_result::InstallStage;
use crate::schemas::manifest::{FallbackEntry, ToolSpec};
use crate::{log_debug, log_error, log_info, log_warn};
use colored::Colorize;
use std::io;
use std::path::Path;

/// Runs `build_steps` for `tool`, stopping at the first failure.
///
/// An empty list is a no-op, but the tool directory must still exist.
///
/// # Errors
/// * `DirectoryNotFound` if the tool directory is missing.
/// * `BuildStepFailed` naming the first step that could not be run or exited non-zero,
///   with its status and combined output. Later steps are not run.
/// * `Interrupted` if the run was cancelled while a step was in flight.
pub fn run_build_steps(
    tool: &ToolSpec,
    build_steps: &[String],
    layout: &InstallLayout,
    runner: &dyn CommandRunner,
) -> Result<(), InstallError> {
    let tool_dir = layout.tool_dir(tool);
    if !tool_dir.is_dir() {
        log_error!(
            "[Build] Tool directory for {} not found: {}",
            tool.command_name.bold(),
            tool_dir.display().to_string().red()
        );
        return Err(InstallError::DirectoryNotFound { path: tool_dir });
    }

    if build_steps.is_empty() {
        log_debug!("[Build] {} has no build steps", tool.command_name);
        return Ok(());
    }

    for (index, step) in build_steps.iter().enumerate() {
        log_info!(
            "[Build] {} step {}/{}: {}",
            tool.command_name.bold(),
            index + 1,
            build_steps.len(),
            step.cyan()
        );
        let spec = CommandSpec::new("sh").arg("-c").arg(step.as_str()).current_dir(&tool_dir);
        let output = runner.run(&spec).map_err(|e| {
            if e.kind() == io::ErrorKind::Interrupted {
                InstallError::Interrupted {
                    stage: InstallStage::Build,
                }
            } else {
                InstallError::BuildStepFailed {
                    command: step.clone(),
                    status: None,
                    output: format!("could not run build step: {e}"),
                }
            }
        })?;

        if !output.success() {
            log_error!(
                "[Build] Step '{}' for {} failed with {:?}",
                step.red(),
                tool.command_name.bold(),
                output.status
            );
            return Err(InstallError::BuildStepFailed {
                command: step.clone(),
                status: output.status,
                output: output.combined(),
            });
        }
    }
    Ok(())
}

/// Turns a launcher name into what the wrapper should exec.
///
/// A launcher containing a path separator is used as given. Otherwise it is looked
/// up on PATH now and pinned to its absolute location; when it cannot be found the
/// bare name is kept and the wrapper resolves it at run time.
pub fn resolve_launcher(launcher: &str) -> String {
    if launcher.contains('/') {
        return launcher.to_string();
    }
    match which::which(launcher) {
        Ok(path) => {
            log_debug!("[Build] Launcher '{}' resolved to {}", launcher, path.display());
            path.display().to_string()
        }
        Err(_) => {
            log_warn!(
                "[Build] Launcher '{}' is not on PATH; the wrapper will look it up when it runs.",
                launcher.yellow()
            );
            launcher.to_string()
        }
    }
}

/// Absolute location of a fallback launch script declared relative to the tool directory.
pub fn resolve_fallback(tool_dir: &Path, fallback: &FallbackEntry) -> FallbackLaunch {
    FallbackLaunch {
        script: normalize_path(&tool_dir.join(&fallback.script)),
        interpreter: fallback.interpreter.clone(),
    }
}
