// Provisions the isolated Python environment of an environment-based tool.
//
// The environment always lives inside the tool's own directory
// (`<tool dir>/<env dir name>`), so two tools never share an interpreter or
// site-packages. Every run starts from a fresh environment: a half-built one
// from an earlier, interrupted install is removed first.

use crate::libs::command_runner::{CommandOutput, CommandRunner, CommandSpec};
use crate::libs::paths::InstallLayout;
use crate::schemas::errors::{InstallError, describe_status, output_tail};
use crate::schemas::install_result::InstallStage;
use crate::schemas::manifest::{RuntimeSettings, ToolSpec};
use crate::{log_debug, log_error, log_info};
use colored::Colorize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Interpreter locations probed inside a fresh environment, in order.
const INTERPRETER_CANDIDATES: [&str; 2] = ["bin/python", "bin/python3"];

/// A ready-to-use environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    pub root_path: PathBuf,
    /// The environment's own interpreter; wrappers exec this directly.
    pub runtime_binary: PathBuf,
}

/// Creates the environment for `tool` and installs its dependencies into it.
///
/// # Workflow
/// 1. The tool directory must exist under the package root.
/// 2. Any existing environment root is removed, then `<python> -m venv <root>` runs.
/// 3. The environment's interpreter is located (`bin/python`, then `bin/python3`).
/// 4. pip is upgraded inside the environment when `runtimes.upgrade_pip` is set.
/// 5. All dependencies are installed with a single batched `pip install`; an empty
///    list skips this step.
///
/// # Errors
/// * `DirectoryNotFound` if the tool directory is missing.
/// * `EnvironmentCreationFailed` if the environment cannot be created or has no interpreter.
/// * `DependencyInstallFailed` if the pip upgrade or the dependency install exits non-zero.
/// * `Interrupted` if the run was cancelled while a command was in flight.
pub fn provision(
    tool: &ToolSpec,
    dependencies: &[String],
    layout: &InstallLayout,
    runtimes: &RuntimeSettings,
    runner: &dyn CommandRunner,
) -> Result<Environment, InstallError> {
    let tool_dir = layout.tool_dir(tool);
    if !tool_dir.is_dir() {
        log_error!(
            "[Venv] Tool directory for {} not found: {}",
            tool.command_name.bold(),
            tool_dir.display().to_string().red()
        );
        return Err(InstallError::DirectoryNotFound { path: tool_dir });
    }

    let root = layout.env_root(tool, runtimes);
    create_environment(&root, &runtimes.python, runner)?;
    let runtime_binary = locate_interpreter(&root)?;
    log_debug!(
        "[Venv] Interpreter for {}: {}",
        tool.command_name,
        runtime_binary.display()
    );

    if runtimes.upgrade_pip {
        let upgrade = pip_install(&runtime_binary, &["--upgrade".to_string(), "pip".to_string()]);
        run_dependency_step(runner, &upgrade, &["pip".to_string()])?;
    }

    if dependencies.is_empty() {
        log_debug!("[Venv] {} declares no dependencies", tool.command_name);
    } else {
        log_info!(
            "[Venv] Installing {} dependencies for {}: {}",
            dependencies.len(),
            tool.command_name.bold(),
            dependencies.join(", ").cyan()
        );
        let install = pip_install(&runtime_binary, dependencies);
        run_dependency_step(runner, &install, dependencies)?;
    }

    Ok(Environment {
        root_path: root,
        runtime_binary,
    })
}

/// Where the interpreter of an environment rooted at `root` will be once it exists.
/// Used by `plan`, which never creates anything.
pub fn predicted_interpreter(root: &Path) -> PathBuf {
    root.join(INTERPRETER_CANDIDATES[0])
}

fn create_environment(root: &Path, python: &str, runner: &dyn CommandRunner) -> Result<(), InstallError> {
    let fail = |reason: String| InstallError::EnvironmentCreationFailed {
        environment: root.to_path_buf(),
        reason,
    };

    if root.exists() {
        log_debug!("[Venv] Removing previous environment at {}", root.display());
        fs::remove_dir_all(root).map_err(|e| fail(format!("could not remove previous environment: {e}")))?;
    }

    log_info!(
        "[Venv] Creating environment at {}",
        root.display().to_string().cyan()
    );
    let spec = CommandSpec::new(python).args(["-m".to_string(), "venv".to_string(), root.display().to_string()]);
    let output = runner.run(&spec).map_err(|e| {
        if e.kind() == io::ErrorKind::Interrupted {
            InstallError::Interrupted {
                stage: InstallStage::EnvironmentCreation,
            }
        } else {
            fail(format!("could not run '{python}': {e}"))
        }
    })?;

    if !output.success() {
        log_error!(
            "[Venv] '{}' exited with {:?}",
            spec.display().red(),
            output.status
        );
        return Err(fail(format!(
            "'{}' failed ({}): {}",
            spec.display(),
            describe_status(output.status),
            output_tail(&output.combined())
        )));
    }
    Ok(())
}

fn locate_interpreter(root: &Path) -> Result<PathBuf, InstallError> {
    INTERPRETER_CANDIDATES
        .iter()
        .map(|candidate| root.join(candidate))
        .find(|path| path.exists())
        .ok_or_else(|| InstallError::EnvironmentCreationFailed {
            environment: root.to_path_buf(),
            reason: format!("no interpreter found under {}", root.join("bin").display()),
        })
}

/// `<interpreter> -m pip install --quiet <packages...>`
fn pip_install(interpreter: &Path, packages: &[String]) -> CommandSpec {
    CommandSpec::new(interpreter.display().to_string())
        .args(["-m", "pip", "install", "--quiet"])
        .args(packages.iter().cloned())
}

fn run_dependency_step(
    runner: &dyn CommandRunner,
    spec: &CommandSpec,
    packages: &[String],
) -> Result<CommandOutput, InstallError> {
    log_debug!("[Venv] Executing: {}", spec.display().cyan());
    let output = runner.run(spec).map_err(|e| {
        if e.kind() == io::ErrorKind::Interrupted {
            InstallError::Interrupted {
                stage: InstallStage::DependencyInstall,
            }
        } else {
            InstallError::DependencyInstallFailed {
                dependencies: packages.to_vec(),
                status: None,
                output: format!("could not run '{}': {e}", spec.program),
            }
        }
    })?;

    if !output.success() {
        log_error!(
            "[Venv] pip failed for [{}] with {:?}",
            packages.join(", ").red(),
            output.status
        );
        return Err(InstallError::DependencyInstallFailed {
            dependencies: packages.to_vec(),
            status: output.status,
            output: output.combined(),
        });
    }
    Ok(output)
}
