//! # Installer Error Types
//!
//! Two families of errors exist:
//!
//! - **`InstallError`**: what can go wrong while installing one tool or the shared
//!   resources. These are captured per tool in the install report instead of
//!   aborting the run, so they are `Clone` and `Serialize`.
//! - **`ManifestError`**: problems with the tool catalog itself. These abort the
//!   command before anything is provisioned.

use crate::schemas::install_result::InstallStage;
use serde::Serialize;
use std::path::PathBuf;

/// How many trailing lines of captured subprocess output are shown in messages.
/// The full output is kept in the error value and in the JSON report.
const OUTPUT_TAIL_LINES: usize = 20;

/// A failure of one installation stage.
///
/// Every variant names enough context (paths, the failing command, its exit status
/// and output) for the user to act on it without re-running in debug mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind")]
pub enum InstallError {
    /// The tool's `source_directory` does not exist under the package root.
    #[error("tool directory not found: {}", path.display())]
    DirectoryNotFound { path: PathBuf },

    /// `python -m venv` could not be spawned, exited non-zero, or left no interpreter behind.
    #[error("could not create environment at {}: {reason}", environment.display())]
    EnvironmentCreationFailed { environment: PathBuf, reason: String },

    /// The package manager upgrade or the batched dependency install exited non-zero.
    #[error(
        "dependency installation failed for [{}] ({}): {}",
        dependencies.join(", "),
        describe_status(*status),
        output_tail(output)
    )]
    DependencyInstallFailed {
        dependencies: Vec<String>,
        status: Option<i32>,
        output: String,
    },

    /// A build step exited non-zero or could not be spawned.
    #[error("build step `{command}` failed ({}): {}", describe_status(*status), output_tail(output))]
    BuildStepFailed {
        command: String,
        status: Option<i32>,
        output: String,
    },

    /// The wrapper could not be written, made executable, or published.
    #[error("could not write wrapper {}: {reason}", path.display())]
    WrapperWriteFailed { path: PathBuf, reason: String },

    /// A declared shared resource is absent from the package tree.
    #[error("shared resource missing: {}", path.display())]
    ResourceMissing { path: PathBuf },

    /// A shared resource exists but could not be copied into the share directory.
    #[error("could not copy shared resource {}: {reason}", path.display())]
    ResourceCopyFailed { path: PathBuf, reason: String },

    /// The run was interrupted (Ctrl-C) while this stage was in flight.
    #[error("installation interrupted during {stage}")]
    Interrupted { stage: InstallStage },
}

impl InstallError {
    /// Short, stable name of the error kind, used in summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            InstallError::DirectoryNotFound { .. } => "DirectoryNotFound",
            InstallError::EnvironmentCreationFailed { .. } => "EnvironmentCreationFailed",
            InstallError::DependencyInstallFailed { .. } => "DependencyInstallFailed",
            InstallError::BuildStepFailed { .. } => "BuildStepFailed",
            InstallError::WrapperWriteFailed { .. } => "WrapperWriteFailed",
            InstallError::ResourceMissing { .. } => "ResourceMissing",
            InstallError::ResourceCopyFailed { .. } => "ResourceCopyFailed",
            InstallError::Interrupted { .. } => "Interrupted",
        }
    }
}

/// Problems found while loading or validating a tool catalog.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("could not read manifest {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse manifest {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("manifest declares no tools")]
    Empty,

    #[error("command name `{0}` is declared more than once")]
    DuplicateCommand(String),

    #[error("tool `{command}`: {problem}")]
    InvalidTool { command: String, problem: String },

    #[error("suite: {0}")]
    InvalidSuite(String),
}

/// Renders an exit status for humans; `None` means the process was killed by a signal.
pub fn describe_status(status: Option<i32>) -> String {
    match status {
        Some(code) => format!("exit status {code}"),
        None => "terminated by signal".to_string(),
    }
}

/// Last few lines of captured output, or a placeholder when there was none.
pub fn output_tail(output: &str) -> String {
    let lines: Vec<&str> = output.trim_end().lines().collect();
    if lines.is_empty() {
        return "<no output>".to_string();
    }
    let start = lines.len().saturating_sub(OUTPUT_TAIL_LINES);
    lines[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dependency_failure_names_dependencies_and_status() {
        let err = InstallError::DependencyInstallFailed {
            dependencies: vec!["requests".into(), "nosuchpkg".into()],
            status: Some(1),
            output: "ERROR: No matching distribution found for nosuchpkg\n".into(),
        };
        let message = err.to_string();
        assert!(message.contains("requests, nosuchpkg"));
        assert!(message.contains("exit status 1"));
        assert!(message.contains("No matching distribution"));
        assert_eq!(err.kind(), "DependencyInstallFailed");
    }

    #[test]
    fn output_tail_keeps_only_last_lines() {
        let output: String = (0..50).map(|i| format!("line {i}\n")).collect();
        let tail = output_tail(&output);
        assert!(tail.starts_with("line 30"));
        assert!(tail.ends_with("line 49"));
        assert_eq!(output_tail("   \n"), "<no output>");
    }

    #[test]
    fn serializes_with_kind_tag() {
        let err = InstallError::ResourceMissing {
            path: PathBuf::from("/pkg/theme/AS-Dark.terminal"),
        };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "ResourceMissing");
        assert_eq!(json["path"], "/pkg/theme/AS-Dark.terminal");
    }
}
