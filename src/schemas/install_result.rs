//! # Install Results
//!
//! The per-tool state machine and the run-level accumulator that the orchestrator
//! threads through an installation. Nothing here is persisted between runs; the
//! report lives in memory and is optionally dumped as JSON at the end.
//!
//! ```text
//! per tool:  Pending -> Provisioning -> WrapperWritten -> Done
//!                            \________________\__________> Failed { stage, error }
//! per run:   NotStarted -> Running -> Succeeded | PartiallyFailed | Failed
//! ```

use crate::libs::utilities::timestamps::current_timestamp;
use crate::schemas::errors::InstallError;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// The step of an installation a failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallStage {
    EnvironmentCreation,
    DependencyInstall,
    Build,
    WrapperGeneration,
    SharedResources,
    MetaCommands,
}

impl fmt::Display for InstallStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InstallStage::EnvironmentCreation => "environment creation",
            InstallStage::DependencyInstall => "dependency installation",
            InstallStage::Build => "build",
            InstallStage::WrapperGeneration => "wrapper generation",
            InstallStage::SharedResources => "shared resource installation",
            InstallStage::MetaCommands => "meta-command generation",
        };
        write!(f, "{name}")
    }
}

/// Where a single tool currently stands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ToolState {
    Pending,
    Provisioning,
    WrapperWritten,
    Done,
    Failed { stage: InstallStage, error: InstallError },
}

impl ToolState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ToolState::Done | ToolState::Failed { .. })
    }
}

/// A wrapper that has been published in the bin directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WrittenWrapper {
    pub command_name: String,
    pub path: PathBuf,
    /// Hex SHA-256 of the script content; identical manifests and paths give identical digests.
    pub sha256: String,
}

/// Outcome of installing one tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallResult {
    pub command_name: String,
    pub succeeded: bool,
    pub state: ToolState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wrapper: Option<WrittenWrapper>,
}

impl InstallResult {
    /// A tool that was never started (the run was interrupted before reaching it).
    pub fn pending(command_name: &str) -> Self {
        InstallResult {
            command_name: command_name.to_string(),
            succeeded: false,
            state: ToolState::Pending,
            wrapper: None,
        }
    }

    pub fn done(wrapper: WrittenWrapper) -> Self {
        InstallResult {
            command_name: wrapper.command_name.clone(),
            succeeded: true,
            state: ToolState::Done,
            wrapper: Some(wrapper),
        }
    }

    pub fn failed(command_name: &str, stage: InstallStage, error: InstallError) -> Self {
        InstallResult {
            command_name: command_name.to_string(),
            succeeded: false,
            state: ToolState::Failed { stage, error },
            wrapper: None,
        }
    }

    /// The structured error, if this tool failed.
    pub fn failure_detail(&self) -> Option<&InstallError> {
        match &self.state {
            ToolState::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn failed_stage(&self) -> Option<InstallStage> {
        match &self.state {
            ToolState::Failed { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// Overall state of an install run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    NotStarted,
    Running,
    Succeeded,
    PartiallyFailed,
    Failed,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunStatus::NotStarted => "not started",
            RunStatus::Running => "running",
            RunStatus::Succeeded => "succeeded",
            RunStatus::PartiallyFailed => "partially failed",
            RunStatus::Failed => "failed",
        };
        write!(f, "{name}")
    }
}

/// Accumulates everything that happened during one install run.
#[derive(Debug, Clone, Serialize)]
pub struct InstallReport {
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<String>,
    pub interrupted: bool,
    /// One entry per manifest tool, in manifest order.
    pub tools: Vec<InstallResult>,
    /// Destination paths of the shared resources that were copied.
    pub shared_resources: Vec<PathBuf>,
    /// Failure of the suite-level steps (shared resources, meta-commands); always fatal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suite_failure: Option<SuiteFailure>,
    pub meta_commands: Vec<WrittenWrapper>,
}

/// A failed suite-level step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuiteFailure {
    pub stage: InstallStage,
    pub error: InstallError,
}

impl Default for InstallReport {
    fn default() -> Self {
        InstallReport {
            status: RunStatus::NotStarted,
            started_at: None,
            finished_at: None,
            interrupted: false,
            tools: Vec::new(),
            shared_resources: Vec::new(),
            suite_failure: None,
            meta_commands: Vec::new(),
        }
    }
}

impl InstallReport {
    pub fn begin(&mut self) {
        self.status = RunStatus::Running;
        self.started_at = Some(current_timestamp());
    }

    pub fn record(&mut self, result: InstallResult) {
        self.tools.push(result);
    }

    /// Settles the final status from what was recorded.
    ///
    /// An interrupted run or a failed suite-level step is `Failed`; any tool
    /// that did not finish makes the run `PartiallyFailed`.
    pub fn finish(&mut self) -> RunStatus {
        self.status = if self.interrupted || self.suite_failure.is_some() {
            RunStatus::Failed
        } else if self.tools.iter().any(|t| !t.succeeded) {
            RunStatus::PartiallyFailed
        } else {
            RunStatus::Succeeded
        };
        self.finished_at = Some(current_timestamp());
        self.status
    }

    pub fn failed_tools(&self) -> impl Iterator<Item = &InstallResult> {
        self.tools.iter().filter(|t| !t.succeeded)
    }

    #[cfg(test)]
    pub fn result_for(&self, command_name: &str) -> Option<&InstallResult> {
        self.tools.iter().find(|t| t.command_name == command_name)
    }

    /// Process exit code for this run: 0 success, 1 partial failure, 2 failure.
    pub fn exit_code(&self) -> i32 {
        match self.status {
            RunStatus::Succeeded => 0,
            RunStatus::PartiallyFailed => 1,
            _ => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrapper(name: &str) -> WrittenWrapper {
        WrittenWrapper {
            command_name: name.to_string(),
            path: PathBuf::from(format!("/prefix/bin/{name}")),
            sha256: "00".to_string(),
        }
    }

    #[test]
    fn all_done_is_succeeded() {
        let mut report = InstallReport::default();
        report.begin();
        report.record(InstallResult::done(wrapper("filter")));
        report.record(InstallResult::done(wrapper("lis")));
        assert_eq!(report.finish(), RunStatus::Succeeded);
        assert_eq!(report.exit_code(), 0);
        assert!(report.finished_at.is_some());
    }

    #[test]
    fn one_failed_tool_is_partial() {
        let mut report = InstallReport::default();
        report.begin();
        report.record(InstallResult::failed(
            "alpha",
            InstallStage::DependencyInstall,
            InstallError::DependencyInstallFailed {
                dependencies: vec!["requests".into()],
                status: Some(1),
                output: String::new(),
            },
        ));
        report.record(InstallResult::done(wrapper("beta")));
        assert_eq!(report.finish(), RunStatus::PartiallyFailed);
        assert_eq!(report.exit_code(), 1);
        let failed: Vec<_> = report.failed_tools().map(|t| t.command_name.as_str()).collect();
        assert_eq!(failed, vec!["alpha"]);
        assert_eq!(
            report.result_for("alpha").and_then(|r| r.failed_stage()),
            Some(InstallStage::DependencyInstall)
        );
    }

    #[test]
    fn shared_resource_failure_fails_the_run() {
        let mut report = InstallReport::default();
        report.begin();
        report.record(InstallResult::done(wrapper("filter")));
        report.suite_failure = Some(SuiteFailure {
            stage: InstallStage::SharedResources,
            error: InstallError::ResourceMissing {
                path: PathBuf::from("/pkg/README.md"),
            },
        });
        assert_eq!(report.finish(), RunStatus::Failed);
        assert_eq!(report.exit_code(), 2);
    }

    #[test]
    fn pending_is_not_terminal() {
        assert!(!ToolState::Pending.is_terminal());
        assert!(!ToolState::Provisioning.is_terminal());
        assert!(ToolState::Done.is_terminal());
        assert!(InstallResult::pending("x").failure_detail().is_none());
    }
}
