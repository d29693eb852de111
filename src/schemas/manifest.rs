//! # Tool Catalog Schema
//!
//! The manifest is the declarative list of tools the installer provisions. Each
//! entry is a [`ToolSpec`]; how it is made runnable is a closed [`RuntimeKind`]
//! variant so that every field combination is checked when the file is parsed.
//!
//! ```yaml
//! suite:
//!   name: as-tools
//!   display_name: AS Tools
//!   resources:
//!     shell_script: shell/as-tools.sh
//!     theme_file: theme/AS-Dark.terminal
//!     documentation: README.md
//! tools:
//!   - command_name: filter
//!     source_directory: filter
//!     runtime_kind: environment_based
//!     dependencies: [textual, requests]
//!     entry_point: filter_push_tui.py
//!   - command_name: assign
//!     source_directory: assign/app
//!     runtime_kind: build_based
//!     build_steps: ["npm install --production=false", "npm run build"]
//!     launcher: npm
//!     entry_point: run dev
//!     fallback_entry:
//!       script: ../assign.sh
//! ```

use crate::schemas::errors::ManifestError;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

/// Top-level catalog: suite-wide settings plus the tools, in install order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Manifest {
    pub suite: SuiteSpec,
    #[serde(default)]
    pub runtimes: RuntimeSettings,
    pub tools: Vec<ToolSpec>,
}

/// Naming and shared resources of the suite as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SuiteSpec {
    /// Name of the consolidated help command and of the shared resource subdirectory.
    pub name: String,
    /// Human-readable name, shown in wrapper headers and checked by `verify --run-help`.
    pub display_name: String,
    /// Shell function the help command calls after sourcing the shell script.
    /// Defaults to `__<name>_help` with dashes turned into underscores.
    #[serde(default)]
    pub help_function: Option<String>,
    /// Name of the theme import command. Defaults to `<name>-theme`.
    #[serde(default)]
    pub theme_command: Option<String>,
    /// Program used to open the theme file. Defaults to `open` on macOS, `xdg-open` elsewhere.
    #[serde(default)]
    pub theme_opener: Option<String>,
    pub resources: SharedResources,
}

impl SuiteSpec {
    pub fn help_function(&self) -> String {
        self.help_function
            .clone()
            .unwrap_or_else(|| format!("__{}_help", self.name.replace('-', "_")))
    }

    pub fn theme_command(&self) -> String {
        self.theme_command
            .clone()
            .unwrap_or_else(|| format!("{}-theme", self.name))
    }

    pub fn theme_opener(&self) -> String {
        self.theme_opener.clone().unwrap_or_else(|| {
            if cfg!(target_os = "macos") {
                "open".to_string()
            } else {
                "xdg-open".to_string()
            }
        })
    }
}

/// Static files copied into the shared resource directory, relative to the package root.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SharedResources {
    pub shell_script: PathBuf,
    pub theme_file: PathBuf,
    pub documentation: PathBuf,
}

impl SharedResources {
    /// All declared resources, in copy order.
    pub fn all(&self) -> [&Path; 3] {
        [&self.shell_script, &self.theme_file, &self.documentation]
    }

    /// Resources land flat in the share directory, so each needs a distinct file name.
    fn validate(&self) -> Result<(), ManifestError> {
        let mut names = HashSet::new();
        for resource in self.all() {
            if !is_contained_relative(resource) {
                return Err(ManifestError::InvalidSuite(format!(
                    "resource {} must be a relative path inside the package root",
                    resource.display()
                )));
            }
            let Some(name) = resource.file_name() else {
                return Err(ManifestError::InvalidSuite(format!(
                    "resource {} does not name a file",
                    resource.display()
                )));
            };
            if !names.insert(name) {
                return Err(ManifestError::InvalidSuite(format!(
                    "more than one resource is named {}",
                    name.to_string_lossy()
                )));
            }
        }
        Ok(())
    }
}

/// Knobs for the environment-creation and dependency primitives.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RuntimeSettings {
    /// Interpreter used to create environments (`<python> -m venv`).
    #[serde(default = "default_python")]
    pub python: String,
    /// Name of the environment directory created inside each tool directory.
    #[serde(default = "default_env_dir_name")]
    pub env_dir_name: String,
    /// Upgrade pip inside each fresh environment before installing dependencies.
    #[serde(default = "default_true")]
    pub upgrade_pip: bool,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        RuntimeSettings {
            python: default_python(),
            env_dir_name: default_env_dir_name(),
            upgrade_pip: true,
        }
    }
}

fn default_python() -> String {
    "python3".to_string()
}

fn default_env_dir_name() -> String {
    ".brew_venv".to_string()
}

fn default_true() -> bool {
    true
}

fn default_interpreter() -> String {
    "bash".to_string()
}

/// One declared tool.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ToolSpec {
    pub command_name: String,
    /// Relative to the installed package root.
    pub source_directory: PathBuf,
    #[serde(flatten)]
    pub runtime: RuntimeKind,
    /// Arguments always passed after the entry point and before the caller's arguments.
    #[serde(default)]
    pub invocation_template: String,
    /// Optional line the wrapper echoes before starting the tool.
    #[serde(default)]
    pub banner: Option<String>,
}

/// How a tool becomes runnable.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "runtime_kind", rename_all = "snake_case")]
pub enum RuntimeKind {
    /// Runs from its own virtual environment; `entry_point` is passed to the environment's python.
    EnvironmentBased {
        #[serde(default)]
        dependencies: Vec<String>,
        entry_point: String,
    },
    /// Needs build commands first, then runs through `launcher` (e.g. `npm`, `node`).
    BuildBased {
        #[serde(default)]
        build_steps: Vec<String>,
        launcher: String,
        entry_point: String,
        #[serde(default)]
        fallback_entry: Option<FallbackEntry>,
    },
}

/// A companion launch script preferred over the primary invocation when it exists
/// at the time the wrapper is executed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FallbackEntry {
    /// Relative to the tool's `source_directory`; may point upwards (`../assign.sh`).
    pub script: PathBuf,
    #[serde(default = "default_interpreter")]
    pub interpreter: String,
}

impl ToolSpec {
    pub fn entry_point(&self) -> &str {
        match &self.runtime {
            RuntimeKind::EnvironmentBased { entry_point, .. } => entry_point,
            RuntimeKind::BuildBased { entry_point, .. } => entry_point,
        }
    }

    /// Entry point split into shell words (`-m streamlit run Home.py` is four tokens).
    pub fn entry_tokens(&self) -> Vec<String> {
        self.entry_point().split_whitespace().map(str::to_string).collect()
    }

    pub fn template_tokens(&self) -> Vec<String> {
        self.invocation_template
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }

    pub fn kind_label(&self) -> &'static str {
        match self.runtime {
            RuntimeKind::EnvironmentBased { .. } => "environment",
            RuntimeKind::BuildBased { .. } => "build",
        }
    }

    fn validate(&self) -> Result<(), ManifestError> {
        let invalid = |problem: &str| ManifestError::InvalidTool {
            command: self.command_name.clone(),
            problem: problem.to_string(),
        };

        if !is_valid_command_name(&self.command_name) {
            return Err(invalid("command_name must be a single non-empty path component without whitespace"));
        }
        if self.source_directory.as_os_str().is_empty() || !is_contained_relative(&self.source_directory) {
            return Err(invalid("source_directory must be a relative path inside the package root"));
        }
        if self.entry_point().trim().is_empty() {
            return Err(invalid("entry_point must not be empty"));
        }
        match &self.runtime {
            RuntimeKind::EnvironmentBased { dependencies, .. } => {
                if dependencies.iter().any(|d| d.trim().is_empty()) {
                    return Err(invalid("dependencies must not contain empty names"));
                }
            }
            RuntimeKind::BuildBased {
                build_steps,
                launcher,
                fallback_entry,
                ..
            } => {
                if launcher.trim().is_empty() {
                    return Err(invalid("launcher must not be empty"));
                }
                if build_steps.iter().any(|s| s.trim().is_empty()) {
                    return Err(invalid("build_steps must not contain empty commands"));
                }
                if let Some(fallback) = fallback_entry {
                    if fallback.script.is_absolute() || fallback.script.file_name().is_none() {
                        return Err(invalid("fallback_entry.script must be a relative path to a file"));
                    }
                }
            }
        }
        Ok(())
    }
}

impl Manifest {
    /// Checks the invariants the installer relies on: at least one tool, unique
    /// command names (meta-commands included), and well-formed entries.
    pub fn validate(&self) -> Result<(), ManifestError> {
        if self.tools.is_empty() {
            return Err(ManifestError::Empty);
        }
        let meta = [self.suite.name.clone(), self.suite.theme_command()];
        for name in &meta {
            if !is_valid_command_name(name) {
                return Err(ManifestError::InvalidTool {
                    command: name.clone(),
                    problem: "suite command names must be single path components".to_string(),
                });
            }
        }

        let help_function = self.suite.help_function();
        if !is_shell_identifier(&help_function) {
            return Err(ManifestError::InvalidSuite(format!(
                "help_function `{help_function}` must be a shell identifier"
            )));
        }
        self.suite.resources.validate()?;

        let mut seen: HashSet<&str> = meta.iter().map(String::as_str).collect();
        if seen.len() != meta.len() {
            return Err(ManifestError::DuplicateCommand(self.suite.name.clone()));
        }
        for tool in &self.tools {
            tool.validate()?;
            if !seen.insert(tool.command_name.as_str()) {
                return Err(ManifestError::DuplicateCommand(tool.command_name.clone()));
            }
        }
        Ok(())
    }

    /// Every command the install publishes: tools in manifest order, then help, then theme.
    pub fn command_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.iter().map(|t| t.command_name.clone()).collect();
        names.push(self.suite.name.clone());
        names.push(self.suite.theme_command());
        names
    }
}

fn is_valid_command_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
        && !name.chars().any(char::is_whitespace)
}

/// `[A-Za-z_][A-Za-z0-9_]*`, the names a shell accepts for functions it can call unquoted.
fn is_shell_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Relative, and never climbs above its starting point.
fn is_contained_relative(path: &Path) -> bool {
    let mut depth: i32 = 0;
    for component in path.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            Component::RootDir | Component::Prefix(_) => return false,
        }
    }
    true
}
