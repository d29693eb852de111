// Resolves where everything lands on disk for one install.
//
//   <prefix>/libexec/<tool dir>/<env dir>   package tree and per-tool environments
//   <prefix>/bin/<command>                  one wrapper per command name
//   <prefix>/share/<suite name>/            shared help script, theme, docs

use crate::libs::utilities::path_helpers::{expand_path, normalize_path};
use crate::schemas::manifest::{RuntimeSettings, ToolSpec};
use crate::{log_debug, log_info};
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::{Path, PathBuf};

/// Install prefix used when neither `--prefix` nor `TOOLSUITE_PREFIX` is set.
pub const DEFAULT_PREFIX: &str = "~/.toolsuite";

/// Name of the catalog file looked up inside the package root when `--manifest` is omitted.
pub const MANIFEST_FILE_NAME: &str = "toolsuite.yaml";

/// Concrete directories for one install run. All paths are absolute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallLayout {
    pub prefix: PathBuf,
    /// Where the package tree lives; every `source_directory` is relative to it.
    pub package_root: PathBuf,
    pub bin_dir: PathBuf,
    pub share_dir: PathBuf,
}

impl InstallLayout {
    /// Standard layout under `prefix` (which must already be absolute).
    pub fn new(prefix: &Path, suite_name: &str) -> Self {
        InstallLayout {
            prefix: prefix.to_path_buf(),
            package_root: package_root_for(prefix),
            bin_dir: prefix.join("bin"),
            share_dir: prefix.join("share").join(suite_name),
        }
    }

    pub fn tool_dir(&self, tool: &ToolSpec) -> PathBuf {
        normalize_path(&self.package_root.join(&tool.source_directory))
    }

    /// Root of the tool's isolated environment, always inside the tool's own directory.
    pub fn env_root(&self, tool: &ToolSpec, runtimes: &RuntimeSettings) -> PathBuf {
        self.tool_dir(tool).join(&runtimes.env_dir_name)
    }

    pub fn wrapper_path(&self, command_name: &str) -> PathBuf {
        self.bin_dir.join(command_name)
    }

    /// Destination of a shared resource; resources are flattened into the share directory.
    pub fn shared_resource_path(&self, resource: &Path) -> PathBuf {
        match resource.file_name() {
            Some(name) => self.share_dir.join(name),
            None => self.share_dir.join(resource),
        }
    }

    pub fn log(&self) {
        log_info!("[Paths] Install prefix: {}", self.prefix.display().to_string().cyan());
        log_debug!("[Paths] Package root: {}", self.package_root.display());
        log_debug!("[Paths] Bin directory: {}", self.bin_dir.display());
        log_debug!("[Paths] Shared resources: {}", self.share_dir.display());
    }
}

/// The package root under `prefix`. Known before the manifest is, so the staged
/// `toolsuite.yaml` can be found there.
pub fn package_root_for(prefix: &Path) -> PathBuf {
    prefix.join("libexec")
}

/// Turns the user's `--prefix` (or the default) into an absolute, normalized path.
pub fn resolve_prefix(prefix: Option<&str>) -> Result<PathBuf> {
    let raw = prefix.unwrap_or(DEFAULT_PREFIX);
    let expanded = expand_path(raw);
    let absolute = std::path::absolute(&expanded)
        .with_context(|| format!("could not resolve install prefix '{raw}'"))?;
    Ok(normalize_path(&absolute))
}
