// The `install` command: optionally stages a package tree into the prefix,
// loads the catalog, runs the orchestrator under Ctrl-C supervision, writes
// the JSON report when asked and prints the caveats.

use crate::cli::cmd_enums::TargetArgs;
use crate::libs::caveats::print_caveats;
use crate::libs::command_runner::SystemRunner;
use crate::libs::install_orchestrator::InstallOrchestrator;
use crate::libs::interrupt::{InterruptFlag, listen_for_ctrl_c};
use crate::libs::manifest_loading::resolve_manifest;
use crate::libs::package_stager::stage_package;
use crate::libs::paths::{InstallLayout, package_root_for, resolve_prefix};
use crate::libs::utilities::path_helpers::expand_path;
use crate::schema::InstallReport;
use crate::schemas::manifest::RuntimeSettings;
use crate::{log_debug, log_info};
use anyhow::{Context, Result};
use colored::Colorize;
use std::fs;
use std::path::Path;

/// Runs a full installation and returns the exit code of the run
/// (0 succeeded, 1 partially failed, 2 failed).
///
/// # Arguments
/// * `target`: `--manifest` and `--prefix`.
/// * `source`: package tree to stage into `<prefix>/libexec` first.
/// * `parallel`: provision tools concurrently.
/// * `report_path`: where to write the JSON report.
pub fn run(
    target: TargetArgs,
    source: Option<String>,
    parallel: bool,
    report_path: Option<String>,
) -> Result<i32> {
    log_debug!("[Install] Entering install::run()");
    let prefix = resolve_prefix(target.prefix.as_deref())?;
    let package_root = package_root_for(&prefix);

    if let Some(source) = &source {
        // The manifest may live inside the tree being staged, so the default
        // environment directory name is the one skipped here.
        stage_package(&expand_path(source), &package_root, &RuntimeSettings::default().env_dir_name)
            .context("could not stage the package tree")?;
    }

    let (manifest, _origin) = resolve_manifest(target.manifest.as_deref(), &package_root)?;
    let layout = InstallLayout::new(&prefix, &manifest.suite.name);
    layout.log();

    let interrupt = InterruptFlag::new();
    listen_for_ctrl_c(interrupt.clone());
    let runner = SystemRunner::new(interrupt.clone());
    let report = InstallOrchestrator::new(&manifest, &layout, &runner, interrupt)
        .with_parallelism(parallel)
        .run();

    if let Some(path) = &report_path {
        write_report(&report, &expand_path(path))?;
    }

    if !report.interrupted && report.suite_failure.is_none() && report.tools.iter().any(|t| t.succeeded) {
        print_caveats(&manifest, &layout, &report);
    }
    Ok(report.exit_code())
}

/// Writes `report` as pretty-printed JSON, creating parent directories as needed.
pub fn write_report(report: &InstallReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("could not serialize the install report")?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("could not create report directory {}", parent.display()))?;
    }
    fs::write(path, json + "\n").with_context(|| format!("could not write install report {}", path.display()))?;
    log_info!("[Install] Report written to {}", path.display().to_string().cyan());
    Ok(())
}
