// The `plan` command: shows exactly which wrappers `install` would write and
// what they would contain. Nothing is created and no subprocess is started;
// environment interpreters are shown at the path they will have once created.

use crate::cli::cmd_enums::TargetArgs;
use crate::commands::load_target;
use crate::installers::{build, venv};
use crate::libs::install_orchestrator::{meta_commands, tool_wrapper};
use crate::libs::paths::InstallLayout;
use crate::libs::wrapper_generator::content_digest;
use crate::log_info;
use crate::schema::{Manifest, RuntimeKind};
use anyhow::{Result, bail};
use colored::Colorize;
use std::path::PathBuf;

/// One wrapper as `install` would publish it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedWrapper {
    pub command_name: String,
    pub path: PathBuf,
    pub content: String,
}

pub fn run(target: TargetArgs, only: Option<String>) -> Result<i32> {
    let (manifest, origin, layout) = load_target(&target)?;
    log_info!(
        "[Plan] Wrappers for {} from {}",
        manifest.suite.display_name.bold(),
        origin.to_string().cyan()
    );

    let planned: Vec<PlannedWrapper> = planned_wrappers(&manifest, &layout)
        .into_iter()
        .filter(|w| only.as_deref().is_none_or(|name| w.command_name == name))
        .collect();
    if planned.is_empty() {
        if let Some(name) = only {
            bail!("'{}' is not a command of {}", name, manifest.suite.display_name);
        }
    }

    for wrapper in &planned {
        println!(
            "# ==> {} (sha256 {})",
            wrapper.path.display(),
            content_digest(&wrapper.content)
        );
        println!("{}", wrapper.content);
    }
    Ok(0)
}

/// Every wrapper of an install into `layout`, in publication order.
pub fn planned_wrappers(manifest: &Manifest, layout: &InstallLayout) -> Vec<PlannedWrapper> {
    let tools = manifest.tools.iter().map(|tool| {
        let runtime = match &tool.runtime {
            RuntimeKind::EnvironmentBased { .. } => {
                venv::predicted_interpreter(&layout.env_root(tool, &manifest.runtimes))
                    .display()
                    .to_string()
            }
            RuntimeKind::BuildBased { launcher, .. } => build::resolve_launcher(launcher),
        };
        let script = tool_wrapper(manifest, layout, tool, runtime);
        PlannedWrapper {
            command_name: tool.command_name.clone(),
            path: layout.wrapper_path(&tool.command_name),
            content: script.render(),
        }
    });
    let meta = meta_commands(manifest, layout).into_iter().map(|command| PlannedWrapper {
        command_name: command.command_name().to_string(),
        path: layout.wrapper_path(command.command_name()),
        content: command.render(),
    });
    tools.chain(meta).collect()
}
