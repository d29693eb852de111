// Drives one install run over a validated manifest.
//
// Tools are independent: each one is provisioned (environment or build), then
// its wrapper is published, and a failure is recorded against that tool only.
// Shared resources and the two meta-commands come last, once every tool has had
// its turn. Their failure is fatal to the run, but wrappers already written for
// tools stay in place.

use crate::installers::{build, venv};
use crate::libs::command_runner::CommandRunner;
use crate::libs::interrupt::InterruptFlag;
use crate::libs::paths::InstallLayout;
use crate::libs::resource_installer::install_shared_resources;
use crate::libs::utilities::timestamps::{elapsed_between, format_elapsed};
use crate::libs::wrapper_generator::{Invocation, MetaCommand, WrapperScript, publish_wrapper};
use crate::logger;
use crate::schemas::errors::InstallError;
use crate::schemas::install_result::{
    InstallReport, InstallResult, InstallStage, RunStatus, SuiteFailure, ToolState,
};
use crate::schemas::manifest::{Manifest, RuntimeKind, ToolSpec};
use crate::{log_debug, log_error, log_info, log_warn};
use colored::Colorize;
use rayon::prelude::*;

/// Installs every tool of a manifest into one layout.
pub struct InstallOrchestrator<'a> {
    manifest: &'a Manifest,
    layout: &'a InstallLayout,
    runner: &'a dyn CommandRunner,
    interrupt: InterruptFlag,
    parallel: bool,
}

impl<'a> InstallOrchestrator<'a> {
    pub fn new(
        manifest: &'a Manifest,
        layout: &'a InstallLayout,
        runner: &'a dyn CommandRunner,
        interrupt: InterruptFlag,
    ) -> Self {
        InstallOrchestrator {
            manifest,
            layout,
            runner,
            interrupt,
            parallel: false,
        }
    }

    /// Provision tools concurrently on the rayon pool. Results keep manifest order.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Runs the installation and returns the settled report.
    ///
    /// # Workflow
    /// 1. Each tool is provisioned and gets its wrapper; failures are recorded, not raised.
    /// 2. If the run was interrupted, the suite-level steps are skipped.
    /// 3. Shared resources are copied; only if that succeeds are the meta-commands written.
    /// 4. The final status is settled and a summary is logged.
    pub fn run(&self) -> InstallReport {
        let mut report = InstallReport::default();
        report.begin();
        log_info!(
            "[Orchestrator] Installing {} tools for {}{}",
            self.manifest.tools.len().to_string().bold(),
            self.manifest.suite.display_name.bright_blue().bold(),
            if self.parallel { " (parallel)" } else { "" }
        );

        let results: Vec<InstallResult> = if self.parallel {
            self.manifest
                .tools
                .par_iter()
                .map(|tool| self.install_tool(tool))
                .collect()
        } else {
            self.manifest
                .tools
                .iter()
                .map(|tool| self.install_tool(tool))
                .collect()
        };
        for result in results {
            report.record(result);
        }

        if self.interrupt.is_raised() {
            report.interrupted = true;
            log_warn!("[Orchestrator] Run interrupted; shared resources and meta-commands were not installed.");
        } else {
            self.install_suite(&mut report);
        }

        report.finish();
        log_summary(&report);
        report
    }

    fn install_tool(&self, tool: &ToolSpec) -> InstallResult {
        let name = tool.command_name.as_str();
        if self.interrupt.is_raised() {
            log_debug!("[Orchestrator] {} left pending after interrupt", name);
            return InstallResult::pending(name);
        }

        logger::separator();
        log_info!(
            "[Orchestrator] Installing {} ({} tool)",
            name.bright_blue().bold(),
            tool.kind_label()
        );
        trace_state(name, &ToolState::Provisioning);

        let runtime_binary = match self.provision(tool) {
            Ok(binary) => binary,
            Err((stage, error)) => return fail(name, stage, error),
        };

        if self.interrupt.is_raised() {
            let stage = InstallStage::WrapperGeneration;
            return fail(name, stage, InstallError::Interrupted { stage });
        }

        let script = tool_wrapper(self.manifest, self.layout, tool, runtime_binary);
        log_debug!(
            "[Orchestrator] {} will exec: {} \"$@\"",
            name,
            script.invocation.argv().join(" ")
        );
        match publish_wrapper(&self.layout.wrapper_path(name), name, &script.render()) {
            Ok(wrapper) => {
                trace_state(name, &ToolState::WrapperWritten);
                log_info!(
                    "[Orchestrator] {} is ready: {}",
                    name.green().bold(),
                    wrapper.path.display().to_string().cyan()
                );
                trace_state(name, &ToolState::Done);
                InstallResult::done(wrapper)
            }
            Err(error) => fail(name, InstallStage::WrapperGeneration, error),
        }
    }

    /// Makes the tool runnable and returns what its wrapper should exec.
    fn provision(&self, tool: &ToolSpec) -> Result<String, (InstallStage, InstallError)> {
        match &tool.runtime {
            RuntimeKind::EnvironmentBased { dependencies, .. } => venv::provision(
                tool,
                dependencies,
                self.layout,
                &self.manifest.runtimes,
                self.runner,
            )
            .map(|env| {
                log_debug!("[Orchestrator] Environment for {} at {}", tool.command_name, env.root_path.display());
                env.runtime_binary.display().to_string()
            })
            .map_err(|e| (failure_stage(&e, InstallStage::EnvironmentCreation), e)),
            RuntimeKind::BuildBased {
                build_steps,
                launcher,
                ..
            } => {
                build::run_build_steps(tool, build_steps, self.layout, self.runner)
                    .map_err(|e| (failure_stage(&e, InstallStage::Build), e))?;
                Ok(build::resolve_launcher(launcher))
            }
        }
    }

    fn install_suite(&self, report: &mut InstallReport) {
        logger::separator();
        match install_shared_resources(&self.manifest.suite.resources, self.layout) {
            Ok(installed) => report.shared_resources = installed,
            Err(error) => {
                log_error!("[Orchestrator] Shared resources failed: {}", error);
                report.suite_failure = Some(SuiteFailure {
                    stage: InstallStage::SharedResources,
                    error,
                });
                return;
            }
        }

        for meta in meta_commands(self.manifest, self.layout) {
            let name = meta.command_name();
            match publish_wrapper(&self.layout.wrapper_path(name), name, &meta.render()) {
                Ok(wrapper) => {
                    log_info!("[Orchestrator] Meta-command {} written", name.green().bold());
                    report.meta_commands.push(wrapper);
                }
                Err(error) => {
                    log_error!("[Orchestrator] Meta-command {} failed: {}", name.bold(), error);
                    report.suite_failure = Some(SuiteFailure {
                        stage: InstallStage::MetaCommands,
                        error,
                    });
                    return;
                }
            }
        }
    }
}

/// The wrapper for `tool`, given what its runtime resolved to.
///
/// `install` passes the real interpreter or launcher; `plan` passes the predicted one.
pub fn tool_wrapper(
    manifest: &Manifest,
    layout: &InstallLayout,
    tool: &ToolSpec,
    runtime_binary: String,
) -> WrapperScript {
    let tool_dir = layout.tool_dir(tool);
    let fallback = match &tool.runtime {
        RuntimeKind::BuildBased {
            fallback_entry: Some(entry),
            ..
        } => Some(build::resolve_fallback(&tool_dir, entry)),
        _ => None,
    };
    WrapperScript {
        command_name: tool.command_name.clone(),
        suite_display_name: manifest.suite.display_name.clone(),
        target_working_directory: tool_dir,
        invocation: Invocation {
            runtime_binary,
            entry_tokens: tool.entry_tokens(),
            template_tokens: tool.template_tokens(),
        },
        banner: tool.banner.clone(),
        fallback,
    }
}

/// The help and theme-import commands, pointing at the installed shared resources.
pub fn meta_commands(manifest: &Manifest, layout: &InstallLayout) -> Vec<MetaCommand> {
    let suite = &manifest.suite;
    vec![
        MetaCommand::Help {
            command_name: suite.name.clone(),
            suite_display_name: suite.display_name.clone(),
            shell_script: layout.shared_resource_path(&suite.resources.shell_script),
            help_function: suite.help_function(),
        },
        MetaCommand::ThemeImport {
            command_name: suite.theme_command(),
            suite_display_name: suite.display_name.clone(),
            theme_file: layout.shared_resource_path(&suite.resources.theme_file),
            opener: suite.theme_opener(),
        },
    ]
}

/// Stage a provisioning error belongs to; `default` covers errors any stage can raise.
fn failure_stage(error: &InstallError, default: InstallStage) -> InstallStage {
    match error {
        InstallError::Interrupted { stage } => *stage,
        InstallError::EnvironmentCreationFailed { .. } => InstallStage::EnvironmentCreation,
        InstallError::DependencyInstallFailed { .. } => InstallStage::DependencyInstall,
        InstallError::BuildStepFailed { .. } => InstallStage::Build,
        _ => default,
    }
}

fn fail(name: &str, stage: InstallStage, error: InstallError) -> InstallResult {
    log_error!(
        "[Orchestrator] {} failed during {}: {}",
        name.red().bold(),
        stage,
        error
    );
    InstallResult::failed(name, stage, error)
}

fn trace_state(name: &str, state: &ToolState) {
    log_debug!("[Orchestrator] {} -> {:?}", name, state);
}

fn log_summary(report: &InstallReport) {
    logger::separator();
    for result in &report.tools {
        if let (Some(stage), Some(error)) = (result.failed_stage(), result.failure_detail()) {
            log_error!(
                "[Summary] {:<20} {} during {} ({})",
                result.command_name,
                "FAILED".red().bold(),
                stage,
                error.kind()
            );
        } else if result.state.is_terminal() {
            log_info!("[Summary] {:<20} {}", result.command_name, "done".green());
        } else {
            log_warn!("[Summary] {:<20} {}", result.command_name, "pending".yellow());
        }
    }
    if let Some(failure) = &report.suite_failure {
        log_error!("[Summary] {} failed: {}", failure.stage, failure.error);
    }

    let elapsed = match (&report.started_at, &report.finished_at) {
        (Some(start), Some(end)) => elapsed_between(start, end).map(|d| format_elapsed(&d)),
        _ => None,
    }
    .unwrap_or_default();
    let status = report.status.to_string();
    match report.status {
        RunStatus::Succeeded => log_info!("[Summary] Installation {} in {}", status.green().bold(), elapsed),
        RunStatus::PartiallyFailed => log_warn!(
            "[Summary] Installation {} in {}: {} of {} tools did not install",
            status.yellow().bold(),
            elapsed,
            report.failed_tools().count(),
            report.tools.len()
        ),
        _ => log_error!("[Summary] Installation {} in {}", status.red().bold(), elapsed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::command_runner::CommandOutput;
    use crate::libs::command_runner::testing::FakeRunner;
    use crate::libs::utilities::file_operations::is_executable;
    use std::fs;
    use std::io;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    const MANIFEST: &str = r#"
suite:
  name: demo
  display_name: Demo Tools
  resources:
    shell_script: shell/demo.sh
    theme_file: theme/Demo.terminal
    documentation: README.md
tools:
  - command_name: alpha
    source_directory: alpha
    runtime_kind: environment_based
    dependencies: [requests]
    entry_point: main.py
  - command_name: beta
    source_directory: beta
    runtime_kind: build_based
    build_steps: ["npm run build"]
    launcher: /bin/sh
    entry_point: server.js
"#;

    struct Fixture {
        _prefix: TempDir,
        manifest: Manifest,
        layout: InstallLayout,
    }

    impl Fixture {
        fn new(yaml: &str) -> Self {
            let prefix = TempDir::new().unwrap();
            let manifest: Manifest = serde_yaml::from_str(yaml).unwrap();
            manifest.validate().unwrap();
            let layout = InstallLayout::new(prefix.path(), &manifest.suite.name);
            for tool in &manifest.tools {
                fs::create_dir_all(layout.tool_dir(tool)).unwrap();
            }
            for resource in manifest.suite.resources.all() {
                let path = layout.package_root.join(resource);
                fs::create_dir_all(path.parent().unwrap()).unwrap();
                fs::write(path, "content\n").unwrap();
            }
            Fixture {
                _prefix: prefix,
                manifest,
                layout,
            }
        }

        fn run(&self, runner: &FakeRunner) -> InstallReport {
            InstallOrchestrator::new(&self.manifest, &self.layout, runner, InterruptFlag::new()).run()
        }

        fn wrapper(&self, name: &str) -> PathBuf {
            self.layout.wrapper_path(name)
        }
    }

    fn venv_runner() -> FakeRunner {
        FakeRunner::new().on(
            |spec| spec.args.iter().any(|a| a == "venv"),
            |spec| {
                let root = PathBuf::from(spec.args.last().unwrap());
                fs::create_dir_all(root.join("bin")).unwrap();
                fs::write(root.join("bin/python"), "").unwrap();
                Ok(CommandOutput {
                    status: Some(0),
                    ..CommandOutput::default()
                })
            },
        )
    }

    fn read(path: &Path) -> String {
        fs::read_to_string(path).unwrap()
    }

    #[test]
    fn one_failing_tool_does_not_stop_the_others() {
        let yaml = MANIFEST.replace("[requests]", "[requests, nosuchpkg]").replace(
            "entry_point: server.js\n",
            "entry_point: server.js\n    fallback_entry:\n      script: launch.sh\n      interpreter: sh\n",
        );
        let fixture = Fixture::new(&yaml);
        let runner = venv_runner().fail_when("nosuchpkg", 1, "No matching distribution found for nosuchpkg");

        let report = fixture.run(&runner);

        assert_eq!(report.status, RunStatus::PartiallyFailed);
        assert_eq!(report.exit_code(), 1);
        let alpha = report.result_for("alpha").unwrap();
        assert!(!alpha.succeeded);
        assert_eq!(alpha.failed_stage(), Some(InstallStage::DependencyInstall));
        match alpha.failure_detail() {
            Some(InstallError::DependencyInstallFailed { dependencies, .. }) => {
                assert_eq!(dependencies, &vec!["requests", "nosuchpkg"]);
            }
            other => panic!("unexpected failure {other:?}"),
        }
        assert!(!fixture.wrapper("alpha").exists());

        assert!(report.result_for("beta").unwrap().succeeded);
        assert!(is_executable(&fixture.wrapper("beta")));
        assert!(is_executable(&fixture.wrapper("demo")));
        assert!(is_executable(&fixture.wrapper("demo-theme")));

        #[cfg(unix)]
        {
            let beta_dir = fixture.layout.package_root.join("beta");
            fs::write(beta_dir.join("server.js"), "echo primary \"$@\"\n").unwrap();
            let run_beta = || {
                let output = std::process::Command::new(fixture.wrapper("beta"))
                    .args(["x", "y"])
                    .output()
                    .unwrap();
                assert!(output.status.success());
                String::from_utf8_lossy(&output.stdout).trim().to_string()
            };
            assert_eq!(run_beta(), "primary x y");

            fs::write(beta_dir.join("launch.sh"), "echo fallback \"$@\"\n").unwrap();
            assert_eq!(run_beta(), "fallback x y");
        }
    }

    #[test]
    fn unwritable_bin_directory_fails_every_wrapper() {
        let fixture = Fixture::new(MANIFEST);
        fs::create_dir_all(&fixture.layout.prefix).unwrap();
        fs::write(&fixture.layout.bin_dir, "not a directory\n").unwrap();

        let report = fixture.run(&venv_runner());

        assert_eq!(report.tools.len(), 2);
        for tool in &report.tools {
            assert!(tool.state.is_terminal(), "{} did not finish", tool.command_name);
            assert!(!tool.succeeded);
            assert_eq!(tool.failed_stage(), Some(InstallStage::WrapperGeneration));
            assert_eq!(tool.failure_detail().map(InstallError::kind), Some("WrapperWriteFailed"));
            assert!(tool.wrapper.is_none());
            assert!(!fixture.wrapper(&tool.command_name).exists());
        }

        let failure = report.suite_failure.as_ref().unwrap();
        assert_eq!(failure.stage, InstallStage::MetaCommands);
        assert_eq!(failure.error.kind(), "WrapperWriteFailed");
        assert!(report.meta_commands.is_empty());
        assert_eq!(report.status, RunStatus::Failed);
        assert_eq!(report.exit_code(), 2);
    }

    #[test]
    fn successful_run_publishes_every_command() {
        let fixture = Fixture::new(MANIFEST);
        let report = fixture.run(&venv_runner());

        assert_eq!(report.status, RunStatus::Succeeded);
        for name in fixture.manifest.command_names() {
            assert!(is_executable(&fixture.wrapper(&name)), "{name} is not executable");
        }
        assert_eq!(report.meta_commands.len(), 2);
        assert_eq!(report.shared_resources.len(), 3);

        let alpha = read(&fixture.wrapper("alpha"));
        let interpreter = fixture.layout.package_root.join("alpha/.brew_venv/bin/python");
        assert!(alpha.contains(&format!("RUNTIME='{}'", interpreter.display())));
        assert!(alpha.contains("exec \"$RUNTIME\" 'main.py' \"$@\""));

        let beta = read(&fixture.wrapper("beta"));
        assert!(beta.contains("RUNTIME='/bin/sh'"));
    }

    #[test]
    fn missing_directory_fails_only_that_tool() {
        let fixture = Fixture::new(MANIFEST);
        fs::remove_dir_all(fixture.layout.package_root.join("beta")).unwrap();
        let runner = venv_runner();

        let report = fixture.run(&runner);

        let beta = report.result_for("beta").unwrap();
        assert_eq!(beta.failed_stage(), Some(InstallStage::Build));
        assert_eq!(beta.failure_detail().map(InstallError::kind), Some("DirectoryNotFound"));
        assert!(!fixture.wrapper("beta").exists());
        assert!(runner.calls().iter().all(|c| !c.display().contains("npm")));
        assert!(report.result_for("alpha").unwrap().succeeded);
        assert_eq!(report.status, RunStatus::PartiallyFailed);
    }

    #[test]
    fn missing_resource_fails_the_run_but_keeps_tool_wrappers() {
        let fixture = Fixture::new(MANIFEST);
        fs::remove_file(fixture.layout.package_root.join("theme/Demo.terminal")).unwrap();

        let report = fixture.run(&venv_runner());

        assert_eq!(report.status, RunStatus::Failed);
        assert_eq!(report.exit_code(), 2);
        let failure = report.suite_failure.as_ref().unwrap();
        assert_eq!(failure.stage, InstallStage::SharedResources);
        assert_eq!(
            failure.error,
            InstallError::ResourceMissing {
                path: fixture.layout.package_root.join("theme/Demo.terminal")
            }
        );
        assert!(report.meta_commands.is_empty());
        assert!(!fixture.wrapper("demo").exists());
        assert!(!fixture.wrapper("demo-theme").exists());
        assert!(is_executable(&fixture.wrapper("alpha")));
        assert!(is_executable(&fixture.wrapper("beta")));
    }

    #[test]
    fn rerun_produces_identical_wrappers() {
        let fixture = Fixture::new(MANIFEST);
        let first = fixture.run(&venv_runner());
        let before: Vec<String> = fixture
            .manifest
            .command_names()
            .iter()
            .map(|name| read(&fixture.wrapper(name)))
            .collect();

        let second = fixture.run(&venv_runner());
        let after: Vec<String> = fixture
            .manifest
            .command_names()
            .iter()
            .map(|name| read(&fixture.wrapper(name)))
            .collect();

        assert_eq!(before, after);
        let digests = |report: &InstallReport| -> Vec<String> {
            report
                .tools
                .iter()
                .filter_map(|t| t.wrapper.as_ref().map(|w| w.sha256.clone()))
                .chain(report.meta_commands.iter().map(|w| w.sha256.clone()))
                .collect()
        };
        assert_eq!(digests(&first), digests(&second));
    }

    #[test]
    fn interrupt_before_start_leaves_everything_pending() {
        let fixture = Fixture::new(MANIFEST);
        let flag = InterruptFlag::new();
        flag.raise();
        let runner = venv_runner();

        let report = InstallOrchestrator::new(&fixture.manifest, &fixture.layout, &runner, flag).run();

        assert!(report.interrupted);
        assert_eq!(report.status, RunStatus::Failed);
        assert!(report.tools.iter().all(|t| t.state == ToolState::Pending));
        assert!(runner.calls().is_empty());
        assert!(report.meta_commands.is_empty());
    }

    #[test]
    fn interrupt_during_a_tool_fails_it_and_skips_the_rest() {
        let fixture = Fixture::new(MANIFEST);
        let flag = InterruptFlag::new();
        let raiser = flag.clone();
        let runner = FakeRunner::new().on(
            |spec| spec.args.iter().any(|a| a == "venv"),
            move |_| {
                raiser.raise();
                Err(io::Error::new(io::ErrorKind::Interrupted, "interrupted"))
            },
        );

        let report = InstallOrchestrator::new(&fixture.manifest, &fixture.layout, &runner, flag).run();

        let alpha = report.result_for("alpha").unwrap();
        assert_eq!(
            alpha.failure_detail(),
            Some(&InstallError::Interrupted {
                stage: InstallStage::EnvironmentCreation
            })
        );
        assert_eq!(report.result_for("beta").unwrap().state, ToolState::Pending);
        assert_eq!(report.status, RunStatus::Failed);
        assert!(report.shared_resources.is_empty());
    }

    #[test]
    fn parallel_run_keeps_manifest_order() {
        let fixture = Fixture::new(MANIFEST);
        let runner = venv_runner();
        let report = InstallOrchestrator::new(&fixture.manifest, &fixture.layout, &runner, InterruptFlag::new())
            .with_parallelism(true)
            .run();

        let names: Vec<&str> = report.tools.iter().map(|t| t.command_name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "beta"]);
        assert_eq!(report.status, RunStatus::Succeeded);
    }

    #[test]
    fn fallback_script_is_resolved_against_tool_directory() {
        let yaml = MANIFEST.replace(
            "    entry_point: server.js\n",
            "    entry_point: server.js\n    fallback_entry:\n      script: ../beta.sh\n",
        );
        let fixture = Fixture::new(&yaml);
        let tool = &fixture.manifest.tools[1];
        let script = tool_wrapper(&fixture.manifest, &fixture.layout, tool, "/bin/sh".to_string());
        let fallback = script.fallback.unwrap();
        assert_eq!(fallback.script, fixture.layout.package_root.join("beta.sh"));
    }

    #[test]
    fn meta_commands_point_at_shared_resources() {
        let fixture = Fixture::new(MANIFEST);
        let commands = meta_commands(&fixture.manifest, &fixture.layout);
        let names: Vec<&str> = commands.iter().map(MetaCommand::command_name).collect();
        assert_eq!(names, vec!["demo", "demo-theme"]);
        match &commands[0] {
            MetaCommand::Help {
                shell_script,
                help_function,
                ..
            } => {
                assert_eq!(shell_script, &fixture.layout.share_dir.join("demo.sh"));
                assert_eq!(help_function, "__demo_help");
            }
            other => panic!("unexpected meta-command {other:?}"),
        }
    }
}
