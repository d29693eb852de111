// Generates the executable launchers exposed to users.
//
// A wrapper binds a stable command name to: change into the tool directory,
// exec the resolved runtime with the entry point and fixed template arguments,
// then append every caller argument verbatim. Because the wrapper `exec`s, no
// wrapper process remains and the tool's exit code and signals pass straight
// through.
//
// Script content is a pure function of its inputs (every token single-quoted,
// no timestamps), so re-running an install produces byte-identical files.
// Publication is write-to-temp, chmod 0755, atomic rename: a wrapper is never
// visible under its final name without being executable.

use crate::libs::utilities::file_operations::{is_executable, make_executable};
use crate::log_debug;
use crate::schemas::errors::InstallError;
use crate::schemas::install_result::WrittenWrapper;
use colored::Colorize;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Exit status of a wrapper whose tool directory or runtime is missing.
pub const MISSING_TARGET_STATUS: i32 = 127;

/// What the wrapper finally `exec`s, before caller arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Absolute path to the interpreter/launcher, or a bare name looked up on PATH at run time.
    pub runtime_binary: String,
    pub entry_tokens: Vec<String>,
    pub template_tokens: Vec<String>,
}

impl Invocation {
    /// The full fixed command line; the wrapper appends `"$@"` to it.
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.runtime_binary.clone())
            .chain(self.entry_tokens.iter().cloned())
            .chain(self.template_tokens.iter().cloned())
            .collect()
    }
}

/// An alternate launch script checked for every time the wrapper runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackLaunch {
    /// Absolute, normalized path of the script.
    pub script: PathBuf,
    pub interpreter: String,
}

/// Everything needed to render one tool wrapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrapperScript {
    pub command_name: String,
    /// Suite name used in the header comment.
    pub suite_display_name: String,
    pub target_working_directory: PathBuf,
    pub invocation: Invocation,
    pub banner: Option<String>,
    pub fallback: Option<FallbackLaunch>,
}

impl WrapperScript {
    pub fn render(&self) -> String {
        let name = &self.command_name;
        let mut script = String::new();
        script.push_str("#!/usr/bin/env bash\n");
        script.push_str(&format!("# {} wrapper: {}\n", self.suite_display_name, name));
        script.push_str("# Generated by toolsuite; overwritten on every install.\n");

        if let Some(banner) = &self.banner {
            script.push_str(&format!("printf '%s\\n' {}\n", shell_quote(banner)));
        }

        if let Some(fallback) = &self.fallback {
            let script_dir = fallback.script.parent().unwrap_or(Path::new("/"));
            let script_name = fallback
                .script
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            script.push_str(&format!(
                "FALLBACK={}\n",
                shell_quote(&fallback.script.to_string_lossy())
            ));
            script.push_str("if [ -f \"$FALLBACK\" ]; then\n");
            script.push_str(&format!(
                "  cd {} 2>/dev/null || {{ echo {}\"$FALLBACK\" >&2; exit {}; }}\n",
                shell_quote(&script_dir.to_string_lossy()),
                shell_quote(&format!("{name}: cannot enter directory of ")),
                MISSING_TARGET_STATUS
            ));
            script.push_str(&format!(
                "  exec {} {} \"$@\"\n",
                shell_quote(&fallback.interpreter),
                shell_quote(&script_name)
            ));
            script.push_str("fi\n");
        }

        script.push_str(&format!(
            "TOOL_DIR={}\n",
            shell_quote(&self.target_working_directory.to_string_lossy())
        ));
        script.push_str(&format!(
            "RUNTIME={}\n",
            shell_quote(&self.invocation.runtime_binary)
        ));
        script.push_str("if ! cd \"$TOOL_DIR\" 2>/dev/null; then\n");
        script.push_str(&format!(
            "  echo {}\"$TOOL_DIR\" >&2\n  exit {}\nfi\n",
            shell_quote(&format!("{name}: tool directory not found: ")),
            MISSING_TARGET_STATUS
        ));
        // An absolute runtime must be executable in place; a bare launcher must be on PATH.
        let runtime_check = if self.invocation.runtime_binary.contains('/') {
            "[ -x \"$RUNTIME\" ]"
        } else {
            "command -v \"$RUNTIME\" >/dev/null 2>&1"
        };
        script.push_str(&format!("if ! {runtime_check}; then\n"));
        script.push_str(&format!(
            "  echo {}\"$RUNTIME\" >&2\n  exit {}\nfi\n",
            shell_quote(&format!("{name}: runtime not found: ")),
            MISSING_TARGET_STATUS
        ));

        let fixed: Vec<String> = self
            .invocation
            .entry_tokens
            .iter()
            .chain(self.invocation.template_tokens.iter())
            .map(|t| shell_quote(t))
            .collect();
        let mut exec_line = String::from("exec \"$RUNTIME\"");
        for token in &fixed {
            exec_line.push(' ');
            exec_line.push_str(token);
        }
        exec_line.push_str(" \"$@\"\n");
        script.push_str(&exec_line);
        script
    }
}

/// The two suite-level commands that have no `ToolSpec` of their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaCommand {
    /// Sources the shared shell-integration script and calls its help function.
    Help {
        command_name: String,
        suite_display_name: String,
        shell_script: PathBuf,
        help_function: String,
    },
    /// Opens the shared terminal theme with the platform opener.
    ThemeImport {
        command_name: String,
        suite_display_name: String,
        theme_file: PathBuf,
        opener: String,
    },
}

impl MetaCommand {
    pub fn command_name(&self) -> &str {
        match self {
            MetaCommand::Help { command_name, .. } => command_name,
            MetaCommand::ThemeImport { command_name, .. } => command_name,
        }
    }

    pub fn render(&self) -> String {
        match self {
            MetaCommand::Help {
                command_name,
                suite_display_name,
                shell_script,
                help_function,
            } => format!(
                "#!/usr/bin/env bash\n\
                 # {suite_display_name}: consolidated help\n\
                 SCRIPT={script}\n\
                 if [ ! -f \"$SCRIPT\" ]; then\n\
                 \x20 echo {missing}\"$SCRIPT\" >&2\n\
                 \x20 exit {status}\n\
                 fi\n\
                 source \"$SCRIPT\"\n\
                 {help_function} \"$@\"\n",
                script = shell_quote(&shell_script.to_string_lossy()),
                missing = shell_quote(&format!("{command_name}: shell integration script not found: ")),
                status = MISSING_TARGET_STATUS,
            ),
            MetaCommand::ThemeImport {
                command_name: _,
                suite_display_name,
                theme_file,
                opener,
            } => {
                let theme_name = theme_file
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "theme".to_string());
                format!(
                    "#!/usr/bin/env bash\n\
                     # {suite_display_name}: theme import\n\
                     THEME={theme}\n\
                     if [ -f \"$THEME\" ]; then\n\
                     \x20 {opener} \"$THEME\"\n\
                     \x20 echo {imported}\n\
                     \x20 echo {hint}\n\
                     else\n\
                     \x20 echo 'Error: Theme file not found at '\"$THEME\" >&2\n\
                     \x20 exit 1\n\
                     fi\n",
                    theme = shell_quote(&theme_file.to_string_lossy()),
                    opener = shell_quote(opener),
                    imported = shell_quote(&format!("{theme_name} theme imported.")),
                    hint = shell_quote(&format!(
                        "Set it as the default profile in your terminal settings to use {theme_name} everywhere."
                    )),
                )
            }
        }
    }
}

/// Quotes `value` as a single shell word.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}

/// Hex SHA-256 of wrapper content.
pub fn content_digest(content: &str) -> String {
    format!("{:x}", Sha256::digest(content.as_bytes()))
}

/// Atomically publishes `content` as an executable at `path`, replacing any existing file.
///
/// # Errors
/// `WrapperWriteFailed` if the directory cannot be created, the temporary file cannot be
/// written or made executable, the rename fails, or the published file is not executable.
pub fn publish_wrapper(
    path: &Path,
    command_name: &str,
    content: &str,
) -> Result<WrittenWrapper, InstallError> {
    let fail = |reason: String| InstallError::WrapperWriteFailed {
        path: path.to_path_buf(),
        reason,
    };

    let dir = path
        .parent()
        .ok_or_else(|| fail("wrapper path has no parent directory".to_string()))?;
    fs::create_dir_all(dir).map_err(|e| fail(format!("could not create {}: {e}", dir.display())))?;

    let mut staged = tempfile::Builder::new()
        .prefix(&format!(".{command_name}."))
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| fail(format!("could not create temporary file: {e}")))?;
    staged
        .write_all(content.as_bytes())
        .and_then(|_| staged.as_file().sync_all())
        .map_err(|e| fail(format!("could not write temporary file: {e}")))?;
    make_executable(staged.path()).map_err(|e| fail(format!("could not mark executable: {e}")))?;
    staged
        .persist(path)
        .map_err(|e| fail(format!("could not move into place: {}", e.error)))?;

    if !is_executable(path) {
        return Err(fail("published wrapper is not executable".to_string()));
    }

    log_debug!(
        "[Wrapper] Published {} at {}",
        command_name.bold(),
        path.display().to_string().cyan()
    );
    Ok(WrittenWrapper {
        command_name: command_name.to_string(),
        path: path.to_path_buf(),
        sha256: content_digest(content),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn script(dir: &Path, runtime: &str) -> WrapperScript {
        WrapperScript {
            command_name: "consult".to_string(),
            suite_display_name: "AS Tools".to_string(),
            target_working_directory: dir.to_path_buf(),
            invocation: Invocation {
                runtime_binary: runtime.to_string(),
                entry_tokens: vec!["-m".into(), "streamlit".into(), "run".into(), "Home.py".into()],
                template_tokens: vec!["--server.port".into(), "8501".into()],
            },
            banner: None,
            fallback: None,
        }
    }

    #[test]
    fn shell_quote_escapes_single_quotes() {
        assert_eq!(shell_quote("plain"), "'plain'");
        assert_eq!(shell_quote("it's"), "'it'\\''s'");
        assert_eq!(shell_quote(""), "''");
    }

    #[test]
    fn render_contains_exec_line_with_forwarding() {
        let rendered = script(Path::new("/opt/libexec/consult"), "/opt/libexec/consult/.brew_venv/bin/python").render();
        assert!(rendered.starts_with("#!/usr/bin/env bash\n"));
        assert!(rendered.contains("TOOL_DIR='/opt/libexec/consult'\n"));
        assert!(rendered.contains(
            "exec \"$RUNTIME\" '-m' 'streamlit' 'run' 'Home.py' '--server.port' '8501' \"$@\"\n"
        ));
        assert!(rendered.contains("[ -x \"$RUNTIME\" ]"));
        assert!(!rendered.contains("FALLBACK="));
    }

    #[test]
    fn bare_launcher_is_checked_on_path() {
        let rendered = script(Path::new("/opt/libexec/lis"), "node").render();
        assert!(rendered.contains("command -v \"$RUNTIME\""));
    }

    #[test]
    fn render_is_deterministic() {
        let a = script(Path::new("/opt/x"), "/opt/x/python").render();
        let b = script(Path::new("/opt/x"), "/opt/x/python").render();
        assert_eq!(a, b);
        assert_eq!(content_digest(&a), content_digest(&b));
    }

    #[test]
    fn argv_is_runtime_entry_then_template() {
        let inv = script(Path::new("/x"), "/py").invocation;
        assert_eq!(
            inv.argv(),
            vec!["/py", "-m", "streamlit", "run", "Home.py", "--server.port", "8501"]
        );
    }

    #[cfg(unix)]
    #[test]
    fn publish_overwrites_and_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bin").join("consult");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "stale").unwrap();

        let written = publish_wrapper(&path, "consult", "#!/usr/bin/env bash\necho hi\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "#!/usr/bin/env bash\necho hi\n");
        assert!(is_executable(&path));
        assert_eq!(written.sha256, content_digest("#!/usr/bin/env bash\necho hi\n"));

        let entries: Vec<_> = fs::read_dir(path.parent().unwrap()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn theme_command_mentions_theme_name() {
        let meta = MetaCommand::ThemeImport {
            command_name: "as-tools-theme".to_string(),
            suite_display_name: "AS Tools".to_string(),
            theme_file: PathBuf::from("/opt/share/as-tools/AS-Dark.terminal"),
            opener: "open".to_string(),
        };
        let rendered = meta.render();
        assert!(rendered.contains("THEME='/opt/share/as-tools/AS-Dark.terminal'\n"));
        assert!(rendered.contains("  'open' \"$THEME\"\n"));
        assert!(rendered.contains("AS-Dark theme imported."));
        assert!(rendered.contains("exit 1\n"));
    }

    #[cfg(unix)]
    mod execution {
        //! Runs generated wrappers with bash against a stub runtime that prints
        //! its working directory and arguments, one per line.

        use super::*;
        use crate::libs::utilities::file_operations::make_executable;
        use std::process::Command;

        const STUB: &str = "#!/bin/sh\npwd\nfor a in \"$@\"; do echo \"$a\"; done\nexit ${STUB_EXIT:-0}\n";

        struct Fixture {
            _root: TempDir,
            tool_dir: PathBuf,
            runtime: PathBuf,
            bin: PathBuf,
        }

        fn fixture() -> Fixture {
            let root = TempDir::new().unwrap();
            let tool_dir = fs::canonicalize(root.path()).unwrap().join("tool");
            fs::create_dir_all(&tool_dir).unwrap();
            let runtime = tool_dir.join("stub-runtime");
            fs::write(&runtime, STUB).unwrap();
            make_executable(&runtime).unwrap();
            let bin = fs::canonicalize(root.path()).unwrap().join("bin");
            Fixture {
                _root: root,
                tool_dir,
                runtime,
                bin,
            }
        }

        fn lines(output: &std::process::Output) -> Vec<String> {
            String::from_utf8_lossy(&output.stdout)
                .lines()
                .map(str::to_string)
                .collect()
        }

        fn simple_script(fx: &Fixture) -> WrapperScript {
            WrapperScript {
                command_name: "alpha".to_string(),
                suite_display_name: "Test Suite".to_string(),
                target_working_directory: fx.tool_dir.clone(),
                invocation: Invocation {
                    runtime_binary: fx.runtime.to_string_lossy().into_owned(),
                    entry_tokens: vec!["main.py".into()],
                    template_tokens: vec!["--port".into(), "8501".into()],
                },
                banner: None,
                fallback: None,
            }
        }

        #[test]
        fn zero_args_reproduce_invocation_exactly() {
            let fx = fixture();
            let wrapper = simple_script(&fx);
            let path = fx.bin.join("alpha");
            publish_wrapper(&path, "alpha", &wrapper.render()).unwrap();

            let output = Command::new(&path).output().unwrap();
            assert!(output.status.success());
            assert_eq!(
                lines(&output),
                vec![fx.tool_dir.to_string_lossy().into_owned(), "main.py".into(), "--port".into(), "8501".into()]
            );
        }

        #[test]
        fn caller_args_are_appended_verbatim() {
            let fx = fixture();
            let path = fx.bin.join("alpha");
            publish_wrapper(&path, "alpha", &simple_script(&fx).render()).unwrap();

            let output = Command::new(&path).args(["x", "y z", "$HOME"]).output().unwrap();
            assert_eq!(
                lines(&output)[1..],
                ["main.py", "--port", "8501", "x", "y z", "$HOME"]
            );
        }

        #[test]
        fn exit_code_is_propagated() {
            let fx = fixture();
            let path = fx.bin.join("alpha");
            publish_wrapper(&path, "alpha", &simple_script(&fx).render()).unwrap();

            let output = Command::new(&path).env("STUB_EXIT", "7").output().unwrap();
            assert_eq!(output.status.code(), Some(7));
        }

        #[test]
        fn banner_is_printed_literally() {
            let fx = fixture();
            let mut wrapper = simple_script(&fx);
            wrapper.banner = Some("-n Starting C:\\tools\\new ... it's up".to_string());
            let path = fx.bin.join("alpha");
            publish_wrapper(&path, "alpha", &wrapper.render()).unwrap();

            let output = Command::new(&path).output().unwrap();
            assert!(output.status.success());
            let printed = lines(&output);
            assert_eq!(printed[0], "-n Starting C:\\tools\\new ... it's up");
            assert_eq!(printed[1], fx.tool_dir.to_string_lossy());
        }

        #[test]
        fn missing_directory_exits_127_without_running() {
            let fx = fixture();
            let mut wrapper = simple_script(&fx);
            wrapper.target_working_directory = fx.tool_dir.join("gone");
            let path = fx.bin.join("alpha");
            publish_wrapper(&path, "alpha", &wrapper.render()).unwrap();

            let output = Command::new(&path).output().unwrap();
            assert_eq!(output.status.code(), Some(MISSING_TARGET_STATUS));
            assert!(output.stdout.is_empty());
            assert!(String::from_utf8_lossy(&output.stderr).contains("alpha: tool directory not found"));
        }

        #[test]
        fn missing_runtime_exits_127() {
            let fx = fixture();
            fs::remove_file(&fx.runtime).unwrap();
            let path = fx.bin.join("alpha");
            publish_wrapper(&path, "alpha", &simple_script(&fx).render()).unwrap();

            let output = Command::new(&path).output().unwrap();
            assert_eq!(output.status.code(), Some(MISSING_TARGET_STATUS));
            assert!(String::from_utf8_lossy(&output.stderr).contains("runtime not found"));
        }

        #[test]
        fn fallback_is_checked_at_execution_time() {
            let fx = fixture();
            let fallback_path = fx.tool_dir.parent().unwrap().join("launch.sh");
            let mut wrapper = simple_script(&fx);
            wrapper.fallback = Some(FallbackLaunch {
                script: fallback_path.clone(),
                interpreter: "sh".to_string(),
            });
            let path = fx.bin.join("beta");
            publish_wrapper(&path, "beta", &wrapper.render()).unwrap();

            // No fallback yet: primary invocation runs.
            let output = Command::new(&path).arg("a1").output().unwrap();
            assert_eq!(lines(&output)[1..], ["main.py", "--port", "8501", "a1"]);

            // Adding the script later switches the same wrapper over without reinstalling.
            fs::write(&fallback_path, "echo fallback \"$@\"\n").unwrap();
            let output = Command::new(&path).arg("a1").output().unwrap();
            assert_eq!(lines(&output), vec!["fallback a1".to_string()]);

            fs::remove_file(&fallback_path).unwrap();
            let output = Command::new(&path).output().unwrap();
            assert_eq!(lines(&output)[1], "main.py");
        }

        #[test]
        fn help_command_calls_help_function_with_args() {
            let fx = fixture();
            let share = fx.tool_dir.parent().unwrap().join("share");
            fs::create_dir_all(&share).unwrap();
            let shell_script = share.join("suite.sh");
            fs::write(&shell_script, "__suite_help() { echo \"Test Suite help $*\"; }\n").unwrap();

            let meta = MetaCommand::Help {
                command_name: "suite".to_string(),
                suite_display_name: "Test Suite".to_string(),
                shell_script,
                help_function: "__suite_help".to_string(),
            };
            let path = fx.bin.join("suite");
            publish_wrapper(&path, "suite", &meta.render()).unwrap();

            let output = Command::new(&path).arg("filter").output().unwrap();
            assert!(output.status.success());
            assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "Test Suite help filter");
        }

        #[test]
        fn theme_command_fails_when_theme_is_absent() {
            let fx = fixture();
            let meta = MetaCommand::ThemeImport {
                command_name: "suite-theme".to_string(),
                suite_display_name: "Test Suite".to_string(),
                theme_file: fx.tool_dir.join("missing.terminal"),
                opener: "true".to_string(),
            };
            let path = fx.bin.join("suite-theme");
            publish_wrapper(&path, "suite-theme", &meta.render()).unwrap();

            let output = Command::new(&path).output().unwrap();
            assert_eq!(output.status.code(), Some(1));
            assert!(String::from_utf8_lossy(&output.stderr).contains("Theme file not found"));
        }
    }
}
