// The single seam through which the installer touches external programs.
//
// Environment creation (`python -m venv`), dependency installation (`pip`) and
// build steps (`sh -c "npm run build"`) are all expressed as a `CommandSpec` and
// handed to a `CommandRunner`. Production code uses `SystemRunner`; tests use a
// recording fake that never spawns anything.

use crate::libs::interrupt::InterruptFlag;
use crate::log_debug;
use colored::Colorize;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::Duration;

/// How often a running child is polled for completion or interruption.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A program invocation: what to run, with which arguments, and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        CommandSpec {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// The command line as it would be typed, for logs and error messages.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Exit status and captured output of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was terminated by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// stdout followed by stderr, for error reports.
    pub fn combined(&self) -> String {
        match (self.stdout.trim().is_empty(), self.stderr.trim().is_empty()) {
            (true, true) => String::new(),
            (false, true) => self.stdout.clone(),
            (true, false) => self.stderr.clone(),
            (false, false) => format!("{}\n{}", self.stdout.trim_end(), self.stderr),
        }
    }
}

/// Runs a command to completion and reports its exit status and output.
///
/// `Err` means the command could not be run at all (program missing, not
/// permitted) or was interrupted (`io::ErrorKind::Interrupted`). A command that
/// ran and failed is an `Ok` with a non-zero status.
pub trait CommandRunner: Send + Sync {
    fn run(&self, spec: &CommandSpec) -> io::Result<CommandOutput>;
}

/// Spawns real processes and kills them if the run is interrupted.
pub struct SystemRunner {
    interrupt: InterruptFlag,
}

impl SystemRunner {
    pub fn new(interrupt: InterruptFlag) -> Self {
        SystemRunner { interrupt }
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, spec: &CommandSpec) -> io::Result<CommandOutput> {
        if self.interrupt.is_raised() {
            return Err(interrupted());
        }
        log_debug!("[Runner] Executing: {}", spec.display().cyan());

        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &spec.working_dir {
            command.current_dir(dir);
        }
        // Own process group, so `sh -c "a && b"` can be stopped together with what it started.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let mut child = command.spawn()?;
        // Pipes are drained on their own threads so a chatty child never blocks on a full pipe.
        let stdout_reader = child.stdout.take().map(spawn_reader);
        let stderr_reader = child.stderr.take().map(spawn_reader);

        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if self.interrupt.is_raised() {
                log_debug!("[Runner] Killing '{}' after interrupt", spec.program);
                kill_process_tree(&mut child);
                let _ = child.wait();
                collect(stdout_reader);
                collect(stderr_reader);
                return Err(interrupted());
            }
            thread::sleep(POLL_INTERVAL);
        };

        let output = CommandOutput {
            status: status.code(),
            stdout: collect(stdout_reader),
            stderr: collect(stderr_reader),
        };
        log_debug!(
            "[Runner] '{}' finished with status {:?}",
            spec.program,
            output.status
        );
        Ok(output)
    }
}

/// Kills the child and everything still in its process group. The pipe readers
/// only finish once every holder of the write ends is gone.
fn kill_process_tree(child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{Signal, killpg};
        use nix::unistd::Pid;

        if let Ok(pid) = i32::try_from(child.id()) {
            if let Err(e) = killpg(Pid::from_raw(pid), Signal::SIGKILL) {
                log_debug!("[Runner] Could not signal process group {}: {}", pid, e);
            }
        }
    }
    let _ = child.kill();
}

fn interrupted() -> io::Error {
    io::Error::new(io::ErrorKind::Interrupted, "installation interrupted")
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn collect(reader: Option<thread::JoinHandle<String>>) -> String {
    reader
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}
