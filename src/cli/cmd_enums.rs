use clap::{Args, Parser, Subcommand};

/// Defines the command-line interface (CLI) for 'toolsuite'.
/// `#[derive(Parser)]` generates the argument parsing code via `clap`.
#[derive(Parser, Debug)]
#[command(name = "toolsuite")]
#[command(about = "Install a suite of small tools behind stable command names", long_about = None)]
pub struct Cli {
    /// Enables detailed debug output, including subprocess output.
    #[arg(short, long, global = true)]
    pub(crate) debug: bool,

    /// Defines available subcommands for 'toolsuite'.
    #[command(subcommand)]
    pub(crate) command: Commands,
}

/// Where to install and which catalog to install from. Shared by every
/// subcommand that works on an install prefix.
#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// Tool catalog to use (YAML, or TOML when the file ends in `.toml`).
    /// Defaults to `<prefix>/libexec/toolsuite.yaml`, then the built-in catalog.
    #[arg(long, env = "TOOLSUITE_MANIFEST")]
    pub manifest: Option<String>,

    /// Install prefix; wrappers go to `<prefix>/bin`, tools to `<prefix>/libexec`.
    #[arg(long, env = "TOOLSUITE_PREFIX")]
    pub prefix: Option<String>,
}

/// Enumerates all supported subcommands with their specific arguments and options.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the current version of the tool.
    Version,
    /// Provisions every tool in the catalog and writes its wrapper, then installs the
    /// shared resources and the help and theme commands.
    Install {
        #[command(flatten)]
        target: TargetArgs,
        /// Package tree to copy into `<prefix>/libexec` before installing.
        #[arg(long)]
        source: Option<String>,
        /// Provision tools concurrently.
        #[arg(long)]
        parallel: bool,
        /// Write the install report as JSON to this path.
        #[arg(long)]
        report: Option<String>,
    },
    /// Prints the wrappers an install would write, without running anything.
    Plan {
        #[command(flatten)]
        target: TargetArgs,
        /// Only show the wrapper for this command.
        #[arg(long)]
        only: Option<String>,
    },
    /// Checks that every expected command is installed and executable.
    Verify {
        #[command(flatten)]
        target: TargetArgs,
        /// Also run the help command and check its output names the suite.
        #[arg(long)]
        run_help: bool,
    },
    /// Writes the built-in catalog to a file as a starting point. Never overwrites.
    Generate {
        /// Where to write the catalog (defaults to `./toolsuite.yaml`).
        #[arg(long)]
        output: Option<String>,
    },
}
