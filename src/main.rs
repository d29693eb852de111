mod cli;
mod commands;
mod installers;
mod libs;
mod logger;
mod schema;
mod schemas;

use clap::Parser;
use cli::cmd_enums::{Cli, Commands};
use colored::Colorize;
use commands::{generate, install, plan, verify, version};

/// Exit code for errors that stop a command before it produces a result
/// (unreadable manifest, bad prefix, staging failure).
const FATAL_EXIT_CODE: i32 = 2;

fn main() {
    let cli = Cli::parse();
    logger::init(cli.debug);

    let result = match cli.command {
        Commands::Version => Ok(version::run()),
        Commands::Install {
            target,
            source,
            parallel,
            report,
        } => install::run(target, source, parallel, report),
        Commands::Plan { target, only } => plan::run(target, only),
        Commands::Verify { target, run_help } => verify::run(target, run_help),
        Commands::Generate { output } => generate::run(output),
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            log_error!("{:#}", e);
            std::process::exit(FATAL_EXIT_CODE);
        }
    }
}
