//! The golf MDK - level development kit
//!
//! Currently it consists of a command line utility capable of building level files out of TOML
//! specifications, and inspecting existing level files.

use clap::{Parser, Subcommand};
use commands::{build::BuildCommand, check::CheckCommand, info::InfoCommand};
use golf_utils::{ok, AnyResult};

pub mod commands;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enables trace logging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Subcommand)]
pub enum CliCommand {
    /// Builds a level file from specification
    Build(BuildCommand),
    /// Prints the contents of a level file
    Info(InfoCommand),
    /// Checks whether a level file is playable
    Check(CheckCommand),
}

pub trait Command {
    fn run(self) -> AnyResult;
}

/// Runs `golf_mdk` as if it was ran from the command line.
///
/// This function is provided to allow invocation of the MDK tools from library
/// builds.
pub fn run(cli: Cli) -> AnyResult {
    match cli.command {
        CliCommand::Build(c) => c.run()?,
        CliCommand::Info(c) => c.run()?,
        CliCommand::Check(c) => c.run()?,
    }
    ok()
}
