//! Command-line interface definition.
//!
//! - `stax build` - build the server and the web app once
//! - `stax watch` - build, launch the server, rebuild on change
//! - `stax graph` - print a domain's module graph as JSON
//! - `stax schema` - print the JSON schema of `stax.config.json`

mod commands;
#[cfg(test)]
mod tests;

use clap::Parser;

pub use commands::{BuildArgs, Command, DomainArg, GraphArgs, ProjectArgs, SchemaArgs, WatchArgs};

/// Stax - recursive module builder for full-stack TypeScript projects
#[derive(Parser, Debug)]
#[command(
    name = "stax",
    version,
    about = "Recursive module builder for full-stack TypeScript projects",
    long_about = "Stax compiles every module of a server and a web app on its own,\n\
                  rewriting imports into deferred loads, and bundles only the\n\
                  external packages and stylesheets."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}
