use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Available stax subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the server and the web app
    ///
    /// Both domains are built concurrently into `<out>/app` and
    /// `<out>/public`. A failing domain leaves its previous output untouched.
    Build(BuildArgs),

    /// Build, start the server and rebuild on every change
    ///
    /// Server changes restart the server process; web-app changes rebuild
    /// the client only.
    Watch(WatchArgs),

    /// Print the module graph of one domain as JSON
    Graph(GraphArgs),

    /// Print the JSON schema of stax.config.json
    Schema(SchemaArgs),
}

/// Flags shared by every command that loads a project.
#[derive(Args, Debug, Clone, Default)]
pub struct ProjectArgs {
    /// Path to the config file (default: ./stax.config.json when present)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory config-relative paths are resolved against
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Source root of the project
    #[arg(long, value_name = "DIR")]
    pub src: Option<PathBuf>,

    /// Output root
    #[arg(short, long, value_name = "DIR")]
    pub out: Option<PathBuf>,

    /// Server entrypoint, relative to the source root
    #[arg(long, value_name = "MODULE")]
    pub server_entry: Option<String>,

    /// Web-app entrypoint, relative to the source root
    #[arg(long, value_name = "MODULE")]
    pub webapp_entry: Option<String>,

    /// Write modules.json next to each entry output
    #[arg(long)]
    pub manifest: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct BuildArgs {
    #[command(flatten)]
    pub project: ProjectArgs,
}

#[derive(Args, Debug, Clone, Default)]
pub struct WatchArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Program that runs the compiled server entry
    #[arg(long, value_name = "PROGRAM")]
    pub command: Option<String>,

    /// Debounce window for file events, in milliseconds
    #[arg(long, value_name = "MS")]
    pub debounce: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct GraphArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Which domain to walk
    #[arg(long, value_enum, default_value = "webapp")]
    pub domain: DomainArg,
}

#[derive(Args, Debug, Clone, Default)]
pub struct SchemaArgs {
    /// Write the schema to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainArg {
    Server,
    Webapp,
}
