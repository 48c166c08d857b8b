//! Conversion from CLI errors to miette reports for `main`.

use miette::Report;

use crate::error::CliError;

/// Builder errors keep their own diagnostic (code and help); everything else
/// is rendered from its message.
pub fn cli_error_to_miette(err: CliError) -> Report {
    match err {
        CliError::Build(e) => Report::new(e),
        CliError::Config(e) => miette::miette!("Configuration error: {}", e),
        CliError::FileNotFound(path) => miette::miette!(
            help = "paths are resolved against the current directory",
            "File not found: {}",
            path.display()
        ),
        other => miette::miette!("{}", other),
    }
}
