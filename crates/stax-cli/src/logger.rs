//! Logging setup for the stax CLI.
//!
//! The library crates only emit `tracing` events; this module installs the
//! subscriber that prints them.
//!
//! - `--verbose` turns on debug output for every stax crate
//! - `--quiet` keeps errors only
//! - otherwise `RUST_LOG` is honored, falling back to `info`
//!
//! ```rust,no_run
//! use stax_cli::logger::init_logger;
//!
//! init_logger(false, false, false);
//! tracing::info!("watching for changes");
//! ```

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const VERBOSE_FILTER: &str = "stax=debug,stax_builder=debug,stax_graph=debug,stax_cli=debug";
const QUIET_FILTER: &str = "stax=error";
const DEFAULT_FILTER: &str = "stax=info,stax_builder=info,stax_graph=info,stax_cli=info";

/// Pick the filter for the given flags.
pub fn filter_for(verbose: bool, quiet: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else if quiet {
        EnvFilter::new(QUIET_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}

/// Install the global subscriber. Call once, before any command runs.
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    init_logger_with_filter(filter_for(verbose, quiet), no_color || !should_use_colors());
}

pub fn init_logger_with_filter(filter: EnvFilter, no_color: bool) {
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color)
        .with_writer(std::io::stderr)
        .compact();

    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

/// NO_COLOR wins over FORCE_COLOR, which wins over terminal detection.
pub fn should_use_colors() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if std::env::var_os("FORCE_COLOR").is_some() {
        return true;
    }
    console::Term::stderr().features().colors_supported()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_filters_parse() {
        let _verbose = EnvFilter::new(VERBOSE_FILTER);
        let _quiet = EnvFilter::new(QUIET_FILTER);
        let _default = EnvFilter::new(DEFAULT_FILTER);
    }

    #[test]
    fn test_verbose_filter_enables_debug() {
        let filter = filter_for(true, false);
        assert!(filter.to_string().contains("stax_builder=debug"));
    }

    #[test]
    fn test_quiet_filter_is_errors_only() {
        let filter = filter_for(false, true);
        assert_eq!(filter.to_string(), QUIET_FILTER);
    }

    #[test]
    #[serial]
    fn test_no_color_wins_over_force_color() {
        // SAFETY: serialized with every other env-mutating test.
        unsafe {
            std::env::set_var("NO_COLOR", "1");
            std::env::set_var("FORCE_COLOR", "1");
        }
        assert!(!should_use_colors());
        unsafe {
            std::env::remove_var("NO_COLOR");
        }
        assert!(should_use_colors());
        unsafe {
            std::env::remove_var("FORCE_COLOR");
        }
    }
}
