//! # stax-cli
//!
//! Command-line front end for the recursive module builder. A stax project
//! has two build domains that share one source root:
//!
//! - the **server**, compiled into `<out>/app/` and launched as a child
//!   process in watch mode
//! - the **web app**, compiled into `<out>/public/` with its externals and
//!   stylesheets bundled and an `index.html` generated next to it
//!
//! ## Architecture
//!
//! - [`cli`] - argument parsing with clap derive
//! - [`config`] - `stax.config.json` + `STAX_*` env vars + flags, via figment
//! - [`project`] - the two build domains and the web-app post-build
//! - [`watch`] - file watcher, per-domain rebuild serialization, server process
//! - [`commands`] - `build`, `watch`, `graph`, `schema`
//! - [`error`], [`logger`], [`ui`] - the ambient pieces

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logger;
pub mod project;
pub mod ui;
pub mod watch;

pub use error::{CliError, ConfigError, Result, ResultExt};
