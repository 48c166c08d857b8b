use super::*;
use clap::{CommandFactory, Parser};

#[test]
fn test_cli_definition_is_valid() {
    Cli::command().debug_assert();
}

#[test]
fn test_build_flags() {
    let cli = Cli::parse_from([
        "stax",
        "build",
        "--src",
        "app",
        "--out",
        "build",
        "--server-entry",
        "api/main",
        "--manifest",
    ]);
    let Command::Build(args) = cli.command else {
        panic!("expected build");
    };
    assert_eq!(args.project.src.as_deref(), Some(std::path::Path::new("app")));
    assert_eq!(args.project.server_entry.as_deref(), Some("api/main"));
    assert!(args.project.manifest);
    assert!(args.project.webapp_entry.is_none());
}

#[test]
fn test_global_flags_after_subcommand() {
    let cli = Cli::parse_from(["stax", "watch", "--verbose", "--no-color", "--debounce", "250"]);
    assert!(cli.verbose);
    assert!(cli.no_color);
    let Command::Watch(args) = cli.command else {
        panic!("expected watch");
    };
    assert_eq!(args.debounce, Some(250));
}

#[test]
fn test_verbose_conflicts_with_quiet() {
    assert!(Cli::try_parse_from(["stax", "-v", "-q", "build"]).is_err());
}

#[test]
fn test_graph_domain_defaults_to_webapp() {
    let cli = Cli::parse_from(["stax", "graph"]);
    let Command::Graph(args) = cli.command else {
        panic!("expected graph");
    };
    assert_eq!(args.domain, DomainArg::Webapp);

    let cli = Cli::parse_from(["stax", "graph", "--domain", "server"]);
    let Command::Graph(args) = cli.command else {
        panic!("expected graph");
    };
    assert_eq!(args.domain, DomainArg::Server);
}
