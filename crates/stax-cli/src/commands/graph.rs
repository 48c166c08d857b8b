//! `stax graph`: print one domain's flat tree as JSON on stdout.

use crate::cli::{DomainArg, GraphArgs};
use crate::commands::load_project_config;
use crate::config::ConfigOverrides;
use crate::error::{CliError, Result};
use crate::project::{Domain, Project};

pub async fn execute(args: GraphArgs) -> Result<()> {
    let (cwd, config) = load_project_config(&args.project, ConfigOverrides::from(&args.project))?;
    let domain = match args.domain {
        DomainArg::Server => Domain::Server,
        DomainArg::Webapp => Domain::WebApp,
    };
    let project = Project::new(config, &cwd);

    let walk = project.scan(domain).await?;
    let json = walk
        .graph
        .to_json()
        .map_err(|e| CliError::Custom(format!("cannot serialize the {} graph: {}", domain, e)))?;
    println!("{}", json);
    tracing::debug!(%domain, nodes = walk.graph.len(), "graph printed");
    Ok(())
}
