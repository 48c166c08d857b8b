//! `stax build`: build both domains once.

use crate::cli::BuildArgs;
use crate::commands::load_project_config;
use crate::config::ConfigOverrides;
use crate::error::Result;
use crate::project::{Domain, Project};
use crate::ui;

pub async fn execute(args: BuildArgs) -> Result<()> {
    let (cwd, config) = load_project_config(&args.project, ConfigOverrides::from(&args.project))?;
    let project = Project::new(config, &cwd);
    ui::info(&format!("Building {}", project.src().display()));

    let spinner = ui::Spinner::new("Building server and web app...");
    let result = project.build().await;
    spinner.clear();
    let build = result?;

    if build.webapp.output.is_none() {
        ui::warning(&format!(
            "No web app at {}, wrote a placeholder page",
            project.entrypoint(Domain::WebApp)
        ));
    }
    ui::print_build_summary(&[build.server.summary_row(), build.webapp.summary_row()]);
    ui::success(&format!("Output written to {}", project.out().display()));
    Ok(())
}
