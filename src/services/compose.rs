//! Application lifecycle through `docker compose`
//!
//! deploy / undeploy / start / stop / remove, plus image refresh

use tracing::{info, warn};

use crate::config::env::constants::COMPOSE_PROJECT_LABEL;
use crate::error::{DeployResult, Outcome};
use crate::infra::command::OutputMode;

use super::context::DeployContext;

const REMOVE_QUESTION: &str =
    "Do you really want to perform application removal action? All data will be irreversibly lost";

/// `docker compose up -d --force-recreate`
pub async fn deploy(ctx: &DeployContext) -> DeployResult<Outcome> {
    ctx.require_artifacts()?;
    info!("Deploying application");
    ctx.docker(&["compose", "up", "-d", "--force-recreate"], OutputMode::Echo)
        .await?;
    Ok(Outcome::done("Application has been successfully deployed"))
}

/// Tear down containers and network of the running project
pub async fn undeploy(ctx: &DeployContext) -> DeployResult<Outcome> {
    ctx.require_artifacts()?;
    compose_down(ctx, &[]).await?;
    Ok(Outcome::done("Application has been successfully undeployed"))
}

pub async fn start(ctx: &DeployContext) -> DeployResult<Outcome> {
    ctx.require_artifacts()?;
    start_services(ctx).await?;
    Ok(Outcome::done("Application has been successfully started"))
}

pub async fn stop(ctx: &DeployContext) -> DeployResult<Outcome> {
    ctx.require_artifacts()?;
    stop_services(ctx).await?;
    Ok(Outcome::done("Application has been successfully stopped"))
}

/// Remove containers, images and volumes after confirmation
pub async fn remove(ctx: &DeployContext) -> DeployResult<Outcome> {
    if !ctx.prompt.ask_yes_no(REMOVE_QUESTION, true) {
        return Ok(Outcome::cancelled(
            "Removal action has been cancelled by the user",
        ));
    }
    ctx.require_compose_file()?;
    compose_down(ctx, &["--rmi", "all", "-v"]).await?;
    Ok(Outcome::done("Application has been successfully removed"))
}

/// `docker compose pull`
pub async fn pull(ctx: &DeployContext) -> DeployResult<()> {
    ctx.show("Refreshing images...");
    ctx.docker(&["compose", "pull"], OutputMode::Echo).await?;
    Ok(())
}

pub(crate) async fn start_services(ctx: &DeployContext) -> DeployResult<()> {
    ctx.docker(&["compose", "start"], OutputMode::Echo).await?;
    Ok(())
}

pub(crate) async fn stop_services(ctx: &DeployContext) -> DeployResult<()> {
    ctx.docker(&["compose", "stop"], OutputMode::Echo).await?;
    Ok(())
}

async fn compose_down(ctx: &DeployContext, extra: &[&str]) -> DeployResult<()> {
    let topology = ctx.read_topology().await?;
    let container = topology.frontend_container_name()?;
    let project = project_name(ctx, container).await?;

    let mut args = vec!["compose"];
    match project.as_deref() {
        Some(project) => args.extend(["-p", project]),
        None => warn!(
            container,
            "Compose project label not found, using the application file in the working directory"
        ),
    }
    args.push("down");
    args.extend_from_slice(extra);

    ctx.docker(&args, OutputMode::Echo).await?;
    Ok(())
}

/// Look up the compose project a container belongs to from its labels
async fn project_name(ctx: &DeployContext, container: &str) -> DeployResult<Option<String>> {
    let output = ctx
        .docker(
            &["inspect", "--format", "{{.Config.Labels}}", container],
            OutputMode::Capture,
        )
        .await?;
    if !output.stderr.trim().is_empty() {
        warn!(container, stderr = %output.stderr.trim(), "docker inspect reported errors");
    }
    Ok(parse_project_name(&output.stdout))
}

/// Extract the project label from `map[key:value key:value]`
pub fn parse_project_name(labels: &str) -> Option<String> {
    let start = labels.find("map[")? + "map[".len();
    let body = &labels[start..];
    let body = body.find(']').map_or(body, |end| &body[..end]);

    body.split(' ')
        .filter_map(|pair| pair.split_once(':'))
        .find(|(key, _)| *key == COMPOSE_PROJECT_LABEL)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}
