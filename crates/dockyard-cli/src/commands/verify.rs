use dockyard_core::ImagePlan;
use dockyard_engine::{DockerClient, check_environment};
use std::path::PathBuf;

use super::run::{Launched, launch};

/// Build, launch, and check the image end to end.
///
/// Exits non-zero when any step fails. The container is removed afterwards
/// unless `keep` is set and every check passed.
pub async fn verify(keep: bool) -> anyhow::Result<()> {
    let project_dir = PathBuf::from(".");
    let client = DockerClient::new();

    let outcome = super::build_pipeline::run(&project_dir, &client, true).await?;
    if let Some(output) = &outcome.build_output {
        tracing::debug!(%output, "build output");
    }
    for step in &outcome.steps {
        println!("  [OK] {step}");
    }

    let container = format!("{}-verify", super::container_name(&outcome.config));
    // A previous interrupted run may have left the container behind.
    if let Err(e) = client.remove_container(&container).await {
        tracing::debug!(%container, error = %e, "no leftover verify container");
    }

    let result = match launch(&client, &outcome.config, &outcome.plan, &container, None).await {
        Ok(launched) => check_running(&client, &outcome.plan, &launched).await,
        Err(e) => Err(e),
    };

    if keep && result.is_ok() {
        println!();
        println!("Container {container} left running; remove it with: docker rm -f {container}");
    } else if let Err(e) = client.remove_container(&container).await {
        tracing::warn!(%container, error = %e, "failed to remove verify container");
    }

    result?;
    println!();
    println!("Verified: {}", outcome.image);
    Ok(())
}

async fn check_running(
    client: &DockerClient,
    plan: &ImagePlan,
    launched: &Launched,
) -> anyhow::Result<()> {
    println!(
        "  [OK] Port {} served on {} after {:.1}s",
        plan.exposed_port(),
        launched.addr,
        launched.startup.as_secs_f64()
    );

    // The server must outlive its first connection.
    let state = client.container_state(&launched.container).await?;
    if !state.running {
        anyhow::bail!("container {} is {state}", launched.container);
    }
    println!("  [OK] Container {state}");

    let env = client.container_env(&launched.container).await?;
    let mismatches = check_environment(plan.env(), &env);
    if !mismatches.is_empty() {
        let detail: Vec<String> = mismatches.iter().map(ToString::to_string).collect();
        anyhow::bail!("environment check failed: {}", detail.join("; "));
    }
    println!("  [OK] Environment holds {} planned variable(s)", plan.env().len());

    Ok(())
}
