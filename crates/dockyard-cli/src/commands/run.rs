use anyhow::Context;
use dockyard_core::{DockyardConfig, ImagePlan};
use dockyard_engine::readiness::DEFAULT_INTERVAL;
use dockyard_engine::{DockerClient, wait_for_port};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// A started container whose server accepts connections.
pub(crate) struct Launched {
    pub container: String,
    pub addr: SocketAddr,
    pub startup: Duration,
}

/// Start `container` from the built image and wait for the launch port.
///
/// The container is left running when the port is never served, so its logs
/// stay readable; the error names it.
pub(crate) async fn launch(
    client: &DockerClient,
    config: &DockyardConfig,
    plan: &ImagePlan,
    container: &str,
    host_port: Option<u16>,
) -> anyhow::Result<Launched> {
    let image = config.image.reference();
    let port = plan.exposed_port().get();

    if !plan.launch().binds_all_interfaces() {
        tracing::warn!(
            bind = %plan.launch().bind_address(),
            "server does not bind all interfaces; published port may be unreachable"
        );
    }

    let id = client
        .run_container(&image, container, port, &config.verify.host, host_port)
        .await?;
    tracing::debug!(%id, %container, "container started");

    let addr = client.published_address(container, port).await?;
    let timeout = Duration::from_secs(config.verify.startup_timeout_secs);

    tracing::info!(%addr, ?timeout, "waiting for server");
    match wait_for_port(addr, timeout, DEFAULT_INTERVAL).await {
        Ok(startup) => Ok(Launched {
            container: container.to_owned(),
            addr,
            startup,
        }),
        Err(e) => {
            let state = match client.container_state(container).await {
                Ok(state) => state.to_string(),
                Err(inspect) => format!("unknown ({inspect})"),
            };
            anyhow::bail!(
                "{e}\ncontainer {container} is {state}; see: dockyard logs"
            );
        }
    }
}

pub async fn run(host_port: Option<u16>) -> anyhow::Result<()> {
    let (config, plan) = super::load_plan(&PathBuf::from("."))?;
    let client = DockerClient::new();

    client.check_prerequisites().await?;

    let container = super::container_name(&config);
    let launched = launch(&client, &config, &plan, container, host_port)
        .await
        .with_context(|| {
            format!("failed to launch {container}; remove a stale container with: dockyard destroy")
        })?;

    println!(
        "Container {} serving on http://{} (ready in {:.1}s)",
        launched.container,
        launched.addr,
        launched.startup.as_secs_f64()
    );
    println!("Stop it with: dockyard destroy");
    Ok(())
}
