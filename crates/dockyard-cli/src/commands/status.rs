use dockyard_build::fingerprint;
use dockyard_core::DockyardConfig;
use dockyard_engine::DockerClient;
use std::path::PathBuf;

pub async fn status() -> anyhow::Result<()> {
    let project_dir = PathBuf::from(".");
    let config = DockyardConfig::load(&project_dir)?;
    let container = super::container_name(&config);
    let port = config.launch.port;

    let client = DockerClient::new();
    let state = client.container_state(container).await?;

    println!("Container: {container}");
    println!("State:     {state}");
    if state.running {
        match client.published_address(container, port).await {
            Ok(addr) => println!("URL:       http://{addr}"),
            Err(e) => println!("URL:       unavailable ({e})"),
        }
    }

    if let Some(last) = fingerprint::load_state(&project_dir)? {
        println!("Last build: {}", last.image);
    }

    Ok(())
}
