use dockyard_core::DockyardConfig;
use dockyard_engine::DockerClient;
use std::path::PathBuf;

/// Default number of lines when not following.
const DEFAULT_TAIL: u32 = 100;

pub async fn logs(follow: bool, tail: Option<u32>) -> anyhow::Result<()> {
    let config = DockyardConfig::load(&PathBuf::from("."))?;
    let container = super::container_name(&config);

    let tail = match (follow, tail) {
        (_, Some(n)) => Some(n),
        (true, None) => None,
        (false, None) => Some(DEFAULT_TAIL),
    };

    let client = DockerClient::new();
    client.logs(container, follow, tail).await?;

    Ok(())
}
