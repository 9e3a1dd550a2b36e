use dockyard_engine::DockerClient;
use std::path::PathBuf;

pub async fn build(quiet: bool) -> anyhow::Result<()> {
    let project_dir = PathBuf::from(".");
    let client = DockerClient::new();

    let outcome = super::build_pipeline::run(&project_dir, &client, quiet).await?;

    println!();
    for step in &outcome.steps {
        println!("  - {step}");
    }
    println!();
    println!("Dependency layer: {}", outcome.prediction.dependencies);
    println!("Source layer:     {}", outcome.prediction.source);
    println!();
    println!("Built: {}", outcome.image);

    Ok(())
}
