use dockyard_build::DockerfileGenerator;
use std::path::PathBuf;

pub async fn eject() -> anyhow::Result<()> {
    let project_dir = PathBuf::from(".");
    let (_config, plan) = super::load_plan(&project_dir)?;

    let dockerfile = DockerfileGenerator::new(&plan).render();
    let path = dockyard_build::eject::eject(&project_dir, &dockerfile)?;

    println!("Ejected build config to {}", path.display());
    println!("You can now edit it directly. dockyard build will use this file.");
    Ok(())
}
