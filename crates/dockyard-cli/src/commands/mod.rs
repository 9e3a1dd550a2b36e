mod build;
mod build_pipeline;
mod destroy;
mod doctor;
mod eject;
mod init;
mod logs;
mod plan;
mod render;
mod run;
mod status;
mod verify;

use dockyard_build::DockerfileGenerator;
use dockyard_build::eject as eject_mod;
use dockyard_core::{DockyardConfig, ImagePlan};
use std::path::Path;

pub use build::build;
pub use destroy::destroy;
pub use doctor::doctor;
pub use eject::eject;
pub use init::init_project;
pub use logs::logs;
pub use plan::plan;
pub use render::render;
pub use run::run;
pub use status::status;
pub use verify::verify;

/// Load dockyard.toml and validate it into an image plan.
pub(crate) fn load_plan(project_dir: &Path) -> anyhow::Result<(DockyardConfig, ImagePlan)> {
    let config = DockyardConfig::load(project_dir)?;
    let plan = ImagePlan::from_config(&config)?;
    Ok((config, plan))
}

/// Container name for the project: the image name without its tag.
pub(crate) fn container_name(config: &DockyardConfig) -> &str {
    &config.image.name
}

/// Ejected Dockerfile when present, otherwise the generated one.
pub(crate) fn dockerfile_for(project_dir: &Path, plan: &ImagePlan) -> anyhow::Result<String> {
    if eject_mod::is_ejected(project_dir) {
        tracing::info!("using ejected Dockerfile from .dockyard/Dockerfile");
        Ok(eject_mod::load_ejected_dockerfile(project_dir)?)
    } else {
        Ok(DockerfileGenerator::new(plan).render())
    }
}
