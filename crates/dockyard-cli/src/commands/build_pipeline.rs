use dockyard_build::fingerprint::{self, CachePrediction, LayerFingerprints};
use dockyard_build::{bundle, eject as eject_mod};
use dockyard_core::{DockyardConfig, ImagePlan};
use dockyard_engine::{DockerClient, check_image_metadata};
use std::path::Path;

/// Result of a successful build pipeline run.
pub(crate) struct BuildOutcome {
    pub config: DockyardConfig,
    pub plan: ImagePlan,
    pub image: String,
    pub steps: Vec<String>,
    pub prediction: CachePrediction,
    /// Captured build output (only when `capture_build` is `true`).
    pub build_output: Option<String>,
}

/// Run the build pipeline: validate → preflight → Dockerfile → bundle →
/// build → inspect → record. Halts on the first failing step.
///
/// `capture_build`: when `true`, engine output is captured instead of
/// streamed to the terminal.
pub(crate) async fn run(
    project_dir: &Path,
    client: &DockerClient,
    capture_build: bool,
) -> anyhow::Result<BuildOutcome> {
    let mut steps = Vec::new();

    // Validate configuration and inputs before touching the engine
    let (config, plan) = super::load_plan(project_dir)?;
    bundle::check_manifest(project_dir, plan.manifest())?;
    let image = config.image.reference();
    steps.push(format!("Plan validated for {image}"));

    // Pre-flight checks
    let report = client.check_prerequisites().await?;
    tracing::debug!(
        client = %report.client_version,
        server = %report.server_version,
        "docker available"
    );
    steps.push(format!("Docker {} reachable", report.server_version));

    // Determine Dockerfile content
    let ejected = eject_mod::is_ejected(project_dir);
    let dockerfile = super::dockerfile_for(project_dir, &plan)?;
    if ejected {
        steps.push("Using ejected Dockerfile".to_owned());
    }

    // Predict layer reuse against the last recorded build
    let fingerprints = LayerFingerprints::compute(&plan, &image, project_dir)?;
    let previous = fingerprint::load_state(project_dir)?;
    let prediction = fingerprints.predict(previous.as_ref());
    tracing::info!(
        dependencies = %prediction.dependencies,
        source = %prediction.source,
        "expected layer reuse"
    );

    // Bundle source
    let bundle_dir = bundle::create_bundle(project_dir, plan.manifest(), &dockerfile)?;
    steps.push("Build context bundled".to_owned());

    // Build image
    tracing::info!(%image, "building image");
    let build_output = client
        .build_image(&bundle_dir, &image, capture_build)
        .await?;
    steps.push(format!("Image {image} built"));

    // Inspect the result
    let metadata = client.inspect_image(&image).await?;
    let report = check_image_metadata(&plan, &metadata);
    if report.is_ok() {
        steps.push("Image metadata matches the plan".to_owned());
    } else {
        let problems = report.problems().join("; ");
        if !ejected {
            anyhow::bail!("built image does not match the plan: {problems}");
        }
        tracing::warn!(%problems, "ejected Dockerfile diverges from dockyard.toml");
        steps.push("Image metadata differs from dockyard.toml (ejected)".to_owned());
    }

    // Record fingerprints only after a successful build
    fingerprint::save_state(project_dir, &fingerprints)?;

    Ok(BuildOutcome {
        config,
        plan,
        image,
        steps,
        prediction,
        build_output,
    })
}
