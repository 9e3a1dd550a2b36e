use dockyard_core::{CONFIG_FILE, DockyardConfig, ImagePlan};
use dockyard_engine::{CheckResult, DockerClient};
use std::path::Path;

pub async fn doctor() -> anyhow::Result<()> {
    let project_dir = Path::new(".");
    let config = DockyardConfig::load(project_dir);
    let defaults = DockyardConfig::default();
    let effective = config
        .as_ref()
        // arch-lint: allow(no-silent-result-drop) reason="doctor must report diagnostics even when dockyard.toml is invalid; the error is shown in the config row"
        .ok()
        .unwrap_or(&defaults);

    let client = DockerClient::new();
    let mut report = client.doctor(&effective.image.reference()).await;

    // Config file check
    report.config_file = match &config {
        Ok(c) => match ImagePlan::from_config(c) {
            Ok(_) if project_dir.join(CONFIG_FILE).exists() => CheckResult::ok("Found"),
            Ok(_) => CheckResult::ok("Not found, using defaults"),
            Err(e) => CheckResult::fail(&e.to_string()),
        },
        Err(e) => CheckResult::fail(&e.to_string()),
    };

    // Manifest check
    let manifest = effective.dependencies.manifest.as_str();
    report.manifest = if project_dir.join(manifest).is_file() {
        CheckResult::ok(manifest)
    } else {
        CheckResult::fail(&format!("{manifest} not found"))
    };

    println!();
    println!("{report}");

    if !report.all_passed() {
        anyhow::bail!("some checks failed; see above for details");
    }

    Ok(())
}
