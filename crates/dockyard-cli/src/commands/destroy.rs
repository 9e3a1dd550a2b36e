use dockyard_build::{BUNDLE_DIR, bundle, fingerprint};
use dockyard_core::DockyardConfig;
use dockyard_engine::DockerClient;
use std::io::Write;
use std::path::PathBuf;

/// Remove the container, the image, and local build artifacts.
///
/// An ejected Dockerfile is kept.
pub async fn destroy(skip_confirm: bool) -> anyhow::Result<()> {
    let project_dir = PathBuf::from(".");
    let config = DockyardConfig::load(&project_dir)?;
    let container = super::container_name(&config);
    let image = config.image.reference();

    if !skip_confirm {
        println!("This will delete:");
        println!("  - Container '{container}'");
        println!("  - Image '{image}'");
        println!("  - Local {BUNDLE_DIR}/ and recorded build state");
        println!();
        print!("Are you sure? [y/N] ");
        std::io::stdout().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if !is_confirmation(&input) {
            println!("Aborted.");
            return Ok(());
        }
    }

    let client = DockerClient::new();

    // 1. Container
    println!("Removing container '{container}'...");
    match client.remove_container(container).await {
        Ok(()) => println!("  Removed."),
        Err(e) => println!("  Skipped ({e})"),
    }

    // 2. Image
    println!("Removing image '{image}'...");
    match client.remove_image(&image).await {
        Ok(()) => println!("  Removed."),
        Err(e) => println!("  Skipped ({e})"),
    }

    // 3. Local artifacts
    if bundle::remove_bundle(&project_dir)? {
        println!("Removed local {BUNDLE_DIR}/");
    }
    if fingerprint::clear_state(&project_dir)? {
        println!("Cleared recorded build state");
    }

    println!();
    println!("Destroy complete.");
    Ok(())
}

fn is_confirmation(input: &str) -> bool {
    matches!(input.trim(), "y" | "Y" | "yes" | "YES")
}
