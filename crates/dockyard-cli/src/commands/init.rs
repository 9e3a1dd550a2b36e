use dockyard_core::CONFIG_FILE;
use std::path::Path;

const DOCKYARD_TOML: &str = r#"[image]
# name = "dockyard-app"
# tag = "latest"

[base]
# image = "python:3.11-slim"

[env]
# PYTHONUNBUFFERED, PIP_NO_CACHE_DIR and STREAMLIT_BROWSER_GATHER_USAGE_STATS
# are always set. Add your own here:
# APP_MODE = "production"

[system]
# packages = ["graphviz", "build-essential", "curl"]

[dependencies]
# manifest = "requirements.txt"
# upgrade_installer = true

[source]
# workdir = "/app"

[launch]
# program = "streamlit"
# args = ["run", "app.py"]
# port = 8501
# bind_address = "0.0.0.0"

[verify]
# startup_timeout_secs = 60
"#;

/// Write a commented dockyard.toml in the current directory.
pub async fn init_project() -> anyhow::Result<()> {
    let config_path = Path::new(CONFIG_FILE);
    if config_path.exists() {
        eprintln!("{CONFIG_FILE} already exists, skipping");
        return Ok(());
    }

    std::fs::write(config_path, DOCKYARD_TOML)?;
    println!("Created {CONFIG_FILE}");

    println!();
    println!("Next steps:");
    println!();
    println!("  1. Pin your dependencies in requirements.txt");
    println!("  2. Check the build plan:   dockyard plan");
    println!("  3. Build and verify:       dockyard verify");

    Ok(())
}
