use std::path::PathBuf;

/// Print the Dockerfile the next build would use.
pub async fn render() -> anyhow::Result<()> {
    let project_dir = PathBuf::from(".");
    let (_config, plan) = super::load_plan(&project_dir)?;
    let dockerfile = super::dockerfile_for(&project_dir, &plan)?;

    print!("{dockerfile}");
    if !dockerfile.ends_with('\n') {
        println!();
    }
    Ok(())
}
