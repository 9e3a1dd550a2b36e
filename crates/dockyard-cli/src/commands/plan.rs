use dockyard_core::ImagePlan;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Serialize)]
struct StageSummary {
    step: usize,
    name: &'static str,
    effect: String,
    detail: String,
}

fn summarize(plan: &ImagePlan) -> Vec<StageSummary> {
    plan.stages()
        .iter()
        .enumerate()
        .map(|(i, stage)| StageSummary {
            step: i + 1,
            name: stage.name(),
            effect: stage.effect().to_string(),
            detail: stage.describe(),
        })
        .collect()
}

/// Print the build stages in execution order.
pub async fn plan(json: bool) -> anyhow::Result<()> {
    let (config, plan) = super::load_plan(&PathBuf::from("."))?;
    let stages = summarize(&plan);

    if json {
        println!("{}", serde_json::to_string_pretty(&stages)?);
        return Ok(());
    }

    println!("Image {}", config.image.reference());
    println!();
    for s in &stages {
        println!(
            "  {}. {:<16} [{:<11}] {}",
            s.step, s.name, s.effect, s.detail
        );
    }

    Ok(())
}
