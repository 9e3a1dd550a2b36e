use dockyard_core::{BuildStage, DockyardConfig, Error, ImagePlan, StageEffect};

fn default_plan() -> ImagePlan {
    ImagePlan::from_config(&DockyardConfig::default()).unwrap()
}

#[test]
fn default_plan_matches_reference_image() {
    let plan = default_plan();

    assert_eq!(plan.base().as_str(), "python:3.11-slim");
    assert_eq!(
        plan.packages().names(),
        ["graphviz", "build-essential", "curl"]
    );
    assert_eq!(plan.manifest().as_str(), "requirements.txt");
    assert!(plan.upgrade_installer());
    assert_eq!(plan.workdir().as_str(), "/app");
    assert_eq!(plan.exposed_port().get(), 8501);
    assert_eq!(plan.exposed_port().to_string(), "8501/tcp");
}

#[test]
fn dependencies_precede_source() {
    let plan = default_plan();
    let stages = plan.stages();

    let deps = stages
        .iter()
        .position(|s| matches!(s, BuildStage::Dependencies { .. }))
        .unwrap();
    let source = stages
        .iter()
        .position(|s| matches!(s, BuildStage::Source { .. }))
        .unwrap();
    assert!(deps < source);
}

#[test]
fn environment_precedes_every_filesystem_stage_but_base() {
    let plan = default_plan();
    let stages = plan.stages();

    let env_index = stages
        .iter()
        .position(|s| s.effect() == StageEffect::Environment)
        .unwrap();
    assert_eq!(env_index, 1);
    for stage in &stages[2..] {
        assert_ne!(stage.effect(), StageEffect::Environment);
    }
}

#[test]
fn launch_is_last_stage() {
    let plan = default_plan();
    let last = plan.stages()[6];
    assert!(matches!(last, BuildStage::Launch(_)));
    assert!(last.describe().contains("--server.port=8501"));
}

#[test]
fn describe_mentions_packages() {
    let plan = default_plan();
    let text = plan.stages()[2].describe();
    assert_eq!(text, "apt install graphviz build-essential curl");
}

#[test]
fn describe_empty_packages() {
    let mut config = DockyardConfig::default();
    config.system.packages.clear();
    let plan = ImagePlan::from_config(&config).unwrap();
    assert_eq!(plan.stages()[2].describe(), "no system packages");
}

#[test]
fn invalid_base_image_errors() {
    let mut config = DockyardConfig::default();
    config.base.image = "python 3.11".to_owned();

    let err = ImagePlan::from_config(&config).unwrap_err();
    assert!(matches!(err, Error::InvalidImageReference { .. }));
    assert!(err.to_string().contains("whitespace"), "got: {err}");
}

#[test]
fn relative_workdir_errors() {
    let mut config = DockyardConfig::default();
    config.source.workdir = "app".to_owned();

    assert!(matches!(
        ImagePlan::from_config(&config),
        Err(Error::InvalidWorkDir { .. })
    ));
}

#[test]
fn empty_program_errors() {
    let mut config = DockyardConfig::default();
    config.launch.program = "  ".to_owned();

    assert!(matches!(
        ImagePlan::from_config(&config),
        Err(Error::EmptyProgram)
    ));
}

#[test]
fn required_env_override_errors() {
    let mut config = DockyardConfig::default();
    config.env.insert(
        "STREAMLIT_BROWSER_GATHER_USAGE_STATS".to_owned(),
        "true".to_owned(),
    );

    let err = ImagePlan::from_config(&config).unwrap_err().to_string();
    assert!(err.contains("STREAMLIT_BROWSER_GATHER_USAGE_STATS"), "got: {err}");
    assert!(err.contains("\"false\""), "got: {err}");
}

#[test]
fn invalid_env_name_errors() {
    let mut config = DockyardConfig::default();
    config.env.insert("BAD-NAME".to_owned(), "x".to_owned());

    assert!(matches!(
        ImagePlan::from_config(&config),
        Err(Error::InvalidEnvName(ref n)) if n == "BAD-NAME"
    ));
}

#[test]
fn env_value_with_line_break_errors() {
    let mut config = DockyardConfig::default();
    config
        .env
        .insert("MOTD".to_owned(), "hi\nRUN echo pwned".to_owned());

    let err = ImagePlan::from_config(&config).unwrap_err();
    assert!(
        matches!(err, Error::InvalidEnvValue { ref name, .. } if name == "MOTD"),
        "got: {err}"
    );
}

#[test]
fn env_value_with_spaces_and_quotes_is_accepted() {
    let mut config = DockyardConfig::default();
    config
        .env
        .insert("GREETING".to_owned(), r#"say "hi" to $USER"#.to_owned());

    let plan = ImagePlan::from_config(&config).unwrap();
    assert_eq!(plan.env().get("GREETING"), Some(r#"say "hi" to $USER"#));
}

#[test]
fn workdir_with_line_break_errors() {
    let mut config = DockyardConfig::default();
    config.source.workdir = "/app\nUSER root".to_owned();

    let err = ImagePlan::from_config(&config).unwrap_err();
    assert!(matches!(err, Error::InvalidWorkDir { .. }));
    assert!(err.to_string().contains("control characters"), "got: {err}");
}

#[test]
fn manifest_with_whitespace_errors() {
    for manifest in ["my deps.txt", "deps/\trequirements.txt", "requirements.txt\n"] {
        let mut config = DockyardConfig::default();
        config.dependencies.manifest = manifest.to_owned();

        assert!(
            matches!(
                ImagePlan::from_config(&config),
                Err(Error::InvalidManifest { .. })
            ),
            "{manifest:?} should be rejected"
        );
    }
}

#[test]
fn loopback_bind_is_not_wildcard() {
    let mut config = DockyardConfig::default();
    config.launch.bind_address = "127.0.0.1".to_owned();

    let plan = ImagePlan::from_config(&config).unwrap();
    assert!(!plan.launch().binds_all_interfaces());
}
