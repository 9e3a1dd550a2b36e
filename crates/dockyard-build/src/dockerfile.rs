use dockyard_core::{BuildStage, ImagePlan};

/// Renders an [`ImagePlan`] as a Dockerfile, one section per stage.
pub struct DockerfileGenerator<'a> {
    plan: &'a ImagePlan,
}

impl<'a> DockerfileGenerator<'a> {
    pub fn new(plan: &'a ImagePlan) -> Self {
        Self { plan }
    }

    pub fn render(&self) -> String {
        let sections: Vec<String> = self
            .plan
            .stages()
            .iter()
            .map(render_stage)
            .filter(|s| !s.is_empty())
            .collect();

        let mut out = sections.join("\n\n");
        out.push('\n');
        out
    }
}

fn render_stage(stage: &BuildStage<'_>) -> String {
    match *stage {
        BuildStage::Base(image) => format!(
            "# === Base runtime ===\nFROM {image}",
            image = image.as_str()
        ),
        BuildStage::Environment { env, workdir } => {
            let mut lines = vec!["# === Environment ===".to_owned()];
            lines.extend(
                env.iter()
                    .map(|(name, value)| format!("ENV {name}=\"{}\"", escape_env_value(value))),
            );
            lines.push(format!("WORKDIR {}", workdir.as_str()));
            lines.join("\n")
        }
        BuildStage::SystemPackages(packages) if packages.is_empty() => String::new(),
        BuildStage::SystemPackages(packages) => format!(
            "# === System packages ===\n\
             RUN apt-get update \\\n    \
             && apt-get install -y --no-install-recommends {names} \\\n    \
             && rm -rf /var/lib/apt/lists/*",
            names = packages.names().join(" ")
        ),
        BuildStage::Dependencies {
            manifest,
            upgrade_installer,
        } => {
            let target = manifest.file_name();
            let install = if upgrade_installer {
                format!("pip install --upgrade pip && pip install -r {target}")
            } else {
                format!("pip install -r {target}")
            };
            format!(
                "# === Dependencies (cached until {source} changes) ===\n\
                 COPY {source} ./{target}\n\
                 RUN {install}",
                source = manifest.as_str(),
            )
        }
        BuildStage::Source { .. } => "# === Source ===\nCOPY . .".to_owned(),
        BuildStage::Expose(port) => format!("EXPOSE {}", port.get()),
        BuildStage::Launch(cmd) => {
            let argv = serde_json::Value::from(cmd.argv());
            format!("CMD {argv}")
        }
    }
}

/// Escape a value for a double-quoted Dockerfile `ENV` assignment.
fn escape_env_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '"' | '\\' | '$') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_plain_value() {
        assert_eq!(escape_env_value("false"), "false");
    }

    #[test]
    fn escape_quotes_backslashes_and_dollars() {
        assert_eq!(escape_env_value(r#"a"b\c$HOME"#), r#"a\"b\\c\$HOME"#);
    }
}
