//! Checks that a built image and a running container honor the plan.

use std::fmt;

use dockyard_core::{EnvironmentSet, ImagePlan};

use crate::client::ImageMetadata;

/// A planned environment entry the engine does not report as planned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvMismatch {
    pub name: String,
    pub expected: String,
    /// `None` when the variable is absent.
    pub actual: Option<String>,
}

impl fmt::Display for EnvMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.actual {
            Some(actual) => write!(
                f,
                "{} is {actual:?}, expected {:?}",
                self.name, self.expected
            ),
            None => write!(f, "{} is missing, expected {:?}", self.name, self.expected),
        }
    }
}

/// Compare planned entries against `NAME=value` pairs reported by the engine.
///
/// Extra variables (PATH, base-image defaults) are ignored. When a name
/// appears more than once, the last entry wins, as in a process environment.
pub fn check_environment(expected: &EnvironmentSet, actual: &[String]) -> Vec<EnvMismatch> {
    expected
        .iter()
        .filter_map(|(name, value)| {
            let found = actual
                .iter()
                .rev()
                .filter_map(|entry| entry.split_once('='))
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v);

            match found {
                Some(v) if v == value => None,
                other => Some(EnvMismatch {
                    name: name.to_owned(),
                    expected: value.to_owned(),
                    actual: other.map(str::to_owned),
                }),
            }
        })
        .collect()
}

/// Result of comparing `docker image inspect` output with the plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataReport {
    pub env: Vec<EnvMismatch>,
    pub port_exposed: bool,
    pub command_matches: bool,
    pub workdir_matches: bool,
}

impl MetadataReport {
    pub fn is_ok(&self) -> bool {
        self.env.is_empty() && self.port_exposed && self.command_matches && self.workdir_matches
    }

    /// Human-readable problems, one per line item.
    pub fn problems(&self) -> Vec<String> {
        let mut problems: Vec<String> = self.env.iter().map(ToString::to_string).collect();
        if !self.port_exposed {
            problems.push("declared port is not exposed".to_owned());
        }
        if !self.command_matches {
            problems.push("default command differs from the launch command".to_owned());
        }
        if !self.workdir_matches {
            problems.push("working directory differs".to_owned());
        }
        problems
    }
}

pub fn check_image_metadata(plan: &ImagePlan, metadata: &ImageMetadata) -> MetadataReport {
    let env = check_environment(plan.env(), metadata.env.as_deref().unwrap_or_default());

    let port_key = plan.exposed_port().to_string();
    let port_exposed = metadata
        .exposed_ports
        .as_ref()
        .is_some_and(|ports| ports.contains_key(&port_key));

    let argv = plan.launch().argv();
    let entrypoint_empty = metadata
        .entrypoint
        .as_ref()
        .is_none_or(|e| e.is_empty());
    let command_matches = entrypoint_empty && metadata.cmd.as_deref() == Some(argv.as_slice());

    let workdir_matches = metadata.working_dir.as_deref() == Some(plan.workdir().as_str());

    MetadataReport {
        env,
        port_exposed,
        command_matches,
        workdir_matches,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dockyard_core::DockyardConfig;
    use std::collections::BTreeMap;

    fn plan() -> ImagePlan {
        ImagePlan::from_config(&DockyardConfig::default()).unwrap()
    }

    fn reference_metadata() -> ImageMetadata {
        ImageMetadata {
            env: Some(vec![
                "PATH=/usr/local/bin:/usr/bin:/bin".to_owned(),
                "PYTHONUNBUFFERED=1".to_owned(),
                "PIP_NO_CACHE_DIR=1".to_owned(),
                "STREAMLIT_BROWSER_GATHER_USAGE_STATS=false".to_owned(),
            ]),
            exposed_ports: Some(BTreeMap::from([(
                "8501/tcp".to_owned(),
                serde_json::json!({}),
            )])),
            cmd: Some(plan().launch().argv()),
            entrypoint: None,
            working_dir: Some("/app".to_owned()),
        }
    }

    #[test]
    fn reference_image_passes() {
        let report = check_image_metadata(&plan(), &reference_metadata());
        assert!(report.is_ok(), "problems: {:?}", report.problems());
    }

    #[test]
    fn missing_env_reported() {
        let mut metadata = reference_metadata();
        metadata.env = Some(vec!["PYTHONUNBUFFERED=1".to_owned()]);

        let report = check_image_metadata(&plan(), &metadata);
        assert_eq!(report.env.len(), 2);
        assert!(report.env.iter().all(|m| m.actual.is_none()));
        assert!(!report.is_ok());
    }

    #[test]
    fn wrong_env_value_reported() {
        let plan = plan();
        let actual = vec![
            "PYTHONUNBUFFERED=0".to_owned(),
            "PIP_NO_CACHE_DIR=1".to_owned(),
            "STREAMLIT_BROWSER_GATHER_USAGE_STATS=false".to_owned(),
        ];
        let mismatches = check_environment(plan.env(), &actual);
        assert_eq!(
            mismatches,
            vec![EnvMismatch {
                name: "PYTHONUNBUFFERED".to_owned(),
                expected: "1".to_owned(),
                actual: Some("0".to_owned()),
            }]
        );
        assert_eq!(
            mismatches[0].to_string(),
            "PYTHONUNBUFFERED is \"0\", expected \"1\""
        );
    }

    #[test]
    fn later_env_entry_wins() {
        let plan = plan();
        let actual = vec![
            "PYTHONUNBUFFERED=0".to_owned(),
            "PYTHONUNBUFFERED=1".to_owned(),
            "PIP_NO_CACHE_DIR=1".to_owned(),
            "STREAMLIT_BROWSER_GATHER_USAGE_STATS=false".to_owned(),
        ];
        assert!(check_environment(plan.env(), &actual).is_empty());
    }

    #[test]
    fn value_containing_equals_sign() {
        let mut config = DockyardConfig::default();
        config
            .env
            .insert("DSN".to_owned(), "host=db port=5432".to_owned());
        let plan = ImagePlan::from_config(&config).unwrap();

        let mut actual: Vec<String> = plan.env().iter().map(|(k, v)| format!("{k}={v}")).collect();
        actual.push("UNRELATED=1".to_owned());
        assert!(check_environment(plan.env(), &actual).is_empty());
    }

    #[test]
    fn unexposed_port_reported() {
        let mut metadata = reference_metadata();
        metadata.exposed_ports = None;

        let report = check_image_metadata(&plan(), &metadata);
        assert!(!report.port_exposed);
        assert_eq!(report.problems(), vec!["declared port is not exposed"]);
    }

    #[test]
    fn entrypoint_breaks_command_match() {
        let mut metadata = reference_metadata();
        metadata.entrypoint = Some(vec!["/bin/sh".to_owned(), "-c".to_owned()]);

        let report = check_image_metadata(&plan(), &metadata);
        assert!(!report.command_matches);
    }
}
