//! The image plan: an immutable, validated description of every build stage.
//!
//! [`ImagePlan::from_config`] is the only constructor. Once built, the plan is
//! read-only; renderers and verifiers borrow it and walk
//! [`ImagePlan::stages`], which always yields the stages in execution order:
//!
//! ```text
//! Base → Environment → SystemPackages → Dependencies → Source → Expose → Launch
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;
use std::path::{Component, Path};

use crate::config::DockyardConfig;
use crate::{Error, Result};

/// Environment entries every image carries, regardless of configuration.
///
/// - `PYTHONUNBUFFERED`: log lines reach the container log immediately
/// - `PIP_NO_CACHE_DIR`: the dependency installer keeps no download cache
/// - `STREAMLIT_BROWSER_GATHER_USAGE_STATS`: framework telemetry opt-out
pub const REQUIRED_ENV: &[(&str, &str)] = &[
    ("PYTHONUNBUFFERED", "1"),
    ("PIP_NO_CACHE_DIR", "1"),
    ("STREAMLIT_BROWSER_GATHER_USAGE_STATS", "false"),
];

/// Characters allowed in an apt package spec besides ASCII alphanumerics
/// (covers `name=version` pins and `name:arch` qualifiers).
const PACKAGE_PUNCTUATION: &[char] = &['+', '-', '.', ':', '=', '~', '_'];

/// Versioned base runtime image reference, e.g. `python:3.11-slim`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseImage(String);

impl BaseImage {
    pub fn parse(reference: &str) -> Result<Self> {
        let invalid = |reason| Error::InvalidImageReference {
            reference: reference.to_owned(),
            reason,
        };

        if reference.is_empty() {
            return Err(invalid("must not be empty"));
        }
        if reference.chars().any(char::is_whitespace) {
            return Err(invalid("must not contain whitespace"));
        }
        Ok(Self(reference.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Process-wide environment, sorted by name.
///
/// Always contains [`REQUIRED_ENV`]. Entries are visible to every stage
/// after the environment stage and to the launched server process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentSet {
    vars: BTreeMap<String, String>,
}

impl EnvironmentSet {
    /// Merge configured entries with the required set.
    ///
    /// A configured entry may repeat a required one with the same value, but
    /// never change it.
    pub fn with_required(configured: &BTreeMap<String, String>) -> Result<Self> {
        let mut vars: BTreeMap<String, String> = REQUIRED_ENV
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();

        for (name, value) in configured {
            if !is_valid_env_name(name) {
                return Err(Error::InvalidEnvName(name.clone()));
            }
            // A line break would end the ENV instruction early.
            if value.chars().any(char::is_control) {
                return Err(Error::InvalidEnvValue {
                    name: name.clone(),
                    reason: "must not contain control characters such as line breaks",
                });
            }
            if let Some(required) = vars.get(name)
                && required != value
            {
                return Err(Error::RequiredEnvOverride {
                    name: name.clone(),
                    required: required.clone(),
                    configured: value.clone(),
                });
            }
            vars.insert(name.clone(), value.clone());
        }

        Ok(Self { vars })
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

fn is_valid_env_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Exhaustive, ordered list of OS packages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemPackages(Vec<String>);

impl SystemPackages {
    pub fn parse(names: &[String]) -> Result<Self> {
        let mut packages: Vec<String> = Vec::with_capacity(names.len());

        for name in names {
            let invalid = |reason| Error::InvalidPackageName {
                name: name.clone(),
                reason,
            };

            let Some(first) = name.chars().next() else {
                return Err(invalid("must not be empty"));
            };
            if !first.is_ascii_alphanumeric() {
                return Err(invalid("must start with a letter or digit"));
            }
            if let Some(bad) = name
                .chars()
                .find(|c| !c.is_ascii_alphanumeric() && !PACKAGE_PUNCTUATION.contains(c))
            {
                tracing::debug!(package = %name, character = %bad, "rejecting package name");
                return Err(invalid("contains a character apt does not accept"));
            }
            if packages.contains(name) {
                return Err(Error::DuplicatePackage(name.clone()));
            }
            packages.push(name.clone());
        }

        Ok(Self(packages))
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Dependency manifest file, relative to the build context.
///
/// Its contents are never inspected; the installer consumes the file as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestRef(String);

impl ManifestRef {
    pub fn parse(path: &str) -> Result<Self> {
        let invalid = |reason| Error::InvalidManifest {
            path: path.to_owned(),
            reason,
        };

        if path.trim().is_empty() {
            return Err(invalid("must not be empty"));
        }
        let as_path = Path::new(path);
        if as_path.is_absolute() {
            return Err(invalid("must be relative to the project root"));
        }
        if as_path
            .components()
            .any(|c| matches!(c, Component::ParentDir))
        {
            return Err(invalid("must stay inside the project root"));
        }
        if path.ends_with('/') {
            return Err(invalid("must name a file"));
        }
        // Rendered unquoted in COPY and on the installer command line.
        if path.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(invalid("must not contain whitespace or control characters"));
        }
        Ok(Self(path.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name the manifest is copied to inside the working directory.
    pub fn file_name(&self) -> &str {
        Path::new(&self.0)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.0)
    }
}

/// Absolute working directory inside the image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkDir(String);

impl WorkDir {
    pub fn parse(path: &str) -> Result<Self> {
        let invalid = |reason| Error::InvalidWorkDir {
            path: path.to_owned(),
            reason,
        };

        if !path.starts_with('/') {
            return Err(invalid("must be an absolute path"));
        }
        if path.chars().any(char::is_control) {
            return Err(invalid("must not contain control characters such as line breaks"));
        }
        Ok(Self(path.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Port documented as image metadata. Advisory only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExposedPort(u16);

impl ExposedPort {
    pub fn new(port: u16) -> Result<Self> {
        if port == 0 {
            return Err(Error::ZeroPort);
        }
        Ok(Self(port))
    }

    pub fn get(self) -> u16 {
        self.0
    }
}

impl fmt::Display for ExposedPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/tcp", self.0)
    }
}

/// The image's sole runtime entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchCommand {
    program: String,
    args: Vec<String>,
    port: ExposedPort,
    bind_address: IpAddr,
    port_flag: String,
    address_flag: String,
}

impl LaunchCommand {
    /// Full argument vector, program first.
    ///
    /// # Examples
    ///
    /// ```
    /// use dockyard_core::{DockyardConfig, ImagePlan};
    ///
    /// let plan = ImagePlan::from_config(&DockyardConfig::default()).unwrap();
    /// assert_eq!(
    ///     plan.launch().argv(),
    ///     [
    ///         "streamlit",
    ///         "run",
    ///         "app.py",
    ///         "--server.port=8501",
    ///         "--server.address=0.0.0.0",
    ///     ]
    /// );
    /// ```
    pub fn argv(&self) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.args.len() + 3);
        argv.push(self.program.clone());
        argv.extend(self.args.iter().cloned());
        argv.push(format!("{}={}", self.port_flag, self.port.get()));
        argv.push(format!("{}={}", self.address_flag, self.bind_address));
        argv
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn port(&self) -> ExposedPort {
        self.port
    }

    pub fn bind_address(&self) -> IpAddr {
        self.bind_address
    }

    /// True when the server accepts connections on every interface.
    pub fn binds_all_interfaces(&self) -> bool {
        self.bind_address.is_unspecified()
    }
}

/// What a stage changes in the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageEffect {
    /// Adds a filesystem layer.
    Filesystem,
    /// Extends the process environment of later stages and the server.
    Environment,
    /// Records image metadata only.
    Metadata,
}

impl fmt::Display for StageEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Filesystem => "filesystem",
            Self::Environment => "environment",
            Self::Metadata => "metadata",
        };
        f.write_str(label)
    }
}

/// One ordered step of the image build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStage<'a> {
    Base(&'a BaseImage),
    Environment {
        env: &'a EnvironmentSet,
        workdir: &'a WorkDir,
    },
    SystemPackages(&'a SystemPackages),
    Dependencies {
        manifest: &'a ManifestRef,
        upgrade_installer: bool,
    },
    Source {
        workdir: &'a WorkDir,
    },
    Expose(ExposedPort),
    Launch(&'a LaunchCommand),
}

impl BuildStage<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Base(_) => "base-runtime",
            Self::Environment { .. } => "environment",
            Self::SystemPackages(_) => "system-packages",
            Self::Dependencies { .. } => "dependencies",
            Self::Source { .. } => "source",
            Self::Expose(_) => "expose",
            Self::Launch(_) => "launch",
        }
    }

    pub fn effect(&self) -> StageEffect {
        match self {
            Self::Base(_) | Self::SystemPackages(_) | Self::Dependencies { .. } => {
                StageEffect::Filesystem
            }
            Self::Source { .. } => StageEffect::Filesystem,
            Self::Environment { .. } => StageEffect::Environment,
            Self::Expose(_) | Self::Launch(_) => StageEffect::Metadata,
        }
    }

    /// One-line human summary.
    pub fn describe(&self) -> String {
        match self {
            Self::Base(image) => format!("start from {}", image.as_str()),
            Self::Environment { env, workdir } => format!(
                "set {} variable(s), working directory {}",
                env.len(),
                workdir.as_str()
            ),
            Self::SystemPackages(packages) if packages.is_empty() => {
                "no system packages".to_owned()
            }
            Self::SystemPackages(packages) => {
                format!("apt install {}", packages.names().join(" "))
            }
            Self::Dependencies {
                manifest,
                upgrade_installer,
            } => {
                if *upgrade_installer {
                    format!("upgrade pip, install {}", manifest.as_str())
                } else {
                    format!("install {}", manifest.as_str())
                }
            }
            Self::Source { workdir } => format!("copy source tree into {}", workdir.as_str()),
            Self::Expose(port) => format!("expose {port}"),
            Self::Launch(cmd) => format!("run {}", cmd.argv().join(" ")),
        }
    }
}

/// Validated, immutable description of the image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePlan {
    base: BaseImage,
    env: EnvironmentSet,
    packages: SystemPackages,
    manifest: ManifestRef,
    upgrade_installer: bool,
    workdir: WorkDir,
    launch: LaunchCommand,
}

impl ImagePlan {
    /// Validate the configuration and freeze it into a plan.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure; no partially valid plan exists.
    pub fn from_config(config: &DockyardConfig) -> Result<Self> {
        let base = BaseImage::parse(&config.base.image)?;
        let env = EnvironmentSet::with_required(&config.env)?;
        let packages = SystemPackages::parse(&config.system.packages)?;
        let manifest = ManifestRef::parse(&config.dependencies.manifest)?;
        let workdir = WorkDir::parse(&config.source.workdir)?;

        let launch_cfg = &config.launch;
        if launch_cfg.program.trim().is_empty() {
            return Err(Error::EmptyProgram);
        }
        let bind_address: IpAddr =
            launch_cfg
                .bind_address
                .parse()
                .map_err(|e| Error::InvalidBindAddress {
                    address: launch_cfg.bind_address.clone(),
                    source: e,
                })?;
        let launch = LaunchCommand {
            program: launch_cfg.program.clone(),
            args: launch_cfg.args.clone(),
            port: ExposedPort::new(launch_cfg.port)?,
            bind_address,
            port_flag: launch_cfg.port_flag.clone(),
            address_flag: launch_cfg.address_flag.clone(),
        };

        tracing::debug!(
            base = base.as_str(),
            env = env.len(),
            packages = packages.names().len(),
            manifest = manifest.as_str(),
            port = launch.port.get(),
            "image plan built"
        );

        Ok(Self {
            base,
            env,
            packages,
            manifest,
            upgrade_installer: config.dependencies.upgrade_installer,
            workdir,
            launch,
        })
    }

    /// All stages, in execution order.
    pub fn stages(&self) -> [BuildStage<'_>; 7] {
        [
            BuildStage::Base(&self.base),
            BuildStage::Environment {
                env: &self.env,
                workdir: &self.workdir,
            },
            BuildStage::SystemPackages(&self.packages),
            BuildStage::Dependencies {
                manifest: &self.manifest,
                upgrade_installer: self.upgrade_installer,
            },
            BuildStage::Source {
                workdir: &self.workdir,
            },
            BuildStage::Expose(self.launch.port),
            BuildStage::Launch(&self.launch),
        ]
    }

    pub fn base(&self) -> &BaseImage {
        &self.base
    }

    pub fn env(&self) -> &EnvironmentSet {
        &self.env
    }

    pub fn packages(&self) -> &SystemPackages {
        &self.packages
    }

    pub fn manifest(&self) -> &ManifestRef {
        &self.manifest
    }

    pub fn upgrade_installer(&self) -> bool {
        self.upgrade_installer
    }

    pub fn workdir(&self) -> &WorkDir {
        &self.workdir
    }

    /// The exposed port always equals the launch port.
    pub fn exposed_port(&self) -> ExposedPort {
        self.launch.port
    }

    pub fn launch(&self) -> &LaunchCommand {
        &self.launch
    }
}
