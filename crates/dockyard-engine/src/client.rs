use std::collections::BTreeMap;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;

use serde::Deserialize;

use crate::docker::DockerError;
use crate::executor::{DockerExecutor, RealExecutor};

/// Docker engine client, parameterized over the executor for testability.
pub struct DockerClient<E: DockerExecutor = RealExecutor> {
    executor: E,
}

impl DockerClient<RealExecutor> {
    pub fn new() -> Self {
        Self {
            executor: RealExecutor,
        }
    }
}

impl Default for DockerClient<RealExecutor> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: DockerExecutor> DockerClient<E> {
    pub fn with_executor(executor: E) -> Self {
        Self { executor }
    }

    // ── Preflight ──

    pub async fn check_prerequisites(&self) -> Result<PreflightReport, PreflightError> {
        let mut report = PreflightReport::default();

        // 1. docker CLI available
        match self
            .executor
            .exec(&args(["version", "--format", "{{.Client.Version}}"]))
            .await
        {
            Ok(version) => report.client_version = version.trim().to_owned(),
            Err(_) => return Err(PreflightError::DockerNotInstalled),
        }

        // 2. Daemon reachable
        match self
            .executor
            .exec(&args(["version", "--format", "{{.Server.Version}}"]))
            .await
        {
            Ok(version) => report.server_version = version.trim().to_owned(),
            Err(_) => return Err(PreflightError::DaemonUnavailable),
        }

        Ok(report)
    }

    // ── Doctor ──

    /// Run all engine checks without early return.
    ///
    /// `config_file` and `manifest` are left for the caller to fill in.
    pub async fn doctor(&self, image: &str) -> DoctorReport {
        let mut report = DoctorReport::default();

        match self
            .executor
            .exec(&args(["version", "--format", "{{.Client.Version}}"]))
            .await
        {
            Ok(v) => report.docker_cli = CheckResult::ok(v.trim()),
            Err(e) => report.docker_cli = CheckResult::fail(&e.to_string()),
        }

        match self
            .executor
            .exec(&args(["version", "--format", "{{.Server.Version}}"]))
            .await
        {
            Ok(v) if !v.trim().is_empty() => report.daemon = CheckResult::ok(v.trim()),
            _ => {
                report.daemon = CheckResult::fail("daemon not reachable");
                report.image = CheckResult::fail("daemon not reachable");
                return report;
            }
        }

        match self
            .executor
            .exec(&args(["image", "inspect", "--format", "{{.Id}}", image]))
            .await
        {
            Ok(id) => report.image = CheckResult::ok(&format!("{image} ({})", short_id(&id))),
            Err(_) => report.image = CheckResult::fail(&format!("{image} not built yet")),
        }

        report
    }

    // ── Images ──

    /// Build the image from a prepared context directory.
    ///
    /// `capture`: when `true`, build output is returned instead of streamed.
    pub async fn build_image(
        &self,
        context_dir: &Path,
        image: &str,
        capture: bool,
    ) -> Result<Option<String>, BuildError> {
        let context = context_dir
            .to_str()
            .ok_or_else(|| BuildError::InvalidPath(context_dir.to_path_buf()))?;

        let cmd = args(["build", "--tag", image, context]);
        if capture {
            self.executor
                .exec(&cmd)
                .await
                .map(Some)
                .map_err(|e| BuildError::Build { source: e })
        } else {
            self.executor
                .exec_streaming(&cmd)
                .await
                .map(|()| None)
                .map_err(|e| BuildError::Build { source: e })
        }
    }

    pub async fn inspect_image(&self, image: &str) -> Result<ImageMetadata, ImageError> {
        let output = self
            .executor
            .exec(&args(["image", "inspect", "--format", "{{json .Config}}", image]))
            .await
            .map_err(|e| ImageError::Inspect { source: e })?;

        serde_json::from_str(output.trim()).map_err(|e| ImageError::Parse { source: e })
    }

    pub async fn remove_image(&self, image: &str) -> Result<(), ImageError> {
        self.executor
            .exec(&args(["image", "rm", image]))
            .await
            .map_err(|e| ImageError::Remove { source: e })?;

        Ok(())
    }

    // ── Containers ──

    /// Start a detached container and return its id.
    ///
    /// The container port is published on `host`; `host_port: None` lets
    /// the engine pick a free port.
    pub async fn run_container(
        &self,
        image: &str,
        name: &str,
        container_port: u16,
        host: &str,
        host_port: Option<u16>,
    ) -> Result<String, ContainerError> {
        let publish = match host_port {
            Some(p) => format!("{host}:{p}:{container_port}"),
            None => format!("{host}::{container_port}"),
        };

        let output = self
            .executor
            .exec(&args([
                "run", "--detach", "--name", name, "--publish", &publish, image,
            ]))
            .await
            .map_err(|e| ContainerError::Run { source: e })?;

        Ok(output.trim().to_owned())
    }

    /// Host address the container port is published on.
    pub async fn published_address(
        &self,
        container: &str,
        container_port: u16,
    ) -> Result<SocketAddr, ContainerError> {
        let port = format!("{container_port}/tcp");
        let output = self
            .executor
            .exec(&args(["port", container, &port]))
            .await
            .map_err(|e| ContainerError::Port { source: e })?;

        parse_port_output(&output).ok_or_else(|| ContainerError::NotPublished {
            container: container.to_owned(),
            port: container_port,
        })
    }

    pub async fn container_state(&self, container: &str) -> Result<ContainerState, ContainerError> {
        let output = self
            .executor
            .exec(&args([
                "container",
                "inspect",
                "--format",
                "{{json .State}}",
                container,
            ]))
            .await
            .map_err(|e| ContainerError::Inspect { source: e })?;

        serde_json::from_str(output.trim()).map_err(|e| ContainerError::Parse { source: e })
    }

    /// Environment of the container's main process, as `NAME=value` entries.
    pub async fn container_env(&self, container: &str) -> Result<Vec<String>, ContainerError> {
        let output = self
            .executor
            .exec(&args([
                "container",
                "inspect",
                "--format",
                "{{json .Config.Env}}",
                container,
            ]))
            .await
            .map_err(|e| ContainerError::Inspect { source: e })?;

        let env: Option<Vec<String>> =
            serde_json::from_str(output.trim()).map_err(|e| ContainerError::Parse { source: e })?;
        Ok(env.unwrap_or_default())
    }

    pub async fn logs(
        &self,
        container: &str,
        follow: bool,
        tail: Option<u32>,
    ) -> Result<(), ContainerError> {
        let mut cmd = vec!["logs".to_owned()];
        if follow {
            cmd.push("--follow".to_owned());
        }
        if let Some(n) = tail {
            cmd.push("--tail".to_owned());
            cmd.push(n.to_string());
        }
        cmd.push(container.to_owned());

        self.executor
            .exec_streaming(&cmd)
            .await
            .map_err(|e| ContainerError::Logs { source: e })
    }

    /// Force-remove a container, stopping it first if running.
    pub async fn remove_container(&self, container: &str) -> Result<(), ContainerError> {
        self.executor
            .exec(&args(["rm", "--force", container]))
            .await
            .map_err(|e| ContainerError::Remove { source: e })?;

        Ok(())
    }
}

// ── Helper ──

fn args<const N: usize>(a: [&str; N]) -> Vec<String> {
    a.iter().map(|s| (*s).to_owned()).collect()
}

fn short_id(id: &str) -> &str {
    let id = id.trim();
    let id = id.strip_prefix("sha256:").unwrap_or(id);
    id.get(..12).unwrap_or(id)
}

/// Parse `docker port` output, preferring IPv4 and mapping wildcard hosts
/// to loopback so the address is connectable.
pub fn parse_port_output(output: &str) -> Option<SocketAddr> {
    let mut addrs: Vec<SocketAddr> = output
        .lines()
        // arch-lint: allow(no-silent-result-drop) reason="docker port prints one mapping per line; unparsable lines are not mappings"
        .filter_map(|line| line.trim().parse().ok())
        .collect();
    addrs.sort_by_key(|a: &SocketAddr| a.is_ipv6());

    addrs.into_iter().next().map(|mut addr| {
        if addr.ip().is_unspecified() {
            let loopback = match addr.ip() {
                IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::LOCALHOST),
                IpAddr::V6(_) => IpAddr::V6(std::net::Ipv6Addr::LOCALHOST),
            };
            addr.set_ip(loopback);
        }
        addr
    })
}

// ── Engine data ──

/// `.Config` section of `docker image inspect`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ImageMetadata {
    #[serde(default)]
    pub env: Option<Vec<String>>,
    #[serde(default)]
    pub exposed_ports: Option<BTreeMap<String, serde_json::Value>>,
    #[serde(default)]
    pub cmd: Option<Vec<String>>,
    #[serde(default)]
    pub entrypoint: Option<Vec<String>>,
    #[serde(default)]
    pub working_dir: Option<String>,
}

/// `.State` section of `docker container inspect`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerState {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub running: bool,
    #[serde(default)]
    pub exit_code: i64,
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.running {
            write!(f, "{}", self.status)
        } else {
            write!(f, "{} (exit code {})", self.status, self.exit_code)
        }
    }
}

// ── Report types ──

#[derive(Debug, Default)]
pub struct PreflightReport {
    pub client_version: String,
    pub server_version: String,
}

#[derive(Debug, thiserror::Error)]
pub enum PreflightError {
    #[error("docker CLI not installed; see https://docs.docker.com/get-docker/")]
    DockerNotInstalled,

    #[error("docker daemon is not reachable; start it or check DOCKER_HOST")]
    DaemonUnavailable,
}

#[derive(Debug, Default)]
pub struct DoctorReport {
    pub docker_cli: CheckResult,
    pub daemon: CheckResult,
    pub image: CheckResult,
    pub config_file: CheckResult,
    pub manifest: CheckResult,
}

impl DoctorReport {
    /// A missing image is informational and does not fail the report.
    pub fn all_passed(&self) -> bool {
        self.docker_cli.passed && self.daemon.passed && self.config_file.passed && self.manifest.passed
    }
}

impl fmt::Display for DoctorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows = [
            ("docker CLI", &self.docker_cli),
            ("docker daemon", &self.daemon),
            ("dockyard.toml", &self.config_file),
            ("manifest", &self.manifest),
            ("image", &self.image),
        ];
        for (label, check) in rows {
            writeln!(f, "  [{}] {label:<14} {}", check.icon(), check.detail)?;
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct CheckResult {
    pub passed: bool,
    pub detail: String,
}

impl CheckResult {
    pub fn ok(detail: &str) -> Self {
        Self {
            passed: true,
            detail: detail.to_owned(),
        }
    }

    pub fn fail(detail: &str) -> Self {
        Self {
            passed: false,
            detail: detail.to_owned(),
        }
    }

    pub fn icon(&self) -> &'static str {
        if self.passed { "OK" } else { "NG" }
    }
}

// ── Error types ──

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("build context path is not valid UTF-8: {0}")]
    InvalidPath(std::path::PathBuf),

    #[error("image build failed")]
    Build { source: DockerError },
}

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("failed to inspect image")]
    Inspect { source: DockerError },

    #[error("unexpected image inspect output")]
    Parse { source: serde_json::Error },

    #[error("failed to remove image")]
    Remove { source: DockerError },
}

#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    #[error("failed to start container")]
    Run { source: DockerError },

    #[error("failed to look up published port")]
    Port { source: DockerError },

    #[error("container {container} does not publish port {port}")]
    NotPublished { container: String, port: u16 },

    #[error("failed to inspect container")]
    Inspect { source: DockerError },

    #[error("unexpected container inspect output")]
    Parse { source: serde_json::Error },

    #[error("failed to read container logs")]
    Logs { source: DockerError },

    #[error("failed to remove container")]
    Remove { source: DockerError },
}
