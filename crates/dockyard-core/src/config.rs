use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// File name of the project configuration.
pub const CONFIG_FILE: &str = "dockyard.toml";

/// dockyard.toml configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DockyardConfig {
    #[serde(default)]
    pub image: ImageConfig,
    #[serde(default)]
    pub base: BaseConfig,
    /// Extra environment variables, merged with the required set.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub system: SystemConfig,
    #[serde(default)]
    pub dependencies: DependencyConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub launch: LaunchConfig,
    #[serde(default)]
    pub verify: VerifyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Repository name of the built image, also used as the container name
    #[serde(default = "default_image_name")]
    pub name: String,
    #[serde(default = "default_image_tag")]
    pub tag: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseConfig {
    /// Versioned runtime image all stages build on
    #[serde(default = "default_base_image")]
    pub image: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    /// Exhaustive list of apt packages. Recommended packages are never installed.
    #[serde(default = "default_system_packages")]
    pub packages: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyConfig {
    /// Pinned dependency manifest, relative to the project root
    #[serde(default = "default_manifest")]
    pub manifest: String,
    /// Upgrade pip before installing the manifest
    #[serde(default = "default_true")]
    pub upgrade_installer: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Absolute working directory inside the image
    #[serde(default = "default_workdir")]
    pub workdir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchConfig {
    /// Server binary started as the container's main process
    #[serde(default = "default_program")]
    pub program: String,
    /// Arguments placed before the port and address flags
    #[serde(default = "default_args")]
    pub args: Vec<String>,
    /// Port the server listens on; also the exposed port
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port_flag")]
    pub port_flag: String,
    #[serde(default = "default_address_flag")]
    pub address_flag: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyConfig {
    /// Seconds to wait for the launched server to accept connections
    #[serde(default = "default_startup_timeout")]
    pub startup_timeout_secs: u64,
    /// Host interface the container port is published on
    #[serde(default = "default_verify_host")]
    pub host: String,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            name: default_image_name(),
            tag: default_image_tag(),
        }
    }
}

impl Default for BaseConfig {
    fn default() -> Self {
        Self {
            image: default_base_image(),
        }
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            packages: default_system_packages(),
        }
    }
}

impl Default for DependencyConfig {
    fn default() -> Self {
        Self {
            manifest: default_manifest(),
            upgrade_installer: true,
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            workdir: default_workdir(),
        }
    }
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: default_args(),
            port: default_port(),
            bind_address: default_bind_address(),
            port_flag: default_port_flag(),
            address_flag: default_address_flag(),
        }
    }
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            startup_timeout_secs: default_startup_timeout(),
            host: default_verify_host(),
        }
    }
}

impl ImageConfig {
    /// `name:tag` reference passed to the container engine.
    pub fn reference(&self) -> String {
        format!("{}:{}", self.name, self.tag)
    }
}

impl DockyardConfig {
    /// Load from dockyard.toml at the given path, or return defaults if not found.
    pub fn load(project_dir: &std::path::Path) -> crate::Result<Self> {
        let config_path = project_dir.join(CONFIG_FILE);
        if config_path.exists() {
            tracing::debug!(path = %config_path.display(), "loading config");
            let content =
                std::fs::read_to_string(&config_path).map_err(|e| crate::Error::ConfigLoad {
                    path: config_path.clone(),
                    source: e,
                })?;
            toml::from_str(&content).map_err(|e| crate::Error::ConfigParse {
                path: config_path,
                source: e,
            })
        } else {
            Ok(Self::default())
        }
    }
}

fn default_image_name() -> String {
    "dockyard-app".to_owned()
}

fn default_image_tag() -> String {
    "latest".to_owned()
}

fn default_base_image() -> String {
    "python:3.11-slim".to_owned()
}

fn default_system_packages() -> Vec<String> {
    ["graphviz", "build-essential", "curl"]
        .iter()
        .map(|p| (*p).to_owned())
        .collect()
}

fn default_manifest() -> String {
    "requirements.txt".to_owned()
}

fn default_true() -> bool {
    true
}

fn default_workdir() -> String {
    "/app".to_owned()
}

fn default_program() -> String {
    "streamlit".to_owned()
}

fn default_args() -> Vec<String> {
    vec!["run".to_owned(), "app.py".to_owned()]
}

fn default_port() -> u16 {
    8501
}

fn default_bind_address() -> String {
    "0.0.0.0".to_owned()
}

fn default_port_flag() -> String {
    "--server.port".to_owned()
}

fn default_address_flag() -> String {
    "--server.address".to_owned()
}

fn default_startup_timeout() -> u64 {
    60
}

fn default_verify_host() -> String {
    "127.0.0.1".to_owned()
}
