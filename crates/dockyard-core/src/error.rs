use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to load config from {path}")]
    ConfigLoad {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config at {path}")]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    // ── Plan validation ──
    #[error("invalid image reference {reference:?}: {reason}")]
    InvalidImageReference {
        reference: String,
        reason: &'static str,
    },

    #[error("invalid environment variable name {0:?}")]
    InvalidEnvName(String),

    #[error("invalid value for environment variable {name}: {reason}")]
    InvalidEnvValue { name: String, reason: &'static str },

    #[error(
        "environment variable {name} is required to be {required:?} but dockyard.toml sets {configured:?}"
    )]
    RequiredEnvOverride {
        name: String,
        required: String,
        configured: String,
    },

    #[error("invalid system package name {name:?}: {reason}")]
    InvalidPackageName { name: String, reason: &'static str },

    #[error("system package {0:?} is listed more than once")]
    DuplicatePackage(String),

    #[error("invalid dependency manifest path {path:?}: {reason}")]
    InvalidManifest { path: String, reason: &'static str },

    #[error("invalid working directory {path:?}: {reason}")]
    InvalidWorkDir { path: String, reason: &'static str },

    #[error("launch port must be between 1 and 65535")]
    ZeroPort,

    #[error("launch program must not be empty")]
    EmptyProgram,

    #[error("bind address {address:?} is not an IP address")]
    InvalidBindAddress {
        address: String,
        source: std::net::AddrParseError,
    },
}
