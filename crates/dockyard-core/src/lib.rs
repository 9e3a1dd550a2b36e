//! Core types and configuration for dockyard.
//!
//! This crate defines the `dockyard.toml` schema ([`DockyardConfig`]),
//! the immutable image plan built from it ([`ImagePlan`]), and shared
//! error types.

pub mod config;
pub mod error;
pub mod plan;

pub use config::{
    BaseConfig, CONFIG_FILE, DependencyConfig, DockyardConfig, ImageConfig, LaunchConfig,
    SourceConfig, SystemConfig, VerifyConfig,
};
pub use error::{Error, Result};
pub use plan::{
    BaseImage, BuildStage, EnvironmentSet, ExposedPort, ImagePlan, LaunchCommand, ManifestRef,
    REQUIRED_ENV, StageEffect, SystemPackages, WorkDir,
};
