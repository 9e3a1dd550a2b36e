//! Docker engine operations for dockyard: building images, starting
//! containers, waiting for the launched server, and checking that the result
//! matches the image plan.

pub mod client;
pub mod docker;
pub mod executor;
pub mod readiness;
pub mod verify;

pub use client::{
    BuildError, CheckResult, ContainerError, ContainerState, DockerClient, DoctorReport,
    ImageError, ImageMetadata, PreflightError, PreflightReport,
};
pub use executor::{DockerExecutor, RealExecutor};
pub use readiness::{ReadinessError, wait_for_port};
pub use verify::{EnvMismatch, MetadataReport, check_environment, check_image_metadata};
