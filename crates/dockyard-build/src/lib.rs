//! Dockerfile generation, build context bundling, eject, and layer
//! fingerprints for dockyard.
//!
//! # Build pipeline
//!
//! ```text
//! dockyard build
//!   1. Validate    ── dockyard.toml → ImagePlan, manifest present
//!   2. Preflight   ── docker version (client + daemon)
//!   3. Dockerfile  ── DockerfileGenerator::render() or .dockyard/Dockerfile
//!   4. Bundle      ── project tree → .dockyard-bundle/
//!   5. Build       ── docker build -t <name:tag> .dockyard-bundle/
//!   6. Inspect     ── exposed port, env, and command match the plan
//!   7. Record      ── layer fingerprints → .dockyard/build-state.json
//! ```
//!
//! # Layer ordering
//!
//! The generated Dockerfile copies only the dependency manifest before
//! installing dependencies, and copies the source tree afterwards. A change
//! confined to source files therefore leaves the dependency layer cached.

pub mod bundle;
pub mod dockerfile;
pub mod eject;
pub mod fingerprint;

pub use dockerfile::DockerfileGenerator;

/// Build context directory, recreated on every build.
pub const BUNDLE_DIR: &str = ".dockyard-bundle";

/// dockyard's own state directory (ejected Dockerfile, build state).
pub const STATE_DIR: &str = ".dockyard";
