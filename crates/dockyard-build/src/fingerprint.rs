//! Layer fingerprints: SHA-256 digests of everything that feeds the
//! dependency layer and the source layer.
//!
//! Comparing the fingerprints of two builds predicts which layers the
//! engine's build cache can reuse. The prediction ignores `.dockerignore`,
//! so a change to an ignored file reports a source rebuild that the engine
//! may in fact skip.

use std::fmt;
use std::path::{Path, PathBuf};

use dockyard_core::{BuildStage, ImagePlan};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::STATE_DIR;
use crate::bundle::{self, BundleError};

const STATE_FILE: &str = "build-state.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerFingerprints {
    /// Image reference the fingerprints were recorded for
    pub image: String,
    /// Base image, environment, system packages, and manifest content
    pub dependencies: String,
    /// Dependency fingerprint plus every file in the source tree
    pub source: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerReuse {
    Reused,
    Rebuilt,
    /// No previous build recorded for this image.
    Unknown,
}

impl fmt::Display for LayerReuse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Reused => "cached",
            Self::Rebuilt => "rebuilt",
            Self::Unknown => "first build",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePrediction {
    pub dependencies: LayerReuse,
    pub source: LayerReuse,
}

impl LayerFingerprints {
    pub fn compute(
        plan: &ImagePlan,
        image: &str,
        project_dir: &Path,
    ) -> Result<Self, FingerprintError> {
        let mut deps = Sha256::new();
        for stage in plan.stages() {
            match stage {
                BuildStage::Base(base) => update_field(&mut deps, base.as_str().as_bytes()),
                BuildStage::Environment { env, workdir } => {
                    for (name, value) in env.iter() {
                        update_field(&mut deps, name.as_bytes());
                        update_field(&mut deps, value.as_bytes());
                    }
                    update_field(&mut deps, workdir.as_str().as_bytes());
                }
                BuildStage::SystemPackages(packages) => {
                    for name in packages.names() {
                        update_field(&mut deps, name.as_bytes());
                    }
                }
                BuildStage::Dependencies {
                    manifest,
                    upgrade_installer,
                } => {
                    let path = project_dir.join(manifest.as_str());
                    let content = std::fs::read(&path)
                        .map_err(|e| FingerprintError::Read { path, source: e })?;
                    update_field(&mut deps, manifest.as_str().as_bytes());
                    update_field(&mut deps, &[u8::from(upgrade_installer)]);
                    update_field(&mut deps, &content);
                }
                // Later stages do not feed the dependency layer.
                BuildStage::Source { .. } | BuildStage::Expose(_) | BuildStage::Launch(_) => {}
            }
        }
        let dependencies = format!("{:x}", deps.finalize());

        let mut source = Sha256::new();
        update_field(&mut source, dependencies.as_bytes());
        for relative in bundle::source_files(project_dir)? {
            let path = project_dir.join(&relative);
            let content =
                std::fs::read(&path).map_err(|e| FingerprintError::Read { path, source: e })?;
            update_field(&mut source, relative.to_string_lossy().as_bytes());
            update_field(&mut source, &content);
        }
        let source = format!("{:x}", source.finalize());

        Ok(Self {
            image: image.to_owned(),
            dependencies,
            source,
        })
    }

    /// Compare against the previous build of the same image.
    pub fn predict(&self, previous: Option<&LayerFingerprints>) -> CachePrediction {
        let Some(prev) = previous.filter(|p| p.image == self.image) else {
            return CachePrediction {
                dependencies: LayerReuse::Unknown,
                source: LayerReuse::Unknown,
            };
        };

        let reuse = |same: bool| {
            if same {
                LayerReuse::Reused
            } else {
                LayerReuse::Rebuilt
            }
        };

        let dependencies = reuse(prev.dependencies == self.dependencies);
        // A rebuilt dependency layer invalidates every layer after it.
        let source = if dependencies == LayerReuse::Rebuilt {
            LayerReuse::Rebuilt
        } else {
            reuse(prev.source == self.source)
        };

        CachePrediction {
            dependencies,
            source,
        }
    }
}

/// Length-prefixed update so adjacent fields cannot alias.
fn update_field(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

fn state_path(project_dir: &Path) -> PathBuf {
    project_dir.join(STATE_DIR).join(STATE_FILE)
}

/// Load the fingerprints recorded by the last successful build.
pub fn load_state(project_dir: &Path) -> Result<Option<LayerFingerprints>, FingerprintError> {
    let path = state_path(project_dir);
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(&path).map_err(|e| FingerprintError::Read {
        path: path.clone(),
        source: e,
    })?;
    let state = serde_json::from_str(&content)
        .map_err(|e| FingerprintError::Parse { path, source: e })?;
    Ok(Some(state))
}

/// Record fingerprints after a successful build.
pub fn save_state(
    project_dir: &Path,
    fingerprints: &LayerFingerprints,
) -> Result<(), FingerprintError> {
    let path = state_path(project_dir);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| FingerprintError::Write {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    let json = serde_json::to_string_pretty(fingerprints)
        .map_err(|e| FingerprintError::Serialize { source: e })?;
    std::fs::write(&path, json).map_err(|e| FingerprintError::Write { path, source: e })
}

/// Forget the recorded build, e.g. after the image was removed.
/// Returns `false` when nothing was recorded.
pub fn clear_state(project_dir: &Path) -> Result<bool, FingerprintError> {
    let path = state_path(project_dir);
    if !path.exists() {
        return Ok(false);
    }
    std::fs::remove_file(&path).map_err(|e| FingerprintError::Write { path, source: e })?;
    Ok(true)
}

#[derive(Debug, thiserror::Error)]
pub enum FingerprintError {
    #[error("failed to read {path}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write {path}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid build state at {path}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to serialize build state")]
    Serialize { source: serde_json::Error },
    #[error(transparent)]
    Walk(#[from] BundleError),
}
