use std::path::{Path, PathBuf};

use dockyard_core::ManifestRef;

use crate::{BUNDLE_DIR, STATE_DIR};

/// Top-level entries that never enter the build context.
const DOCKYARD_EXCLUDES: &[&str] = &[BUNDLE_DIR, STATE_DIR];

/// Prepares the build context for `docker build`.
///
/// Copies the whole project tree verbatim into `.dockyard-bundle/`,
/// except dockyard's own directories, then writes the Dockerfile at the
/// bundle root. `.dockerignore` is copied like any other file and applied
/// by the engine.
pub fn create_bundle(
    project_dir: &Path,
    manifest: &ManifestRef,
    dockerfile_content: &str,
) -> Result<PathBuf, BundleError> {
    check_manifest(project_dir, manifest)?;

    let bundle_dir = project_dir.join(BUNDLE_DIR);

    // Clean previous bundle
    if bundle_dir.exists() {
        std::fs::remove_dir_all(&bundle_dir).map_err(|e| BundleError::Cleanup {
            path: bundle_dir.clone(),
            source: e,
        })?;
    }
    std::fs::create_dir_all(&bundle_dir).map_err(|e| BundleError::Create {
        path: bundle_dir.clone(),
        source: e,
    })?;

    let files = source_files(project_dir)?;
    tracing::debug!(files = files.len(), bundle = %bundle_dir.display(), "copying build context");

    for relative_path in &files {
        let src = project_dir.join(relative_path);
        let dst = bundle_dir.join(relative_path);

        if let Some(parent) = dst.parent() {
            std::fs::create_dir_all(parent).map_err(|e| BundleError::Create {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        std::fs::copy(&src, &dst).map_err(|e| BundleError::CopyFile {
            path: src,
            source: e,
        })?;
    }

    std::fs::write(bundle_dir.join("Dockerfile"), dockerfile_content).map_err(|e| {
        BundleError::WriteDockerfile {
            path: bundle_dir.join("Dockerfile"),
            source: e,
        }
    })?;

    Ok(bundle_dir)
}

/// Fails unless the dependency manifest exists as a file in the project.
pub fn check_manifest(project_dir: &Path, manifest: &ManifestRef) -> Result<(), BundleError> {
    let path = project_dir.join(manifest.as_str());
    if path.is_file() {
        Ok(())
    } else {
        Err(BundleError::MissingManifest(path))
    }
}

/// Remove the build context, if any. Returns whether something was removed.
pub fn remove_bundle(project_dir: &Path) -> Result<bool, BundleError> {
    let bundle_dir = project_dir.join(BUNDLE_DIR);
    if !bundle_dir.exists() {
        return Ok(false);
    }
    std::fs::remove_dir_all(&bundle_dir).map_err(|e| BundleError::Cleanup {
        path: bundle_dir,
        source: e,
    })?;
    Ok(true)
}

/// Every file in the project, relative to `project_dir`, in sorted order.
///
/// Symlinks are followed: the bundle receives the target's content.
pub fn source_files(project_dir: &Path) -> Result<Vec<PathBuf>, BundleError> {
    let mut files = Vec::new();
    walk(project_dir, Path::new(""), &mut files)?;
    files.sort();
    Ok(files)
}

fn walk(root: &Path, relative: &Path, files: &mut Vec<PathBuf>) -> Result<(), BundleError> {
    let dir = root.join(relative);
    let entries = std::fs::read_dir(&dir).map_err(|e| BundleError::ReadDir {
        path: dir.clone(),
        source: e,
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| BundleError::ReadDir {
            path: dir.clone(),
            source: e,
        })?;
        let name = entry.file_name();
        if relative.as_os_str().is_empty()
            && DOCKYARD_EXCLUDES.iter().any(|ex| name == *ex)
        {
            continue;
        }

        let child = relative.join(&name);
        let path = root.join(&child);
        let link = std::fs::symlink_metadata(&path).map_err(|e| BundleError::ReadDir {
            path: path.clone(),
            source: e,
        })?;
        // fs::metadata follows symlinks.
        let metadata = std::fs::metadata(&path).map_err(|e| BundleError::ReadDir {
            path: path.clone(),
            source: e,
        })?;

        if metadata.is_dir() {
            if link.file_type().is_symlink() {
                tracing::warn!(path = %path.display(), "skipping symlinked directory");
                continue;
            }
            walk(root, &child, files)?;
        } else {
            files.push(child);
        }
    }

    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    #[error("dependency manifest not found at {0}")]
    MissingManifest(PathBuf),
    #[error("failed to clean up bundle directory {path}")]
    Cleanup {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to create directory {path}")]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to read {path}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to copy file {path}")]
    CopyFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write Dockerfile at {path}")]
    WriteDockerfile {
        path: PathBuf,
        source: std::io::Error,
    },
}
