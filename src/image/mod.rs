// src/image/mod.rs

//! Image reference resolution.
//!
//! A container reference is classified purely by its prefix:
//!
//! - `shub://…`   → [`ImageSource::RegistryHub`]
//! - `docker://…` → [`ImageSource::DockerRegistry`]
//! - anything else → [`ImageSource::LocalPath`]
//!
//! Registry references are never pulled here; they are handed to the backend
//! verbatim (modulo its own spelling) and the backend's pull-on-run does the
//! caching. Only local paths touch the filesystem, and only for run actions.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::backend::ContainerBackend;
use crate::errors::{ActionError, Result};
use crate::fs::FileSystem;
use crate::types::{ActionKind, BackendId};

pub const SHUB_SCHEME: &str = "shub://";
pub const DOCKER_SCHEME: &str = "docker://";

/// Where an image comes from, as parsed from a reference string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    RegistryHub(String),
    DockerRegistry(String),
    LocalPath(PathBuf),
}

impl fmt::Display for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageSource::RegistryHub(h) => write!(f, "{SHUB_SCHEME}{h}"),
            ImageSource::DockerRegistry(h) => write!(f, "{DOCKER_SCHEME}{h}"),
            ImageSource::LocalPath(p) => write!(f, "{}", p.display()),
        }
    }
}

/// An image identifier the chosen backend accepts as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImage {
    pub backend: BackendId,
    pub local_identifier: String,
}

/// Classify a reference by scheme. Never touches the filesystem.
pub fn classify(reference: &str) -> Result<ImageSource> {
    let reference = reference.trim();
    if reference.is_empty() {
        return Err(invalid(reference, "empty reference"));
    }

    if let Some(handle) = reference.strip_prefix(SHUB_SCHEME) {
        return registry_handle(reference, handle).map(ImageSource::RegistryHub);
    }
    if let Some(handle) = reference.strip_prefix(DOCKER_SCHEME) {
        return registry_handle(reference, handle).map(ImageSource::DockerRegistry);
    }
    if let Some((scheme, _)) = reference.split_once("://") {
        return Err(invalid(
            reference,
            format!("unsupported scheme '{scheme}://' (expected shub:// or docker://)"),
        ));
    }

    Ok(ImageSource::LocalPath(PathBuf::from(reference)))
}

fn registry_handle(reference: &str, handle: &str) -> Result<String> {
    if handle.is_empty() || handle.chars().any(char::is_whitespace) {
        return Err(invalid(reference, "registry handle is empty or contains whitespace"));
    }
    Ok(handle.to_string())
}

fn invalid(reference: &str, reason: impl Into<String>) -> ActionError {
    ActionError::InvalidReference {
        reference: reference.to_string(),
        reason: reason.into(),
    }
}

/// Resolves references against a filesystem for a given backend.
#[derive(Debug)]
pub struct ImageResolver<'a> {
    fs: &'a dyn FileSystem,
}

impl<'a> ImageResolver<'a> {
    pub fn new(fs: &'a dyn FileSystem) -> Self {
        Self { fs }
    }

    /// Resolve `reference` into an identifier usable by `backend`.
    ///
    /// Bare names on a run action must exist on disk (relative to
    /// `workdir`) unless the backend treats bare names as registry images.
    /// On a build action a missing bare name is taken as a build target.
    pub fn resolve(
        &self,
        reference: &str,
        backend: &dyn ContainerBackend,
        kind: ActionKind,
        workdir: &Path,
    ) -> Result<ResolvedImage> {
        let source = match classify(reference)? {
            ImageSource::LocalPath(path) if backend.bare_names_are_registry_images() => {
                ImageSource::DockerRegistry(path.to_string_lossy().into_owned())
            }
            ImageSource::LocalPath(path) => {
                let on_disk = workdir.join(&path);
                if !self.fs.exists(&on_disk) && kind == ActionKind::Run {
                    return Err(invalid(
                        reference,
                        format!("no known scheme and no local image at {}", on_disk.display()),
                    ));
                }
                ImageSource::LocalPath(path)
            }
            other => other,
        };

        let local_identifier = backend.image_identifier(&source)?;
        debug!(
            backend = %backend.id(),
            %source,
            identifier = %local_identifier,
            "resolved container reference"
        );

        Ok(ResolvedImage {
            backend: backend.id(),
            local_identifier,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_registry_schemes() {
        assert_eq!(
            classify("shub://singularityhub/ubuntu").unwrap(),
            ImageSource::RegistryHub("singularityhub/ubuntu".into())
        );
        assert_eq!(
            classify("docker://godlovedc/lolcow").unwrap(),
            ImageSource::DockerRegistry("godlovedc/lolcow".into())
        );
        assert_eq!(
            classify("images/lolcow.simg").unwrap(),
            ImageSource::LocalPath(PathBuf::from("images/lolcow.simg"))
        );
    }

    #[test]
    fn rejects_empty_and_unknown_schemes() {
        assert!(matches!(
            classify("   "),
            Err(ActionError::InvalidReference { .. })
        ));
        assert!(matches!(
            classify("shub://"),
            Err(ActionError::InvalidReference { .. })
        ));
        assert!(matches!(
            classify("library://alpine"),
            Err(ActionError::InvalidReference { .. })
        ));
    }

    #[test]
    fn display_round_trips_scheme() {
        let src = classify("docker://ubuntu:16.04").unwrap();
        assert_eq!(src.to_string(), "docker://ubuntu:16.04");
    }
}
