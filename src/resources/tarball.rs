//! Tarball resource: a gzip-compressed tar archive extracted in place.
use anyhow::Result;
use flate2::read::GzDecoder;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::helpers::fs;
use super::{Resource, ResourceChange, ResourceState, clear_target, marker};
use crate::config::{Markers, PollutionPolicy};
use crate::http::HttpClient;
use crate::resources::error::ResourceError;

/// A tarball-backed resource.
///
/// Tarballs are never diffed: an existing target is always discarded and
/// the archive fetched and extracted again.
pub struct TarballResource {
    /// Declared relative path.
    pub path: String,
    /// Archive location.
    pub url: String,
    /// Absolute target directory.
    pub target: PathBuf,
    /// What to do with an unmanaged, non-empty target.
    pub policy: PollutionPolicy,
    markers: Markers,
    http: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for TarballResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TarballResource")
            .field("path", &self.path)
            .field("url", &self.url)
            .field("target", &self.target)
            .field("policy", &self.policy)
            .field("http", &"<dyn HttpClient>")
            .finish_non_exhaustive()
    }
}

impl TarballResource {
    /// Create a new tarball resource.
    #[must_use]
    pub fn new(
        path: impl Into<String>,
        url: impl Into<String>,
        target: PathBuf,
        policy: PollutionPolicy,
        markers: Markers,
        http: Arc<dyn HttpClient>,
    ) -> Self {
        Self {
            path: path.into(),
            url: url.into(),
            target,
            policy,
            markers,
            http,
        }
    }

    fn is_managed(&self, dir: &Path) -> bool {
        marker::detect(dir, &self.markers).is_some()
    }
}

impl Resource for TarballResource {
    fn description(&self) -> String {
        format!("{} (tarball {})", self.path, self.url)
    }

    fn current_state(&self) -> Result<ResourceState> {
        if !fs::exists(&self.target) {
            return Ok(ResourceState::Missing);
        }
        if self.policy == PollutionPolicy::Protect
            && (!self.target.is_dir()
                || (!self.is_managed(&self.target) && !fs::is_empty_dir(&self.target)?))
        {
            return Err(ResourceError::PathPolluted {
                path: self.path.clone(),
            }
            .into());
        }
        Ok(ResourceState::Incorrect {
            current: "previous extraction".to_string(),
        })
    }

    fn apply(&self) -> Result<ResourceChange> {
        clear_target(&self.path, &self.target, self.policy, |dir| {
            self.is_managed(dir)
        })?;
        fs::ensure_dir(&self.target)?;

        let body = self.http.open(&self.url).map_err(|e| ResourceError::Fetch {
            url: self.url.clone(),
            reason: format!("{e:#}"),
        })?;
        extract_archive(body, &self.target).map_err(|e| ResourceError::Extraction {
            url: self.url.clone(),
            reason: e.to_string(),
        })?;
        Ok(ResourceChange::Applied)
    }
}

/// Decompress and unpack a `.tar.gz` stream into `dest` as it is read.
///
/// Entries that would escape `dest` are skipped by the archive reader.
///
/// # Errors
///
/// Returns an error if the stream fails, is not gzip, or is not a valid tar
/// archive.
pub fn extract_archive(reader: impl Read, dest: &Path) -> std::io::Result<()> {
    let mut archive = tar::Archive::new(GzDecoder::new(reader));
    archive.unpack(dest)
}
