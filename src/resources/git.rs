//! Git resource: a working tree cloned from the declared url.
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

use super::helpers::fs::{self, has_vcs_metadata};
use super::{Resource, ResourceChange, ResourceState, clear_target};
use crate::config::PollutionPolicy;
use crate::git::GitClient;
use crate::resources::error::ResourceError;

/// A git-backed resource.
///
/// An existing working tree whose `origin` equals [`url`](Self::url) is left
/// untouched; no fetch or pull is performed.  Any other existing content is
/// removed and the repository re-cloned, subject to [`policy`](Self::policy).
pub struct GitResource {
    /// Declared relative path.
    pub path: String,
    /// Clone source.
    pub url: String,
    /// Absolute target directory.
    pub target: PathBuf,
    /// What to do with an unmanaged, non-empty target.
    pub policy: PollutionPolicy,
    git: Arc<dyn GitClient>,
}

impl std::fmt::Debug for GitResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitResource")
            .field("path", &self.path)
            .field("url", &self.url)
            .field("target", &self.target)
            .field("policy", &self.policy)
            .field("git", &"<dyn GitClient>")
            .finish()
    }
}

impl GitResource {
    /// Create a new git resource.
    #[must_use]
    pub fn new(
        path: impl Into<String>,
        url: impl Into<String>,
        target: PathBuf,
        policy: PollutionPolicy,
        git: Arc<dyn GitClient>,
    ) -> Self {
        Self {
            path: path.into(),
            url: url.into(),
            target,
            policy,
            git,
        }
    }

    fn polluted(&self) -> ResourceError {
        ResourceError::PathPolluted {
            path: self.path.clone(),
        }
    }
}

impl Resource for GitResource {
    fn description(&self) -> String {
        format!("{} (git {})", self.path, self.url)
    }

    fn current_state(&self) -> Result<ResourceState> {
        if !fs::exists(&self.target) {
            return Ok(ResourceState::Missing);
        }

        if !self.target.is_dir() {
            if self.policy == PollutionPolicy::Protect {
                return Err(self.polluted().into());
            }
            return Ok(ResourceState::Incorrect {
                current: "not a directory".to_string(),
            });
        }

        if !has_vcs_metadata(&self.target) {
            if fs::is_empty_dir(&self.target)? {
                return Ok(ResourceState::Incorrect {
                    current: "empty directory".to_string(),
                });
            }
            if self.policy == PollutionPolicy::Protect {
                return Err(self.polluted().into());
            }
            return Ok(ResourceState::Incorrect {
                current: "unmanaged content".to_string(),
            });
        }

        Ok(match self.git.origin_url(&self.target) {
            Ok(Some(origin)) if origin == self.url => ResourceState::Correct,
            Ok(Some(origin)) => ResourceState::Incorrect { current: origin },
            Ok(None) => ResourceState::Incorrect {
                current: "no origin remote".to_string(),
            },
            Err(e) => ResourceState::Incorrect {
                current: format!("unreadable working tree ({e})"),
            },
        })
    }

    fn apply(&self) -> Result<ResourceChange> {
        clear_target(&self.path, &self.target, self.policy, has_vcs_metadata)?;
        fs::ensure_parent_dir(&self.target)?;
        self.git.clone_repo(&self.url, &self.target)?;
        Ok(ResourceChange::Applied)
    }
}
