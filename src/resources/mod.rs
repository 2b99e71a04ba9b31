//! Idempotent resource installers (check + apply pattern).
//!
//! Each declared resource is materialized by one implementation of
//! [`Resource`]: [`git::GitResource`] clones a repository,
//! [`tarball::TarballResource`] extracts an archive.  Callers first ask for
//! the [`ResourceState`] and only call [`Resource::apply`] when the state is
//! not [`ResourceState::Correct`].
pub mod error;
pub mod git;
pub mod helpers;
pub mod marker;
pub mod tarball;

use anyhow::Result;
use std::path::Path;

use crate::config::PollutionPolicy;

/// On-disk state of a resource relative to its declaration.
///
/// # Examples
///
/// ```
/// use rsm_cli::resources::ResourceState;
///
/// let missing = ResourceState::Missing;
/// let wrong = ResourceState::Incorrect { current: "https://other/repo.git".into() };
///
/// assert_ne!(missing, ResourceState::Correct);
/// assert_ne!(wrong, ResourceState::Correct);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceState {
    /// Nothing exists at the target path.
    Missing,
    /// The target path already matches the declaration.
    Correct,
    /// Something exists at the target path but must be replaced.
    Incorrect {
        /// What is currently there.
        current: String,
    },
}

/// Result of bringing a resource in line with its declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceChange {
    /// The resource was cloned, re-cloned, or extracted.
    Applied,
    /// The resource already matched (no change needed).
    AlreadyCorrect,
}

/// A declared resource that can be checked and applied.
pub trait Resource: Send + Sync {
    /// Human-readable description of this resource.
    fn description(&self) -> String;

    /// Inspect the target path.
    ///
    /// # Errors
    ///
    /// Returns an error if the target cannot be inspected, or
    /// [`error::ResourceError::PathPolluted`] if it holds unmanaged content
    /// the resource's policy protects.
    fn current_state(&self) -> Result<ResourceState>;

    /// Materialize the resource at its target path, replacing whatever is
    /// there.
    ///
    /// # Errors
    ///
    /// Returns an error if the target cannot be cleared, or if cloning,
    /// fetching, or extraction fails.
    fn apply(&self) -> Result<ResourceChange>;

    /// Determine if the resource needs to be changed.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`current_state`](Self::current_state).
    fn needs_change(&self) -> Result<bool> {
        Ok(self.current_state()? != ResourceState::Correct)
    }
}

/// Check `resource` and apply it only when its state is not correct.
///
/// # Errors
///
/// Propagates errors from [`Resource::current_state`] and [`Resource::apply`].
pub fn ensure(resource: &dyn Resource) -> Result<ResourceChange> {
    match resource.current_state()? {
        ResourceState::Correct => Ok(ResourceChange::AlreadyCorrect),
        ResourceState::Missing | ResourceState::Incorrect { .. } => resource.apply(),
    }
}

/// Clear the target path before (re)materializing a resource.
///
/// Under [`PollutionPolicy::Protect`] a target for which `is_managed` returns
/// `false` is refused with `PathPolluted` and left untouched.  Empty
/// directories never count as polluted.
fn clear_target(
    path: &str,
    target: &Path,
    policy: PollutionPolicy,
    is_managed: impl Fn(&Path) -> bool,
) -> Result<()> {
    if !helpers::fs::exists(target) {
        return Ok(());
    }
    if policy == PollutionPolicy::Protect && is_polluted(target, is_managed)? {
        return Err(error::ResourceError::PathPolluted {
            path: path.to_string(),
        }
        .into());
    }
    helpers::fs::remove_tree(target)?;
    Ok(())
}

/// Return `true` if `target` holds content not recognised by `is_managed`.
fn is_polluted(target: &Path, is_managed: impl Fn(&Path) -> bool) -> Result<bool> {
    if !target.is_dir() {
        return Ok(true);
    }
    Ok(!is_managed(target) && !helpers::fs::is_empty_dir(target)?)
}

/// Shared test helpers for resource unit tests.
#[cfg(test)]
pub mod test_helpers {
    use std::collections::HashMap;
    use std::io::{Cursor, Read};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::http::HttpClient;

    /// Build an in-memory `.tar.gz` archive from `(path, contents)` pairs.
    #[allow(clippy::expect_used)]
    #[must_use]
    pub fn tar_gz(files: &[(&str, &str)]) -> Vec<u8> {
        let encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (path, contents) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(contents.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, path, contents.as_bytes())
                .expect("append tar entry");
        }
        builder
            .into_inner()
            .expect("finish tar")
            .finish()
            .expect("finish gzip")
    }

    /// An [`HttpClient`] serving canned bodies and content types.
    ///
    /// Unknown URLs fail with `HTTP 404`.
    #[derive(Debug, Default)]
    pub struct StubHttp {
        bodies: Mutex<HashMap<String, Vec<u8>>>,
        content_types: Mutex<HashMap<String, String>>,
        gets: AtomicUsize,
    }

    impl StubHttp {
        /// Serve `body` for `GET url`.
        #[must_use]
        pub fn with_body(self, url: &str, body: Vec<u8>) -> Self {
            if let Ok(mut bodies) = self.bodies.lock() {
                bodies.insert(url.to_string(), body);
            }
            self
        }

        /// Answer `HEAD url` with `content_type`.
        #[must_use]
        pub fn with_content_type(self, url: &str, content_type: &str) -> Self {
            if let Ok(mut types) = self.content_types.lock() {
                types.insert(url.to_string(), content_type.to_string());
            }
            self
        }

        /// Number of `GET` requests served so far.
        #[must_use]
        pub fn get_count(&self) -> usize {
            self.gets.load(Ordering::SeqCst)
        }
    }

    impl HttpClient for StubHttp {
        fn content_type(&self, url: &str) -> anyhow::Result<Option<String>> {
            let types = self
                .content_types
                .lock()
                .map_err(|e| anyhow::anyhow!("poisoned: {e}"))?;
            Ok(types.get(url).cloned())
        }

        fn open(&self, url: &str) -> anyhow::Result<Box<dyn Read>> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            let bodies = self
                .bodies
                .lock()
                .map_err(|e| anyhow::anyhow!("poisoned: {e}"))?;
            let body = bodies
                .get(url)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("HTTP 404"))?;
            Ok(Box::new(Cursor::new(body)))
        }
    }
}
