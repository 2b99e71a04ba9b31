//! Classification of bare CLI references into resource kinds.
use std::sync::LazyLock;

use regex::Regex;

use crate::config::definition::ResourceKind;
use crate::error::ReferenceError;
use crate::http::{HttpClient, media_type};

/// Git URLs as used by common hosting: scheme (or `git@host:`), a path, a
/// `.git` suffix, and an optional trailing slash or `#ref`.
#[allow(clippy::expect_used)]
static GIT_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:git|ssh|https?|git@[-\w.]+):(//)?(.*?)(\.git)(/?|#[-\d\w._]+?)$")
        .expect("literal pattern")
});

/// Media types that identify a gzip-compressed archive.
const GZIP_TYPES: [&str; 2] = ["application/gzip", "application/x-gzip"];

/// Return `true` if `reference` is recognisably a git remote.
#[must_use]
pub fn is_git_url(reference: &str) -> bool {
    ["ssh://", "git://", "git+ssh://"]
        .iter()
        .any(|scheme| reference.starts_with(scheme))
        || GIT_URL.is_match(reference)
}

/// Classify `reference` as a git or tarball source.
///
/// Git syntax is recognised offline.  Any other `http(s)` reference is probed
/// with a `HEAD` request; a gzip `Content-Type` makes it a tarball.
///
/// # Errors
///
/// Returns [`ReferenceError::Probe`] if the probe fails (including timeouts)
/// and [`ReferenceError::Unsupported`] for anything else that is not
/// recognised.
pub fn classify(reference: &str, http: &dyn HttpClient) -> Result<ResourceKind, ReferenceError> {
    if is_git_url(reference) {
        return Ok(ResourceKind::Git);
    }

    if reference.starts_with("http://") || reference.starts_with("https://") {
        let content_type = http
            .content_type(reference)
            .map_err(|e| ReferenceError::Probe {
                reference: reference.to_string(),
                reason: format!("{e:#}"),
            })?;
        if content_type.is_some_and(|ct| GZIP_TYPES.contains(&media_type(&ct).as_str())) {
            return Ok(ResourceKind::Tarball);
        }
    }

    Err(ReferenceError::Unsupported {
        reference: reference.to_string(),
    })
}

/// Derive a resource path from the last segment of `reference`.
///
/// Query strings and fragments are ignored and `.git`, `.tar.gz` and `.tgz`
/// suffixes stripped.  Returns `None` when nothing usable remains.
#[must_use]
pub fn derive_path(reference: &str) -> Option<String> {
    let without_query = reference
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .trim_end_matches('/');
    let segment = without_query
        .rsplit(['/', ':'])
        .next()
        .unwrap_or_default();
    let name = [".git", ".tar.gz", ".tgz"]
        .iter()
        .find_map(|suffix| segment.strip_suffix(suffix))
        .unwrap_or(segment);
    (!name.is_empty()).then(|| name.to_string())
}
