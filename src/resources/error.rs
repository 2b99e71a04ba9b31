//! Typed error variants for resource installers.
//!
//! This module provides [`ResourceError`], a structured error type for
//! resource check and apply operations.  Installer code bails with these
//! variants; callers convert to [`anyhow::Error`] via `?` and can recover the
//! variant with `downcast_ref`.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that arise from resource checks and apply operations.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// The resource lacks the `url` its strategy needs.
    #[error("resource '{path}' of type {kind} must define a url property")]
    MissingUrl {
        /// Declared relative path of the resource.
        path: String,
        /// Strategy name (`GIT` or `TARBALL`).
        kind: String,
    },

    /// The target path holds content this strategy does not manage.
    #[error("configured resource path is polluted with unmanaged files at \"{path}\"")]
    PathPolluted {
        /// Declared relative path of the resource.
        path: String,
    },

    /// Downloading an archive failed.
    #[error("fetching {url} failed: {reason}")]
    Fetch {
        /// Source URL.
        url: String,
        /// Transport or HTTP status failure.
        reason: String,
    },

    /// The downloaded stream could not be decompressed or unpacked.
    #[error("extracting {url} failed: {reason}")]
    Extraction {
        /// Source URL.
        url: String,
        /// Decoder or archive failure.
        reason: String,
    },

    /// A version-control operation failed.
    #[error("git {operation} for {url} failed: {reason}")]
    Git {
        /// Operation name (`clone`, `open`).
        operation: String,
        /// Repository URL or path.
        url: String,
        /// Message reported by the git backend.
        reason: String,
    },

    /// A filesystem operation on the target path failed.
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        /// Path being inspected, removed, or created.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn missing_url_display() {
        let e = ResourceError::MissingUrl {
            path: "pNotify".to_string(),
            kind: "GIT".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "resource 'pNotify' of type GIT must define a url property"
        );
    }

    #[test]
    fn path_polluted_display() {
        let e = ResourceError::PathPolluted {
            path: "[esx]/es_extended".to_string(),
        };
        assert!(e.to_string().contains("[esx]/es_extended"));
        assert!(e.to_string().contains("polluted"));
    }

    #[test]
    fn fetch_display() {
        let e = ResourceError::Fetch {
            url: "https://example.com/a.tar.gz".to_string(),
            reason: "HTTP 404".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "fetching https://example.com/a.tar.gz failed: HTTP 404"
        );
    }

    #[test]
    fn extraction_display() {
        let e = ResourceError::Extraction {
            url: "https://example.com/a.tar.gz".to_string(),
            reason: "invalid gzip header".to_string(),
        };
        assert!(e.to_string().contains("invalid gzip header"));
    }

    #[test]
    fn git_display() {
        let e = ResourceError::Git {
            operation: "clone".to_string(),
            url: "https://example.com/repo.git".to_string(),
            reason: "Repository not found".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "git clone for https://example.com/repo.git failed: Repository not found"
        );
    }

    #[test]
    fn io_display_includes_path() {
        let e = ResourceError::Io {
            path: PathBuf::from("/srv/resources/pNotify"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(e.to_string(), "IO error on /srv/resources/pNotify: denied");
    }

    #[test]
    fn resource_error_round_trips_through_anyhow() {
        let err: anyhow::Error = ResourceError::PathPolluted {
            path: "x".to_string(),
        }
        .into();
        assert!(matches!(
            err.downcast_ref::<ResourceError>(),
            Some(ResourceError::PathPolluted { .. })
        ));
    }
}
