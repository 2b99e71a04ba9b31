//! Domain-specific error types for the resource manager.
//!
//! Internal modules return typed errors while command handlers at the CLI
//! boundary convert them to [`anyhow::Error`] via the standard `?` operator.
//!
//! # Error hierarchy
//!
//! ```text
//! DefinitionError     resources.json missing, malformed, already present,
//!                     or declaring a path that escapes or overlaps
//! ResourceError       installer failures (see resources::error)
//! ReferenceError      a CLI reference that cannot be classified
//! ReconcileError      one or more resources failed during a reconcile pass
//! ```

use std::path::PathBuf;

use thiserror::Error;

pub use crate::resources::error::ResourceError;

/// Errors raised by the definition store.
#[derive(Error, Debug)]
pub enum DefinitionError {
    /// No definition file exists at the resolved location.
    #[error("no resource definition found at {}", .path.display())]
    NotFound {
        /// Location that was probed.
        path: PathBuf,
    },

    /// The definition file exists but is not a valid definition.
    #[error("malformed resource definition {}: {source}", .path.display())]
    Parse {
        /// File that failed to parse.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// `init` was asked to create a definition where one already exists.
    #[error("{} does already exist", .path.display())]
    AlreadyExists {
        /// Existing definition file.
        path: PathBuf,
    },

    /// A declared path is absolute, or resolves to the resources root itself
    /// or somewhere outside it.
    #[error("invalid resource path \"{path}\": {reason}")]
    InvalidPath {
        /// Path as declared.
        path: String,
        /// Why the path was refused.
        reason: &'static str,
    },

    /// A declared path resolves to the same target as another entry, or to a
    /// directory nested inside (or containing) it.
    #[error("resource path \"{path}\" conflicts with declared resource \"{existing}\"")]
    PathConflict {
        /// Path being declared.
        path: String,
        /// Path of the entry already holding that location.
        existing: String,
    },

    /// Reading or writing the definition file failed.
    #[error("IO error on resource definition {}: {source}", .path.display())]
    Io {
        /// File being read or written.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Errors raised while classifying a bare resource reference.
#[derive(Error, Debug)]
pub enum ReferenceError {
    /// The reference is neither a git URL nor a URL serving a gzip archive.
    #[error("could not determine type for input \"{reference}\"")]
    Unsupported {
        /// Reference as given on the command line.
        reference: String,
    },

    /// The HTTP probe used to classify the reference failed.
    #[error("probing \"{reference}\" failed: {reason}")]
    Probe {
        /// Reference as given on the command line.
        reference: String,
        /// Human-readable failure reason (includes timeouts).
        reason: String,
    },
}

/// A single resource that failed during a reconcile pass.
#[derive(Debug)]
pub struct ResourceFailure {
    /// Declared relative path of the resource.
    pub path: String,
    /// The installer error.
    pub error: anyhow::Error,
}

/// Errors raised by the reconciler.
#[derive(Error, Debug)]
pub enum ReconcileError {
    /// At least one installer failed; resources that succeeded stay installed.
    #[error("{} resource(s) failed to install: {}", .failures.len(), describe(.failures))]
    ResourcesFailed {
        /// Every failed resource, in declaration order.
        failures: Vec<ResourceFailure>,
    },
}

fn describe(failures: &[ResourceFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{}: {:#}", f.path, f.error))
        .collect::<Vec<_>>()
        .join("; ")
}
