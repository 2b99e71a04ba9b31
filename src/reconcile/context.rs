use std::path::Path;
use std::sync::Arc;

use crate::config::{Config, Paths};
use crate::git::{Git2Client, GitClient};
use crate::http::{HttpClient, UreqClient};
use crate::logging::Log;

/// Shared context for one reconcile pass.
pub struct Context {
    /// Resolved project locations.
    pub paths: Paths,
    /// Settings from `rsm.toml`.
    pub config: Config,
    /// Logger for output.
    pub log: Arc<dyn Log>,
    /// Version-control capability (injectable for testing).
    pub git: Arc<dyn GitClient>,
    /// HTTP capability (injectable for testing).
    pub http: Arc<dyn HttpClient>,
    /// Whether to install and prune in parallel using Rayon.
    pub parallel: bool,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("paths", &self.paths)
            .field("config", &self.config)
            .field("log", &"<dyn Log>")
            .field("git", &"<dyn GitClient>")
            .field("http", &"<dyn HttpClient>")
            .field("parallel", &self.parallel)
            .finish()
    }
}

impl Context {
    /// Create a context using the libgit2 and ureq clients.
    ///
    /// The HTTP client's timeouts come from `config.network`.
    #[must_use]
    pub fn new(paths: Paths, config: Config, log: Arc<dyn Log>, parallel: bool) -> Self {
        let http = Arc::new(UreqClient::new(config.network.timeout()));
        Self {
            paths,
            config,
            log,
            git: Arc::new(Git2Client),
            http,
            parallel,
        }
    }

    /// Replace the version-control client.
    #[must_use]
    pub fn with_git(mut self, git: Arc<dyn GitClient>) -> Self {
        self.git = git;
        self
    }

    /// Replace the HTTP client.
    #[must_use]
    pub fn with_http(mut self, http: Arc<dyn HttpClient>) -> Self {
        self.http = http;
        self
    }

    /// Directory every declared resource path is resolved against.
    #[must_use]
    pub fn resources_root(&self) -> &Path {
        &self.paths.resources
    }
}
