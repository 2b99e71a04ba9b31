//! Project settings (`rsm.toml`) and the resource definition store.
pub mod definition;
pub mod toml_loader;

use anyhow::{Context as _, Result, ensure};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the optional settings file at the project root.
pub const SETTINGS_FILE: &str = "rsm.toml";

/// What an installer does with existing content it does not manage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PollutionPolicy {
    /// Refuse to touch the path and fail with `PathPolluted`.
    Protect,
    /// Discard whatever is at the path.
    Replace,
}

/// Marker file names that identify a directory as one resource.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Markers {
    /// Current manifest format.
    pub current: String,
    /// Legacy manifest format; still a resource, but reported as outdated.
    pub legacy: String,
}

impl Default for Markers {
    fn default() -> Self {
        Self {
            current: "fxmanifest.lua".to_string(),
            legacy: "__resource.lua".to_string(),
        }
    }
}

/// Network settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Network {
    /// Upper bound, in seconds, for the type probe and for download handshakes.
    pub timeout_secs: u64,
}

impl Default for Network {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

impl Network {
    /// The configured timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Per-strategy pollution policies.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Policies {
    /// Policy for git-backed resources.
    pub git: PollutionPolicy,
    /// Policy for tarball-backed resources.
    pub tarball: PollutionPolicy,
}

impl Default for Policies {
    fn default() -> Self {
        Self {
            git: PollutionPolicy::Protect,
            tarball: PollutionPolicy::Replace,
        }
    }
}

/// Settings loaded from `rsm.toml`; every field has a default.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Definition file name, relative to the project root.
    pub definition: String,
    /// Resources root directory, relative to the project root.
    pub resources_dir: String,
    /// Marker file names.
    pub markers: Markers,
    /// Network settings.
    pub network: Network,
    /// Pollution policies.
    pub policy: Policies,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            definition: definition::DEFINITION_FILE.to_string(),
            resources_dir: "resources".to_string(),
            markers: Markers::default(),
            network: Network::default(),
            policy: Policies::default(),
        }
    }
}

impl Config {
    /// Load `rsm.toml` from `root`, falling back to defaults when absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or
    /// if `network.timeout_secs` is zero.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(SETTINGS_FILE);
        let config: Self =
            toml_loader::load_config(&path).with_context(|| format!("loading {SETTINGS_FILE}"))?;
        ensure!(
            config.network.timeout_secs > 0,
            "{SETTINGS_FILE}: network.timeout_secs must be at least 1"
        );
        Ok(config)
    }
}

/// Resolved locations for one invocation.
///
/// Built once at the CLI boundary; nothing below it consults the process
/// working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    /// Project root.
    pub root: PathBuf,
    /// Definition file.
    pub definition: PathBuf,
    /// Resources root directory.
    pub resources: PathBuf,
}

impl Paths {
    /// Resolve the definition file and resources root against `root`.
    ///
    /// Overrides replace the configured names; relative overrides are taken
    /// relative to `root`, absolute ones are used as given.
    #[must_use]
    pub fn resolve(
        root: &Path,
        config: &Config,
        definition_override: Option<&Path>,
        resources_override: Option<&Path>,
    ) -> Self {
        let definition =
            definition_override.map_or_else(|| root.join(&config.definition), |p| root.join(p));
        let resources =
            resources_override.map_or_else(|| root.join(&config.resources_dir), |p| root.join(p));
        Self {
            root: root.to_path_buf(),
            definition,
            resources,
        }
    }
}
