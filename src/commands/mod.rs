pub mod init;
pub mod install;
pub mod remove;
pub mod version;

use anyhow::{Context as _, Result};
use std::path::PathBuf;
use std::sync::Arc;

use crate::cli::GlobalOpts;
use crate::config::{Config, Paths};
use crate::logging::Log;
use crate::reconcile::Context;

/// Shared state produced by the common command setup sequence.
///
/// Resolves the project root once and loads `rsm.toml`, so that nothing
/// below the command layer consults the process working directory.
#[derive(Debug)]
pub struct CommandSetup {
    pub paths: Paths,
    pub config: Config,
}

impl CommandSetup {
    /// Resolve the project root and load settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the root cannot be determined or `rsm.toml`
    /// exists but fails to parse.
    pub fn init(global: &GlobalOpts, log: &dyn Log) -> Result<Self> {
        let root = resolve_root(global)?;
        log.debug(&format!("project root: {}", root.display()));

        let config = Config::load(&root)?;
        let paths = Paths::resolve(
            &root,
            &config,
            global.definition.as_deref(),
            global.resources.as_deref(),
        );
        log.debug(&format!("definition: {}", paths.definition.display()));
        log.debug(&format!("resources: {}", paths.resources.display()));

        Ok(Self { paths, config })
    }

    /// Build the reconcile context for this invocation.
    #[must_use]
    pub fn into_context(self, log: Arc<dyn Log>, parallel: bool) -> Context {
        Context::new(self.paths, self.config, log, parallel)
    }
}

/// Resolve the project root from `--root` (or `RSM_ROOT`), falling back to
/// the current directory.
///
/// # Errors
///
/// Returns an error if the explicit root does not exist or the current
/// directory cannot be read.
pub fn resolve_root(global: &GlobalOpts) -> Result<PathBuf> {
    if let Some(ref root) = global.root {
        return dunce::canonicalize(root)
            .with_context(|| format!("project root {} does not exist", root.display()));
    }
    std::env::current_dir().context("cannot determine current directory")
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::logging::MemoryLog;

    fn global(root: Option<PathBuf>) -> GlobalOpts {
        GlobalOpts {
            root,
            definition: None,
            resources: None,
            parallel: true,
        }
    }

    #[test]
    fn resolve_root_uses_explicit_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = resolve_root(&global(Some(dir.path().to_path_buf()))).unwrap();
        assert_eq!(root, dunce::canonicalize(dir.path()).unwrap());
    }

    #[test]
    fn resolve_root_rejects_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_root(&global(Some(dir.path().join("absent")))).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn setup_applies_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let mut opts = global(Some(dir.path().to_path_buf()));
        opts.definition = Some(PathBuf::from("conf/resources.json"));
        opts.resources = Some(PathBuf::from("server-data/resources"));

        let setup = CommandSetup::init(&opts, &MemoryLog::new()).unwrap();
        let root = dunce::canonicalize(dir.path()).unwrap();
        assert_eq!(setup.paths.definition, root.join("conf/resources.json"));
        assert_eq!(setup.paths.resources, root.join("server-data/resources"));
    }

    #[test]
    fn setup_reads_settings_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("rsm.toml"), "resources_dir = \"res\"\n").unwrap();
        let setup =
            CommandSetup::init(&global(Some(dir.path().to_path_buf())), &MemoryLog::new())
                .unwrap();
        assert!(setup.paths.resources.ends_with("res"));
    }
}
