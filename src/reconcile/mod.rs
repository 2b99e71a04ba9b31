//! Reconciliation of the resources root against the definition.
//!
//! [`Reconciler::install`] partitions the declared resources into an
//! *install* bucket (every tarball, and git resources whose target is
//! missing) and an *update* bucket (git resources whose target exists),
//! runs both buckets concurrently, and only once both have settled hands the
//! tree to the [`Pruner`].  Every per-resource outcome is gathered; if any
//! resource failed the pass reports all failures together and skips pruning.
mod context;
mod parallel;
mod prune;

pub use context::Context;
pub use prune::Pruner;

use anyhow::{Context as _, Result};
use std::fmt;
use std::sync::Arc;

use crate::config::definition::{Definition, ResourceEntry, ResourceKind};
use crate::error::{ReconcileError, ResourceFailure};
use crate::resources::error::ResourceError;
use crate::resources::git::GitResource;
use crate::resources::helpers::fs;
use crate::resources::tarball::TarballResource;
use crate::resources::{self, Resource, ResourceChange};

/// Counts reported by one reconcile pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    /// Resources in the install bucket.
    pub installed: usize,
    /// Resources in the update bucket.
    pub updated: usize,
    /// Orphaned resources removed by the pruner.
    pub removed: usize,
}

impl Summary {
    /// Return `true` if any count is non-zero.
    #[must_use]
    pub const fn has_changes(&self) -> bool {
        self.installed > 0 || self.updated > 0 || self.removed > 0
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.has_changes() {
            write!(
                f,
                "Successfully installed {}, updated {} and removed {} resources!",
                self.installed, self.updated, self.removed
            )
        } else {
            f.write_str("No changes required, everything is up to date.")
        }
    }
}

/// Which work set a declared resource belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bucket {
    Install,
    Update,
}

/// Build the installer for one declared resource.
///
/// # Errors
///
/// Returns [`ResourceError::MissingUrl`] if the entry has no (or an empty)
/// `url`.
pub fn installer_for(
    entry: &ResourceEntry,
    ctx: &Context,
) -> Result<Box<dyn Resource>, ResourceError> {
    let kind = entry.kind();
    let url = entry
        .url
        .as_deref()
        .filter(|url| !url.is_empty())
        .ok_or_else(|| ResourceError::MissingUrl {
            path: entry.path.clone(),
            kind: kind.to_string(),
        })?;
    let target = entry.target(ctx.resources_root());
    Ok(match kind {
        ResourceKind::Git => Box::new(GitResource::new(
            &entry.path,
            url,
            target,
            ctx.config.policy.git,
            Arc::clone(&ctx.git),
        )),
        ResourceKind::Tarball => Box::new(TarballResource::new(
            &entry.path,
            url,
            target,
            ctx.config.policy.tarball,
            ctx.config.markers.clone(),
            Arc::clone(&ctx.http),
        )),
    })
}

/// Drives installers and the pruner for one [`Context`].
#[derive(Debug)]
pub struct Reconciler<'a> {
    ctx: &'a Context,
}

impl<'a> Reconciler<'a> {
    /// Create a reconciler.
    #[must_use]
    pub const fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }

    /// Make the resources root match `definition`.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::ResourcesFailed`] (inside the
    /// [`anyhow::Error`]) listing every resource that failed, a
    /// [`DefinitionError`](crate::error::DefinitionError) if a declared path
    /// leaves the resources root or overlaps another before anything is
    /// touched, or an error if the resources root cannot be created or
    /// pruned.  Resources that
    /// succeeded stay installed either way.
    pub fn install(&self, definition: &Definition) -> Result<Summary> {
        let log = &self.ctx.log;
        let root = self.ctx.resources_root();
        definition.validate(root)?;
        fs::ensure_dir(root)
            .with_context(|| format!("creating resources root {}", root.display()))?;

        log.stage("Installing resources");
        let (install, update): (Vec<_>, Vec<_>) = definition
            .resources
            .iter()
            .enumerate()
            .partition(|(_, entry)| {
                let bucket = self.bucket(entry);
                log.debug(&format!("{}: {bucket:?}", entry.path));
                bucket == Bucket::Install
            });
        log.debug(&format!(
            "{} to install, {} to update",
            install.len(),
            update.len()
        ));
        let summary_counts = (install.len(), update.len());

        let (installed, updated) = parallel::join(
            self.ctx.parallel,
            || self.run_bucket(install),
            || self.run_bucket(update),
        );

        let mut failures: Vec<(usize, ResourceFailure)> = installed
            .into_iter()
            .chain(updated)
            .filter_map(|(index, outcome)| outcome.err().map(|failure| (index, failure)))
            .collect();
        if !failures.is_empty() {
            failures.sort_by_key(|(index, _)| *index);
            let failures: Vec<ResourceFailure> =
                failures.into_iter().map(|(_, failure)| failure).collect();
            for failure in &failures {
                log.error(&format!("{}: {:#}", failure.path, failure.error));
            }
            return Err(ReconcileError::ResourcesFailed { failures }.into());
        }

        let removed = self.prune(definition)?;

        Ok(Summary {
            installed: summary_counts.0,
            updated: summary_counts.1,
            removed,
        })
    }

    /// Remove every materialized resource `definition` does not declare.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory cannot be listed or removed.
    pub fn prune(&self, definition: &Definition) -> Result<usize> {
        self.ctx.log.stage("Removing undeclared resources");
        Pruner::new(self.ctx, definition).clean()
    }

    fn bucket(&self, entry: &ResourceEntry) -> Bucket {
        match entry.kind() {
            ResourceKind::Tarball => Bucket::Install,
            ResourceKind::Git if fs::exists(&entry.target(self.ctx.resources_root())) => {
                Bucket::Update
            }
            ResourceKind::Git => Bucket::Install,
        }
    }

    fn run_bucket(
        &self,
        entries: Vec<(usize, &ResourceEntry)>,
    ) -> Vec<(usize, Result<ResourceChange, ResourceFailure>)> {
        parallel::map_all(entries, self.ctx.parallel, |(index, entry)| {
            let outcome = self.apply_entry(entry).map_err(|error| ResourceFailure {
                path: entry.path.clone(),
                error,
            });
            (index, outcome)
        })
    }

    fn apply_entry(&self, entry: &ResourceEntry) -> Result<ResourceChange> {
        let resource = installer_for(entry, self.ctx)?;
        let change = resources::ensure(resource.as_ref())
            .with_context(|| resource.description())?;
        match change {
            ResourceChange::Applied => self
                .ctx
                .log
                .info(&format!("installed {}", resource.description())),
            ResourceChange::AlreadyCorrect => self
                .ctx
                .log
                .debug(&format!("{} is up to date", entry.path)),
        }
        Ok(change)
    }
}


#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::test_helpers::context_for;
    use super::*;
    use crate::error::DefinitionError;
    use crate::git::MockGitClient;
    use crate::logging::MemoryLog;
    use crate::resources::test_helpers::{StubHttp, tar_gz};
    use std::path::Path;

    const PNOTIFY: &str = "https://github.com/Nick78111/pNotify.git";

    fn fake_clone(dest: &Path) {
        std::fs::create_dir_all(dest.join(".git")).unwrap();
        std::fs::write(dest.join("fxmanifest.lua"), "").unwrap();
    }

    /// A git mock that "clones" by creating a marked working tree and
    /// reports `origin` as whatever was cloned there.
    fn cloning_git() -> MockGitClient {
        let mut git = MockGitClient::new();
        git.expect_clone_repo().returning(|_, dest| {
            fake_clone(dest);
            Ok(())
        });
        git.expect_origin_url()
            .returning(|_| Ok(Some(PNOTIFY.to_string())));
        git
    }

    fn git_entry(path: &str, url: &str) -> ResourceEntry {
        ResourceEntry {
            kind: None,
            path: path.to_string(),
            url: Some(url.to_string()),
            extra: serde_json::Map::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Summary
    // -----------------------------------------------------------------------

    #[test]
    fn summary_messages() {
        assert_eq!(
            Summary::default().to_string(),
            "No changes required, everything is up to date."
        );
        let summary = Summary {
            installed: 1,
            updated: 2,
            removed: 3,
        };
        assert_eq!(
            summary.to_string(),
            "Successfully installed 1, updated 2 and removed 3 resources!"
        );
    }

    // -----------------------------------------------------------------------
    // installer_for
    // -----------------------------------------------------------------------

    #[test]
    fn missing_url_is_rejected() {
        let (_tmp, ctx) = context_for(Arc::new(MemoryLog::new()));
        let mut entry = git_entry("pNotify", "");
        let Err(err) = installer_for(&entry, &ctx) else {
            panic!("an empty url must be rejected");
        };
        assert!(matches!(err, ResourceError::MissingUrl { ref kind, .. } if kind == "GIT"));

        entry.url = None;
        entry.kind = Some(ResourceKind::Tarball);
        let Err(err) = installer_for(&entry, &ctx) else {
            panic!("an absent url must be rejected");
        };
        assert!(matches!(err, ResourceError::MissingUrl { ref kind, .. } if kind == "TARBALL"));
    }

    // -----------------------------------------------------------------------
    // install
    // -----------------------------------------------------------------------

    #[test]
    fn fresh_install_clones_and_counts() {
        let (_tmp, ctx) = context_for(Arc::new(MemoryLog::new()));
        let ctx = ctx.with_git(Arc::new(cloning_git()));
        let definition = Definition {
            resources: vec![git_entry("pNotify", PNOTIFY)],
            ..Definition::default()
        };

        let summary = Reconciler::new(&ctx).install(&definition).unwrap();

        assert_eq!(
            summary,
            Summary {
                installed: 1,
                updated: 0,
                removed: 0
            }
        );
        assert!(ctx.resources_root().join("pNotify/fxmanifest.lua").exists());
    }

    #[test]
    fn second_install_counts_updates_only() {
        let (_tmp, ctx) = context_for(Arc::new(MemoryLog::new()));
        let ctx = ctx.with_git(Arc::new(cloning_git()));
        let definition = Definition {
            resources: vec![git_entry("pNotify", PNOTIFY)],
            ..Definition::default()
        };

        let reconciler = Reconciler::new(&ctx);
        reconciler.install(&definition).unwrap();
        let summary = reconciler.install(&definition).unwrap();

        assert_eq!(
            summary,
            Summary {
                installed: 0,
                updated: 1,
                removed: 0
            }
        );
    }

    #[test]
    fn undeclared_resource_is_pruned_after_install() {
        let (_tmp, ctx) = context_for(Arc::new(MemoryLog::new()));
        let ctx = ctx.with_git(Arc::new(cloning_git()));
        let with = Definition {
            resources: vec![git_entry("pNotify", PNOTIFY)],
            ..Definition::default()
        };
        Reconciler::new(&ctx).install(&with).unwrap();

        let summary = Reconciler::new(&ctx)
            .install(&Definition::default())
            .unwrap();

        assert_eq!(summary.removed, 1);
        assert!(!ctx.resources_root().join("pNotify").exists());
    }

    #[test]
    fn entry_leaving_the_root_is_refused_before_any_work() {
        let url = "https://example.com/island.tar.gz";
        let http = Arc::new(StubHttp::default().with_body(url, tar_gz(&[("fxmanifest.lua", "")])));
        let (tmp, ctx) = context_for(Arc::new(MemoryLog::new()));
        let ctx = ctx.with_http(http.clone());
        let precious = tmp.path().join("precious.txt");
        std::fs::write(&precious, "keep").unwrap();
        let definition = Definition {
            resources: vec![ResourceEntry::new(ResourceKind::Tarball, "..", url)],
            ..Definition::default()
        };

        let err = Reconciler::new(&ctx).install(&definition).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<DefinitionError>(),
            Some(DefinitionError::InvalidPath { .. })
        ));
        assert_eq!(std::fs::read_to_string(&precious).unwrap(), "keep");
        assert_eq!(http.get_count(), 0);
    }

    #[test]
    fn overlapping_targets_are_refused() {
        let (_tmp, ctx) = context_for(Arc::new(MemoryLog::new()));
        let mut git = MockGitClient::new();
        git.expect_clone_repo().never();
        let ctx = ctx.with_git(Arc::new(git));
        let definition = Definition {
            resources: vec![
                git_entry("pNotify", PNOTIFY),
                git_entry("./pNotify/", "https://h/other.git"),
            ],
            ..Definition::default()
        };

        let err = Reconciler::new(&ctx).install(&definition).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<DefinitionError>(),
            Some(DefinitionError::PathConflict { .. })
        ));
    }

    #[test]
    fn tarballs_always_land_in_install_bucket() {
        let url = "https://example.com/island.tar.gz";
        let http = StubHttp::default().with_body(url, tar_gz(&[("fxmanifest.lua", "")]));
        let (_tmp, ctx) = context_for(Arc::new(MemoryLog::new()));
        let ctx = ctx.with_http(Arc::new(http));
        let definition = Definition {
            resources: vec![ResourceEntry::new(ResourceKind::Tarball, "[maps]/island", url)],
            ..Definition::default()
        };

        let reconciler = Reconciler::new(&ctx);
        reconciler.install(&definition).unwrap();
        let summary = reconciler.install(&definition).unwrap();

        assert_eq!(summary.installed, 1);
        assert_eq!(summary.updated, 0);
        assert!(ctx.resources_root().join("[maps]/island/fxmanifest.lua").exists());
    }

    #[test]
    fn failures_are_gathered_and_pruning_skipped() {
        let log = Arc::new(MemoryLog::new());
        let (_tmp, ctx) = context_for(log.clone());
        let mut git = MockGitClient::new();
        git.expect_clone_repo().returning(|url, dest| {
            if url.contains("broken") {
                return Err(ResourceError::Git {
                    operation: "clone".to_string(),
                    url: url.to_string(),
                    reason: "repository not found".to_string(),
                });
            }
            fake_clone(dest);
            Ok(())
        });
        let ctx = ctx.with_git(Arc::new(git));

        let orphan = ctx.resources_root().join("orphan");
        fake_clone(&orphan);

        let definition = Definition {
            resources: vec![
                git_entry("broken-a", "https://h/broken-a.git"),
                git_entry("good", "https://h/good.git"),
                git_entry("broken-b", "https://h/broken-b.git"),
            ],
            ..Definition::default()
        };

        let err = Reconciler::new(&ctx).install(&definition).unwrap_err();
        let Some(ReconcileError::ResourcesFailed { failures }) = err.downcast_ref() else {
            panic!("expected ResourcesFailed, got {err:#}");
        };
        let paths: Vec<_> = failures.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["broken-a", "broken-b"]);
        assert!(ctx.resources_root().join("good/fxmanifest.lua").exists());
        assert!(orphan.exists(), "pruning must not run after a failure");
        assert_eq!(log.messages(crate::logging::Severity::Error).len(), 2);
    }

    #[test]
    fn polluted_git_target_fails_and_is_untouched() {
        let (_tmp, ctx) = context_for(Arc::new(MemoryLog::new()));
        let mut git = MockGitClient::new();
        git.expect_clone_repo().never();
        let ctx = ctx.with_git(Arc::new(git));
        let target = ctx.resources_root().join("pNotify");
        std::fs::create_dir(&target).unwrap();
        std::fs::write(target.join("client.lua"), "-- mine").unwrap();

        let definition = Definition {
            resources: vec![git_entry("pNotify", PNOTIFY)],
            ..Definition::default()
        };
        let err = Reconciler::new(&ctx).install(&definition).unwrap_err();

        let Some(ReconcileError::ResourcesFailed { failures }) = err.downcast_ref() else {
            panic!("expected ResourcesFailed, got {err:#}");
        };
        assert!(matches!(
            failures[0].error.downcast_ref::<ResourceError>(),
            Some(ResourceError::PathPolluted { .. })
        ));
        assert_eq!(
            std::fs::read_to_string(target.join("client.lua")).unwrap(),
            "-- mine"
        );
    }

    #[test]
    fn sequential_mode_matches_parallel_results() {
        let (_tmp, mut ctx) = context_for(Arc::new(MemoryLog::new()));
        ctx.parallel = false;
        let ctx = ctx.with_git(Arc::new(cloning_git()));
        let definition = Definition {
            resources: vec![
                git_entry("[ui]/pNotify", PNOTIFY),
                git_entry("[ui]/other", PNOTIFY),
            ],
            ..Definition::default()
        };
        let summary = Reconciler::new(&ctx).install(&definition).unwrap();
        assert_eq!(summary.installed, 2);
    }

    #[test]
    fn resources_root_is_created() {
        let (_tmp, ctx) = context_for(Arc::new(MemoryLog::new()));
        std::fs::remove_dir(ctx.resources_root()).unwrap();
        let summary = Reconciler::new(&ctx)
            .install(&Definition::default())
            .unwrap();
        assert!(!summary.has_changes());
        assert!(ctx.resources_root().is_dir());
    }
}
