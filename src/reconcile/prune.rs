//! Recursive removal of undeclared resources.
//!
//! The walk is depth-first and post-order.  A directory carrying a marker
//! file is one resource and is never looked into: it is kept when declared
//! and deleted whole when not.  Any other directory is descended into (its
//! children concurrently) and, once they have settled, removed if nothing at
//! all is left in it.  A husk that still holds loose files is kept, since
//! those files belong to no resource.  The resources root itself is never
//! removed.
use anyhow::{Context as _, Result};
use std::path::Path;

use super::Context;
use super::parallel::sum_all;
use crate::config::Markers;
use crate::config::definition::Definition;
use crate::logging::Log;
use crate::resources::helpers::fs;
use crate::resources::marker::{self, MarkerKind};

/// Removes materialized resources that the definition no longer declares.
pub struct Pruner<'a> {
    root: &'a Path,
    definition: &'a Definition,
    markers: &'a Markers,
    log: &'a dyn Log,
    parallel: bool,
}

impl std::fmt::Debug for Pruner<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pruner")
            .field("root", &self.root)
            .field("markers", &self.markers)
            .field("parallel", &self.parallel)
            .finish_non_exhaustive()
    }
}

impl<'a> Pruner<'a> {
    /// Create a pruner for `ctx`'s resources root.
    #[must_use]
    pub fn new(ctx: &'a Context, definition: &'a Definition) -> Self {
        Self {
            root: ctx.resources_root(),
            definition,
            markers: &ctx.config.markers,
            log: ctx.log.as_ref(),
            parallel: ctx.parallel,
        }
    }

    /// Walk the resources root and return how many orphaned resources were
    /// removed.  Emptied non-resource directories are removed too but not
    /// counted.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory cannot be listed or removed.  Sibling
    /// subtrees are still processed.
    pub fn clean(&self) -> Result<usize> {
        if !self.root.is_dir() {
            return Ok(0);
        }
        self.clean_dir(self.root)
    }

    fn clean_dir(&self, path: &Path) -> Result<usize> {
        let is_root = path == self.root;

        if !is_root {
            if let Some(kind) = marker::detect(path, self.markers) {
                return self.settle_resource(path, kind);
            }
            // A declared target without a marker is still an opaque unit.
            if self.definition.find_by_target(self.root, path).is_some() {
                return Ok(0);
            }
        }

        let children = fs::list_subdirectories(path)?;
        let removed = sum_all(children, self.parallel, |child| self.clean_dir(&child))?;

        if !is_root && fs::is_empty_dir(path)? {
            self.log
                .debug(&format!("removing empty directory {}", self.relative(path)));
            fs::remove_tree(path)
                .with_context(|| format!("removing empty directory {}", path.display()))?;
        }

        Ok(removed)
    }

    fn settle_resource(&self, path: &Path, kind: MarkerKind) -> Result<usize> {
        match self.definition.find_by_target(self.root, path) {
            Some(entry) => {
                if kind == MarkerKind::Legacy {
                    self.log
                        .warn(&format!("Outdated resource manifest for {}", entry.path));
                }
                Ok(0)
            }
            None => {
                self.log
                    .info(&format!("removing undeclared resource {}", self.relative(path)));
                fs::remove_tree(path)
                    .with_context(|| format!("removing resource {}", path.display()))?;
                Ok(1)
            }
        }
    }

    fn relative(&self, path: &Path) -> String {
        path.strip_prefix(self.root)
            .unwrap_or(path)
            .display()
            .to_string()
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::definition::{ResourceEntry, ResourceKind};
    use crate::logging::{MemoryLog, Severity};
    use crate::reconcile::test_helpers::context_for;
    use std::sync::Arc;

    fn resource_dir(root: &Path, rel: &str) {
        let dir = root.join(rel);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("fxmanifest.lua"), "").unwrap();
    }

    fn declare(paths: &[&str]) -> Definition {
        Definition {
            resources: paths
                .iter()
                .map(|p| ResourceEntry::new(ResourceKind::Git, *p, format!("https://h/{p}.git")))
                .collect(),
            ..Definition::default()
        }
    }

    #[test]
    fn removes_orphan_then_empty_parent() {
        let (tmp, ctx) = context_for(Arc::new(MemoryLog::new()));
        let root = ctx.resources_root();
        resource_dir(root, "A");
        resource_dir(root, "C/B");

        let definition = declare(&["A"]);
        let removed = Pruner::new(&ctx, &definition).clean().unwrap();

        assert_eq!(removed, 1);
        assert!(root.join("A").is_dir());
        assert!(!root.join("C").exists());
        drop(tmp);
    }

    #[test]
    fn never_removes_root() {
        for parallel in [true, false] {
            let (_tmp, mut ctx) = context_for(Arc::new(MemoryLog::new()));
            ctx.parallel = parallel;
            std::fs::write(ctx.resources_root().join("fxmanifest.lua"), "").unwrap();
            resource_dir(ctx.resources_root(), "orphan");

            let definition = Definition::default();
            let removed = Pruner::new(&ctx, &definition).clean().unwrap();

            assert_eq!(removed, 1);
            assert!(ctx.resources_root().is_dir());
        }
    }

    #[test]
    fn missing_root_is_a_noop() {
        let (_tmp, ctx) = context_for(Arc::new(MemoryLog::new()));
        std::fs::remove_dir(ctx.resources_root()).unwrap();
        let definition = Definition::default();
        assert_eq!(Pruner::new(&ctx, &definition).clean().unwrap(), 0);
    }

    #[test]
    fn does_not_descend_into_declared_resource() {
        let (_tmp, ctx) = context_for(Arc::new(MemoryLog::new()));
        let root = ctx.resources_root();
        resource_dir(root, "[ui]/pNotify");
        // A nested marker inside a declared resource is part of that resource.
        resource_dir(root, "[ui]/pNotify/html/embedded");

        let definition = declare(&["[ui]/pNotify"]);
        assert_eq!(Pruner::new(&ctx, &definition).clean().unwrap(), 0);
        assert!(root.join("[ui]/pNotify/html/embedded").is_dir());
    }

    #[test]
    fn orphan_is_deleted_whole() {
        let (_tmp, ctx) = context_for(Arc::new(MemoryLog::new()));
        let root = ctx.resources_root();
        resource_dir(root, "orphan");
        resource_dir(root, "orphan/inner");

        let definition = Definition::default();
        assert_eq!(Pruner::new(&ctx, &definition).clean().unwrap(), 1);
        assert!(!root.join("orphan").exists());
    }

    #[test]
    fn declared_target_without_marker_is_kept() {
        let (_tmp, ctx) = context_for(Arc::new(MemoryLog::new()));
        let root = ctx.resources_root();
        std::fs::create_dir_all(root.join("pNotify/.git/objects")).unwrap();

        let definition = declare(&["pNotify"]);
        assert_eq!(Pruner::new(&ctx, &definition).clean().unwrap(), 0);
        assert!(root.join("pNotify/.git/objects").is_dir());
    }

    #[test]
    fn removes_category_without_resources() {
        let (_tmp, ctx) = context_for(Arc::new(MemoryLog::new()));
        let root = ctx.resources_root();
        std::fs::create_dir_all(root.join("[empty]/[nested]")).unwrap();

        let definition = Definition::default();
        assert_eq!(Pruner::new(&ctx, &definition).clean().unwrap(), 0);
        assert!(!root.join("[empty]").exists());
    }

    #[test]
    fn category_with_loose_files_is_kept() {
        let (_tmp, ctx) = context_for(Arc::new(MemoryLog::new()));
        let root = ctx.resources_root();
        resource_dir(root, "[maps]/orphan");
        std::fs::create_dir_all(root.join("[maps]/[nested]")).unwrap();
        std::fs::write(root.join("[maps]/readme.txt"), "keep me").unwrap();

        let definition = Definition::default();
        assert_eq!(Pruner::new(&ctx, &definition).clean().unwrap(), 1);
        assert!(!root.join("[maps]/orphan").exists());
        assert!(!root.join("[maps]/[nested]").exists());
        assert_eq!(
            std::fs::read_to_string(root.join("[maps]/readme.txt")).unwrap(),
            "keep me"
        );
    }

    #[test]
    fn keeps_category_with_declared_children() {
        let (_tmp, ctx) = context_for(Arc::new(MemoryLog::new()));
        let root = ctx.resources_root();
        resource_dir(root, "[esx]/es_extended");
        resource_dir(root, "[esx]/esx_menu");

        let definition = declare(&["[esx]/es_extended"]);
        assert_eq!(Pruner::new(&ctx, &definition).clean().unwrap(), 1);
        assert!(root.join("[esx]/es_extended").is_dir());
        assert!(!root.join("[esx]/esx_menu").exists());
    }

    #[test]
    fn legacy_marker_warns_for_declared_resource() {
        let log = Arc::new(MemoryLog::new());
        let (_tmp, ctx) = context_for(log.clone());
        let dir = ctx.resources_root().join("old");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("__resource.lua"), "").unwrap();

        let definition = declare(&["old"]);
        assert_eq!(Pruner::new(&ctx, &definition).clean().unwrap(), 0);
        assert!(dir.is_dir());
        assert_eq!(
            log.messages(Severity::Warn),
            vec!["Outdated resource manifest for old"]
        );
    }

    #[test]
    fn legacy_marker_orphan_is_removed() {
        let (_tmp, ctx) = context_for(Arc::new(MemoryLog::new()));
        let dir = ctx.resources_root().join("old");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("__resource.lua"), "").unwrap();

        let definition = Definition::default();
        assert_eq!(Pruner::new(&ctx, &definition).clean().unwrap(), 1);
        assert!(!dir.exists());
    }

    #[test]
    fn second_pass_is_a_noop() {
        let (_tmp, ctx) = context_for(Arc::new(MemoryLog::new()));
        let root = ctx.resources_root();
        resource_dir(root, "A");
        resource_dir(root, "[x]/B");

        let definition = declare(&["A"]);
        assert_eq!(Pruner::new(&ctx, &definition).clean().unwrap(), 1);
        assert_eq!(Pruner::new(&ctx, &definition).clean().unwrap(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_directory_is_not_followed() {
        let outside = tempfile::tempdir().unwrap();
        resource_dir(outside.path(), "victim");
        let (_tmp, ctx) = context_for(Arc::new(MemoryLog::new()));
        std::os::unix::fs::symlink(outside.path(), ctx.resources_root().join("link")).unwrap();

        let definition = Definition::default();
        assert_eq!(Pruner::new(&ctx, &definition).clean().unwrap(), 0);
        assert!(outside.path().join("victim/fxmanifest.lua").exists());
    }
}
