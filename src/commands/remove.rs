//! Command: undeclare a resource and prune it from disk.
use anyhow::Result;
use std::sync::Arc;

use crate::cli::{GlobalOpts, RemoveOpts};
use crate::commands::CommandSetup;
use crate::config::definition::DefinitionStore;
use crate::logging::Log;
use crate::reconcile::{Context, Reconciler};

/// Run the remove command.
///
/// # Errors
///
/// Returns an error if the definition cannot be loaded or saved, or the
/// pruner fails.
pub fn run(global: &GlobalOpts, opts: &RemoveOpts, log: &Arc<dyn Log>) -> Result<()> {
    let ctx = CommandSetup::init(global, log.as_ref())?
        .into_context(Arc::clone(log), global.parallel);

    let removed = execute(&ctx, &opts.path)?;
    if removed > 0 {
        log.info(&format!("Successfully removed {removed} resources."));
    } else {
        log.warn(&format!(
            "No resources removed! Resource with path {} does not exist.",
            opts.path
        ));
    }
    Ok(())
}

/// Remove every entry declared at `path` and prune the resources root.
///
/// Returns how many entries were undeclared.  No installer runs.
///
/// # Errors
///
/// Returns an error if the definition cannot be loaded or saved, or the
/// pruner fails.
pub fn execute(ctx: &Context, path: &str) -> Result<usize> {
    let mut store = DefinitionStore::load(&ctx.paths.definition, ctx.resources_root())?;

    ctx.log.stage("Updating resource definition");
    let removed = store.remove_resource(path)?;
    ctx.log
        .debug(&format!("{removed} entries declared at {path} removed"));

    let pruned = Reconciler::new(ctx).prune(store.definition())?;
    ctx.log.debug(&format!("{pruned} resources pruned"));
    Ok(removed)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::definition::{ResourceEntry, ResourceKind};
    use crate::git::MockGitClient;
    use crate::logging::MemoryLog;
    use crate::reconcile::test_helpers::context_for;

    fn declare(ctx: &Context, paths: &[&str]) {
        DefinitionStore::init(&ctx.paths.definition, false).unwrap();
        let mut store =
            DefinitionStore::load(&ctx.paths.definition, ctx.resources_root()).unwrap();
        for path in paths {
            store
                .add_resource(ResourceEntry::new(
                    ResourceKind::Git,
                    *path,
                    format!("https://h/{path}.git"),
                ))
                .unwrap();
            let dir = ctx.resources_root().join(path);
            std::fs::create_dir_all(dir.join(".git")).unwrap();
            std::fs::write(dir.join("fxmanifest.lua"), "").unwrap();
        }
    }

    #[test]
    fn removes_entry_and_directory() {
        let (_tmp, ctx) = context_for(Arc::new(MemoryLog::new()));
        let mut git = MockGitClient::new();
        git.expect_clone_repo().never();
        let ctx = ctx.with_git(Arc::new(git));
        declare(&ctx, &["[esx]/es_extended", "[esx]/esx_menu"]);

        assert_eq!(execute(&ctx, "[esx]/esx_menu").unwrap(), 1);

        let store = DefinitionStore::load(&ctx.paths.definition, ctx.resources_root()).unwrap();
        assert_eq!(store.resources().len(), 1);
        assert!(!ctx.resources_root().join("[esx]/esx_menu").exists());
        assert!(ctx.resources_root().join("[esx]/es_extended").is_dir());
    }

    #[test]
    fn equivalent_path_spelling_matches() {
        let (_tmp, ctx) = context_for(Arc::new(MemoryLog::new()));
        declare(&ctx, &["[ui]/pNotify"]);
        assert_eq!(execute(&ctx, "./[ui]/pNotify/").unwrap(), 1);
        assert!(!ctx.resources_root().join("[ui]").exists());
    }

    #[test]
    fn unknown_path_removes_nothing() {
        let (_tmp, ctx) = context_for(Arc::new(MemoryLog::new()));
        declare(&ctx, &["pNotify"]);
        assert_eq!(execute(&ctx, "absent").unwrap(), 0);
        assert!(ctx.resources_root().join("pNotify").is_dir());
    }
}
