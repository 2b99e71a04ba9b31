use anyhow::{Result, anyhow};
use std::sync::Arc;

use crate::cli::{GlobalOpts, InstallOpts};
use crate::commands::{CommandSetup, version};
use crate::config::definition::{DefinitionStore, ResourceEntry};
use crate::logging::Log;
use crate::reconcile::{Context, Reconciler, Summary};
use crate::resolver;

/// Run the install command.
///
/// # Errors
///
/// Returns an error if the definition cannot be loaded, the reference cannot
/// be classified, or any resource fails to install.
pub fn run(global: &GlobalOpts, opts: &InstallOpts, log: &Arc<dyn Log>) -> Result<()> {
    log.info(&format!("rsm {}", version::version()));
    let ctx = CommandSetup::init(global, log.as_ref())?
        .into_context(Arc::clone(log), global.parallel);

    let summary = execute(&ctx, opts.reference.as_deref(), opts.path.as_deref())?;
    log.info(&summary.to_string());
    Ok(())
}

/// Optionally declare `reference`, then reconcile every declared resource.
///
/// With a `reference` the resource type is resolved first and the entry is
/// appended to the definition (unless the same type and url are already
/// declared).  A missing `path` is derived from the reference.
///
/// # Errors
///
/// Returns an error if the definition cannot be loaded or saved, the
/// reference is unsupported, or reconciliation fails.
pub fn execute(ctx: &Context, reference: Option<&str>, path: Option<&str>) -> Result<Summary> {
    let mut store = DefinitionStore::load(&ctx.paths.definition, ctx.resources_root())?;

    if let Some(reference) = reference {
        declare(ctx, &mut store, reference, path)?;
    }

    Reconciler::new(ctx).install(store.definition())
}

fn declare(
    ctx: &Context,
    store: &mut DefinitionStore,
    reference: &str,
    path: Option<&str>,
) -> Result<()> {
    ctx.log.stage("Resolving resource type");
    let kind = resolver::classify(reference, ctx.http.as_ref())?;
    let path = match path {
        Some(path) => path.to_string(),
        None => resolver::derive_path(reference).ok_or_else(|| {
            anyhow!("cannot derive a resource path from \"{reference}\"; pass one explicitly")
        })?,
    };
    ctx.log.debug(&format!("{reference} resolved as {kind}"));

    if store.add_resource(ResourceEntry::new(kind, path.as_str(), reference))? {
        ctx.log.info(&format!("declared {kind} resource {path}"));
    } else {
        ctx.log
            .info(&format!("{reference} is already declared, nothing to add"));
    }
    Ok(())
}
