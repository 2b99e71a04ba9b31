//! Command: create an empty resource definition.
use anyhow::Result;
use std::path::Path;

use crate::cli::{GlobalOpts, InitOpts};
use crate::commands::CommandSetup;
use crate::config::definition::DefinitionStore;
use crate::logging::Log;

/// Run the init command.
///
/// # Errors
///
/// Returns an error if a definition already exists and `--force` was not
/// given, or if the file cannot be written.
pub fn run(global: &GlobalOpts, opts: &InitOpts, log: &dyn Log) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;
    execute(&setup.paths.definition, opts.force, log)
}

/// Write an empty definition to `file`.
///
/// # Errors
///
/// Returns [`crate::error::DefinitionError::AlreadyExists`] when `file`
/// exists and `force` is unset.
pub fn execute(file: &Path, force: bool, log: &dyn Log) -> Result<()> {
    log.stage("Creating resource definition");
    DefinitionStore::init(file, force)?;
    log.info(&format!("created {}", file.display()));
    Ok(())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::DefinitionError;
    use crate::logging::MemoryLog;

    #[test]
    fn creates_empty_definition() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("resources.json");
        execute(&file, false, &MemoryLog::new()).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&file).unwrap()).unwrap();
        assert_eq!(json, serde_json::json!({ "resources": [] }));
    }

    #[test]
    fn refuses_existing_definition_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("resources.json");
        std::fs::write(&file, "{\"resources\": [{\"path\": \"keep\"}]}").unwrap();

        let err = execute(&file, false, &MemoryLog::new()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DefinitionError>(),
            Some(DefinitionError::AlreadyExists { .. })
        ));
        assert!(std::fs::read_to_string(&file).unwrap().contains("keep"));
    }

    #[test]
    fn force_replaces_existing_definition() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("resources.json");
        std::fs::write(&file, "{\"resources\": [{\"path\": \"old\"}]}").unwrap();
        execute(&file, true, &MemoryLog::new()).unwrap();
        assert!(!std::fs::read_to_string(&file).unwrap().contains("old"));
    }
}
