// Shared helpers for integration tests.
//
// Provides a temporary-directory-backed project (root, `resources.json`,
// resources directory) and a fluent builder so each integration test can
// set up an isolated tree without repeating filesystem boilerplate.  Git
// sources are local repositories created with git2, so nothing touches the
// network.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rsm_cli::config::definition::{DefinitionStore, ResourceEntry};
use rsm_cli::config::{Config, Paths};
use rsm_cli::logging::{Log, MemoryLog};
use rsm_cli::reconcile::Context;

/// Marker file written into every fake resource.
pub const MARKER: &str = "fxmanifest.lua";

/// An isolated project backed by a [`tempfile::TempDir`].
///
/// Layout: `<root>/resources.json` and `<root>/resources/`.  Git origin
/// repositories live under `<root>/origins/`, outside the resources root.
pub struct TestProject {
    /// Temporary project root.
    pub root: tempfile::TempDir,
    /// Log every context built from this project writes to.
    pub log: Arc<MemoryLog>,
}

impl TestProject {
    /// Path to the project root.
    pub fn root_path(&self) -> &Path {
        self.root.path()
    }

    /// Path to the resources root.
    pub fn resources(&self) -> PathBuf {
        self.root.path().join("resources")
    }

    /// Path to the definition file.
    pub fn definition_file(&self) -> PathBuf {
        self.root.path().join("resources.json")
    }

    /// Load the definition store.
    pub fn store(&self) -> DefinitionStore {
        DefinitionStore::load(&self.definition_file(), &self.resources()).expect("load definition")
    }

    /// Build a reconcile context with the production git and HTTP clients.
    pub fn context(&self, parallel: bool) -> Context {
        let config = Config::load(self.root.path()).expect("load settings");
        let paths = Paths::resolve(self.root.path(), &config, None, None);
        let log: Arc<dyn Log> = self.log.clone();
        Context::new(paths, config, log, parallel)
    }

    /// Create a git repository at `origins/<name>` with one commit holding a
    /// marker file, and return its path as a clone URL.
    pub fn origin_repo(&self, name: &str) -> String {
        let dir = self.root.path().join("origins").join(name);
        init_repo_with_commit(&dir, &[(MARKER, "fx_version 'cerulean'\n")]);
        dir.to_string_lossy().into_owned()
    }
}

/// Initialise a repository at `dir` and commit `files` on its default branch.
pub fn init_repo_with_commit(dir: &Path, files: &[(&str, &str)]) {
    std::fs::create_dir_all(dir).expect("create repo dir");
    let repo = git2::Repository::init(dir).expect("init repo");
    for (name, contents) in files {
        std::fs::write(dir.join(name), contents).expect("write repo file");
    }

    let mut index = repo.index().expect("open index");
    index
        .add_all(["*"], git2::IndexAddOption::DEFAULT, None)
        .expect("stage files");
    index.write().expect("write index");
    let tree_id = index.write_tree().expect("write tree");
    let tree = repo.find_tree(tree_id).expect("find tree");
    let signature = git2::Signature::now("rsm tests", "tests@example.com").expect("signature");
    repo.commit(Some("HEAD"), &signature, &signature, "initial", &tree, &[])
        .expect("commit");
}

/// Fluent builder for [`TestProject`].
pub struct ProjectBuilder {
    project: TestProject,
    entries: Vec<ResourceEntry>,
    with_definition: bool,
}

impl ProjectBuilder {
    /// Begin building a project with an empty resources directory.
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("create temp dir");
        std::fs::create_dir_all(root.path().join("resources")).expect("create resources dir");
        Self {
            project: TestProject {
                root,
                log: Arc::new(MemoryLog::new()),
            },
            entries: Vec::new(),
            with_definition: true,
        }
    }

    /// Do not write a definition file.
    pub fn without_definition(mut self) -> Self {
        self.with_definition = false;
        self
    }

    /// Declare `entry` in the definition file.
    pub fn with_entry(mut self, entry: ResourceEntry) -> Self {
        self.entries.push(entry);
        self
    }

    /// Create a marked resource directory at `resources/<rel>`.
    pub fn with_resource_dir(self, rel: &str) -> Self {
        let dir = self.project.resources().join(rel);
        std::fs::create_dir_all(&dir).expect("create resource dir");
        std::fs::write(dir.join(MARKER), "").expect("write marker");
        self
    }

    /// Write `contents` to `<root>/<rel>`, creating parents.
    pub fn with_file(self, rel: &str, contents: &str) -> Self {
        let path = self.project.root.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create file parent");
        }
        std::fs::write(path, contents).expect("write file");
        self
    }

    /// Finish building and return the project.
    pub fn build(self) -> TestProject {
        if self.with_definition {
            let file = self.project.definition_file();
            DefinitionStore::init(&file, false).expect("init definition");
            let mut store = self.project.store();
            for entry in self.entries {
                store.add_resource(entry).expect("declare resource");
            }
        }
        self.project
    }
}
