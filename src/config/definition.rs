//! The resource definition (`resources.json`) and its store.
//!
//! The definition is the single durable record of which resources a project
//! declares.  [`DefinitionStore`] owns it for one command invocation: it is
//! loaded once, mutated only through [`DefinitionStore::add_resource`] and
//! [`DefinitionStore::remove_resource`], and every mutation is persisted
//! immediately as a whole-file atomic replace.
use serde::ser::SerializeMap as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use std::io::Write as _;
use std::path::{Component, Path, PathBuf};

use crate::error::DefinitionError;

/// Default definition file name.
pub const DEFINITION_FILE: &str = "resources.json";

const RESOURCES_KEY: &str = "resources";

/// Installation strategy of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    /// A git repository cloned into the target path.
    #[serde(rename = "GIT", alias = "git")]
    Git,
    /// A gzip-compressed tar archive extracted into the target path.
    #[serde(rename = "TARBALL", alias = "tarball")]
    Tarball,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Git => f.write_str("GIT"),
            Self::Tarball => f.write_str("TARBALL"),
        }
    }
}

/// One declared resource.
///
/// Known keys are written as `type`, `path`, `url`, followed by any unknown
/// keys in the order they were read.
///
/// # Examples
///
/// ```
/// use rsm_cli::config::definition::{ResourceEntry, ResourceKind};
///
/// let entry: ResourceEntry =
///     serde_json::from_str(r#"{"path":"pNotify","url":"https://host/repo.git"}"#).unwrap();
/// assert_eq!(entry.kind(), ResourceKind::Git);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceEntry {
    /// Declared strategy; absent means git.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ResourceKind>,
    /// Path relative to the resources root; the unique key of the entry.
    pub path: String,
    /// Source URL (clone source or archive location).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Fields this tool does not interpret, preserved on save.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ResourceEntry {
    /// Create an entry with an explicit strategy.
    #[must_use]
    pub fn new(kind: ResourceKind, path: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            kind: Some(kind),
            path: path.into(),
            url: Some(url.into()),
            extra: Map::new(),
        }
    }

    /// Effective strategy, treating an absent `type` as git.
    #[must_use]
    pub fn kind(&self) -> ResourceKind {
        self.kind.unwrap_or(ResourceKind::Git)
    }

    /// Absolute on-disk location of this resource under `resources_root`.
    #[must_use]
    pub fn target(&self, resources_root: &Path) -> PathBuf {
        resolve_under(resources_root, Path::new(&self.path))
    }

    /// Like [`ResourceEntry::target`], but refuse locations that are not
    /// strictly inside `resources_root`.
    ///
    /// # Errors
    ///
    /// Returns [`DefinitionError::InvalidPath`] if `path` is absolute, or
    /// normalises to the resources root itself or outside it.
    pub fn checked_target(&self, resources_root: &Path) -> Result<PathBuf, DefinitionError> {
        let invalid = |reason| DefinitionError::InvalidPath {
            path: self.path.clone(),
            reason,
        };
        let relative = Path::new(&self.path);
        if relative
            .components()
            .any(|c| matches!(c, Component::Prefix(_) | Component::RootDir))
        {
            return Err(invalid("must be relative to the resources root"));
        }
        let root = normalize(resources_root);
        let target = self.target(resources_root);
        if target == root {
            return Err(invalid("resolves to the resources root itself"));
        }
        if !target.starts_with(&root) {
            return Err(invalid("resolves outside the resources root"));
        }
        Ok(target)
    }
}

/// The declared list of resources.
///
/// Top-level keys keep their original order on save, with `resources`
/// written back where it was read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Definition {
    /// Declared resources, in declaration order.
    pub resources: Vec<ResourceEntry>,
    /// Top-level fields this tool does not interpret, preserved on save.
    pub extra: Map<String, Value>,
    /// Index of `resources` among the top-level keys.
    pub(crate) resources_position: usize,
}

impl Definition {
    /// Find the entry whose resolved target equals `candidate`.
    #[must_use]
    pub fn find_by_target(&self, resources_root: &Path, candidate: &Path) -> Option<&ResourceEntry> {
        let candidate = normalize(candidate);
        self.resources
            .iter()
            .find(|entry| entry.target(resources_root) == candidate)
    }

    /// Check that every entry resolves strictly inside `resources_root` and
    /// that no two entries share a target or nest inside one another.
    ///
    /// # Errors
    ///
    /// Returns [`DefinitionError::InvalidPath`] for the first path that
    /// leaves the root, or [`DefinitionError::PathConflict`] for the first
    /// entry overlapping an earlier one.
    pub fn validate(&self, resources_root: &Path) -> Result<(), DefinitionError> {
        let mut seen: Vec<(&str, PathBuf)> = Vec::with_capacity(self.resources.len());
        for entry in &self.resources {
            let target = entry.checked_target(resources_root)?;
            if let Some((existing, _)) = seen.iter().find(|(_, other)| overlaps(other, &target)) {
                return Err(DefinitionError::PathConflict {
                    path: entry.path.clone(),
                    existing: (*existing).to_string(),
                });
            }
            seen.push((entry.path.as_str(), target));
        }
        Ok(())
    }
}

impl Serialize for Definition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let at = self.resources_position.min(self.extra.len());
        let mut map = serializer.serialize_map(Some(self.extra.len() + 1))?;
        for (index, (key, value)) in self.extra.iter().enumerate() {
            if index == at {
                map.serialize_entry(RESOURCES_KEY, &self.resources)?;
            }
            map.serialize_entry(key, value)?;
        }
        if at == self.extra.len() {
            map.serialize_entry(RESOURCES_KEY, &self.resources)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Definition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut extra = Map::<String, Value>::deserialize(deserializer)?;
        let resources_position = extra
            .keys()
            .position(|key| key == RESOURCES_KEY)
            .unwrap_or(extra.len());
        let resources = match extra.shift_remove(RESOURCES_KEY) {
            Some(value) => serde_json::from_value(value).map_err(serde::de::Error::custom)?,
            None => Vec::new(),
        };
        Ok(Self {
            resources,
            extra,
            resources_position,
        })
    }
}

/// Two targets overlap when they are equal or one contains the other.
fn overlaps(a: &Path, b: &Path) -> bool {
    a.starts_with(b) || b.starts_with(a)
}

/// Join `relative` onto `root` and normalize the result lexically.
///
/// `.` segments are dropped and `..` segments pop the previous component, so
/// `pNotify`, `./pNotify` and `[ui]/../pNotify/` all resolve to the same path.
#[must_use]
pub fn resolve_under(root: &Path, relative: &Path) -> PathBuf {
    normalize(&root.join(relative))
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Loads, mutates and persists the definition file.
#[derive(Debug)]
pub struct DefinitionStore {
    file: PathBuf,
    resources_root: PathBuf,
    definition: Definition,
}

impl DefinitionStore {
    /// Load the definition at `file`.
    ///
    /// `resources_root` is used to resolve entry paths for removal.
    ///
    /// # Errors
    ///
    /// Returns [`DefinitionError::NotFound`] if the file does not exist,
    /// [`DefinitionError::Parse`] on malformed content,
    /// [`DefinitionError::InvalidPath`] or [`DefinitionError::PathConflict`]
    /// if an entry's path escapes the root or overlaps another entry, or
    /// [`DefinitionError::Io`] if the file cannot be read.
    pub fn load(file: &Path, resources_root: &Path) -> Result<Self, DefinitionError> {
        if !file.exists() {
            return Err(DefinitionError::NotFound {
                path: file.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(file).map_err(|source| DefinitionError::Io {
            path: file.to_path_buf(),
            source,
        })?;
        let definition: Definition =
            serde_json::from_str(&content).map_err(|source| DefinitionError::Parse {
                path: file.to_path_buf(),
                source,
            })?;
        definition.validate(resources_root)?;
        Ok(Self {
            file: file.to_path_buf(),
            resources_root: resources_root.to_path_buf(),
            definition,
        })
    }

    /// Write an empty definition to `file`.
    ///
    /// # Errors
    ///
    /// Returns [`DefinitionError::AlreadyExists`] if the file is present and
    /// `overwrite` is `false`, or [`DefinitionError::Io`] if writing fails.
    pub fn init(file: &Path, overwrite: bool) -> Result<(), DefinitionError> {
        if file.exists() && !overwrite {
            return Err(DefinitionError::AlreadyExists {
                path: file.to_path_buf(),
            });
        }
        write_definition(file, &Definition::default())
    }

    /// The in-memory definition.
    #[must_use]
    pub const fn definition(&self) -> &Definition {
        &self.definition
    }

    /// Declared resources, in declaration order.
    #[must_use]
    pub fn resources(&self) -> &[ResourceEntry] {
        &self.definition.resources
    }

    /// Resources root used to resolve entry paths.
    #[must_use]
    pub fn resources_root(&self) -> &Path {
        &self.resources_root
    }

    /// Definition file this store persists to.
    #[must_use]
    pub fn file(&self) -> &Path {
        &self.file
    }

    /// Persist the whole definition, replacing the file atomically.
    ///
    /// # Errors
    ///
    /// Returns [`DefinitionError::Io`] if the file cannot be written.
    pub fn save(&self) -> Result<(), DefinitionError> {
        write_definition(&self.file, &self.definition)
    }

    /// Append `entry` and persist, unless an entry with the same type and url
    /// is already declared.  An absent `type` compares as git.
    ///
    /// Returns `true` if the entry was added.
    ///
    /// # Errors
    ///
    /// Returns [`DefinitionError::InvalidPath`] if the path does not resolve
    /// strictly inside the resources root, [`DefinitionError::PathConflict`]
    /// if another source already occupies (or nests with) that target, or
    /// [`DefinitionError::Io`] if the definition cannot be saved.
    pub fn add_resource(&mut self, entry: ResourceEntry) -> Result<bool, DefinitionError> {
        let target = entry.checked_target(&self.resources_root)?;
        let resources = &self.definition.resources;
        if resources
            .iter()
            .any(|existing| existing.kind() == entry.kind() && existing.url == entry.url)
        {
            return Ok(false);
        }
        if let Some(existing) = resources
            .iter()
            .find(|existing| overlaps(&existing.target(&self.resources_root), &target))
        {
            return Err(DefinitionError::PathConflict {
                path: entry.path,
                existing: existing.path.clone(),
            });
        }
        self.definition.resources.push(entry);
        self.save()?;
        Ok(true)
    }

    /// Remove every entry whose resolved path equals `path`, persist, and
    /// return how many were removed.
    ///
    /// # Errors
    ///
    /// Returns [`DefinitionError::Io`] if the definition cannot be saved.
    pub fn remove_resource(&mut self, path: &str) -> Result<usize, DefinitionError> {
        let target = resolve_under(&self.resources_root, Path::new(path));
        let before = self.definition.resources.len();
        self.definition
            .resources
            .retain(|entry| entry.target(&self.resources_root) != target);
        let removed = before - self.definition.resources.len();
        self.save()?;
        Ok(removed)
    }
}

/// Serialize `definition` next to `file` and rename it into place.
fn write_definition(file: &Path, definition: &Definition) -> Result<(), DefinitionError> {
    let io_err = |source| DefinitionError::Io {
        path: file.to_path_buf(),
        source,
    };
    let mut json = serde_json::to_string_pretty(definition)
        .map_err(|e| io_err(std::io::Error::other(e)))?;
    json.push('\n');

    let parent = file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent).map_err(io_err)?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(io_err)?;
    tmp.write_all(json.as_bytes()).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(file).map_err(|e| io_err(e.error))?;
    Ok(())
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;

    fn store_with(json: &str) -> (tempfile::TempDir, DefinitionStore) {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join(DEFINITION_FILE);
        std::fs::write(&file, json).unwrap();
        let store = DefinitionStore::load(&file, &dir.path().join("resources")).unwrap();
        (dir, store)
    }

    // -----------------------------------------------------------------------
    // load
    // -----------------------------------------------------------------------

    #[test]
    fn load_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = DefinitionStore::load(&dir.path().join(DEFINITION_FILE), dir.path())
            .unwrap_err();
        assert!(matches!(err, DefinitionError::NotFound { .. }));
    }

    #[test]
    fn load_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join(DEFINITION_FILE);
        std::fs::write(&file, "{ \"resources\": [ ").unwrap();
        let err = DefinitionStore::load(&file, dir.path()).unwrap_err();
        assert!(matches!(err, DefinitionError::Parse { .. }));
    }

    #[test]
    fn load_entry_without_path_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join(DEFINITION_FILE);
        std::fs::write(&file, r#"{"resources":[{"url":"https://host/a.git"}]}"#).unwrap();
        let err = DefinitionStore::load(&file, dir.path()).unwrap_err();
        assert!(matches!(err, DefinitionError::Parse { .. }));
    }

    fn load_err(json: &str) -> DefinitionError {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join(DEFINITION_FILE);
        std::fs::write(&file, json).unwrap();
        DefinitionStore::load(&file, &dir.path().join("resources")).unwrap_err()
    }

    #[test]
    fn load_rejects_path_leaving_the_root() {
        for path in ["..", "../sibling", "[ui]/../../x"] {
            let json = format!(r#"{{"resources":[{{"type":"TARBALL","path":"{path}","url":"u"}}]}}"#);
            let err = load_err(&json);
            assert!(
                matches!(err, DefinitionError::InvalidPath { .. }),
                "{path}: {err}"
            );
        }
    }

    #[test]
    fn load_rejects_absolute_path() {
        let err = load_err(r#"{"resources":[{"path":"/etc/passwd","url":"u"}]}"#);
        assert!(matches!(err, DefinitionError::InvalidPath { .. }));
    }

    #[test]
    fn load_rejects_path_naming_the_root() {
        for path in ["", ".", "a/.."] {
            let json = format!(r#"{{"resources":[{{"path":"{path}","url":"u"}}]}}"#);
            assert!(matches!(load_err(&json), DefinitionError::InvalidPath { .. }));
        }
    }

    #[test]
    fn load_rejects_entries_sharing_a_target() {
        let err = load_err(
            r#"{"resources":[{"path":"pNotify","url":"a"},{"path":"./pNotify/","url":"b"}]}"#,
        );
        match err {
            DefinitionError::PathConflict { path, existing } => {
                assert_eq!(path, "./pNotify/");
                assert_eq!(existing, "pNotify");
            }
            other => panic!("expected a path conflict, got {other}"),
        }
    }

    #[test]
    fn load_rejects_nested_targets() {
        let err = load_err(
            r#"{"resources":[{"path":"[ui]/pNotify/html","url":"a"},{"path":"[ui]/pNotify","url":"b"}]}"#,
        );
        assert!(matches!(err, DefinitionError::PathConflict { .. }));
    }

    #[test]
    fn sibling_prefix_is_not_nesting() {
        let (_dir, store) = store_with(
            r#"{"resources":[{"path":"pNotify","url":"a"},{"path":"pNotify2","url":"b"}]}"#,
        );
        assert_eq!(store.resources().len(), 2);
    }

    #[test]
    fn load_without_resources_defaults_to_empty() {
        let (_dir, store) = store_with("{}");
        assert!(store.resources().is_empty());
    }

    #[test]
    fn absent_type_is_git() {
        let (_dir, store) = store_with(r#"{"resources":[{"path":"pNotify","url":"u"}]}"#);
        assert_eq!(store.resources()[0].kind, None);
        assert_eq!(store.resources()[0].kind(), ResourceKind::Git);
    }

    #[test]
    fn lowercase_type_is_accepted() {
        let (_dir, store) =
            store_with(r#"{"resources":[{"type":"tarball","path":"maps","url":"u"}]}"#);
        assert_eq!(store.resources()[0].kind(), ResourceKind::Tarball);
    }

    // -----------------------------------------------------------------------
    // save
    // -----------------------------------------------------------------------

    #[test]
    fn save_then_load_round_trips_unknown_fields() {
        let (dir, store) = store_with(
            r#"{"resources":[{"type":"GIT","path":"a","url":"u","branch":"main"}],"version":2}"#,
        );
        store.save().unwrap();
        let reloaded =
            DefinitionStore::load(store.file(), &dir.path().join("resources")).unwrap();
        assert_eq!(reloaded.definition(), store.definition());
        assert_eq!(reloaded.resources()[0].extra["branch"], "main");
        assert_eq!(reloaded.definition().extra["version"], 2);
    }

    #[test]
    fn save_keeps_hand_written_key_order() {
        let original = r#"{
  "version": 1,
  "resources": [
    {
      "type": "GIT",
      "path": "a",
      "url": "u",
      "zeta": 1,
      "alpha": 2
    }
  ],
  "server": "main"
}
"#;
        let (_dir, store) = store_with(original);
        store.save().unwrap();
        assert_eq!(std::fs::read_to_string(store.file()).unwrap(), original);
    }

    #[test]
    fn save_keeps_order_of_compact_file() {
        let (_dir, store) = store_with(
            r#"{"version":1,"resources":[{"path":"a","url":"u","zeta":1,"alpha":2}]}"#,
        );
        store.save().unwrap();
        let text = std::fs::read_to_string(store.file()).unwrap();
        let at = |needle: &str| text.find(needle).unwrap();
        assert!(at("\"version\"") < at("\"resources\""));
        assert!(at("\"zeta\"") < at("\"alpha\""));
    }

    #[test]
    fn save_is_stable_across_repeated_saves() {
        let (_dir, store) = store_with(r#"{"resources":[{"path":"a","url":"u"}]}"#);
        store.save().unwrap();
        let first = std::fs::read_to_string(store.file()).unwrap();
        store.save().unwrap();
        let second = std::fs::read_to_string(store.file()).unwrap();
        assert_eq!(first, second);
        assert!(!first.contains("\"type\""), "absent type must stay absent");
    }

    #[test]
    fn save_leaves_no_temporary_files() {
        let (dir, store) = store_with("{}");
        store.save().unwrap();
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from(DEFINITION_FILE)]);
    }

    // -----------------------------------------------------------------------
    // init
    // -----------------------------------------------------------------------

    #[test]
    fn init_writes_empty_definition() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join(DEFINITION_FILE);
        DefinitionStore::init(&file, false).unwrap();
        let store = DefinitionStore::load(&file, dir.path()).unwrap();
        assert!(store.resources().is_empty());
    }

    #[test]
    fn init_refuses_existing_definition() {
        let (_dir, store) = store_with(r#"{"resources":[{"path":"a","url":"u"}]}"#);
        let err = DefinitionStore::init(store.file(), false).unwrap_err();
        assert!(matches!(err, DefinitionError::AlreadyExists { .. }));
        let content = std::fs::read_to_string(store.file()).unwrap();
        assert!(content.contains("\"a\""), "existing file must be untouched");
    }

    #[test]
    fn init_overwrites_when_confirmed() {
        let (dir, store) = store_with(r#"{"resources":[{"path":"a","url":"u"}]}"#);
        DefinitionStore::init(store.file(), true).unwrap();
        let reloaded = DefinitionStore::load(store.file(), dir.path()).unwrap();
        assert!(reloaded.resources().is_empty());
    }

    // -----------------------------------------------------------------------
    // add_resource
    // -----------------------------------------------------------------------

    #[test]
    fn add_resource_appends_and_persists() {
        let (dir, mut store) = store_with("{}");
        let added = store
            .add_resource(ResourceEntry::new(ResourceKind::Git, "pNotify", "https://h/p.git"))
            .unwrap();
        assert!(added);
        let reloaded =
            DefinitionStore::load(store.file(), &dir.path().join("resources")).unwrap();
        assert_eq!(reloaded.resources().len(), 1);
        assert_eq!(reloaded.resources()[0].path, "pNotify");
    }

    #[test]
    fn add_resource_dedupes_on_type_and_url_not_path() {
        let (_dir, mut store) = store_with("{}");
        store
            .add_resource(ResourceEntry::new(ResourceKind::Git, "a", "https://h/p.git"))
            .unwrap();
        let added = store
            .add_resource(ResourceEntry::new(ResourceKind::Git, "b", "https://h/p.git"))
            .unwrap();
        assert!(!added);
        assert_eq!(store.resources().len(), 1);
        assert_eq!(store.resources()[0].path, "a");
    }

    #[test]
    fn add_resource_same_url_different_type_is_added() {
        let (_dir, mut store) = store_with("{}");
        store
            .add_resource(ResourceEntry::new(ResourceKind::Git, "a", "https://h/p"))
            .unwrap();
        let added = store
            .add_resource(ResourceEntry::new(ResourceKind::Tarball, "b", "https://h/p"))
            .unwrap();
        assert!(added);
        assert_eq!(store.resources().len(), 2);
    }

    #[test]
    fn add_resource_rejects_path_outside_root() {
        let (dir, mut store) = store_with("{}");
        for path in ["../x", "/etc/passwd", "."] {
            let err = store
                .add_resource(ResourceEntry::new(ResourceKind::Tarball, path, "https://h/x.tgz"))
                .unwrap_err();
            assert!(matches!(err, DefinitionError::InvalidPath { .. }), "{path}");
        }
        let reloaded =
            DefinitionStore::load(store.file(), &dir.path().join("resources")).unwrap();
        assert!(reloaded.resources().is_empty());
    }

    #[test]
    fn add_resource_rejects_path_declared_under_other_url() {
        let (_dir, mut store) = store_with(r#"{"resources":[{"path":"pNotify","url":"a"}]}"#);
        let err = store
            .add_resource(ResourceEntry::new(ResourceKind::Git, "./pNotify", "c"))
            .unwrap_err();
        assert!(matches!(err, DefinitionError::PathConflict { .. }));
        let err = store
            .add_resource(ResourceEntry::new(ResourceKind::Git, "pNotify/html", "d"))
            .unwrap_err();
        assert!(matches!(err, DefinitionError::PathConflict { .. }));
        assert_eq!(store.resources().len(), 1);
    }

    #[test]
    fn add_resource_same_source_at_taken_path_is_noop() {
        let (_dir, mut store) = store_with(r#"{"resources":[{"path":"pNotify","url":"a"}]}"#);
        let added = store
            .add_resource(ResourceEntry::new(ResourceKind::Git, "pNotify", "a"))
            .unwrap();
        assert!(!added);
    }

    // -----------------------------------------------------------------------
    // remove_resource
    // -----------------------------------------------------------------------

    #[test]
    fn remove_resource_matches_resolved_path() {
        let (dir, mut store) = store_with(
            r#"{"resources":[{"path":"[ui]/pNotify","url":"u"},{"path":"other","url":"v"}]}"#,
        );
        let removed = store.remove_resource("./[ui]/pNotify/").unwrap();
        assert_eq!(removed, 1);
        let reloaded =
            DefinitionStore::load(store.file(), &dir.path().join("resources")).unwrap();
        assert_eq!(reloaded.resources().len(), 1);
        assert_eq!(reloaded.resources()[0].path, "other");
    }

    #[test]
    fn remove_resource_unknown_path_returns_zero() {
        let (_dir, mut store) = store_with(r#"{"resources":[{"path":"a","url":"u"}]}"#);
        assert_eq!(store.remove_resource("b").unwrap(), 0);
        assert_eq!(store.resources().len(), 1);
    }

    // -----------------------------------------------------------------------
    // path resolution
    // -----------------------------------------------------------------------

    #[test]
    fn resolve_under_normalizes_segments() {
        let root = Path::new("/srv/resources");
        assert_eq!(
            resolve_under(root, Path::new("./[ui]/../pNotify/")),
            PathBuf::from("/srv/resources/pNotify")
        );
    }

    #[test]
    fn checked_target_stays_under_root() {
        let root = Path::new("/srv/resources");
        let entry = ResourceEntry::new(ResourceKind::Git, "[ui]/../pNotify", "u");
        assert_eq!(
            entry.checked_target(root).unwrap(),
            PathBuf::from("/srv/resources/pNotify")
        );
        let escaping = ResourceEntry::new(ResourceKind::Git, "../resources2/x", "u");
        assert!(escaping.checked_target(root).is_err());
    }

    #[test]
    fn validate_checks_in_memory_definitions() {
        let definition = Definition {
            resources: vec![ResourceEntry::new(ResourceKind::Tarball, "..", "u")],
            ..Definition::default()
        };
        assert!(matches!(
            definition.validate(Path::new("/srv/resources")),
            Err(DefinitionError::InvalidPath { .. })
        ));
    }

    #[test]
    fn find_by_target_matches_declared_entry() {
        let (_dir, store) = store_with(r#"{"resources":[{"path":"[ui]/pNotify","url":"u"}]}"#);
        let root = store.resources_root().to_path_buf();
        assert!(
            store
                .definition()
                .find_by_target(&root, &root.join("[ui]").join("pNotify"))
                .is_some()
        );
        assert!(
            store
                .definition()
                .find_by_target(&root, &root.join("pNotify"))
                .is_none()
        );
    }
}
