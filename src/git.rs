//! Version-control capability used by the git installer.
//!
//! Installers only talk to [`GitClient`]; [`Git2Client`] is the production
//! implementation on libgit2.  Authentication is delegated to the user's
//! environment (SSH agent, git credential helpers).
use std::borrow::Cow;
use std::path::Path;

use git2::{
    Cred, CredentialType, ErrorClass, ErrorCode, FetchOptions, RemoteCallbacks, Repository,
    build::RepoBuilder,
};

use crate::resources::error::ResourceError;

/// Remote that records where a working tree was cloned from.
pub const ORIGIN: &str = "origin";

/// Clone and inspect working trees.
#[cfg_attr(test, mockall::automock)]
pub trait GitClient: Send + Sync {
    /// Clone `url` into `dest`, leaving `origin` set to `url` exactly.
    ///
    /// `dest` must not exist or be an empty directory.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Git`] if the clone fails.
    fn clone_repo(&self, url: &str, dest: &Path) -> Result<(), ResourceError>;

    /// URL of the `origin` remote of the working tree at `repo`, or `None`
    /// if no such remote is configured.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Git`] if `repo` cannot be opened.
    fn origin_url(&self, repo: &Path) -> Result<Option<String>, ResourceError>;
}

/// [`GitClient`] backed by libgit2.
#[derive(Debug, Default, Clone, Copy)]
pub struct Git2Client;

impl GitClient for Git2Client {
    fn clone_repo(&self, url: &str, dest: &Path) -> Result<(), ResourceError> {
        let mut callbacks = RemoteCallbacks::new();
        setup_auth_callbacks(&mut callbacks);

        let mut fetch_options = FetchOptions::new();
        fetch_options.remote_callbacks(callbacks);

        let mut builder = RepoBuilder::new();
        builder.fetch_options(fetch_options);

        let source = normalize_ssh_url(url);
        let repo = builder
            .clone(source.as_ref(), dest)
            .map_err(|e| git_error("clone", url, &e))?;

        // libgit2 needs the ssh:// form; keep the declared spelling as origin.
        if source != url {
            repo.remote_set_url(ORIGIN, url)
                .map_err(|e| git_error("set-url", url, &e))?;
        }
        Ok(())
    }

    fn origin_url(&self, repo: &Path) -> Result<Option<String>, ResourceError> {
        let location = repo.display().to_string();
        let repository = Repository::open(repo).map_err(|e| git_error("open", &location, &e))?;
        match repository.find_remote(ORIGIN) {
            Ok(remote) => Ok(remote.url().map(str::to_string)),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
            Err(e) => Err(git_error("remote", &location, &e)),
        }
    }
}

fn git_error(operation: &str, url: &str, err: &git2::Error) -> ResourceError {
    ResourceError::Git {
        operation: operation.to_string(),
        url: url.to_string(),
        reason: interpret_git_error(err),
    }
}

/// Rewrite SCP-style `git@host:path` into `ssh://git@host/path`.
///
/// Other URLs are returned unchanged.
fn normalize_ssh_url(url: &str) -> Cow<'_, str> {
    if !url.starts_with("git@") {
        return Cow::Borrowed(url);
    }
    match url.split_once(':') {
        Some((host, path)) => {
            let path = path.strip_prefix('/').unwrap_or(path);
            Cow::Owned(format!("ssh://{host}/{path}"))
        }
        None => Cow::Borrowed(url),
    }
}

/// Map a libgit2 error onto a short, user-facing reason.
fn interpret_git_error(err: &git2::Error) -> String {
    let message = err.message().to_lowercase();
    if message.contains("not found") || message.contains("404") {
        "repository not found".to_string()
    } else if message.contains("authentication") || message.contains("credentials") {
        "authentication failed".to_string()
    } else if message.contains("timed out") || message.contains("connection") {
        format!("network error: {}", err.message())
    } else if err.class() == ErrorClass::Ssh {
        format!("SSH error: {}", err.message())
    } else {
        err.message().to_string()
    }
}

/// Install credential callbacks: default credentials, then the SSH agent,
/// then the configured git credential helper.
///
/// libgit2 re-invokes the callback after every rejected credential, so the
/// number of attempts is capped.
fn setup_auth_callbacks(callbacks: &mut RemoteCallbacks<'_>) {
    let mut attempts = 0u8;
    callbacks.credentials(move |url, username_from_url, allowed_types| {
        attempts += 1;
        if attempts > 3 {
            return Err(git2::Error::new(
                ErrorCode::Auth,
                ErrorClass::Net,
                "authentication failed",
            ));
        }

        if allowed_types.contains(CredentialType::DEFAULT) {
            return Cred::default();
        }

        if allowed_types.contains(CredentialType::SSH_KEY) {
            return Cred::ssh_key_from_agent(username_from_url.unwrap_or("git"));
        }

        if allowed_types.contains(CredentialType::USER_PASS_PLAINTEXT)
            && let Ok(config) = git2::Config::open_default()
            && let Ok(cred) = Cred::credential_helper(&config, url, username_from_url)
        {
            return Ok(cred);
        }

        Err(git2::Error::new(
            ErrorCode::Auth,
            ErrorClass::Net,
            "no usable credentials",
        ))
    });
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn init_source_repo() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        std::fs::write(dir.path().join("fxmanifest.lua"), "fx_version 'cerulean'\n").unwrap();
        let mut index = repo.index().unwrap();
        index.add_path(Path::new("fxmanifest.lua")).unwrap();
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let sig = git2::Signature::now("rsm", "rsm@example.invalid").unwrap();
        repo.commit(Some("HEAD"), &sig, &sig, "initial", &tree, &[])
            .unwrap();
        dir
    }

    // -----------------------------------------------------------------------
    // normalize_ssh_url
    // -----------------------------------------------------------------------

    #[test]
    fn scp_style_url_is_rewritten() {
        assert_eq!(
            normalize_ssh_url("git@github.com:owner/repo.git"),
            "ssh://git@github.com/owner/repo.git"
        );
    }

    #[test]
    fn https_url_is_unchanged() {
        let url = "https://github.com/owner/repo.git";
        assert!(matches!(normalize_ssh_url(url), Cow::Borrowed(u) if u == url));
    }

    // -----------------------------------------------------------------------
    // Git2Client
    // -----------------------------------------------------------------------

    #[test]
    fn clone_local_repository_sets_origin() {
        let source = init_source_repo();
        let dest = tempfile::tempdir().unwrap();
        let target = dest.path().join("pNotify");
        let url = source.path().to_str().unwrap();

        Git2Client.clone_repo(url, &target).unwrap();

        assert!(target.join("fxmanifest.lua").exists());
        assert_eq!(
            Git2Client.origin_url(&target).unwrap().as_deref(),
            Some(url)
        );
    }

    #[test]
    fn clone_missing_source_is_git_error() {
        let dest = tempfile::tempdir().unwrap();
        let err = Git2Client
            .clone_repo(
                dest.path().join("no-such-repo").to_str().unwrap(),
                &dest.path().join("out"),
            )
            .unwrap_err();
        assert!(matches!(err, ResourceError::Git { ref operation, .. } if operation == "clone"));
    }

    #[test]
    fn origin_url_is_none_without_remote() {
        let dir = tempfile::tempdir().unwrap();
        Repository::init(dir.path()).unwrap();
        assert_eq!(Git2Client.origin_url(dir.path()).unwrap(), None);
    }

    #[test]
    fn origin_url_errors_outside_repository() {
        let dir = tempfile::tempdir().unwrap();
        let err = Git2Client.origin_url(dir.path()).unwrap_err();
        assert!(matches!(err, ResourceError::Git { ref operation, .. } if operation == "open"));
    }
}
