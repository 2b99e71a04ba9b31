//! Declarative resource manager.
//!
//! Keeps a directory tree of game-server resources in line with a JSON
//! definition file (`resources.json`): declared git repositories are cloned,
//! declared tarballs are downloaded and extracted, and any resource directory
//! the definition no longer mentions is pruned.
//!
//! The public API is organised into these layers:
//!
//! - **[`config`]**: `rsm.toml` settings and the definition store
//! - **[`resources`]**: idempotent `check + apply` installers and the filesystem prober
//! - **[`git`]**, **[`http`]**: version-control and download capabilities behind traits
//! - **[`resolver`]**: classify a bare reference as a git or tarball source
//! - **[`reconcile`]**: install buckets, pruning, and the execution context
//! - **[`commands`]**: top-level subcommand orchestration (`init`, `install`, `remove`)
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod git;
pub mod http;
pub mod logging;
pub mod reconcile;
pub mod resolver;
pub mod resources;
