//! Command: print version information.

/// Version string embedded at build time, falling back to the crate version.
#[must_use]
pub fn version() -> &'static str {
    option_env!("RSM_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"))
}

/// Print the rsm version to stdout.
#[allow(clippy::print_stdout)]
pub fn run() {
    println!("rsm {}", version());
}
