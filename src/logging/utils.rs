//! Helpers shared by the console formatter and the file layer.
use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;

/// Timestamp format of the per-run log header.
pub(super) const HEADER_TIMESTAMP: &str = "%Y-%m-%d %H:%M:%S";
/// Timestamp format prefixed to every log line.
pub(super) const LINE_TIMESTAMP: &str = "%H:%M:%S";

/// Current UTC time rendered with a `chrono` format string.
pub(super) fn utc_now(format: &str) -> String {
    chrono::Utc::now().format(format).to_string()
}

/// Remove terminal escape sequences so log files stay plain text.
///
/// CSI sequences (`ESC [ ... final`) are dropped up to and including the
/// final byte in `@..=~`; any other escape drops itself and the following
/// character.
pub(super) fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\x1b' {
            out.push(c);
            continue;
        }
        if chars.next() == Some('[') {
            chars.by_ref().find(|ch| ('@'..='~').contains(ch));
        }
    }
    out
}

/// Base cache directory: `$XDG_CACHE_HOME`, else `<home>/.cache`, else
/// `./.cache`.
fn cache_base(xdg_cache: Option<OsString>, home: Option<OsString>) -> PathBuf {
    xdg_cache.filter(|v| !v.is_empty()).map_or_else(
        || home.map_or_else(|| PathBuf::from("."), PathBuf::from).join(".cache"),
        PathBuf::from,
    )
}

/// Path of the log file for `command`, creating `<cache>/rsm/` on demand.
///
/// Returns `None` when the directory cannot be created; file logging is then
/// skipped.
pub(super) fn log_file_path(command: &str) -> Option<PathBuf> {
    let home = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE"));
    let dir = cache_base(std::env::var_os("XDG_CACHE_HOME"), home).join("rsm");
    fs::create_dir_all(&dir).ok()?;
    Some(dir.join(format!("{command}.log")))
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn strip_ansi_keeps_plain_text() {
        assert_eq!(strip_ansi("removing undeclared resource [esx]/old"), "removing undeclared resource [esx]/old");
        assert_eq!(strip_ansi(""), "");
    }

    #[test]
    fn strip_ansi_drops_stage_styling() {
        assert_eq!(
            strip_ansi("\x1b[1;34m==>\x1b[0m \x1b[1mInstalling resources\x1b[0m"),
            "==> Installing resources"
        );
        assert_eq!(strip_ansi("\x1b[33mWARN\x1b[0m outdated"), "WARN outdated");
    }

    #[test]
    fn strip_ansi_drops_non_sgr_escapes() {
        assert_eq!(strip_ansi("\x1b[2Kprogress"), "progress");
        assert_eq!(strip_ansi("a\x1b7b"), "ab");
    }

    #[test]
    fn cache_base_prefers_xdg() {
        assert_eq!(
            cache_base(Some("/xdg".into()), Some("/home/fx".into())),
            PathBuf::from("/xdg")
        );
    }

    #[test]
    fn cache_base_falls_back_to_home_then_cwd() {
        assert_eq!(
            cache_base(Some(OsString::new()), Some("/home/fx".into())),
            PathBuf::from("/home/fx/.cache")
        );
        assert_eq!(cache_base(None, None), PathBuf::from("./.cache"));
    }

    #[test]
    fn timestamps_have_fixed_width() {
        assert_eq!(utc_now(HEADER_TIMESTAMP).len(), 19);
        assert_eq!(utc_now(LINE_TIMESTAMP).len(), 8);
    }
}
