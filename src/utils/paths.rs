//! Filesystem Path Helpers
//!
//! Path resolution and normalization shared by the config builders and the
//! file uploaders. Input paths may contain `~` or environment variables and
//! are always returned in absolute form.

use std::env;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{LaunchError, Result};

/// Matches `$VAR` and `${VAR}` occurrences inside a path string.
static ENV_VAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)").unwrap());

/// Expands environment variables, leaving unknown variables untouched.
fn expand_env_vars(value: &str) -> String {
    ENV_VAR_RE
        .replace_all(value, |caps: &regex::Captures| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str())
                .unwrap_or_default();
            env::var(name).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}

/// Expands a leading `~` to the user's home directory.
fn expand_user(value: &str) -> String {
    if value == "~" || value.starts_with("~/") {
        if let Ok(home) = env::var("HOME") {
            return format!("{}{}", home, &value[1..]);
        }
    }
    value.to_string()
}

/// Expands environment variables and `~`, returning an absolute path.
///
/// The path does not need to exist; non-existing paths are absolutized
/// against the current working directory without touching the filesystem.
pub fn resolve_path(value: &str) -> PathBuf {
    let expanded = expand_env_vars(&expand_user(value));
    let path = PathBuf::from(expanded);

    // Prefer the canonical form when the path exists (resolves symlinks
    // and `..` components), otherwise absolutize lexically.
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    if path.is_absolute() {
        path
    } else {
        env::current_dir().map(|cwd| cwd.join(&path)).unwrap_or(path)
    }
}

/// Creates the directory (and parents) if it does not already exist.
///
/// Returns the resolved absolute path of the directory.
pub fn ensure_directory(path: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(path).map_err(|e| LaunchError::io(path, e))?;
    path.canonicalize().map_err(|e| LaunchError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_resolve_path_absolute_passthrough() {
        let resolved = resolve_path("/nonexistent/pipeline/dir");
        assert_eq!(resolved, PathBuf::from("/nonexistent/pipeline/dir"));
    }

    #[test]
    fn test_resolve_path_expands_env_var() {
        env::set_var("NFLAUNCH_TEST_ROOT", "/data");
        let resolved = resolve_path("$NFLAUNCH_TEST_ROOT/params.yaml");
        assert_eq!(resolved, PathBuf::from("/data/params.yaml"));

        let resolved = resolve_path("${NFLAUNCH_TEST_ROOT}/params.yaml");
        assert_eq!(resolved, PathBuf::from("/data/params.yaml"));
        env::remove_var("NFLAUNCH_TEST_ROOT");
    }

    #[test]
    fn test_resolve_path_unknown_var_untouched() {
        let resolved = resolve_path("/data/$NFLAUNCH_UNSET_VAR/x");
        assert_eq!(resolved, PathBuf::from("/data/$NFLAUNCH_UNSET_VAR/x"));
    }

    #[test]
    fn test_resolve_path_expands_home() {
        env::set_var("HOME", "/home/tester");
        let resolved = resolve_path("~/pipelines");
        assert_eq!(resolved, PathBuf::from("/home/tester/pipelines"));
    }

    #[test]
    fn test_resolve_path_is_idempotent_for_existing_paths() {
        let temp_dir = tempdir().unwrap();
        let file = temp_dir.path().join("main.nf");
        std::fs::write(&file, "workflow {}").unwrap();

        let once = resolve_path(file.to_str().unwrap());
        let twice = resolve_path(once.to_str().unwrap());
        assert_eq!(once, twice);
        assert!(once.is_absolute());
    }

    #[test]
    fn test_ensure_directory_creates_parents() {
        let temp_dir = tempdir().unwrap();
        let nested = temp_dir.path().join("a/b/c");

        let created = ensure_directory(&nested).unwrap();
        assert!(created.is_dir());
        assert!(created.is_absolute());

        // Second call is a no-op
        let again = ensure_directory(&nested).unwrap();
        assert_eq!(created, again);
    }
}
