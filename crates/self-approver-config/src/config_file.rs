//! Config file lookup
//!
//! `SELF_APPROVER_CONFIG` names the file explicitly. Without it the service
//! looks for `.self-approver.toml` in the working directory, then in `$HOME`,
//! and falls back to defaults when neither exists.

use crate::ConfigError;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = ".self-approver.toml";

/// Environment variable holding an explicit config file path
pub const CONFIG_PATH_ENV: &str = "SELF_APPROVER_CONFIG";

/// A config file that was found, with its content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSource {
    pub path: PathBuf,
    pub content: String,
}

/// Load the config file using the process environment
pub fn load_config_file() -> Result<Option<ConfigSource>, ConfigError> {
    load_config_file_with(|key| std::env::var_os(key))
}

/// Load the config file, resolving variables through `lookup`
///
/// An explicitly named file must exist. Searched locations that do not exist
/// are skipped, and `Ok(None)` is returned when none of them does.
pub fn load_config_file_with<F>(lookup: F) -> Result<Option<ConfigSource>, ConfigError>
where
    F: Fn(&str) -> Option<OsString>,
{
    if let Some(path) = lookup(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        log::debug!("Using config file from {}", CONFIG_PATH_ENV);
        return read_source(&path).map(Some);
    }

    for path in search_paths(lookup("HOME")) {
        match read_source(&path) {
            Ok(source) => return Ok(Some(source)),
            Err(ConfigError::ReadFile { source, .. }) if source.kind() == ErrorKind::NotFound => {
                log::trace!("No config at {}", path.display());
            }
            Err(e) => return Err(e),
        }
    }

    Ok(None)
}

/// Candidate locations, most specific first
fn search_paths(home: Option<OsString>) -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(CONFIG_FILE)];
    if let Some(home) = home {
        paths.push(PathBuf::from(home).join(CONFIG_FILE));
    }
    paths
}

fn read_source(path: &Path) -> Result<ConfigSource, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    log::debug!("Loaded config from {}", path.display());

    Ok(ConfigSource {
        path: path.to_path_buf(),
        content,
    })
}
