use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const PREFERENCES_FILE: &str = "preferences.json";
const APP_DIR: &str = "ytdl-shell";

#[derive(Debug, Error)]
pub enum PreferencesError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed preferences in {path}: {message}")]
    Malformed { path: PathBuf, message: String },
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Values persisted across shell sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_addr: Option<String>,
}

impl Preferences {
    /// Stored address, ignoring blank values.
    pub fn server_addr(&self) -> Option<&str> {
        self.server_addr
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

pub fn default_preferences_path() -> PathBuf {
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join(PREFERENCES_FILE)
}

/// A missing file is not an error; it yields defaults.
pub fn load_preferences(path: &Path) -> Result<Preferences, PreferencesError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Preferences::default()),
        Err(source) => {
            return Err(PreferencesError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    if contents.trim().is_empty() {
        return Ok(Preferences::default());
    }
    serde_json::from_str(&contents).map_err(|err| PreferencesError::Malformed {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}

pub fn save_preferences(path: &Path, preferences: &Preferences) -> Result<(), PreferencesError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|source| PreferencesError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }
    let payload = serde_json::to_string_pretty(preferences)
        .map_err(|err| PreferencesError::Serialization(err.to_string()))?;
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, payload).map_err(|source| PreferencesError::Io {
        path: tmp_path.clone(),
        source,
    })?;
    fs::rename(&tmp_path, path).map_err(|source| PreferencesError::Io {
        path: path.to_path_buf(),
        source,
    })
}
