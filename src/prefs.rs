//! Persisted display preferences.
//!
//! The only state that outlives a session is the dark-mode flag, kept as a
//! small JSON file in the platform config directory
//! (`~/.config/notecypher/preferences.json` on Linux). A missing or
//! unreadable file means light mode.

use crate::error::NoteError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const APP_DIR: &str = "notecypher";
const FILE_NAME: &str = "preferences.json";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayPreferences {
    pub dark_mode: bool,
}

impl DisplayPreferences {
    /// `<config dir>/notecypher/preferences.json`, if the platform has one.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR).join(FILE_NAME))
    }

    /// Load from the default location.
    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load from `path`, falling back to the defaults on any error.
    pub fn load_from(path: &Path) -> Self {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                debug!("No preferences at {}: {}", path.display(), e);
                return Self::default();
            }
        };
        serde_json::from_str(&text).unwrap_or_else(|e| {
            warn!("Ignoring unreadable preferences {}: {}", path.display(), e);
            Self::default()
        })
    }

    /// Save to the default location and return the path written.
    pub fn save(&self) -> Result<PathBuf, NoteError> {
        let path = Self::default_path()
            .ok_or_else(|| NoteError::Internal("no config directory on this platform".into()))?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), NoteError> {
        let write_err = |source: std::io::Error| NoteError::OutputWriteFailed {
            path: path.to_path_buf(),
            source,
        };
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(write_err)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| NoteError::Internal(format!("preferences JSON: {e}")))?;
        std::fs::write(path, json).map_err(write_err)?;
        debug!("Saved preferences to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_means_light_mode() {
        let dir = tempfile::tempdir().unwrap();
        let prefs = DisplayPreferences::load_from(&dir.path().join("nope.json"));
        assert!(!prefs.dark_mode);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg").join(FILE_NAME);
        DisplayPreferences { dark_mode: true }.save_to(&path).unwrap();
        assert!(DisplayPreferences::load_from(&path).dark_mode);
    }

    #[test]
    fn corrupt_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(FILE_NAME);
        std::fs::write(&path, "{ dark_mode: yes").unwrap();
        assert_eq!(DisplayPreferences::load_from(&path), DisplayPreferences::default());

        std::fs::write(&path, "{}").unwrap();
        assert!(!DisplayPreferences::load_from(&path).dark_mode);
    }
}
