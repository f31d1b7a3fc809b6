//! Editor configuration.
//!
//! Loaded from RON. Every field has a default, so an empty file (or no file
//! at all) yields [`EditorConfig::default()`]:
//!
//! ```ron
//! (
//!     suggestions: (enabled: true, mirror_empty_draft: true),
//!     versions: (refetch_on_growth: true),
//!     save: (keep_session_on_concurrent_edit: true),
//! )
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Suggestion sub-workflow settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestionConfig {
    /// When false, prompts never open and no suggestion calls are made.
    pub enabled: bool,
    /// Opening the prompt on an empty paragraph mirrors the draft into the
    /// instructions as the user types.
    pub mirror_empty_draft: bool,
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            mirror_empty_draft: true,
        }
    }
}

/// Version navigation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VersionConfig {
    /// Drop the cached version list when the block's version count grows.
    pub refetch_on_growth: bool,
}

impl Default for VersionConfig {
    fn default() -> Self {
        Self {
            refetch_on_growth: true,
        }
    }
}

/// Save behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveConfig {
    /// If the draft changed while a save was in flight, keep the session open
    /// with the newer edits pending instead of closing it.
    pub keep_session_on_concurrent_edit: bool,
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self {
            keep_session_on_concurrent_edit: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub suggestions: SuggestionConfig,
    pub versions: VersionConfig,
    pub save: SaveConfig,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

impl EditorConfig {
    /// Parse a RON document.
    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(text)?)
    }

    /// Read and parse a RON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_ron(&text)
    }

    /// Like [`load`](Self::load), but a missing file yields the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path.as_ref()) {
            Ok(text) => Self::from_ron(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.as_ref().display(), "no config file, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_struct_is_default() {
        assert_eq!(EditorConfig::from_ron("()").unwrap(), EditorConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config = EditorConfig::from_ron("(suggestions: (enabled: false))").unwrap();
        assert!(!config.suggestions.enabled);
        assert!(config.suggestions.mirror_empty_draft);
        assert!(config.versions.refetch_on_growth);
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            EditorConfig::from_ron("(suggestions: ("),
            Err(ConfigError::Ron(_))
        ));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = EditorConfig::load_or_default(dir.path().join("editor.ron")).unwrap();
        assert_eq!(config, EditorConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("editor.ron");
        std::fs::write(&path, "(save: (keep_session_on_concurrent_edit: false))").unwrap();
        let config = EditorConfig::load(&path).unwrap();
        assert!(!config.save.keep_session_on_concurrent_edit);
    }
}
