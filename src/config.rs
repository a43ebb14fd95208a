//! Process-wide settings with an explicit load/save lifecycle.
//!
//! Settings are plain constructed values handed to the callers that need
//! them; nothing in this crate reads them through a global. Callers load
//! once at startup and save on exit.

use crate::common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// User-facing settings persisted between sessions.
///
/// Stored as YAML. Every field is optional or defaulted so that older
/// settings files keep loading after new fields are added.
///
/// # Example
///
/// ```rust,no_run
/// use rambutan::config::Settings;
///
/// let settings = Settings::load_or_default("rambutan.yaml");
/// // ... run ...
/// settings.save("rambutan.yaml")?;
/// # Ok::<(), rambutan::common::Error>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Join column preselected for table reconciliation.
    pub key_column: Option<String>,
    /// Directory where generated documents are written.
    pub output_dir: Option<PathBuf>,
    /// Overwrite existing output files instead of failing the document.
    pub overwrite_existing: bool,
    /// Thread count for batch generation; `None` lets rayon decide.
    pub worker_threads: Option<usize>,
}

impl Settings {
    /// Load settings from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        serde_saphyr::from_str(&contents)
            .map_err(|e| Error::Config(format!("failed to parse settings: {}", e)))
    }

    /// Load settings, falling back to defaults when the file is missing
    /// or unreadable.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Save settings as YAML.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_saphyr::to_string(self)
            .map_err(|e| Error::Config(format!("failed to serialize settings: {}", e)))?;
        fs::write(path.as_ref(), yaml)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.yaml");

        let settings = Settings {
            key_column: Some("id".to_string()),
            output_dir: Some(PathBuf::from("/tmp/out")),
            overwrite_existing: true,
            worker_threads: Some(4),
        };
        settings.save(&path).unwrap();

        let loaded = Settings::load(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let loaded = Settings::load_or_default("/nonexistent/rambutan.yaml");
        assert_eq!(loaded, Settings::default());
    }
}
