//! Engine configuration
//!
//! All tunables for the looping engine, with serde defaults and TOML
//! loading. Each engine instance owns its own `EngineConfig`; there is no
//! global parameter singleton.
//!
//! Valid ranges (out-of-range values are clamped by [`EngineConfig::normalized`]):
//!
//! | Parameter                  | Range          | Default |
//! |----------------------------|----------------|---------|
//! | crossfade_duration_ms      | 250..=30000    | 2500    |
//! | base_volume                | 0.0..=1.0      | 0.5     |
//! | status_update_interval_ms  | 20..=1000      | 100     |
//! | fade_steps                 | 1..=100        | 10      |
//! | tolerance_ms               | 0..=1000       | 100     |

use crate::error::{Error, Result};
use crate::registry::TrackEntry;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

/// Engine tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Total length of the fade-and-swap ramp
    pub crossfade_duration_ms: u64,

    /// Steady-state volume of the active slot (0.0-1.0)
    pub base_volume: f64,

    /// Position polling interval for the active slot
    pub status_update_interval_ms: u64,

    /// Number of discrete volume steps per crossfade
    pub fade_steps: u32,

    /// Extra margin on the trigger window to absorb callback jitter
    pub tolerance_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            crossfade_duration_ms: 2_500,
            base_volume: 0.5,
            status_update_interval_ms: 100,
            fade_steps: 10,
            tolerance_ms: 100,
        }
    }
}

impl EngineConfig {
    /// Clamp all fields into their valid ranges, warning on each adjustment.
    pub fn normalized(mut self) -> Self {
        if !(250..=30_000).contains(&self.crossfade_duration_ms) {
            let clamped = self.crossfade_duration_ms.clamp(250, 30_000);
            warn!(
                "crossfade_duration_ms {} out of range, clamping to {}",
                self.crossfade_duration_ms, clamped
            );
            self.crossfade_duration_ms = clamped;
        }
        if !(0.0..=1.0).contains(&self.base_volume) {
            let clamped = self.base_volume.clamp(0.0, 1.0);
            warn!(
                "base_volume {} out of range, clamping to {}",
                self.base_volume, clamped
            );
            self.base_volume = clamped;
        }
        if !(20..=1_000).contains(&self.status_update_interval_ms) {
            let clamped = self.status_update_interval_ms.clamp(20, 1_000);
            warn!(
                "status_update_interval_ms {} out of range, clamping to {}",
                self.status_update_interval_ms, clamped
            );
            self.status_update_interval_ms = clamped;
        }
        if !(1..=100).contains(&self.fade_steps) {
            let clamped = self.fade_steps.clamp(1, 100);
            warn!(
                "fade_steps {} out of range, clamping to {}",
                self.fade_steps, clamped
            );
            self.fade_steps = clamped;
        }
        if self.tolerance_ms > 1_000 {
            warn!(
                "tolerance_ms {} out of range, clamping to 1000",
                self.tolerance_ms
            );
            self.tolerance_ms = 1_000;
        }
        self
    }
}

/// Top-level TOML document: engine tunables plus app-supplied track entries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default, rename = "track")]
    pub tracks: Vec<TrackEntry>,
}

impl ConfigFile {
    /// Parse a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let parsed: ConfigFile = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        Ok(ConfigFile {
            engine: parsed.engine.normalized(),
            tracks: parsed.tracks,
        })
    }

    /// Load and parse a TOML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.crossfade_duration_ms, 2_500);
        assert_eq!(config.base_volume, 0.5);
        assert_eq!(config.status_update_interval_ms, 100);
        assert_eq!(config.fade_steps, 10);
        assert_eq!(config.tolerance_ms, 100);
    }

    #[test]
    fn test_normalized_clamps() {
        let config = EngineConfig {
            crossfade_duration_ms: 50,
            base_volume: 1.7,
            status_update_interval_ms: 5,
            fade_steps: 0,
            tolerance_ms: 10_000,
        }
        .normalized();

        assert_eq!(config.crossfade_duration_ms, 250);
        assert_eq!(config.base_volume, 1.0);
        assert_eq!(config.status_update_interval_ms, 20);
        assert_eq!(config.fade_steps, 1);
        assert_eq!(config.tolerance_ms, 1_000);
    }

    #[test]
    fn test_normalized_keeps_valid_values() {
        let config = EngineConfig::default().normalized();
        assert_eq!(config.crossfade_duration_ms, 2_500);
        assert_eq!(config.fade_steps, 10);
    }

    #[test]
    fn test_from_toml_partial() {
        let doc = r#"
            [engine]
            crossfade_duration_ms = 4000
            fade_steps = 20
        "#;
        let config = ConfigFile::from_toml_str(doc).unwrap();
        assert_eq!(config.engine.crossfade_duration_ms, 4_000);
        assert_eq!(config.engine.fade_steps, 20);
        // Unspecified fields fall back to defaults
        assert_eq!(config.engine.base_volume, 0.5);
        assert!(config.tracks.is_empty());
    }

    #[test]
    fn test_from_toml_with_tracks() {
        let doc = r#"
            [[track]]
            id = "rain"
            label = "Gentle Rain"
            asset = "sounds/rain.ogg"

            [[track]]
            id = "silence"
            label = "Silence"
        "#;
        let config = ConfigFile::from_toml_str(doc).unwrap();
        assert_eq!(config.tracks.len(), 2);
        assert_eq!(config.tracks[0].id, "rain");
        assert!(config.tracks[1].asset.is_none());
    }

    #[test]
    fn test_from_toml_invalid() {
        assert!(ConfigFile::from_toml_str("not [valid toml").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[engine]\nbase_volume = 0.3").unwrap();

        let config = ConfigFile::load(file.path()).unwrap();
        assert_eq!(config.engine.base_volume, 0.3);
    }

    #[test]
    fn test_load_missing_file() {
        let err = ConfigFile::load(Path::new("/nonexistent/ambia.toml")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
