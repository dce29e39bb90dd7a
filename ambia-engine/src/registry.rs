//! Track registry
//!
//! Static lookup from a theme identifier to an audio asset and display
//! label. Resolution is pure: no I/O, no errors. The reserved `"silence"`
//! theme resolves to a track with no asset, which the engine treats as a
//! request to play nothing.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Reserved theme id that resolves to no asset.
pub const SILENCE_THEME_ID: &str = "silence";

/// One ambient soundscape definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub id: String,
    pub label: String,
    /// `None` for the silence theme
    pub asset: Option<PathBuf>,
}

impl Track {
    pub fn is_silent(&self) -> bool {
        self.asset.is_none()
    }
}

/// Serde shape for app-supplied registry entries (TOML `[[track]]` tables).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackEntry {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub asset: Option<PathBuf>,
}

/// Immutable id -> track lookup, defined at engine construction.
#[derive(Debug, Clone)]
pub struct TrackRegistry {
    tracks: HashMap<String, Track>,
}

impl TrackRegistry {
    /// Build a registry from app-supplied entries.
    ///
    /// A `"silence"` entry is always present, whether or not the entries
    /// include one.
    pub fn from_entries(entries: impl IntoIterator<Item = TrackEntry>) -> Self {
        let mut tracks = HashMap::new();
        for entry in entries {
            tracks.insert(
                entry.id.clone(),
                Track {
                    id: entry.id,
                    label: entry.label,
                    asset: entry.asset,
                },
            );
        }
        tracks.entry(SILENCE_THEME_ID.to_string()).or_insert(Track {
            id: SILENCE_THEME_ID.to_string(),
            label: "Silence".to_string(),
            asset: None,
        });
        Self { tracks }
    }

    /// Built-in default soundscape set, with assets resolved under `asset_root`.
    pub fn builtin(asset_root: &std::path::Path) -> Self {
        let themes = [
            ("rain", "Gentle Rain"),
            ("ocean", "Ocean Waves"),
            ("fire", "Campfire"),
            ("forest", "Forest"),
            ("wind", "Mountain Wind"),
        ];
        Self::from_entries(themes.iter().map(|(id, label)| TrackEntry {
            id: (*id).to_string(),
            label: (*label).to_string(),
            asset: Some(asset_root.join(format!("{}.ogg", id))),
        }))
    }

    /// Resolve a theme id. Pure lookup; unknown ids yield `None`.
    pub fn resolve(&self, theme_id: &str) -> Option<Track> {
        self.tracks.get(theme_id).cloned()
    }

    /// All registered tracks, for host UIs.
    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_builtin_resolves_known_themes() {
        let registry = TrackRegistry::builtin(Path::new("/assets"));
        let rain = registry.resolve("rain").unwrap();
        assert_eq!(rain.label, "Gentle Rain");
        assert_eq!(rain.asset.as_deref(), Some(Path::new("/assets/rain.ogg")));
        assert!(!rain.is_silent());
    }

    #[test]
    fn test_silence_always_present() {
        let registry = TrackRegistry::from_entries(vec![]);
        let silence = registry.resolve(SILENCE_THEME_ID).unwrap();
        assert!(silence.is_silent());
        assert_eq!(silence.id, "silence");
    }

    #[test]
    fn test_unknown_theme_resolves_none() {
        let registry = TrackRegistry::builtin(Path::new("/assets"));
        assert!(registry.resolve("thunder").is_none());
    }

    #[test]
    fn test_entries_can_override_silence_label() {
        let registry = TrackRegistry::from_entries(vec![TrackEntry {
            id: "silence".to_string(),
            label: "None".to_string(),
            asset: None,
        }]);
        assert_eq!(registry.resolve("silence").unwrap().label, "None");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_resolution_is_pure() {
        let registry = TrackRegistry::builtin(Path::new("/assets"));
        // Repeated lookups return equal values
        assert_eq!(registry.resolve("ocean"), registry.resolve("ocean"));
    }
}
