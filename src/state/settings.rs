// SPDX-License-Identifier: MPL-2.0

use crate::config::{APP_ID, DEFAULT_PDS, LIKE_COLLECTION, REPOST_COLLECTION};
use crate::state::Action;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("could not determine config directory")]
    Path,
}

fn default_service_url() -> String {
    DEFAULT_PDS.to_string()
}

fn default_like_collection() -> String {
    LIKE_COLLECTION.to_string()
}

fn default_repost_collection() -> String {
    REPOST_COLLECTION.to_string()
}

/// Where the client talks to and which record types back each interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSettings {
    #[serde(default = "default_service_url")]
    pub service_url: String,
    #[serde(default = "default_like_collection")]
    pub like_collection: String,
    #[serde(default = "default_repost_collection")]
    pub repost_collection: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            service_url: default_service_url(),
            like_collection: default_like_collection(),
            repost_collection: default_repost_collection(),
        }
    }
}

impl ClientSettings {
    pub fn collection_for(&self, action: Action) -> &str {
        match action {
            Action::Like => &self.like_collection,
            Action::Repost => &self.repost_collection,
        }
    }

    /// ~/.config/io.github.sethcottle.Hangar/settings.json
    fn settings_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push(APP_ID);
            p.push("settings.json");
            p
        })
    }

    /// Load settings from disk, or return defaults if not found
    pub fn load() -> Self {
        match Self::settings_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable settings");
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self) -> Result<(), SettingsError> {
        let path = Self::settings_path().ok_or(SettingsError::Path)?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_point_at_bluesky() {
        let settings = ClientSettings::default();
        assert_eq!(settings.service_url, "https://bsky.social");
        assert_eq!(settings.collection_for(Action::Like), "app.bsky.feed.like");
        assert_eq!(
            settings.collection_for(Action::Repost),
            "app.bsky.feed.repost"
        );
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let settings = ClientSettings {
            service_url: "https://pds.example.com".to_string(),
            ..ClientSettings::default()
        };
        settings.save_to(&path).unwrap();

        assert_eq!(ClientSettings::load_from(&path), settings);
    }

    #[test]
    fn test_missing_fields_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"service_url": "https://pds.example.com"}"#).unwrap();

        let settings = ClientSettings::load_from(&path);
        assert_eq!(settings.service_url, "https://pds.example.com");
        assert_eq!(settings.like_collection, LIKE_COLLECTION);
    }

    #[test]
    fn test_missing_or_corrupt_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        assert_eq!(ClientSettings::load_from(&path), ClientSettings::default());

        std::fs::write(&path, "not json").unwrap();
        assert_eq!(ClientSettings::load_from(&path), ClientSettings::default());
    }
}
