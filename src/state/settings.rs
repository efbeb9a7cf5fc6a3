/// Persisted user settings
///
/// A single JSON object under one key, always overwritten as a whole.
/// Saving announces `SettingsUpdated` so open dialogs reload.
use tracing::{info, warn};

use super::data::UserSettings;
use super::storage::KeyValueStore;
use crate::error::Result;
use crate::event::{EventBus, GalleryEvent};

pub const SETTINGS_KEY: &str = "user-settings";

#[derive(Debug)]
pub struct SettingsStore<S> {
    store: S,
    bus: EventBus,
}

impl<S: KeyValueStore> SettingsStore<S> {
    pub fn new(store: S, bus: EventBus) -> Self {
        Self { store, bus }
    }

    /// `None` until the first save
    pub fn load(&self) -> Option<UserSettings> {
        let raw = match self.store.get(SETTINGS_KEY) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!("⚠️  Could not read settings: {}", e);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(settings) => Some(settings),
            Err(e) => {
                warn!("⚠️  Ignoring malformed settings: {}", e);
                None
            }
        }
    }

    pub fn save(&mut self, settings: &UserSettings) -> Result<()> {
        self.store.set(SETTINGS_KEY, &serde_json::to_string(settings)?)?;
        info!("⚙️  Saved settings for {}", settings.username);
        self.bus.publish(GalleryEvent::SettingsUpdated);
        Ok(())
    }

    /// First run: nothing has been saved yet
    pub fn needs_onboarding(&self) -> bool {
        self.load().is_none()
    }
}
