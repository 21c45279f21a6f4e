//! Player audio preferences
//!
//! Persisted separately from the leaderboard in LocalStorage.

use serde::{Deserialize, Serialize};

/// Volume and mute preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Background music volume (0.0 - 1.0)
    pub bgm_volume: f32,
    pub bgm_muted: bool,
    /// Sound effects volume (0.0 - 1.0)
    pub sfx_volume: f32,
    pub sfx_muted: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bgm_volume: 0.15,
            bgm_muted: false,
            sfx_volume: 0.2,
            sfx_muted: false,
        }
    }
}

impl Settings {
    /// Clamp volumes into range (stored documents may be hand-edited)
    pub fn sanitized(mut self) -> Self {
        let clamp = |v: f32| if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 };
        self.bgm_volume = clamp(self.bgm_volume);
        self.sfx_volume = clamp(self.sfx_volume);
        self
    }

    pub fn with_bgm_volume(mut self, volume: f32) -> Self {
        self.bgm_volume = volume;
        self.sanitized()
    }

    pub fn with_sfx_volume(mut self, volume: f32) -> Self {
        self.sfx_volume = volume;
        self.sanitized()
    }

    /// LocalStorage key
    #[allow(dead_code)]
    const STORAGE_KEY: &'static str = "fruit_brick_breaker_settings";

    /// Load settings from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                if let Ok(settings) = serde_json::from_str::<Settings>(&json) {
                    log::info!("Loaded settings from LocalStorage");
                    return settings.sanitized();
                }
            }
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Save settings to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(json) = serde_json::to_string(self) {
                if storage.set_item(Self::STORAGE_KEY, &json).is_err() {
                    log::warn!("Could not save settings");
                }
            }
        }
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {
        // No-op for native
    }
}
