//! Data-driven game balance
//!
//! Everything gameplay-feel related lives here so a round can be re-tuned
//! without touching simulation code. Persisted separately from any session
//! state in LocalStorage on wasm.

use serde::{Deserialize, Serialize};

use crate::consts::*;

/// Tunable round parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tuning {
    /// Round length in seconds
    pub round_duration_secs: u32,
    /// Milliseconds between bubble spawns
    pub spawn_interval_ms: u32,
    /// Milliseconds between motion ticks
    pub motion_tick_ms: u32,
    /// Bubble diameter range [min, max)
    pub bubble_size: (f32, f32),
    /// Bubble rise speed range [min, max), units per motion tick
    pub bubble_speed: (f32, f32),
    /// Camera capture dimensions (width, height)
    pub capture_size: (f32, f32),
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            round_duration_secs: ROUND_DURATION_SECS,
            spawn_interval_ms: SPAWN_INTERVAL_MS,
            motion_tick_ms: MOTION_TICK_MS,
            bubble_size: (BUBBLE_MIN_SIZE, BUBBLE_MAX_SIZE),
            bubble_speed: (BUBBLE_MIN_SPEED, BUBBLE_MAX_SPEED),
            capture_size: (CAPTURE_WIDTH, CAPTURE_HEIGHT),
        }
    }
}

impl Tuning {
    /// LocalStorage key
    const STORAGE_KEY: &'static str = "bubble_burst_tuning";

    /// Clamp ranges so the spawner never sees an empty or inverted interval
    pub fn sanitized(mut self) -> Self {
        if self.bubble_size.1 <= self.bubble_size.0 {
            self.bubble_size = (BUBBLE_MIN_SIZE, BUBBLE_MAX_SIZE);
        }
        if self.bubble_speed.1 <= self.bubble_speed.0 {
            self.bubble_speed = (BUBBLE_MIN_SPEED, BUBBLE_MAX_SPEED);
        }
        if self.round_duration_secs == 0 {
            self.round_duration_secs = ROUND_DURATION_SECS;
        }
        self
    }

    /// Load tuning from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                if let Ok(tuning) = serde_json::from_str::<Tuning>(&json) {
                    log::info!("Loaded tuning from LocalStorage");
                    return tuning.sanitized();
                }
            }
        }

        log::info!("Using default tuning");
        Self::default()
    }

    /// Save tuning to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(json) = serde_json::to_string(self) {
                let _ = storage.set_item(Self::STORAGE_KEY, &json);
                log::info!("Tuning saved");
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
