//! Server tunables
//!
//! Loaded once at startup from an optional JSON file. Anything the client
//! must agree on lives in `consts` instead.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::{MAX_PLAYERS, TICK_RATE_HZ};

/// Server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Simulation ticks per second
    pub tick_rate_hz: u32,
    /// Players a session accepts before joins are refused
    pub max_players: usize,

    // === Deferred actions (in ticks) ===
    /// Pause between the boss dying and the next floor
    pub floor_advance_delay_ticks: u64,
    /// How long an ended session lingers before it is discarded
    pub teardown_delay_ticks: u64,

    /// Give every active session its own tick thread.
    /// Off when the embedder drives ticks itself (tests, replays).
    pub spawn_tick_drivers: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tick_rate_hz: TICK_RATE_HZ,
            max_players: MAX_PLAYERS,
            floor_advance_delay_ticks: 2 * TICK_RATE_HZ as u64,
            teardown_delay_ticks: 30 * TICK_RATE_HZ as u64,
            spawn_tick_drivers: true,
        }
    }
}

impl Settings {
    /// Settings for a server whose ticks are driven by the caller
    pub fn manual() -> Self {
        Self {
            spawn_tick_drivers: false,
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut settings: Settings = serde_json::from_str(json)?;
        settings.tick_rate_hz = settings.tick_rate_hz.max(1);
        settings.max_players = settings.max_players.max(1);
        Ok(settings)
    }

    /// Load settings from `path`, falling back to defaults
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(json) => match Self::from_json(&json) {
                Ok(settings) => {
                    log::info!("Loaded settings from {}", path.display());
                    settings
                }
                Err(e) => {
                    log::warn!("Invalid settings in {}: {}; using defaults", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("Could not read {}: {}; using defaults", path.display(), e);
                Self::default()
            }
        }
    }

    /// Wall-clock length of one tick
    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / self.tick_rate_hz.max(1) as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.tick_rate_hz, 60);
        assert_eq!(s.max_players, 4);
        assert_eq!(s.floor_advance_delay_ticks, 120);
        assert_eq!(s.teardown_delay_ticks, 1800);
        assert!(s.spawn_tick_drivers);
    }

    #[test]
    fn test_partial_json_keeps_other_defaults() {
        let s = Settings::from_json(r#"{"maxPlayers": 2}"#).unwrap_or_default();
        // Field names are snake_case; unknown keys are ignored
        assert_eq!(s.max_players, 4);

        let s = Settings::from_json(r#"{"max_players": 2, "tick_rate_hz": 0}"#).unwrap();
        assert_eq!(s.max_players, 2);
        assert_eq!(s.tick_rate_hz, 1);
        assert_eq!(s.teardown_delay_ticks, 1800);
    }

    #[test]
    fn test_load_missing_file_falls_back() {
        let s = Settings::load(Path::new("/definitely/not/here.json"));
        assert_eq!(s, Settings::default());
    }

    #[test]
    fn test_tick_interval() {
        let s = Settings::default();
        let ms = s.tick_interval().as_secs_f64() * 1000.0;
        assert!((ms - 16.666).abs() < 0.01);
    }
}
