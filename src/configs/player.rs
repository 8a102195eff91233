use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    audio::constants::{FRAME_DURATION_MS, SUPPORTED_FRAME_DURATIONS_MS},
    common::types::AnyResult,
};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PlayerConfig {
    /// Duration of one Opus frame; ffmpeg is asked for exactly this size and
    /// the playback position advances by it per forwarded frame.
    #[serde(default = "default_frame_duration_ms")]
    pub frame_duration_ms: u64,
    #[serde(default)]
    pub self_mute: bool,
    #[serde(default = "default_self_deaf")]
    pub self_deaf: bool,
}

impl PlayerConfig {
    pub fn validate(&self) -> AnyResult<()> {
        if !SUPPORTED_FRAME_DURATIONS_MS.contains(&self.frame_duration_ms) {
            return Err(format!(
                "player.frame_duration_ms must be one of {:?}, got {}",
                SUPPORTED_FRAME_DURATIONS_MS, self.frame_duration_ms
            )
            .into());
        }
        Ok(())
    }

    /// Unsupported values fall back to the 20 ms default.
    pub fn frame_duration(&self) -> Duration {
        let ms = if self.validate().is_ok() {
            self.frame_duration_ms
        } else {
            FRAME_DURATION_MS
        };
        Duration::from_millis(ms)
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            frame_duration_ms: default_frame_duration_ms(),
            self_mute: false,
            self_deaf: default_self_deaf(),
        }
    }
}

fn default_frame_duration_ms() -> u64 {
    FRAME_DURATION_MS
}

fn default_self_deaf() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_opus_frame_sizes() {
        for ms in [10, 20, 40, 60] {
            let config = PlayerConfig {
                frame_duration_ms: ms,
                ..PlayerConfig::default()
            };
            assert!(config.validate().is_ok(), "{ms} ms");
            assert_eq!(config.frame_duration(), Duration::from_millis(ms));
        }
    }

    #[test]
    fn unsupported_frame_size_falls_back_to_default() {
        let config = PlayerConfig {
            frame_duration_ms: 0,
            ..PlayerConfig::default()
        };
        assert!(config.validate().is_err());
        assert_eq!(config.frame_duration(), Duration::from_millis(20));
    }
}
