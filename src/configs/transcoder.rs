use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TranscoderConfig {
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,
    /// Pass `-reconnect`/`-reconnect_streamed` so network inputs survive
    /// short drops.
    #[serde(default = "default_reconnect")]
    pub reconnect: bool,
    #[serde(default = "default_reconnect_delay_max_secs")]
    pub reconnect_delay_max_secs: u32,
    /// ffmpeg `-loglevel`; anything it prints at this level counts as a
    /// transcoding diagnostic.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for TranscoderConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            reconnect: default_reconnect(),
            reconnect_delay_max_secs: default_reconnect_delay_max_secs(),
            log_level: default_log_level(),
        }
    }
}

fn default_ffmpeg_path() -> String {
    "ffmpeg".to_string()
}

fn default_reconnect() -> bool {
    true
}

fn default_reconnect_delay_max_secs() -> u32 {
    5
}

fn default_log_level() -> String {
    "error".to_string()
}
