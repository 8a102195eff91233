//! Voice playback sessions: a source is transcoded to 20 ms Opus frames by
//! ffmpeg, demultiplexed from Ogg, and paced into a voice transport while
//! callers pause, resume, seek, stop or destroy the session.

pub mod audio;
pub mod common;
pub mod configs;
pub mod playback;
pub mod voice;

pub use common::{
    errors::{PlaybackError, SinkError},
    types::{ChannelId, Encoding},
};
pub use configs::Config;
pub use playback::{PlaybackState, Session};
pub use voice::{Speaking, VoiceTransport};
