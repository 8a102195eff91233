//! The voice connection seen from the playback side.
//!
//! Joining, speaking updates and frame delivery belong to the connection;
//! the session only drives them.

use std::io;

use async_trait::async_trait;

use crate::common::types::{AnyResult, ChannelId};

/// Speaking flag sent over the voice gateway (op 5 `speaking` field).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaking {
    NotSpeaking,
    Microphone,
}

impl Speaking {
    /// Bitfield value of the gateway payload.
    pub fn bits(&self) -> u8 {
        match self {
            Self::NotSpeaking => 0,
            Self::Microphone => 1 << 0,
        }
    }
}

#[async_trait]
pub trait VoiceTransport: Send + Sync {
    async fn join_channel(
        &self,
        channel_id: ChannelId,
        self_mute: bool,
        self_deaf: bool,
    ) -> AnyResult<()>;

    async fn leave(&self) -> AnyResult<()>;

    async fn set_speaking(&self, speaking: Speaking) -> AnyResult<()>;

    /// Sends one encoded Opus frame. Returns the number of bytes accepted.
    async fn write(&self, frame: &[u8]) -> io::Result<usize>;
}
