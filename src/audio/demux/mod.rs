//! Demux layer — turns the transcoder's byte stream into discrete frames.
//!
//! A [`FrameDecoder`] reads a container stream and hands every audio packet
//! to a [`FrameWriter`]. The writer decides whether decoding continues:
//!
//! | `write` result | Decoder reaction |
//! |---|---|
//! | `Ok(())` | keep going |
//! | `Err(SinkError::EndOfStream)` / `Err(SinkError::Cancelled)` | stop, return `Ok(())` |
//! | `Err(SinkError::Transport(_))` | stop, return `PlaybackError::Write` |

pub mod ogg;
pub mod opus;

#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;
use bytes::Bytes;

pub use ogg::OggOpusReader;
pub use opus::OggOpusDemuxer;

use crate::{
    audio::transcode::ByteStream,
    common::errors::{PlaybackError, SinkError},
};

/// Receives one frame per call, in stream order.
#[async_trait]
pub trait FrameWriter: Send {
    async fn write(&mut self, frame: Bytes) -> Result<(), SinkError>;
}

/// Demultiplexes a container stream into frames.
#[async_trait]
pub trait FrameDecoder: Send + Sync {
    /// Runs until the stream is exhausted or the writer asks to stop.
    async fn decode(
        &self,
        sink: &mut dyn FrameWriter,
        stream: ByteStream,
    ) -> Result<(), PlaybackError>;
}
