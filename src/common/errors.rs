use std::io;

use crate::common::types::AnyError;

/// Errors returned to the caller of [`Session::play`](crate::playback::Session::play)
/// and [`Session::connect`](crate::playback::Session::connect).
#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error("this session has been destroyed and can no longer be used")]
    Destroyed,

    #[error("something is already playing")]
    AlreadyPlaying,

    #[error("failed to start transcoder process: {0}")]
    Spawn(#[source] io::Error),

    #[error("voice transport error: {0}")]
    Transport(#[source] AnyError),

    /// The transcoder exited abnormally and left diagnostics behind.
    #[error("transcoder returned error: {0}")]
    Transcode(String),

    #[error("failed to write frame to voice transport: {0}")]
    Write(#[source] io::Error),

    #[error("malformed frame stream: {0}")]
    Demux(String),
}

/// Outcome of a rejected [`FrameWriter::write`](crate::audio::demux::FrameWriter::write).
///
/// `EndOfStream` and `Cancelled` both tell the demuxer to stop; neither is a
/// failure of the playback attempt.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("end of stream")]
    EndOfStream,

    #[error("playback scope cancelled")]
    Cancelled,

    #[error(transparent)]
    Transport(#[from] io::Error),
}

impl SinkError {
    /// Whether the demuxer should treat this as a deliberate stop rather than
    /// a hard failure.
    pub fn is_expected(&self) -> bool {
        matches!(self, Self::EndOfStream | Self::Cancelled)
    }
}

impl From<SinkError> for PlaybackError {
    fn from(e: SinkError) -> Self {
        match e {
            SinkError::Transport(err) => Self::Write(err),
            SinkError::EndOfStream | SinkError::Cancelled => {
                Self::Demux(format!("unexpected sink termination: {e}"))
            }
        }
    }
}
