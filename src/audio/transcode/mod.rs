//! Transcoder abstraction — the external process turning a source into an
//! Ogg Opus byte stream.
//!
//! [`FfmpegTranscoder`] is the production implementation; the session only
//! sees the [`Transcoder`] / [`TranscodeChild`] seams.

pub mod ffmpeg;

use std::{io, time::Duration};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, warn};

pub use ffmpeg::FfmpegTranscoder;

use crate::{
    audio::constants::MAX_DIAGNOSTIC_BYTES,
    common::{errors::PlaybackError, types::Encoding},
};

/// Readable end of a transcoder pipe.
pub type ByteStream = Box<dyn AsyncRead + Send + Sync + Unpin>;

/// Everything needed to start one playback attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeRequest {
    pub source: String,
    pub encoding: Encoding,
    /// Start offset; the transcoder only honours whole seconds.
    pub seek: Duration,
    pub frame_duration: Duration,
}

/// Handle on a running transcoder process.
#[async_trait]
pub trait TranscodeChild: Send {
    /// Waits for the process to exit. `Ok(true)` means a successful exit.
    async fn wait(&mut self) -> io::Result<bool>;

    /// Terminates the process. Killing an already finished process is not
    /// an error.
    async fn kill(&mut self) -> io::Result<()>;
}

/// A spawned transcoder: its output, its diagnostics and the process itself.
pub struct TranscodeProcess {
    pub stdout: ByteStream,
    pub stderr: ByteStream,
    pub child: Box<dyn TranscodeChild>,
}

#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn spawn(&self, request: &TranscodeRequest) -> Result<TranscodeProcess, PlaybackError>;
}

/// Drains `stderr` on its own task so the process never blocks on a full
/// pipe. Resolves to the trimmed diagnostic text.
pub fn collect_diagnostics(stderr: ByteStream) -> tokio::task::JoinHandle<String> {
    tokio::spawn(async move {
        let mut buf = Vec::new();
        let mut limited = stderr.take(MAX_DIAGNOSTIC_BYTES);
        if let Err(e) = limited.read_to_end(&mut buf).await {
            warn!("Failed to read transcoder diagnostics: {}", e);
        }
        // Keep draining past the cap so the writer never stalls.
        let mut rest = limited.into_inner();
        if let Err(e) = tokio::io::copy(&mut rest, &mut tokio::io::sink()).await {
            debug!("Failed to drain transcoder diagnostics: {}", e);
        }

        String::from_utf8_lossy(&buf).trim().to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn diagnostics_are_trimmed() {
        let stderr: ByteStream = Box::new(std::io::Cursor::new(
            b"\nhttps://example.invalid/a.mp3: Server returned 404 Not Found\n".to_vec(),
        ));
        let text = collect_diagnostics(stderr).await.unwrap();
        assert_eq!(text, "https://example.invalid/a.mp3: Server returned 404 Not Found");
    }

    #[tokio::test]
    async fn diagnostics_are_capped() {
        let noise = vec![b'x'; MAX_DIAGNOSTIC_BYTES as usize + 4096];
        let stderr: ByteStream = Box::new(std::io::Cursor::new(noise));
        let text = collect_diagnostics(stderr).await.unwrap();
        assert_eq!(text.len(), MAX_DIAGNOSTIC_BYTES as usize);
    }

    #[tokio::test]
    async fn silent_process_has_no_diagnostics() {
        let stderr: ByteStream = Box::new(tokio::io::empty());
        assert!(collect_diagnostics(stderr).await.unwrap().is_empty());
    }
}
