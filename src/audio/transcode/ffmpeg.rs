//! `FfmpegTranscoder` — spawns ffmpeg to emit 20 ms Ogg Opus frames on stdout.

use std::{io, process::Stdio};

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tracing::debug;

use super::{TranscodeChild, TranscodeProcess, TranscodeRequest, Transcoder};
use crate::{common::errors::PlaybackError, configs::TranscoderConfig};

pub struct FfmpegTranscoder {
    config: TranscoderConfig,
}

impl FfmpegTranscoder {
    pub fn new(config: TranscoderConfig) -> Self {
        Self { config }
    }

    /// Command line for `request`, without the program name.
    pub fn args(&self, request: &TranscodeRequest) -> Vec<String> {
        let mut args: Vec<String> = vec!["-loglevel".into(), self.config.log_level.clone()];

        if self.config.reconnect {
            args.extend(["-reconnect", "1", "-reconnect_streamed", "1"].map(String::from));
            args.push("-reconnect_delay_max".into());
            args.push(self.config.reconnect_delay_max_secs.to_string());
        }

        args.push("-ss".into());
        args.push(request.seek.as_secs().to_string());
        args.push("-i".into());
        args.push(request.source.clone());
        args.extend(["-vn", "-codec", request.encoding.codec(), "-vbr", "off"].map(String::from));
        args.push("-frame_duration".into());
        args.push(request.frame_duration.as_millis().to_string());
        args.extend(["-f", "opus", "-"].map(String::from));

        args
    }
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new(TranscoderConfig::default())
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn spawn(&self, request: &TranscodeRequest) -> Result<TranscodeProcess, PlaybackError> {
        let args = self.args(request);
        debug!("Spawning {} {}", self.config.ffmpeg_path, args.join(" "));

        let mut child = Command::new(&self.config.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(PlaybackError::Spawn)?;

        let stdout = child.stdout.take().ok_or_else(|| {
            PlaybackError::Spawn(io::Error::other("failed to get ffmpeg stdout"))
        })?;
        let stderr = child.stderr.take().ok_or_else(|| {
            PlaybackError::Spawn(io::Error::other("failed to get ffmpeg stderr"))
        })?;

        Ok(TranscodeProcess {
            stdout: Box::new(stdout),
            stderr: Box::new(stderr),
            child: Box::new(child),
        })
    }
}

#[async_trait]
impl TranscodeChild for Child {
    async fn wait(&mut self) -> io::Result<bool> {
        Child::wait(self).await.map(|status| status.success())
    }

    async fn kill(&mut self) -> io::Result<()> {
        match self.try_wait()? {
            Some(_) => Ok(()),
            None => Child::kill(self).await,
        }
    }
}
