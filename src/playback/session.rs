//! `Session` — the playback controller for one voice connection.
//!
//! `play` owns the long-running loop: spawn the transcoder, demux its output
//! through a [`FrameSink`], and restart at the new position whenever a seek
//! tore the attempt down. Every other control call runs from other tasks and
//! meets the loop through the state monitor:
//!
//! ```text
//!   Stopped ──play──▶ Playing ◀──resume── Paused
//!      ▲                │  ▲   ──pause──▶   │
//!      │ stop           │  └──── restart ───┤
//!      │                ▼ seek              ▼ seek
//!      └──────────── Changing ◀─────────────┘
//! ```
//!
//! Pause, resume, seek, stop and destroy are serialized by a per-session
//! control lock. `play` is not: it only has to win the single "loop alive"
//! slot.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use parking_lot::Mutex;
use tokio::{
    sync::{Mutex as AsyncMutex, watch},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::{FrameSink, PlaybackState, state::StateCell};
use crate::{
    audio::{
        constants::FRAME_DURATION_MS,
        demux::{FrameDecoder, OggOpusDemuxer},
        transcode::{
            FfmpegTranscoder, TranscodeProcess, TranscodeRequest, Transcoder, collect_diagnostics,
        },
    },
    common::{
        errors::PlaybackError,
        types::{ChannelId, Encoding},
    },
    configs::{Config, PlayerConfig},
    voice::{Speaking, VoiceTransport},
};

/// What the loop replays after a seek.
#[derive(Debug, Clone)]
struct Track {
    source: String,
    encoding: Encoding,
}

pub(crate) struct SessionInner {
    pub(crate) label: String,
    pub(crate) transport: Arc<dyn VoiceTransport>,
    transcoder: Arc<dyn Transcoder>,
    decoder: Arc<dyn FrameDecoder>,
    frame_duration: Duration,

    pub(crate) state: StateCell,
    position: Mutex<Duration>,
    track: Mutex<Option<Track>>,

    /// Parent of every attempt scope; cancelled once on destroy.
    root: CancellationToken,
    /// Scope of the current attempt.
    scope: Mutex<CancellationToken>,

    control: AsyncMutex<()>,
    looping: AtomicBool,
}

impl SessionInner {
    fn position(&self) -> Duration {
        *self.position.lock()
    }

    /// Credits one forwarded frame, unless the attempt was cancelled or a
    /// seek already replaced the position.
    pub(crate) fn advance_position(&self, scope: &CancellationToken) {
        let mut position = self.position.lock();
        if scope.is_cancelled() || self.state.get() == PlaybackState::Changing {
            return;
        }
        *position += self.frame_duration;
    }

    fn open_scope(&self) -> CancellationToken {
        let token = self.root.child_token();
        *self.scope.lock() = token.clone();
        token
    }

    fn cancel_scope(&self) {
        self.scope.lock().cancel();
    }

    async fn signal(&self, speaking: Speaking) {
        if let Err(e) = self.transport.set_speaking(speaking).await {
            warn!("[{}] Failed to send {:?} update: {}", self.label, speaking, e);
        }
    }

    async fn run(self: &Arc<Self>) -> Result<(), PlaybackError> {
        loop {
            let Some(track) = self.track.lock().clone() else {
                return Ok(());
            };

            self.attempt(&track).await?;

            if self.state.get() != PlaybackState::Changing {
                return Ok(());
            }
            info!(
                "[{}] Restarting {} at {:?}",
                self.label,
                track.source,
                self.position()
            );
        }
    }

    /// One transcoder run, from spawn to exit.
    async fn attempt(self: &Arc<Self>, track: &Track) -> Result<(), PlaybackError> {
        let scope = self.open_scope();
        let request = TranscodeRequest {
            source: track.source.clone(),
            encoding: track.encoding,
            seek: self.position(),
            frame_duration: self.frame_duration,
        };

        let TranscodeProcess {
            stdout,
            stderr,
            mut child,
        } = self.transcoder.spawn(&request).await?;
        let diagnostics = collect_diagnostics(stderr);

        if let Err(e) = self.transport.set_speaking(Speaking::Microphone).await {
            if let Err(kill_err) = child.kill().await {
                debug!("[{}] Failed to kill transcoder: {}", self.label, kill_err);
            }
            return Err(PlaybackError::Transport(e));
        }

        let started = self.state.update(|current| {
            (current != PlaybackState::Destroyed && !scope.is_cancelled())
                .then_some(PlaybackState::Playing)
        });
        if started.is_none() {
            debug!("[{}] Attempt cancelled during setup", self.label);
            if let Err(e) = child.kill().await {
                debug!("[{}] Failed to kill transcoder: {}", self.label, e);
            }
            return Ok(());
        }
        debug!(
            "[{}] Streaming {} from {:?}",
            self.label, track.source, request.seek
        );

        let mut sink = FrameSink::new(self.clone(), scope.clone());
        let decoded = tokio::select! {
            result = self.decoder.decode(&mut sink, stdout) => result,
            _ = scope.cancelled() => Ok(()),
        };

        let state = self.state.get();
        let deliberate = scope.is_cancelled() || state == PlaybackState::Changing;
        if deliberate || decoded.is_err() || state != PlaybackState::Playing {
            if let Err(e) = child.kill().await {
                debug!("[{}] Failed to kill transcoder: {}", self.label, e);
            }
        }

        let exited_ok = match child.wait().await {
            Ok(success) => success,
            Err(e) => {
                warn!("[{}] Failed to reap transcoder: {}", self.label, e);
                false
            }
        };
        let diagnostics = diagnostics.await.unwrap_or_default();

        let failed = !exited_ok && !deliberate && !diagnostics.is_empty();
        match decoded {
            // Unreadable output from a failed transcoder: its own message
            // says more than the demuxer's.
            Err(PlaybackError::Demux(e)) if failed => {
                debug!("[{}] Demuxer gave up: {}", self.label, e);
                return Err(PlaybackError::Transcode(diagnostics));
            }
            Err(e) if !deliberate => return Err(e),
            Err(e) => debug!("[{}] Decoder interrupted: {}", self.label, e),
            Ok(()) => {}
        }

        if failed {
            return Err(PlaybackError::Transcode(diagnostics));
        }
        if !diagnostics.is_empty() {
            debug!("[{}] Transcoder said: {}", self.label, diagnostics);
        }

        Ok(())
    }

    /// Cancels the current attempt and waits until the play loop settled:
    /// back below `Changing` for a plain stop, or out of `Changing` when a
    /// seek asked for a restart.
    async fn stop_cycle(&self) {
        let state = self.state.get();
        if !state.is_active() {
            return;
        }

        let mut rx = self.state.subscribe();
        if state == PlaybackState::Paused {
            self.state
                .transition(PlaybackState::Paused, PlaybackState::Paused);
        }

        let seeking = state == PlaybackState::Changing;
        self.cancel_scope();

        let settled = rx
            .wait_for(|s| {
                if seeking {
                    *s != PlaybackState::Changing
                } else {
                    !s.is_active()
                }
            })
            .await
            .map(|s| *s);

        if let Ok(settled) = settled {
            debug!("[{}] Stop settled in {}", self.label, settled);
        }
    }

    /// Normal end of a play call; the rest happens in [`LoopGuard`].
    async fn finish(&self) {
        self.cancel_scope();
        if self.state.get().is_active() {
            self.signal(Speaking::NotSpeaking).await;
        }
    }
}

/// Holds the session's single play-loop slot.
///
/// On drop it frees the slot, then stops the session if the loop left it
/// active, including when the play future was dropped mid-playback.
struct LoopGuard {
    inner: Arc<SessionInner>,
    finished: bool,
}

impl LoopGuard {
    fn enter(inner: &Arc<SessionInner>) -> Option<Self> {
        inner
            .looping
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        Some(Self {
            inner: inner.clone(),
            finished: false,
        })
    }
}

impl Drop for LoopGuard {
    fn drop(&mut self) {
        let inner = &self.inner;
        inner.cancel_scope();
        inner.looping.store(false, Ordering::Release);

        if !inner.state.get().is_active() {
            return;
        }

        if !self.finished {
            warn!("[{}] Play loop dropped mid-playback, stopping", inner.label);
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                let transport = inner.transport.clone();
                let label = inner.label.clone();
                handle.spawn(async move {
                    if let Err(e) = transport.set_speaking(Speaking::NotSpeaking).await {
                        warn!("[{}] Failed to send NotSpeaking update: {}", label, e);
                    }
                });
            }
        }

        *inner.position.lock() = Duration::ZERO;
        inner
            .state
            .update(|s| s.is_active().then_some(PlaybackState::Stopped));
    }
}

/// Playback controller bound to one voice connection. Cheap to clone; all
/// clones drive the same session.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    /// Joins `channel_id` and returns a stopped session using ffmpeg and the
    /// Ogg Opus demuxer.
    pub async fn connect(
        transport: Arc<dyn VoiceTransport>,
        channel_id: ChannelId,
        config: &Config,
    ) -> Result<Self, PlaybackError> {
        info!("[{}] Joining voice channel", channel_id);
        transport
            .join_channel(channel_id, config.player.self_mute, config.player.self_deaf)
            .await
            .map_err(PlaybackError::Transport)?;

        Ok(Self::new(transport, channel_id, config))
    }

    /// Session over an already joined transport.
    pub fn new(transport: Arc<dyn VoiceTransport>, channel_id: ChannelId, config: &Config) -> Self {
        Self::with_parts(
            transport,
            Arc::new(FfmpegTranscoder::new(config.transcoder.clone())),
            Arc::new(OggOpusDemuxer::new()),
            channel_id,
            &config.player,
        )
    }

    pub fn with_parts(
        transport: Arc<dyn VoiceTransport>,
        transcoder: Arc<dyn Transcoder>,
        decoder: Arc<dyn FrameDecoder>,
        channel_id: ChannelId,
        config: &PlayerConfig,
    ) -> Self {
        if let Err(e) = config.validate() {
            warn!("[{}] {}, using {} ms frames", channel_id, e, FRAME_DURATION_MS);
        }

        Self {
            inner: Arc::new(SessionInner {
                label: channel_id.to_string(),
                transport,
                transcoder,
                decoder,
                frame_duration: config.frame_duration(),
                state: StateCell::new(PlaybackState::Stopped),
                position: Mutex::new(Duration::ZERO),
                track: Mutex::new(None),
                root: CancellationToken::new(),
                scope: Mutex::new(CancellationToken::new()),
                control: AsyncMutex::new(()),
                looping: AtomicBool::new(false),
            }),
        }
    }

    /// Plays `source` until it ends, fails, or is stopped.
    ///
    /// Resolves only when playback is over; run it on its own task (see
    /// [`spawn_play`](Self::spawn_play)) and drive it with the other control
    /// methods. Seeks restart the transcoder inside this call.
    pub async fn play(
        &self,
        source: impl Into<String>,
        encoding: Encoding,
    ) -> Result<(), PlaybackError> {
        let inner = &self.inner;
        match inner.state.get() {
            PlaybackState::Destroyed => return Err(PlaybackError::Destroyed),
            state if state > PlaybackState::Changing => return Err(PlaybackError::AlreadyPlaying),
            _ => {}
        }
        let Some(mut guard) = LoopGuard::enter(inner) else {
            return Err(PlaybackError::AlreadyPlaying);
        };

        let track = Track {
            source: source.into(),
            encoding,
        };
        info!(
            "[{}] Playing {} ({:?}) from {:?}",
            inner.label,
            track.source,
            track.encoding,
            inner.position()
        );
        *inner.track.lock() = Some(track);

        let result = inner.run().await;
        match &result {
            Ok(()) => info!("[{}] Playback finished", inner.label),
            Err(e) => error!("[{}] Playback failed: {}", inner.label, e),
        }

        inner.finish().await;
        guard.finished = true;
        drop(guard);

        result
    }

    /// Runs [`play`](Self::play) on a new tokio task.
    pub fn spawn_play(
        &self,
        source: impl Into<String>,
        encoding: Encoding,
    ) -> JoinHandle<Result<(), PlaybackError>> {
        let session = self.clone();
        let source = source.into();
        tokio::spawn(async move { session.play(source, encoding).await })
    }

    /// No-op unless playing. The transcoder keeps running; frames are held
    /// back until [`resume`](Self::resume).
    pub async fn pause(&self) {
        let inner = &self.inner;
        let _control = inner.control.lock().await;

        if !inner
            .state
            .transition(PlaybackState::Playing, PlaybackState::Paused)
        {
            return;
        }
        info!("[{}] Paused at {:?}", inner.label, inner.position());
        inner.signal(Speaking::NotSpeaking).await;
    }

    /// No-op unless paused.
    pub async fn resume(&self) {
        let inner = &self.inner;
        let _control = inner.control.lock().await;

        if inner.state.get() != PlaybackState::Paused {
            return;
        }
        inner.signal(Speaking::Microphone).await;

        if inner
            .state
            .transition(PlaybackState::Paused, PlaybackState::Playing)
        {
            info!("[{}] Resumed at {:?}", inner.label, inner.position());
        } else {
            debug!("[{}] Playback ended before resume took effect", inner.label);
        }
    }

    /// Restarts the current source at `position`. No-op unless paused or
    /// playing. Returns once the restarted attempt is streaming, or the play
    /// loop gave up.
    pub async fn seek(&self, position: Duration) {
        let inner = &self.inner;
        let _control = inner.control.lock().await;

        let previous = {
            let mut current = inner.position.lock();
            let previous = inner
                .state
                .update(|s| (s >= PlaybackState::Paused).then_some(PlaybackState::Changing));
            if previous.is_some() {
                *current = position;
            }
            previous
        };
        let Some(previous) = previous else {
            return;
        };

        info!("[{}] Seeking to {:?} (was {})", inner.label, position, previous);
        inner.stop_cycle().await;
    }

    /// Ends playback and waits for the play loop to wind down. No-op when
    /// nothing is playing.
    pub async fn stop(&self) {
        let inner = &self.inner;
        let _control = inner.control.lock().await;
        inner.stop_cycle().await;
    }

    /// Stops, leaves the voice channel and retires the session for good.
    pub async fn destroy(&self) {
        let inner = &self.inner;
        let _control = inner.control.lock().await;

        if inner.state.get() == PlaybackState::Destroyed {
            return;
        }

        inner.stop_cycle().await;
        inner.root.cancel();
        if let Err(e) = inner.transport.leave().await {
            warn!("[{}] Failed to leave voice channel: {}", inner.label, e);
        }
        inner.state.set(PlaybackState::Destroyed);
        info!("[{}] Session destroyed", inner.label);
    }

    pub fn state(&self) -> PlaybackState {
        self.inner.state.get()
    }

    pub fn playback_position(&self) -> Duration {
        self.inner.position()
    }

    /// Watches state transitions.
    pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.inner.state.subscribe()
    }
}
