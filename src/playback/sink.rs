//! `FrameSink` — the writer handed to the demuxer for one playback attempt.
//!
//! Holds frames back while the session is paused, ends decoding once the
//! session leaves `Playing`, and advances the playback position for every
//! frame the transport accepted.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use super::{PlaybackState, session::SessionInner};
use crate::{audio::demux::FrameWriter, common::errors::SinkError};

pub struct FrameSink {
    session: Arc<SessionInner>,
    scope: CancellationToken,
    state_rx: watch::Receiver<PlaybackState>,
}

impl FrameSink {
    pub(crate) fn new(session: Arc<SessionInner>, scope: CancellationToken) -> Self {
        let state_rx = session.state.subscribe();
        Self {
            session,
            scope,
            state_rx,
        }
    }
}

#[async_trait]
impl FrameWriter for FrameSink {
    async fn write(&mut self, frame: Bytes) -> Result<(), SinkError> {
        let mut state = *self.state_rx.borrow_and_update();
        while state == PlaybackState::Paused {
            trace!("[{}] Holding frame while paused", self.session.label);
            tokio::select! {
                changed = self.state_rx.changed() => {
                    if changed.is_err() {
                        return Err(SinkError::EndOfStream);
                    }
                }
                _ = self.scope.cancelled() => return Err(SinkError::Cancelled),
            }
            state = *self.state_rx.borrow_and_update();
        }

        if state != PlaybackState::Playing {
            return Err(SinkError::EndOfStream);
        }
        if self.scope.is_cancelled() {
            return Err(SinkError::Cancelled);
        }

        self.session.transport.write(&frame).await?;
        self.session.advance_position(&self.scope);
        Ok(())
    }
}
