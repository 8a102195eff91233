//! Central constants for the frame pipeline.
//!
//! Frame timing lives here so the transcoder, the demuxer and the session
//! agree on it.

// ── Frame timing ─────────────────────────────────────────────────────────────

/// Duration of one Opus frame requested from ffmpeg (`-frame_duration`).
pub const FRAME_DURATION_MS: u64 = 20;

/// Opus frame sizes accepted for `player.frame_duration_ms`.
pub const SUPPORTED_FRAME_DURATIONS_MS: [u64; 4] = [10, 20, 40, 60];

// ── Demux ────────────────────────────────────────────────────────────────────

/// Packets the Ogg reader may run ahead of the frame writer.
pub const DEMUX_QUEUE_PACKETS: usize = 4;

// ── Transcoder ───────────────────────────────────────────────────────────────

/// Upper bound on the diagnostic text kept from the transcoder's stderr.
pub const MAX_DIAGNOSTIC_BYTES: u64 = 64 * 1_024;
