//! `OggOpusDemuxer` — the [`FrameDecoder`] for ffmpeg's Ogg Opus output.
//!
//! The transcoder pipe is bridged into a blocking reader with
//! `SyncIoBridge`, and [`OggOpusReader`] runs on a blocking thread. Packets
//! come back over a short channel, so a paused writer stalls the reader
//! instead of buffering the stream.

use async_trait::async_trait;
use bytes::Bytes;
use symphonia::core::io::ReadOnlySource;
use tokio::{io::AsyncReadExt, sync::mpsc};
use tokio_util::io::SyncIoBridge;
use tracing::{debug, trace, warn};

use super::{FrameDecoder, FrameWriter, OggOpusReader};
use crate::{
    audio::{constants::DEMUX_QUEUE_PACKETS, transcode::ByteStream},
    common::errors::PlaybackError,
};

#[derive(Debug, Default, Clone, Copy)]
pub struct OggOpusDemuxer;

impl OggOpusDemuxer {
    pub fn new() -> Self {
        Self
    }
}

type PacketResult = Result<Bytes, PlaybackError>;

fn demux_error(e: impl std::fmt::Display) -> PlaybackError {
    PlaybackError::Demux(e.to_string())
}

/// Blocking half: pulls packets until the stream ends or nobody listens.
fn read_packets(
    pipe: SyncIoBridge<ByteStream>,
    packets: &mpsc::Sender<PacketResult>,
) -> Result<(), PlaybackError> {
    let mut reader = OggOpusReader::open(Box::new(ReadOnlySource::new(pipe)))
        .map_err(demux_error)?
        .ok_or_else(|| demux_error("no Opus track in stream"))?;

    while let Some(packet) = reader.next_packet().map_err(demux_error)? {
        if packet.is_empty() {
            continue;
        }
        if packets.blocking_send(Ok(packet)).is_err() {
            trace!("Frame writer gone, stopping Ogg reader");
            break;
        }
    }
    Ok(())
}

#[async_trait]
impl FrameDecoder for OggOpusDemuxer {
    async fn decode(
        &self,
        sink: &mut dyn FrameWriter,
        mut stream: ByteStream,
    ) -> Result<(), PlaybackError> {
        // Nothing at all on the pipe: the transcoder produced no output and
        // its exit status tells the rest.
        let mut head = [0u8; 4];
        let read = stream.read(&mut head).await.map_err(demux_error)?;
        if read == 0 {
            debug!("Transcoder output was empty");
            return Ok(());
        }
        let head = std::io::Cursor::new(head[..read].to_vec());
        let stream: ByteStream = Box::new(head.chain(stream));

        let (tx, mut rx) = mpsc::channel::<PacketResult>(DEMUX_QUEUE_PACKETS);
        let pipe = SyncIoBridge::new(stream);
        tokio::task::spawn_blocking(move || {
            if let Err(e) = read_packets(pipe, &tx) {
                if tx.blocking_send(Err(e)).is_err() {
                    trace!("Ogg reader failed after the frame writer stopped");
                }
            }
        });

        let mut forwarded: u64 = 0;
        while let Some(packet) = rx.recv().await {
            let packet = match packet {
                Ok(packet) => packet,
                Err(e) => {
                    warn!("Ogg stream broke after {} frames: {}", forwarded, e);
                    return Err(e);
                }
            };

            match sink.write(packet).await {
                Ok(()) => forwarded += 1,
                Err(e) if e.is_expected() => {
                    debug!("Sink ended decoding after {} frames: {}", forwarded, e);
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            }
        }

        debug!("Ogg stream exhausted after {} frames", forwarded);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        audio::demux::testing::{opus_frame, opus_stream},
        common::errors::SinkError,
    };

    #[derive(Default)]
    struct CollectingSink {
        frames: Vec<Bytes>,
        stop_after: Option<usize>,
        fail_after: Option<usize>,
    }

    #[async_trait]
    impl FrameWriter for CollectingSink {
        async fn write(&mut self, frame: Bytes) -> Result<(), SinkError> {
            if self.stop_after == Some(self.frames.len()) {
                return Err(SinkError::EndOfStream);
            }
            if self.fail_after == Some(self.frames.len()) {
                return Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "udp gone").into());
            }
            self.frames.push(frame);
            Ok(())
        }
    }

    fn stream(data: Vec<u8>) -> ByteStream {
        Box::new(std::io::Cursor::new(data))
    }

    fn frames(n: usize) -> Vec<Vec<u8>> {
        (0..n)
            .map(|i| opus_frame(format!("opus-frame-{i}").as_bytes()))
            .collect()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn forwards_audio_packets_in_order() {
        let expected = frames(3);
        let mut sink = CollectingSink::default();
        OggOpusDemuxer::new()
            .decode(&mut sink, stream(opus_stream(&expected)))
            .await
            .unwrap();

        let got: Vec<&[u8]> = sink.frames.iter().map(|f| &f[..]).collect();
        let want: Vec<&[u8]> = expected.iter().map(|f| &f[..]).collect();
        assert_eq!(got, want);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn end_of_stream_from_sink_is_not_an_error() {
        let mut sink = CollectingSink {
            stop_after: Some(2),
            ..Default::default()
        };
        OggOpusDemuxer::new()
            .decode(&mut sink, stream(opus_stream(&frames(10))))
            .await
            .unwrap();
        assert_eq!(sink.frames.len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn transport_failure_propagates() {
        let mut sink = CollectingSink {
            fail_after: Some(1),
            ..Default::default()
        };
        let err = OggOpusDemuxer::new()
            .decode(&mut sink, stream(opus_stream(&frames(4))))
            .await
            .unwrap_err();
        assert!(matches!(err, PlaybackError::Write(_)), "got {err:?}");
        assert_eq!(sink.frames.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn non_ogg_output_is_a_demux_error() {
        let mut sink = CollectingSink::default();
        let garbage = b"[mp3 @ 0x5581] Header missing ".repeat(8);
        let err = OggOpusDemuxer::new()
            .decode(&mut sink, stream(garbage))
            .await
            .unwrap_err();
        assert!(matches!(err, PlaybackError::Demux(_)), "got {err:?}");
        assert!(sink.frames.is_empty());
    }

    #[tokio::test]
    async fn empty_stream_decodes_nothing() {
        let mut sink = CollectingSink::default();
        OggOpusDemuxer::new()
            .decode(&mut sink, stream(Vec::new()))
            .await
            .unwrap();
        assert!(sink.frames.is_empty());
    }
}
