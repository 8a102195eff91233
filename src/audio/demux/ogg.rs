//! Ogg → raw Opus packet reader.
//!
//! Uses symphonia's Ogg reader under the hood and yields the packets of the
//! Opus track unchanged, ready to be sent to the voice transport without
//! re-encoding. `OpusHead`/`OpusTags` are consumed by the reader itself.
//!
//! Reads block; see [`OggOpusDemuxer`](super::OggOpusDemuxer) for the async
//! side.

use bytes::Bytes;
use symphonia::core::{
    codecs::CODEC_TYPE_OPUS,
    errors::Error,
    formats::{FormatOptions, FormatReader},
    io::{MediaSource, MediaSourceStream},
    meta::MetadataOptions,
    probe::Hint,
};

pub struct OggOpusReader {
    format: Box<dyn FormatReader>,
    track_id: u32,
}

impl OggOpusReader {
    /// Open an Ogg source. Returns `None` if it has no Opus track.
    pub fn open(source: Box<dyn MediaSource>) -> Result<Option<Self>, Error> {
        let mss = MediaSourceStream::new(source, Default::default());
        let mut hint = Hint::new();
        hint.with_extension("ogg");

        let probed = symphonia::default::get_probe().format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )?;

        let format = probed.format;
        let track_id = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec == CODEC_TYPE_OPUS)
            .map(|t| t.id);

        Ok(track_id.map(|track_id| Self { format, track_id }))
    }

    /// Next raw Opus packet; `Ok(None)` once the stream is exhausted.
    pub fn next_packet(&mut self) -> Result<Option<Bytes>, Error> {
        loop {
            let packet = match self.format.next_packet() {
                Ok(p) => p,
                Err(Error::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    return Ok(None);
                }
                Err(e) => return Err(e),
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            return Ok(Some(Bytes::from(packet.data)));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use symphonia::core::io::ReadOnlySource;

    use super::*;
    use crate::audio::demux::testing::{
        FLAG_EOS, granule_after, header_pages, opus_frame, opus_stream, packets_page,
    };

    fn open(data: Vec<u8>) -> Result<Option<OggOpusReader>, Error> {
        OggOpusReader::open(Box::new(ReadOnlySource::new(Cursor::new(data))))
    }

    fn drain(reader: &mut OggOpusReader) -> Vec<Bytes> {
        let mut packets = Vec::new();
        while let Some(packet) = reader.next_packet().unwrap() {
            packets.push(packet);
        }
        packets
    }

    #[test]
    fn yields_audio_packets_without_headers() {
        let frames: Vec<_> = (0..3).map(|i| opus_frame(format!("f{i}").as_bytes())).collect();
        let mut reader = open(opus_stream(&frames)).unwrap().expect("opus track");

        let packets = drain(&mut reader);
        assert_eq!(packets.len(), 3);
        for (packet, frame) in packets.iter().zip(&frames) {
            assert_eq!(&packet[..], &frame[..]);
        }
    }

    #[test]
    fn splits_multi_packet_pages() {
        let (a, b, c) = (opus_frame(b"a"), opus_frame(b"bb"), opus_frame(b"ccc"));
        let mut data = header_pages();
        data.extend(packets_page(FLAG_EOS, granule_after(3), 2, &[&a, &b, &c]));

        let mut reader = open(data).unwrap().expect("opus track");
        let packets = drain(&mut reader);
        assert_eq!(packets, vec![Bytes::from(a), Bytes::from(b), Bytes::from(c)]);
    }

    #[test]
    fn rejects_non_ogg_input() {
        let garbage = b"this is definitely not an ogg stream ".repeat(8);
        assert!(!matches!(open(garbage), Ok(Some(_))));
    }
}
