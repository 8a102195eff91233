//! Ogg Opus stream builders shared by the demux and session tests.

const CAPTURE_PATTERN: &[u8; 4] = b"OggS";
const CRC_OFFSET: usize = 22;
const MAX_LACING: u8 = 255;

pub const FLAG_CONTINUED: u8 = 0x01;
pub const FLAG_BOS: u8 = 0x02;
pub const FLAG_EOS: u8 = 0x04;

pub const SERIAL: u32 = 0x5EED;

/// 48 kHz samples in one 20 ms frame.
const FRAME_SAMPLES: i64 = 960;

/// TOC byte of a mono CELT fullband 20 ms packet holding a single frame.
const TOC_CELT_FB_20MS: u8 = 0xF8;

fn checksum(page: &[u8]) -> u32 {
    page.iter().fold(0u32, |mut crc, &byte| {
        crc ^= (byte as u32) << 24;
        for _ in 0..8 {
            crc = if crc & 0x8000_0000 != 0 {
                (crc << 1) ^ 0x04C1_1DB7
            } else {
                crc << 1
            };
        }
        crc
    })
}

/// An Opus packet carrying `tag` as its payload, so tests can tell frames
/// apart after demuxing.
pub fn opus_frame(tag: &[u8]) -> Vec<u8> {
    let mut frame = vec![TOC_CELT_FB_20MS];
    frame.extend_from_slice(tag);
    frame
}

/// Lacing values for one complete packet of `len` bytes.
pub fn packet_lacing(len: usize) -> Vec<u8> {
    let mut lacing = vec![MAX_LACING; len / 255];
    lacing.push((len % 255) as u8);
    lacing
}

/// Serializes a page from a raw lacing table and body.
pub fn encode_page(
    header_type: u8,
    granule: i64,
    sequence: u32,
    lacing: &[u8],
    body: &[u8],
) -> Vec<u8> {
    let mut page = Vec::with_capacity(27 + lacing.len() + body.len());
    page.extend_from_slice(CAPTURE_PATTERN);
    page.push(0);
    page.push(header_type);
    page.extend_from_slice(&granule.to_le_bytes());
    page.extend_from_slice(&SERIAL.to_le_bytes());
    page.extend_from_slice(&sequence.to_le_bytes());
    page.extend_from_slice(&[0; 4]);
    page.push(lacing.len() as u8);
    page.extend_from_slice(lacing);
    page.extend_from_slice(body);

    let crc = checksum(&page);
    page[CRC_OFFSET..CRC_OFFSET + 4].copy_from_slice(&crc.to_le_bytes());
    page
}

/// A page holding complete packets only.
pub fn packets_page(header_type: u8, granule: i64, sequence: u32, packets: &[&[u8]]) -> Vec<u8> {
    let mut lacing = Vec::new();
    let mut body = Vec::new();
    for packet in packets {
        lacing.extend(packet_lacing(packet.len()));
        body.extend_from_slice(packet);
    }
    encode_page(header_type, granule, sequence, &lacing, &body)
}

fn opus_head() -> Vec<u8> {
    let mut head = b"OpusHead".to_vec();
    head.push(1); // version
    head.push(1); // channels
    head.extend_from_slice(&312u16.to_le_bytes());
    head.extend_from_slice(&48_000u32.to_le_bytes());
    head.extend_from_slice(&0i16.to_le_bytes());
    head.push(0); // mapping family
    head
}

fn opus_tags() -> Vec<u8> {
    let vendor = b"Lavf61.7.100";
    let mut tags = b"OpusTags".to_vec();
    tags.extend_from_slice(&(vendor.len() as u32).to_le_bytes());
    tags.extend_from_slice(vendor);
    tags.extend_from_slice(&0u32.to_le_bytes());
    tags
}

/// The two Opus header pages ffmpeg writes before any audio.
pub fn header_pages() -> Vec<u8> {
    let mut out = packets_page(FLAG_BOS, 0, 0, &[&opus_head()]);
    out.extend(packets_page(0, 0, 1, &[&opus_tags()]));
    out
}

/// Granule position after `frames` 20 ms frames.
pub fn granule_after(frames: u32) -> i64 {
    FRAME_SAMPLES * frames as i64
}

/// One audio page per frame; sequence numbers continue after the headers.
pub fn frame_page(index: u32, frame: &[u8], last: bool) -> Vec<u8> {
    let flags = if last { FLAG_EOS } else { 0 };
    packets_page(flags, granule_after(index + 1), index + 2, &[frame])
}

/// A complete Ogg Opus stream with one frame per page.
pub fn opus_stream(frames: &[Vec<u8>]) -> Vec<u8> {
    let mut out = header_pages();
    for (i, frame) in frames.iter().enumerate() {
        out.extend(frame_page(i as u32, frame, i + 1 == frames.len()));
    }
    out
}

#[test]
fn checksum_matches_reference_vector() {
    // CRC-32/MPEG-2 variant without init/xorout, as used by Ogg.
    assert_eq!(checksum(&[0u8; 32]), 0);
    assert_eq!(checksum(&[0, 0, 0, 1]), 0x04C1_1DB7);
}
