pub mod constants;
pub mod demux;
pub mod transcode;

pub use demux::{FrameDecoder, FrameWriter, OggOpusDemuxer};
pub use transcode::{FfmpegTranscoder, TranscodeRequest, Transcoder};
