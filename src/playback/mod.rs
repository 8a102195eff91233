//! Playback control: the session state machine and the frame sink it hands
//! to the demuxer.

pub mod session;
pub mod sink;
pub mod state;


pub use session::Session;
pub use sink::FrameSink;
pub use state::PlaybackState;
