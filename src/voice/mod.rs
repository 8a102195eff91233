pub mod transport;

pub use transport::{Speaking, VoiceTransport};
