/// A generic boxed error type.
pub type AnyError = Box<dyn std::error::Error + Send + Sync>;

/// A convenient Result alias returning `AnyError`.
pub type AnyResult<T> = std::result::Result<T, AnyError>;

/// Voice channel a session is bound to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct ChannelId(pub u64);

impl From<u64> for ChannelId {
    fn from(u: u64) -> Self {
        Self(u)
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How the source reaches the Opus stage.
///
/// `Opus` sources are already Opus-encoded and only need remuxing
/// (`-codec copy`); everything else goes through `libopus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    Opus,
    #[default]
    Transcode,
}

impl Encoding {
    pub fn from_opus_flag(is_opus: bool) -> Self {
        if is_opus { Self::Opus } else { Self::Transcode }
    }

    /// ffmpeg `-codec` value for this encoding.
    pub fn codec(&self) -> &'static str {
        match self {
            Self::Opus => "copy",
            Self::Transcode => "libopus",
        }
    }

    pub fn is_opus(&self) -> bool {
        matches!(self, Self::Opus)
    }
}
