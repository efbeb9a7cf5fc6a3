/// Application-wide error type
///
/// Store, network and config failures all funnel into `Error` so callers can
/// use `?` across layers. UI messages carry the rendered string instead,
/// because iced messages must be `Clone`.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("failed to serialize data: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored collection is not a JSON array; writes refuse to replace it
    #[error("stored collection {0} is unreadable and was left untouched")]
    CorruptCollection(&'static str),

    /// The in-memory store refused a write that would exceed its byte quota
    #[error("storage quota exceeded: {needed} bytes needed, {quota} allowed")]
    QuotaExceeded { needed: usize, quota: usize },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("generation endpoint returned HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("invalid endpoint url: {0}")]
    Endpoint(String),

    #[error("prompt is empty")]
    EmptyPrompt,

    #[error("a generation is already in progress")]
    Busy,

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("config error: {0}")]
    Config(#[from] toml::ser::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
