use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Date/time parsing failed: {0}")]
    DateTime(#[from] chrono::ParseError),

    #[error("URL building failed: {0}")]
    Url(#[from] url::ParseError),

    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),

    #[error("Local time {time} does not exist in {timezone}")]
    NonexistentLocalTime { time: String, timezone: String },

    #[error("Date arithmetic overflowed: {0}")]
    DateOverflow(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("ICS generation failed: {0}")]
    IcsGeneration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
