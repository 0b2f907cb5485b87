use thiserror::Error;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the library
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid duration '{0}': expected <n>s, <n>h, <n>d or <n>w")]
    InvalidDuration(String),

    #[error("Discord API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Channel not found: {0}")]
    ChannelNotFound(String),

    #[error("Message {0} does not carry a poll")]
    MissingPoll(String),

    #[error("Interrupted before the poll result was announced")]
    Interrupted,
}

impl Error {
    /// HTTP status code for API errors
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
