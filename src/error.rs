use thiserror::Error;

#[derive(Error, Debug)]
pub enum TorrentError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid option: {0}")]
    InvalidOption(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown command: {0}.")]
    UnknownCommand(String),

    #[error("Usage: {0}")]
    Usage(&'static str),
}

impl From<toml::de::Error> for TorrentError {
    fn from(err: toml::de::Error) -> Self {
        TorrentError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TorrentError>;
