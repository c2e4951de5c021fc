use thiserror::Error;

#[derive(Error, Debug)]
pub enum TavolaError {
    #[error("Search error: {0}")]
    Search(#[from] crate::search::SearchError),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Invalid position: {0}")]
    InvalidPosition(String),
    #[error("Init Logging error: {0}")]
    InitLoggingError(#[from] tracing_subscriber::filter::ParseError),
}

pub type Result<T> = std::result::Result<T, TavolaError>;
