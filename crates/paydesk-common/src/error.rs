use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("storage error: {0}")]
    Storage(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("session error: {0}")]
    Session(String),
}

pub type Result<T> = std::result::Result<T, Error>;
