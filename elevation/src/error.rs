use srtm::SrtmError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Srtm(#[from] SrtmError),

    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("operation cancelled")]
    Cancelled,
}
