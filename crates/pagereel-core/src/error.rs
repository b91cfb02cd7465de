use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Page driver error: {0}")]
    Driver(String),

    #[error("Capture process error: {0}")]
    Capture(String),

    #[error("No waypoints generated")]
    NoWaypoints,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported report format: {0}")]
    ReportFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
