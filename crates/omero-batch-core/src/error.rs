use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("ROI archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("ROI encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Could not open image: {0}")]
    Decode(String),

    #[error("Remote store error: {0}")]
    Remote(String),

    #[error("Script error: {0}")]
    Script(String),

    #[error("Workspace error: {0}")]
    Workspace(String),

    #[error("Macro cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}
