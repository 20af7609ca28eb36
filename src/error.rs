// Error type for the I/O edges (sheets, config, snapshot store, exports).
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("unknown scheme '{0}'")]
    UnknownScheme(String),
}

pub type Result<T> = std::result::Result<T, DashboardError>;
