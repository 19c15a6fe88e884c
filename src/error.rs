use thiserror::Error;

#[derive(Error, Debug)]
pub enum WordloopError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("Audio duration {0}s is too short to derive a frame count")]
    Division(f64),

    #[error("Requested {requested} frames but only {available} anchor cells are available")]
    InsufficientCells { requested: usize, available: usize },

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("{description} timed out after {seconds}s")]
    Timeout { description: String, seconds: u64 },

    #[error("SVG rendering error: {0}")]
    Svg(String),

    #[error("Invalid word: {0}")]
    InvalidWord(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Frame rendering task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, WordloopError>;
