use thiserror::Error;

#[derive(Error, Debug)]
pub enum ColoringError {
    #[error("Failed to load image: {0}")]
    ImageLoad(#[from] image::ImageError),

    #[error("No page loaded")]
    NoPageLoaded,

    #[error("Dimension mismatch: expected {expected:?}, got {actual:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("Invalid boundary mask: {0}")]
    InvalidMask(String),

    #[error("Invalid vectorize options: {0}")]
    InvalidOptions(String),

    #[error("Invalid color: {0}")]
    InvalidColor(String),

    #[error("Fill engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("Tracing error: {0}")]
    Tracing(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),

    #[error(transparent)]
    TomlSer(#[from] toml::ser::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported file format. Please use .toml or .json files")]
    UnsupportedFileFormat,
}

pub type Result<T> = std::result::Result<T, ColoringError>;
