use std::path::PathBuf;

/// Result type used by the rendering library.
pub type EngineResult<T> = Result<T, EngineError>;

/// Failures that abort a render job.
///
/// None of these are retried: assets are static files and scripts are
/// deterministic input, so every failure is a data or configuration problem.
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    /// A required sprite, font or sound file does not exist.
    #[error("asset not found: {}", path.display())]
    AssetNotFound { path: PathBuf },

    /// The script references something that cannot be rendered.
    #[error("invalid script: {0}")]
    InvalidScript(String),

    /// An asset exists but could not be decoded.
    #[error("failed to decode {}: {message}", path.display())]
    Decode { path: PathBuf, message: String },

    /// A sub-scene could not be composited.
    #[error("composition error: {0}")]
    Composition(String),

    /// Writing the video stream failed.
    #[error("encode error: {0}")]
    Encode(String),

    /// Audio sequencing or export failed.
    #[error("audio error: {0}")]
    Audio(String),

    /// A setting is out of range, e.g. zero fps.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl EngineError {
    pub fn asset_not_found(path: impl Into<PathBuf>) -> Self {
        Self::AssetNotFound { path: path.into() }
    }

    pub fn invalid_script(msg: impl Into<String>) -> Self {
        Self::InvalidScript(msg.into())
    }

    pub fn decode(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Decode {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn composition(msg: impl Into<String>) -> Self {
        Self::Composition(msg.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    pub fn audio(msg: impl Into<String>) -> Self {
        Self::Audio(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// True for errors caused by the script itself rather than the assets.
    pub fn is_script_error(&self) -> bool {
        matches!(self, Self::InvalidScript(_))
    }
}
