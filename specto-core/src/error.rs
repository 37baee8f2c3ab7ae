use thiserror::Error;

/// All errors produced by specto-core.
#[derive(Debug, Error)]
pub enum SpectoError {
    #[error("camera device error: {0}")]
    CameraDevice(String),

    #[error("no usable camera device found")]
    NoCameraDevice,

    #[error("classification error: {0}")]
    Classification(String),

    #[error("engine is already running")]
    AlreadyRunning,

    #[error("engine is not running")]
    NotRunning,

    #[error("model session error: {0}")]
    ModelSession(String),

    #[error("model file not found: {path}")]
    ModelNotFound { path: std::path::PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, SpectoError>;
