use std::fmt;

/// Everything that can keep the effect from running.
///
/// None of these are meant to reach an end user; hosts log them and carry on
/// without the effect.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    NoRenderingContext,
    UnsupportedPlatform { reason: String },
    InvalidSurface { width: f32, height: f32 },
    InvalidConfig { field: &'static str, reason: String },
    ConfigLoad(String),
    ReducedMotion,
    NotRunning,
    AlreadyRunning,
    TornDown,
    Export(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::NoRenderingContext => write!(f, "no rendering context available"),
            EngineError::UnsupportedPlatform { reason } => {
                write!(f, "unsupported platform: {}", reason)
            }
            EngineError::InvalidSurface { width, height } => {
                write!(f, "invalid surface size {}x{}", width, height)
            }
            EngineError::InvalidConfig { field, reason } => {
                write!(f, "invalid config value for `{}`: {}", field, reason)
            }
            EngineError::ConfigLoad(msg) => write!(f, "failed to load config: {}", msg),
            EngineError::ReducedMotion => write!(f, "reduced motion requested by host"),
            EngineError::NotRunning => write!(f, "engine is not running"),
            EngineError::AlreadyRunning => write!(f, "engine is already running"),
            EngineError::TornDown => write!(f, "engine was stopped and cannot be restarted"),
            EngineError::Export(msg) => write!(f, "export failed: {}", msg),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<image::ImageError> for EngineError {
    fn from(e: image::ImageError) -> Self {
        EngineError::Export(e.to_string())
    }
}
