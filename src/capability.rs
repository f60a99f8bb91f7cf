//! Negotiates a sample format for the simulation fields from what the host
//! platform reports it can store and filter.

use crate::error::EngineError;

/// Storage precision of field samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    Float32,
    Float16,
}

/// How fields are read between sample points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filtering {
    Linear,
    Nearest,
}

/// What the host surface can provide. GPU-backed hosts fill this in from
/// their extension probe; CPU hosts report everything as available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlatformCapabilities {
    pub rendering_context: bool,
    pub float32_storage: bool,
    pub float32_linear: bool,
    pub float16_storage: bool,
    pub float16_linear: bool,
}

impl PlatformCapabilities {
    /// Capabilities of the CPU field backend.
    pub fn cpu() -> Self {
        Self {
            rendering_context: true,
            float32_storage: true,
            float32_linear: true,
            float16_storage: true,
            float16_linear: true,
        }
    }

    /// A host that could not acquire any drawing context.
    pub fn none() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderFormat {
    pub precision: Precision,
    pub filtering: Filtering,
}

/// Candidates in order of preference.
const CANDIDATES: [Precision; 2] = [Precision::Float32, Precision::Float16];

/// Picks the first storage format the platform supports, with linear
/// filtering when that format can be filtered and nearest otherwise.
/// Integer-only platforms are rejected rather than degraded.
pub fn negotiate(caps: &PlatformCapabilities) -> Result<RenderFormat, EngineError> {
    if !caps.rendering_context {
        return Err(EngineError::NoRenderingContext);
    }

    for precision in CANDIDATES {
        let (storage, linear) = match precision {
            Precision::Float32 => (caps.float32_storage, caps.float32_linear),
            Precision::Float16 => (caps.float16_storage, caps.float16_linear),
        };
        if storage {
            let filtering = if linear {
                Filtering::Linear
            } else {
                Filtering::Nearest
            };
            return Ok(RenderFormat {
                precision,
                filtering,
            });
        }
    }

    Err(EngineError::UnsupportedPlatform {
        reason: "no floating-point field storage".to_string(),
    })
}
